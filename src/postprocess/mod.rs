//! Detection geometry and annotation.

pub mod annotate;
pub mod detection;
