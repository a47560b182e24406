//! Tree and shrub analysis service.
//!
//! Accepts an image, detects trees and shrubs, classifies species, estimates
//! health attributes per region and returns an annotated copy of the image.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;

pub use config::Config;
pub use error::AppError;
pub use handlers::{router, AppState};
