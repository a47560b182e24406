//! Image decoding, encoding and region cropping.

pub mod crop;
pub mod decode;
