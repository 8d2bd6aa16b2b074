#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// image representation for color, depth and mask rasters.
pub mod image;

/// Error types for the image module.
pub mod error;

/// Color channel order conversions.
pub mod color;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
