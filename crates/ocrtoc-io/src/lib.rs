#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`error::IoError`] variants for file access and PNG encoding/decoding failures.
pub mod error;

/// PNG image encoding and decoding.
///
/// Read 8-bit color and 16-bit depth PNG images, and write them back.
pub mod png;

/// NumPy `.npy` array reading and writing.
///
/// Camera intrinsics, camera poses, object poses and segmentation masks are
/// stored as `.npy` arrays.
pub mod npy;

/// Internal utility functions for image bit depth conversion.
mod conv_utils;
