#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Read access to the scenes, frames, objects and annotations of a dataset.
pub mod dataset;

/// Error types for the dataset crate.
pub mod error;

/// Scene and object name lists.
pub mod lists;

/// 2D and 3D pose annotation overlays.
pub mod overlay;

/// Whole scene point cloud reconstruction.
pub mod reconstruction;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::dataset::{ColorOrder, Dataset};
pub use crate::error::DatasetError;
pub use crate::overlay::{Dimension, Overlay, OverlayOptions};
