#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use ocrtoc_image as image;

#[doc(inline)]
pub use ocrtoc_io as io;

#[doc(inline)]
pub use ocrtoc_3d as k3d;

#[doc(inline)]
pub use ocrtoc_dataset as dataset;
