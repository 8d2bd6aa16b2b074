#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera models.
pub mod camera;

/// I/O utilities for reading and writing 3D data.
pub mod io;

/// Triangle meshes and surface sampling.
pub mod mesh;

/// Operations on 3D data processing.
pub mod ops;

/// Statistical outlier removal.
pub mod outlier;

/// Colored point clouds.
pub mod pointcloud;

/// Depth backprojection from RGB-D frames.
pub mod rgbd;

/// Rigid body transforms.
pub mod transforms;

/// Voxel grid downsampling.
pub mod voxel_grid;
