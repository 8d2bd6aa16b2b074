mod parser;
mod properties;
mod writer;

pub use parser::*;
pub use properties::*;
pub use writer::*;

use crate::{mesh::MeshError, pointcloud::PointCloudError};

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PlyError {
    /// Failed to read or write the PLY file
    #[error("Failed to read PLY file")]
    Io(#[from] std::io::Error),

    /// The header could not be parsed
    #[error("Malformed PLY header: {0}")]
    MalformedHeader(String),

    /// Unsupported PLY property type
    #[error("Unsupported PLY property type: {0}")]
    UnsupportedProperty(String),

    /// A required element or property is missing
    #[error("Missing PLY element or property: {0}")]
    MissingProperty(String),

    /// A value in the body could not be parsed
    #[error("Invalid PLY value: {0}")]
    InvalidValue(String),

    /// The parsed data does not form a valid mesh
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// The parsed data does not form a valid point cloud
    #[error(transparent)]
    PointCloud(#[from] PointCloudError),
}
