use ocrtoc_3d::{
    io::ply::PlyError, mesh::MeshError, rgbd::RgbdError, voxel_grid::VoxelGridError,
};
use ocrtoc_image::ImageError;
use ocrtoc_io::{error::IoError, npy::NpyError};

/// An error type for the dataset crate.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum DatasetError {
    /// Failed to access the dataset folder.
    #[error("Failed to access the dataset. {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read a color or depth image.
    #[error("Failed to read an image. {0}")]
    ImageIo(#[from] IoError),

    /// Failed to read or write a NumPy array.
    #[error("Failed to read an array. {0}")]
    Npy(#[from] NpyError),

    /// Failed to read an object mesh.
    #[error("Failed to read a mesh. {0}")]
    Ply(#[from] PlyError),

    /// The object mesh cannot be sampled.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// The frame cannot be backprojected.
    #[error(transparent)]
    Rgbd(#[from] RgbdError),

    /// The point cloud cannot be denoised.
    #[error(transparent)]
    VoxelGrid(#[from] VoxelGridError),

    /// An image operation failed.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The scene index is not in the scene list.
    #[error("Scene index {0} out of range, the dataset has {1} scenes")]
    SceneIndexOutOfRange(usize, usize),

    /// The object name is not in the object list.
    #[error("Unknown object {0}")]
    UnknownObject(String),

    /// The requested color channel order is not supported.
    #[error("Unknown order {0}, only RGB and BGR are allowed")]
    UnknownColorOrder(String),

    /// The overlay dimension is not supported.
    #[error("Dimension must be 2 or 3, got {0}")]
    UnsupportedDimension(u8),

    /// A 2D overlay was requested for a whole scene.
    #[error("The image id must be given for 2d visualization")]
    MissingImageId,

    /// The camera pose of a frame is not available.
    #[error("Missing camera pose for image {image_id} of scene {scene}")]
    MissingCameraPose {
        /// The scene name.
        scene: String,
        /// The image index.
        image_id: usize,
    },

    /// The segmentation mask is not a 2-D array.
    #[error("Segmentation mask must be a 2-D array, got shape {0:?}")]
    InvalidMaskShape(Vec<usize>),
}
