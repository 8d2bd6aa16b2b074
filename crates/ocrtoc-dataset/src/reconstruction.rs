use ocrtoc_3d::{
    ops::{denoise, merge, DenoiseParams},
    pointcloud::ColoredPointCloud,
};

use crate::{dataset::Dataset, error::DatasetError};

/// Only one in this many frames is used to reconstruct a scene.
pub const FRAME_STRIDE: usize = 4;

/// The indices of the frames used to reconstruct a scene with `num_frames` frames.
///
/// Example:
///
/// ```
/// use ocrtoc_dataset::reconstruction::selected_frames;
///
/// assert_eq!(selected_frames(9).collect::<Vec<_>>(), vec![0, 4, 8]);
/// ```
pub fn selected_frames(num_frames: usize) -> impl Iterator<Item = usize> {
    (0..num_frames).step_by(FRAME_STRIDE)
}

/// Backproject the selected frames of a scene, move them to world coordinates
/// with their camera poses and concatenate them.
///
/// # Errors
///
/// A selected frame without a camera pose fails with
/// [`DatasetError::MissingCameraPose`].
pub fn merge_scene_frames(
    dataset: &Dataset,
    scene_id: usize,
) -> Result<ColoredPointCloud, DatasetError> {
    let num_frames = dataset.scene_image_number(scene_id)?;

    let frames = selected_frames(num_frames)
        .map(|image_id| {
            let camera_pose = dataset.load_camera_pose(scene_id, image_id)?;
            let mut pointcloud = dataset.load_point_cloud(scene_id, image_id)?;
            pointcloud.transform(&camera_pose);
            log::debug!("frame {image_id}: {} points", pointcloud.len());
            Ok(pointcloud)
        })
        .collect::<Result<Vec<_>, DatasetError>>()?;

    Ok(merge(&frames))
}

/// Reconstruct the whole scene point cloud in world coordinates with the
/// default [`DenoiseParams`].
///
/// Every [`FRAME_STRIDE`]-th frame is backprojected, transformed by its camera
/// pose, merged and denoised. A scene without frames gives an empty cloud.
pub fn reconstruct_scene(
    dataset: &Dataset,
    scene_id: usize,
) -> Result<ColoredPointCloud, DatasetError> {
    reconstruct_scene_with(dataset, scene_id, &DenoiseParams::default())
}

/// Reconstruct the whole scene point cloud with custom denoise parameters.
pub fn reconstruct_scene_with(
    dataset: &Dataset,
    scene_id: usize,
    params: &DenoiseParams,
) -> Result<ColoredPointCloud, DatasetError> {
    log::debug!("full scene pcd: begin preprocess");
    let merged = merge_scene_frames(dataset, scene_id)?;
    Ok(denoise(&merged, params)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_selected_frames() {
        assert_eq!(selected_frames(0).count(), 0);
        assert_eq!(selected_frames(5).collect::<Vec<_>>(), vec![0, 4]);
        assert_eq!(selected_frames(4).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_reconstruct_five_frames() -> Result<(), DatasetError> {
        let tmp_dir = tempfile::tempdir()?;
        let root = tmp_dir.path();
        // only frames 0 and 4 carry depth and pose; the others must not be read
        test_utils::write_scene(root, "scene_0", 1, &[])?;
        for image_id in 1..4 {
            test_utils::write_color_frame(root, "scene_0", image_id)?;
        }
        test_utils::write_frame(root, "scene_0", 4, 80)?;

        let dataset = Dataset::open(root)?;
        assert_eq!(dataset.scene_image_number(0)?, 5);

        let merged = merge_scene_frames(&dataset, 0)?;
        assert_eq!(merged.len(), 100 + 80);

        let full = reconstruct_scene(&dataset, 0)?;
        assert!(full.len() <= merged.len());
        assert!(!full.is_empty());

        // same input, same output
        let again = dataset.load_scene_point_cloud(0)?;
        assert_eq!(again.len(), full.len());
        assert_eq!(again.min_bound(), full.min_bound());
        assert_eq!(again.max_bound(), full.max_bound());
        Ok(())
    }

    #[test]
    fn test_reconstruct_applies_camera_pose() -> Result<(), DatasetError> {
        let tmp_dir = tempfile::tempdir()?;
        let root = tmp_dir.path();
        test_utils::write_scene(root, "scene_0", 1, &[])?;
        test_utils::write_camera_pose(root, "scene_0", 0, [1.0, 2.0, 3.0])?;

        let dataset = Dataset::open(root)?;
        let camera = dataset.load_point_cloud(0, 0)?;
        let world = merge_scene_frames(&dataset, 0)?;
        assert_eq!(world.len(), camera.len());

        let (c, w) = (camera.min_bound(), world.min_bound());
        approx::assert_relative_eq!(w[0], c[0] + 1.0, epsilon = 1e-12);
        approx::assert_relative_eq!(w[1], c[1] + 2.0, epsilon = 1e-12);
        approx::assert_relative_eq!(w[2], c[2] + 3.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_reconstruct_empty_scene() -> Result<(), DatasetError> {
        let tmp_dir = tempfile::tempdir()?;
        test_utils::write_scene(tmp_dir.path(), "scene_0", 0, &[])?;
        let dataset = Dataset::open(tmp_dir.path())?;
        assert!(reconstruct_scene(&dataset, 0)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_reconstruct_missing_pose() -> Result<(), DatasetError> {
        let tmp_dir = tempfile::tempdir()?;
        let root = tmp_dir.path();
        test_utils::write_scene(root, "scene_0", 1, &[])?;
        std::fs::remove_file(root.join("scenes/scene_0/camera_poses/0000.npy"))?;
        let dataset = Dataset::open(root)?;
        assert!(matches!(
            reconstruct_scene(&dataset, 0),
            Err(DatasetError::MissingCameraPose { image_id: 0, .. })
        ));
        Ok(())
    }
}
