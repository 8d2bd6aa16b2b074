use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use ocrtoc_3d::{
    camera::{
        PinholeCameraParameters, PinholeIntrinsics, DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH,
    },
    io::ply::read_ply_mesh,
    mesh::TriangleMesh,
    pointcloud::ColoredPointCloud,
    rgbd::backproject,
    transforms::RigidTransform,
};
use ocrtoc_image::{color::bgr_from_rgb, Image, ImageSize};
use ocrtoc_io::{
    npy::read_npy,
    png::{read_image_png_mono16, read_image_png_rgb8},
};

use crate::{
    error::DatasetError,
    lists::{self, ObjectList, SCENES_DIR},
    overlay::{self, Overlay, OverlayOptions},
    reconstruction,
};

/// Number of raw depth units per meter; depth images are in millimeters.
pub const DEPTH_SCALE: f64 = 1000.0;

/// The channel order of a loaded color image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorOrder {
    /// Red, green, blue.
    #[default]
    Rgb,
    /// Blue, green, red.
    Bgr,
}

impl FromStr for ColorOrder {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RGB" => Ok(ColorOrder::Rgb),
            "BGR" => Ok(ColorOrder::Bgr),
            _ => Err(DatasetError::UnknownColorOrder(s.to_string())),
        }
    }
}

/// Read access to a dataset of recorded RGB-D scenes.
///
/// The dataset folder is laid out as:
///
/// ```text
/// root/scene_name_list.txt
/// root/object_name_list.txt
/// root/rgb_pcd/<object>.ply
/// root/scenes/<scene>/object_list.txt
/// root/scenes/<scene>/color_camK.npy
/// root/scenes/<scene>/rgb_undistort/%04d.png
/// root/scenes/<scene>/depth_undistort/%04d.png
/// root/scenes/<scene>/camera_poses/%04d.npy
/// root/scenes/<scene>/seg_masks/%04d.npy
/// root/scenes/<scene>/object_poses/<object>.npy
/// ```
///
/// Every accessor reads from disk on each call; nothing but the name lists is
/// cached.
#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
    scene_name_list: Vec<String>,
    object_list: ObjectList,
}

impl Dataset {
    /// Open the dataset stored under `root`.
    ///
    /// The scene and object lists are read, or generated from the scene
    /// folders when the list files are missing.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let root = root.as_ref().to_path_buf();
        let scene_name_list = lists::load_scene_name_list(&root, false)?;
        let object_list = lists::load_object_list(&root, &scene_name_list, false)?;

        log::info!(
            "obj name list:{:?} scene name list:{:?}",
            object_list.names(),
            scene_name_list
        );

        Ok(Self {
            root,
            scene_name_list,
            object_list,
        })
    }

    /// The dataset root folder.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The object names and their instance ids.
    pub fn object_list(&self) -> &ObjectList {
        &self.object_list
    }

    /// The scene names in index order.
    pub fn scene_name_list(&self) -> &[String] {
        &self.scene_name_list
    }

    /// Load the scene names from disk, persisting a generated list if `save`.
    pub fn load_scene_name_list(&self, save: bool) -> Result<Vec<String>, DatasetError> {
        lists::load_scene_name_list(&self.root, save)
    }

    /// Load the object names and ids from disk, persisting a generated list if `save`.
    pub fn load_object_list(&self, save: bool) -> Result<ObjectList, DatasetError> {
        lists::load_object_list(&self.root, &self.scene_name_list, save)
    }

    /// The number of scenes.
    pub fn scene_number(&self) -> usize {
        self.scene_name_list.len()
    }

    /// The number of distinct objects.
    pub fn object_number(&self) -> usize {
        self.object_list.len()
    }

    /// The name of a scene.
    pub fn scene_name(&self, scene_id: usize) -> Result<&str, DatasetError> {
        self.scene_name_list
            .get(scene_id)
            .map(String::as_str)
            .ok_or(DatasetError::SceneIndexOutOfRange(
                scene_id,
                self.scene_name_list.len(),
            ))
    }

    fn scene_dir(&self, scene_id: usize) -> Result<PathBuf, DatasetError> {
        Ok(self.root.join(SCENES_DIR).join(self.scene_name(scene_id)?))
    }

    fn frame_path(
        &self,
        scene_id: usize,
        folder: &str,
        image_id: usize,
        extension: &str,
    ) -> Result<PathBuf, DatasetError> {
        Ok(self
            .scene_dir(scene_id)?
            .join(folder)
            .join(format!("{image_id:04}.{extension}")))
    }

    /// The number of images recorded in a scene.
    pub fn scene_image_number(&self, scene_id: usize) -> Result<usize, DatasetError> {
        let mut count = 0;
        for entry in fs::read_dir(self.scene_dir(scene_id)?.join("rgb_undistort"))? {
            if entry?.file_type()?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// The number of images recorded in the whole dataset.
    pub fn total_image_number(&self) -> Result<usize, DatasetError> {
        (0..self.scene_number()).try_fold(0, |acc, scene_id| {
            Ok(acc + self.scene_image_number(scene_id)?)
        })
    }

    /// Load the accurate camera intrinsics of a scene.
    pub fn load_real_camera_intrinsic(
        &self,
        scene_id: usize,
    ) -> Result<PinholeIntrinsics, DatasetError> {
        let camera_k = read_npy(self.scene_dir(scene_id)?.join("color_camK.npy"))?;
        Ok(PinholeIntrinsics::from_matrix(&camera_k.to_matrix::<3, 3>()?))
    }

    /// Load approximate camera parameters for a 1280x720 image.
    ///
    /// The focal lengths come from the scene intrinsics but the principal
    /// point is fixed at the image center.
    pub fn load_camera_param(
        &self,
        scene_id: usize,
    ) -> Result<PinholeCameraParameters, DatasetError> {
        log::warn!(
            "Camera parameter retrieved from 'load_camera_param' is not accurate, \
             using 'load_real_camera_intrinsic' instead for accurate result"
        );
        let intrinsics = self.load_real_camera_intrinsic(scene_id)?;
        Ok(PinholeCameraParameters::centered(
            DEFAULT_IMAGE_WIDTH,
            DEFAULT_IMAGE_HEIGHT,
            intrinsics.fx,
            intrinsics.fy,
        ))
    }

    /// Load the color image of a frame in the requested channel order.
    pub fn load_raw_image(
        &self,
        scene_id: usize,
        image_id: usize,
        order: ColorOrder,
    ) -> Result<Image<u8, 3>, DatasetError> {
        let rgb =
            read_image_png_rgb8(self.frame_path(scene_id, "rgb_undistort", image_id, "png")?)?;
        match order {
            ColorOrder::Rgb => Ok(rgb),
            ColorOrder::Bgr => {
                let mut bgr = Image::from_size_val(rgb.size(), 0u8)?;
                bgr_from_rgb(&rgb, &mut bgr)?;
                Ok(bgr)
            }
        }
    }

    /// Load the raw depth image of a frame, in millimeters.
    pub fn load_depth_image(
        &self,
        scene_id: usize,
        image_id: usize,
    ) -> Result<Image<u16, 1>, DatasetError> {
        Ok(read_image_png_mono16(self.frame_path(
            scene_id,
            "depth_undistort",
            image_id,
            "png",
        )?)?)
    }

    /// Load the camera pose of a frame (camera to world).
    pub fn load_camera_pose(
        &self,
        scene_id: usize,
        image_id: usize,
    ) -> Result<RigidTransform, DatasetError> {
        let path = self.frame_path(scene_id, "camera_poses", image_id, "npy")?;
        if !path.exists() {
            return Err(DatasetError::MissingCameraPose {
                scene: self.scene_name(scene_id)?.to_string(),
                image_id,
            });
        }
        Ok(RigidTransform::from_rows(read_npy(path)?.to_matrix::<4, 4>()?))
    }

    /// Load the names of the objects placed in a scene.
    pub fn load_scene_object_list(&self, scene_id: usize) -> Result<Vec<String>, DatasetError> {
        lists::load_scene_object_list(&self.root, self.scene_name(scene_id)?)
    }

    /// Load the mesh of an object, or `None` if the dataset has no mesh for it.
    pub fn load_object_mesh(
        &self,
        object_name: &str,
    ) -> Result<Option<TriangleMesh>, DatasetError> {
        let path = self
            .root
            .join("rgb_pcd")
            .join(format!("{object_name}.ply"));
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_ply_mesh(path)?))
    }

    /// Load the pose (object to world) of every object of a scene.
    ///
    /// The entries follow the scene object list. Objects that were not
    /// localized in the scene have no pose.
    pub fn load_object_pose_dict(
        &self,
        scene_id: usize,
    ) -> Result<Vec<(String, Option<RigidTransform>)>, DatasetError> {
        let pose_dir = self.scene_dir(scene_id)?.join("object_poses");
        self.load_scene_object_list(scene_id)?
            .into_iter()
            .map(|object_name| {
                let path = pose_dir.join(format!("{object_name}.npy"));
                let pose = if path.exists() {
                    Some(RigidTransform::from_rows(read_npy(path)?.to_matrix::<4, 4>()?))
                } else {
                    None
                };
                Ok((object_name, pose))
            })
            .collect()
    }

    /// Load the segmentation mask of a frame; each pixel holds an object id or 0.
    pub fn load_seg_mask(
        &self,
        scene_id: usize,
        image_id: usize,
    ) -> Result<Image<u32, 1>, DatasetError> {
        let mask = read_npy(self.frame_path(scene_id, "seg_masks", image_id, "npy")?)?;
        let &[height, width] = mask.shape.as_slice() else {
            return Err(DatasetError::InvalidMaskShape(mask.shape.clone()));
        };
        Ok(Image::new(ImageSize { width, height }, mask.to_u32_vec()?)?)
    }

    /// Backproject a frame into a camera space point cloud.
    pub fn load_point_cloud(
        &self,
        scene_id: usize,
        image_id: usize,
    ) -> Result<ColoredPointCloud, DatasetError> {
        let depth = self.load_depth_image(scene_id, image_id)?;
        let color = self
            .load_raw_image(scene_id, image_id, ColorOrder::Rgb)?
            .cast_and_scale::<f64>(1.0 / 255.0)?;
        let intrinsics = self.load_real_camera_intrinsic(scene_id)?;
        Ok(backproject(&depth, &color, &intrinsics, DEPTH_SCALE)?)
    }

    /// Reconstruct the whole scene point cloud in world coordinates.
    ///
    /// See [`reconstruction::reconstruct_scene`].
    pub fn load_scene_point_cloud(
        &self,
        scene_id: usize,
    ) -> Result<ColoredPointCloud, DatasetError> {
        reconstruction::reconstruct_scene(self, scene_id)
    }

    /// Build the pose annotation overlay of a scene or of one of its frames.
    ///
    /// See [`overlay::build_overlay`].
    pub fn vis_6dpose(
        &self,
        scene_id: usize,
        image_id: Option<usize>,
        dimension: u8,
        options: &OverlayOptions,
    ) -> Result<Overlay, DatasetError> {
        overlay::build_overlay(self, scene_id, image_id, dimension, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{self, IMAGE_SIZE};
    use approx::assert_relative_eq;

    #[test]
    fn test_color_order_parsing() {
        assert_eq!("RGB".parse::<ColorOrder>().ok(), Some(ColorOrder::Rgb));
        assert_eq!("BGR".parse::<ColorOrder>().ok(), Some(ColorOrder::Bgr));
        assert!(matches!(
            "HSV".parse::<ColorOrder>(),
            Err(DatasetError::UnknownColorOrder(_))
        ));
    }

    #[test]
    fn test_dataset_counts() -> Result<(), DatasetError> {
        let tmp_dir = tempfile::tempdir()?;
        test_utils::write_scene(tmp_dir.path(), "scene_0", 3, &["cube", "mug"])?;
        test_utils::write_scene(tmp_dir.path(), "scene_1", 2, &["banana", "cube"])?;

        let dataset = Dataset::open(tmp_dir.path())?;
        assert_eq!(dataset.scene_number(), 2);
        assert_eq!(dataset.scene_name(1)?, "scene_1");
        assert_eq!(dataset.object_number(), 3);
        assert_eq!(dataset.object_list().id("cube"), Some(2));
        assert_eq!(dataset.scene_image_number(0)?, 3);
        assert_eq!(dataset.total_image_number()?, 5);
        assert!(matches!(
            dataset.scene_name(2),
            Err(DatasetError::SceneIndexOutOfRange(2, 2))
        ));
        Ok(())
    }

    #[test]
    fn test_load_frame_data() -> Result<(), DatasetError> {
        let tmp_dir = tempfile::tempdir()?;
        test_utils::write_scene(tmp_dir.path(), "scene_0", 1, &["cube"])?;
        let dataset = Dataset::open(tmp_dir.path())?;

        let rgb = dataset.load_raw_image(0, 0, ColorOrder::Rgb)?;
        assert_eq!(rgb.size(), IMAGE_SIZE);
        assert_eq!(&rgb.as_slice()[..3], &test_utils::FRAME_COLOR);
        let bgr = dataset.load_raw_image(0, 0, ColorOrder::Bgr)?;
        let [r, g, b] = test_utils::FRAME_COLOR;
        assert_eq!(&bgr.as_slice()[..3], &[b, g, r]);

        let depth = dataset.load_depth_image(0, 0)?;
        assert!(depth.as_slice().iter().all(|&d| d == test_utils::FRAME_DEPTH));

        let mask = dataset.load_seg_mask(0, 0)?;
        assert_eq!(mask.size(), IMAGE_SIZE);

        let intrinsics = dataset.load_real_camera_intrinsic(0)?;
        assert_eq!(intrinsics, test_utils::intrinsics());

        let param = dataset.load_camera_param(0)?;
        assert_eq!(param.width, 1280);
        assert_eq!(param.intrinsics.cx, 639.5);
        assert_eq!(param.intrinsics.fx, intrinsics.fx);

        let pose = dataset.load_camera_pose(0, 0)?;
        assert_eq!(pose, RigidTransform::identity());
        assert!(matches!(
            dataset.load_camera_pose(0, 7),
            Err(DatasetError::MissingCameraPose { image_id: 7, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_load_point_cloud() -> Result<(), DatasetError> {
        let tmp_dir = tempfile::tempdir()?;
        test_utils::write_scene(tmp_dir.path(), "scene_0", 1, &[])?;
        let dataset = Dataset::open(tmp_dir.path())?;

        let pointcloud = dataset.load_point_cloud(0, 0)?;
        assert_eq!(pointcloud.len(), IMAGE_SIZE.width * IMAGE_SIZE.height);
        let z = test_utils::FRAME_DEPTH as f64 / DEPTH_SCALE;
        assert!(pointcloud.points().iter().all(|p| p[2] == z));
        let color = pointcloud.colors()[0];
        assert_relative_eq!(color[0], test_utils::FRAME_COLOR[0] as f64 / 255.0);
        Ok(())
    }

    #[test]
    fn test_object_meshes_and_poses() -> Result<(), DatasetError> {
        let tmp_dir = tempfile::tempdir()?;
        test_utils::write_scene(tmp_dir.path(), "scene_0", 1, &["cube", "mug"])?;
        test_utils::write_object_pose(tmp_dir.path(), "scene_0", "cube", [0.0, 0.0, 0.5])?;
        test_utils::write_tetrahedron_mesh(tmp_dir.path(), "cube")?;
        let dataset = Dataset::open(tmp_dir.path())?;

        let poses = dataset.load_object_pose_dict(0)?;
        assert_eq!(poses.len(), 2);
        assert_eq!(poses[0].0, "cube");
        assert_eq!(poses[0].1.map(|p| p.translation()), Some([0.0, 0.0, 0.5]));
        assert_eq!(poses[1], ("mug".to_string(), None));

        assert!(dataset.load_object_mesh("cube")?.is_some());
        assert!(dataset.load_object_mesh("mug")?.is_none());
        Ok(())
    }
}
