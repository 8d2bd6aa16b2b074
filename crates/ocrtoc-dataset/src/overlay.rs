use ocrtoc_3d::{ops::merge, pointcloud::ColoredPointCloud};
use ocrtoc_image::{Image, ImageError};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    dataset::{ColorOrder, Dataset},
    error::DatasetError,
    reconstruction::reconstruct_scene,
};

/// Number of points sampled on the surface of every posed object mesh.
pub const MESH_SAMPLES: usize = 10_000;

/// The kind of overlay to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Instance masks tinted on the color image of a frame.
    Two,
    /// Posed object meshes merged with the frame or scene point cloud.
    Three,
}

impl TryFrom<u8> for Dimension {
    type Error = DatasetError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Dimension::Two),
            3 => Ok(Dimension::Three),
            _ => Err(DatasetError::UnsupportedDimension(value)),
        }
    }
}

/// Options of the overlay builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayOptions {
    /// Seed of the random generator used for tint colors and mesh sampling.
    ///
    /// `None` draws a fresh seed from the operating system on every call.
    pub seed: Option<u64>,
}

impl OverlayOptions {
    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// The result of [`build_overlay`].
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// An RGB image with the object instances tinted.
    Image(Image<u8, 3>),
    /// A world space point cloud with the posed object meshes.
    PointCloud(ColoredPointCloud),
}

/// Draw a random tint color.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> [u8; 3] {
    [
        rng.random_range(0..255),
        rng.random_range(0..255),
        rng.random_range(0..255),
    ]
}

/// Tint the pixels of every instance with its color.
///
/// Each pixel whose mask value equals an instance id becomes
/// `original / 2 + tint / 2`, per channel. Other pixels are copied unchanged.
///
/// # Arguments
///
/// * `image` - The color image.
/// * `mask` - The instance id of every pixel.
/// * `tints` - The instance ids with their tint colors.
///
/// # Returns
///
/// A tinted copy of the image.
pub fn tint_instances(
    image: &Image<u8, 3>,
    mask: &Image<u32, 1>,
    tints: &[(u32, [u8; 3])],
) -> Result<Image<u8, 3>, ImageError> {
    if image.size() != mask.size() {
        return Err(ImageError::InvalidImageSize(image.size(), mask.size()));
    }

    let mut tinted = image.clone();
    for (pixel, &id) in tinted.pixels_mut().zip(mask.as_slice().iter()) {
        if let Some((_, tint)) = tints.iter().find(|(instance, _)| *instance == id) {
            pixel
                .iter_mut()
                .zip(tint.iter())
                .for_each(|(p, t)| *p = *p / 2 + t / 2);
        }
    }

    Ok(tinted)
}

fn build_overlay_2d(
    dataset: &Dataset,
    scene_id: usize,
    image_id: usize,
    rng: &mut StdRng,
) -> Result<Image<u8, 3>, DatasetError> {
    let image = dataset.load_raw_image(scene_id, image_id, ColorOrder::Rgb)?;
    let mask = dataset.load_seg_mask(scene_id, image_id)?;

    let tints = dataset
        .load_scene_object_list(scene_id)?
        .into_iter()
        .map(|object_name| {
            let id = dataset
                .object_list()
                .id(&object_name)
                .ok_or(DatasetError::UnknownObject(object_name))?;
            Ok((id, random_color(rng)))
        })
        .collect::<Result<Vec<_>, DatasetError>>()?;

    Ok(tint_instances(&image, &mask, &tints)?)
}

fn build_overlay_3d(
    dataset: &Dataset,
    scene_id: usize,
    image_id: Option<usize>,
    rng: &mut StdRng,
) -> Result<ColoredPointCloud, DatasetError> {
    let base = match image_id {
        Some(image_id) => {
            let mut pointcloud = dataset.load_point_cloud(scene_id, image_id)?;
            pointcloud.transform(&dataset.load_camera_pose(scene_id, image_id)?);
            pointcloud
        }
        None => reconstruct_scene(dataset, scene_id)?,
    };

    let mut geometries = vec![base];
    for (object_name, pose) in dataset.load_object_pose_dict(scene_id)? {
        let Some(pose) = pose else {
            continue;
        };
        let Some(mut mesh) = dataset.load_object_mesh(&object_name)? else {
            log::warn!("No mesh for object {object_name}, skipping it");
            continue;
        };
        mesh.transform(&pose);
        geometries.push(mesh.sample_points_uniformly(MESH_SAMPLES, rng)?);
    }

    Ok(merge(&geometries))
}

/// Build the pose annotation overlay of a scene or of one of its frames.
///
/// With `dimension == 2` the instance masks of frame `image_id` are tinted
/// on its color image with one random color per object. With
/// `dimension == 3` the frame point cloud (or the reconstructed scene when
/// `image_id` is `None`) is merged in world coordinates with [`MESH_SAMPLES`]
/// points sampled on every object mesh that has a pose in the scene.
///
/// # Errors
///
/// Fails with [`DatasetError::UnsupportedDimension`] for a dimension other
/// than 2 or 3 and with [`DatasetError::MissingImageId`] for a 2D overlay
/// without a frame.
pub fn build_overlay(
    dataset: &Dataset,
    scene_id: usize,
    image_id: Option<usize>,
    dimension: u8,
    options: &OverlayOptions,
) -> Result<Overlay, DatasetError> {
    let mut rng = options.rng();
    match Dimension::try_from(dimension)? {
        Dimension::Two => {
            let image_id = image_id.ok_or(DatasetError::MissingImageId)?;
            Ok(Overlay::Image(build_overlay_2d(
                dataset, scene_id, image_id, &mut rng,
            )?))
        }
        Dimension::Three => Ok(Overlay::PointCloud(build_overlay_3d(
            dataset, scene_id, image_id, &mut rng,
        )?)),
    }
}
