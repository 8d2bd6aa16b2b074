//! Builders for small on-disk datasets used by the unit tests.

use std::{fs, path::Path};

use ocrtoc_3d::camera::PinholeIntrinsics;
use ocrtoc_image::{Image, ImageSize};
use ocrtoc_io::{
    npy::write_npy,
    png::{write_image_png_gray16, write_image_png_rgb8},
};

use crate::{
    error::DatasetError,
    lists::{write_name_list, SCENES_DIR, SCENE_OBJECT_LIST_FILE},
};

pub const IMAGE_SIZE: ImageSize = ImageSize {
    width: 10,
    height: 10,
};

pub const FRAME_COLOR: [u8; 3] = [255, 100, 50];

pub const FRAME_DEPTH: u16 = 1000;

pub fn intrinsics() -> PinholeIntrinsics {
    PinholeIntrinsics {
        fx: 100.0,
        fy: 100.0,
        cx: 4.5,
        cy: 4.5,
    }
}

const NUM_PIXELS: usize = 100;

fn scene_dir(root: &Path, scene: &str) -> std::path::PathBuf {
    root.join(SCENES_DIR).join(scene)
}

/// Create a scene whose frames all see a flat wall one meter away.
pub fn write_scene(
    root: &Path,
    scene: &str,
    num_frames: usize,
    objects: &[&str],
) -> Result<(), DatasetError> {
    let dir = scene_dir(root, scene);
    for folder in [
        "rgb_undistort",
        "depth_undistort",
        "camera_poses",
        "seg_masks",
        "object_poses",
    ] {
        fs::create_dir_all(dir.join(folder))?;
    }

    let objects = objects.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    write_name_list(dir.join(SCENE_OBJECT_LIST_FILE), &objects)?;

    let k = intrinsics().matrix();
    let k = k.iter().flatten().copied().collect::<Vec<f64>>();
    write_npy(dir.join("color_camK.npy"), &[3, 3], &k)?;

    for image_id in 0..num_frames {
        write_frame(root, scene, image_id, NUM_PIXELS)?;
    }
    Ok(())
}

/// Write the color image of a frame, filled with [`FRAME_COLOR`].
pub fn write_color_frame(root: &Path, scene: &str, image_id: usize) -> Result<(), DatasetError> {
    let data = FRAME_COLOR.repeat(NUM_PIXELS);
    let image = Image::<u8, 3>::new(IMAGE_SIZE, data)?;
    write_image_png_rgb8(
        scene_dir(root, scene)
            .join("rgb_undistort")
            .join(format!("{image_id:04}.png")),
        &image,
    )?;
    Ok(())
}

/// Write a full frame where the first `valid_pixels` pixels have depth.
pub fn write_frame(
    root: &Path,
    scene: &str,
    image_id: usize,
    valid_pixels: usize,
) -> Result<(), DatasetError> {
    write_color_frame(root, scene, image_id)?;

    let depth = (0..NUM_PIXELS)
        .map(|i| if i < valid_pixels { FRAME_DEPTH } else { 0 })
        .collect();
    write_image_png_gray16(
        scene_dir(root, scene)
            .join("depth_undistort")
            .join(format!("{image_id:04}.png")),
        &Image::<u16, 1>::new(IMAGE_SIZE, depth)?,
    )?;

    write_camera_pose(root, scene, image_id, [0.0; 3])?;
    write_seg_mask(root, scene, image_id, &[0; NUM_PIXELS])
}

fn translation_rows(translation: [f64; 3]) -> [f64; 16] {
    let [x, y, z] = translation;
    [
        1.0, 0.0, 0.0, x, //
        0.0, 1.0, 0.0, y, //
        0.0, 0.0, 1.0, z, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

pub fn write_camera_pose(
    root: &Path,
    scene: &str,
    image_id: usize,
    translation: [f64; 3],
) -> Result<(), DatasetError> {
    let path = scene_dir(root, scene)
        .join("camera_poses")
        .join(format!("{image_id:04}.npy"));
    write_npy(path, &[4, 4], &translation_rows(translation))?;
    Ok(())
}

pub fn write_object_pose(
    root: &Path,
    scene: &str,
    object: &str,
    translation: [f64; 3],
) -> Result<(), DatasetError> {
    let path = scene_dir(root, scene)
        .join("object_poses")
        .join(format!("{object}.npy"));
    write_npy(path, &[4, 4], &translation_rows(translation))?;
    Ok(())
}

pub fn write_seg_mask(
    root: &Path,
    scene: &str,
    image_id: usize,
    mask: &[u32],
) -> Result<(), DatasetError> {
    let path = scene_dir(root, scene)
        .join("seg_masks")
        .join(format!("{image_id:04}.npy"));
    write_npy(path, &[IMAGE_SIZE.height, IMAGE_SIZE.width], mask)?;
    Ok(())
}

/// Write a unit tetrahedron mesh for an object.
pub fn write_tetrahedron_mesh(root: &Path, name: &str) -> Result<(), DatasetError> {
    let dir = root.join("rgb_pcd");
    fs::create_dir_all(&dir)?;
    let ply = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
element face 4
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
0 0 1
3 0 2 1
3 0 1 3
3 0 3 2
3 1 2 3
";
    fs::write(dir.join(format!("{name}.ply")), ply)?;
    Ok(())
}
