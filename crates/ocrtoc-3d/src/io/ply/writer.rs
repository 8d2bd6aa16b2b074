use std::io::{BufWriter, Write};
use std::path::Path;

use super::PlyError;
use crate::pointcloud::ColoredPointCloud;

/// Write a colored point cloud to a binary little endian PLY file.
///
/// Positions are stored as `double`, colors as `uchar` in `[0, 255]`.
///
/// # Arguments
///
/// * `path` - The path to the output file.
/// * `pointcloud` - The point cloud to write.
pub fn write_ply_pointcloud(
    path: impl AsRef<Path>,
    pointcloud: &ColoredPointCloud,
) -> Result<(), PlyError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    write!(
        writer,
        "ply\nformat binary_little_endian 1.0\nelement vertex {}\n\
         property double x\nproperty double y\nproperty double z\n\
         property uchar red\nproperty uchar green\nproperty uchar blue\nend_header\n",
        pointcloud.len()
    )?;

    for (point, color) in pointcloud.iter() {
        for v in point {
            writer.write_all(&v.to_le_bytes())?;
        }
        let rgb = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        writer.write_all(&rgb)?;
    }

    writer.flush()?;
    Ok(())
}
