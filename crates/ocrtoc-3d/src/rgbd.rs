use ocrtoc_image::{Image, ImageSize};

use crate::{camera::PinholeIntrinsics, pointcloud::ColoredPointCloud};

/// Error types for the rgbd module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RgbdError {
    /// The depth and the color images do not have the same size.
    #[error("Depth image size {0} does not match color image size {1}")]
    SizeMismatch(ImageSize, ImageSize),

    /// The depth scale is not a finite positive number.
    #[error("Depth scale must be finite and positive, got {0}")]
    InvalidDepthScale(f64),
}

/// Backproject an aligned depth and color frame into a camera space point cloud.
///
/// For every pixel `(u, v)` the metric depth is `z = depth[v, u] / depth_scale`.
/// Pixels with `z <= 0` carry no measurement and are skipped. The remaining
/// pixels map to `x = (u - cx) / fx * z` and `y = (v - cy) / fy * z`, with the
/// color taken from the same pixel. Points are emitted in raster scan order.
///
/// # Arguments
///
/// * `depth` - The raw depth image.
/// * `color` - The color image with values in `[0, 1]`.
/// * `intrinsics` - The camera intrinsics.
/// * `depth_scale` - The number of raw depth units per meter.
///
/// # Returns
///
/// The colored point cloud in the camera frame (z forward).
pub fn backproject<D>(
    depth: &Image<D, 1>,
    color: &Image<f64, 3>,
    intrinsics: &PinholeIntrinsics,
    depth_scale: f64,
) -> Result<ColoredPointCloud, RgbdError>
where
    D: Copy + Into<f64>,
{
    if depth.size() != color.size() {
        return Err(RgbdError::SizeMismatch(depth.size(), color.size()));
    }

    if !depth_scale.is_finite() || depth_scale <= 0.0 {
        return Err(RgbdError::InvalidDepthScale(depth_scale));
    }

    let cols = depth.cols();
    let mut pointcloud = ColoredPointCloud::with_capacity(depth.as_slice().len());

    for (idx, (d, rgb)) in depth
        .as_slice()
        .iter()
        .zip(color.as_slice().chunks_exact(3))
        .enumerate()
    {
        let z = (*d).into() / depth_scale;
        if z <= 0.0 {
            continue;
        }

        let (u, v) = ((idx % cols) as f64, (idx / cols) as f64);
        let x = (u - intrinsics.cx) / intrinsics.fx * z;
        let y = (v - intrinsics.cy) / intrinsics.fy * z;

        pointcloud.push([x, y, z], [rgb[0], rgb[1], rgb[2]]);
    }

    Ok(pointcloud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ocrtoc_image::ImageError;

    fn intrinsics() -> PinholeIntrinsics {
        PinholeIntrinsics {
            fx: 2.0,
            fy: 4.0,
            cx: 1.0,
            cy: 0.5,
        }
    }

    #[test]
    fn test_backproject_skips_invalid_depth() -> Result<(), Box<dyn std::error::Error>> {
        let size = ImageSize {
            width: 3,
            height: 2,
        };
        let depth = Image::<u16, 1>::new(size, vec![0, 1000, 2000, 0, 500, 1500])?;
        let color = Image::<f64, 3>::new(size, (0..18).map(|v| v as f64 / 17.0).collect())?;

        let pointcloud = backproject(&depth, &color, &intrinsics(), 1000.0)?;
        assert_eq!(pointcloud.len(), 4);

        // first valid pixel is (u=1, v=0)
        assert_eq!(pointcloud.points()[0], [0.0, -0.125, 1.0]);
        assert_eq!(pointcloud.colors()[0], [3.0 / 17.0, 4.0 / 17.0, 5.0 / 17.0]);

        // reprojection lands back on the source pixel
        let valid_pixels = [(1, 0), (2, 0), (1, 1), (2, 1)];
        for (point, (u, v)) in pointcloud.points().iter().zip(valid_pixels) {
            let uv = intrinsics().project(point);
            assert!(uv.is_some());
            if let Some([pu, pv]) = uv {
                assert_relative_eq!(pu, u as f64, epsilon = 1e-9);
                assert_relative_eq!(pv, v as f64, epsilon = 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn test_backproject_all_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let size = ImageSize {
            width: 2,
            height: 2,
        };
        let depth = Image::<u16, 1>::from_size_val(size, 0)?;
        let color = Image::<f64, 3>::from_size_val(size, 1.0)?;
        let pointcloud = backproject(&depth, &color, &intrinsics(), 1000.0)?;
        assert!(pointcloud.is_empty());
        Ok(())
    }

    #[test]
    fn test_backproject_size_mismatch() -> Result<(), ImageError> {
        let depth = Image::<u16, 1>::from_size_val([2, 2].into(), 1)?;
        let color = Image::<f64, 3>::from_size_val([3, 2].into(), 1.0)?;
        let res = backproject(&depth, &color, &intrinsics(), 1000.0);
        assert!(matches!(res, Err(RgbdError::SizeMismatch(..))));

        let color = Image::<f64, 3>::from_size_val([2, 2].into(), 1.0)?;
        let res = backproject(&depth, &color, &intrinsics(), 0.0);
        assert_eq!(res, Err(RgbdError::InvalidDepthScale(0.0)));
        Ok(())
    }
}
