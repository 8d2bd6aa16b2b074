use crate::{
    outlier::remove_statistical_outliers,
    pointcloud::ColoredPointCloud,
    voxel_grid::{VoxelGrid, VoxelGridError},
};

/// Concatenate point clouds in the given order.
///
/// No deduplication or alignment check is done; the clouds must already be
/// expressed in the same frame. An empty input gives an empty cloud.
///
/// Example:
/// ```
/// use ocrtoc_3d::{ops::merge, pointcloud::ColoredPointCloud};
///
/// let a = ColoredPointCloud::new(vec![[0.0; 3]], vec![[1.0; 3]]).unwrap();
/// let b = ColoredPointCloud::new(vec![[1.0; 3]; 2], vec![[0.0; 3]; 2]).unwrap();
/// let merged = merge(&[a, b]);
/// assert_eq!(merged.len(), 3);
/// assert_eq!(merged.points()[0], [0.0; 3]);
/// ```
pub fn merge(pointclouds: &[ColoredPointCloud]) -> ColoredPointCloud {
    let total = pointclouds.iter().map(|pc| pc.len()).sum();
    let mut merged = ColoredPointCloud::with_capacity(total);
    for pointcloud in pointclouds {
        merged.extend_from(pointcloud);
    }
    merged
}

/// Parameters of the [`denoise`] pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenoiseParams {
    /// The voxel edge length used for downsampling, in meters.
    pub voxel_size: f64,
    /// The number of neighbours used by the outlier filter.
    pub nb_neighbors: usize,
    /// The number of standard deviations tolerated by the outlier filter.
    pub std_ratio: f64,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            voxel_size: 0.002,
            nb_neighbors: 3000,
            std_ratio: 0.5,
        }
    }
}

/// Downsample a point cloud on a voxel grid, then remove statistical outliers.
///
/// # Arguments
///
/// * `pointcloud` - The input point cloud.
/// * `params` - The voxel size and the outlier filter parameters.
///
/// # Returns
///
/// The denoised point cloud, never larger than the input.
pub fn denoise(
    pointcloud: &ColoredPointCloud,
    params: &DenoiseParams,
) -> Result<ColoredPointCloud, VoxelGridError> {
    let voxel_grid = VoxelGrid::new(params.voxel_size)?;

    let downsampled = voxel_grid.downsample(pointcloud);
    log::debug!(
        "voxel downsample ({}): {} -> {} points",
        params.voxel_size,
        pointcloud.len(),
        downsampled.len()
    );

    let (filtered, _) =
        remove_statistical_outliers(&downsampled, params.nb_neighbors, params.std_ratio);
    log::debug!(
        "outlier removal: {} -> {} points",
        downsampled.len(),
        filtered.len()
    );

    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointcloud::PointCloudError;

    #[test]
    fn test_merge() -> Result<(), PointCloudError> {
        let a = ColoredPointCloud::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            vec![[1.0, 0.0, 0.0]; 2],
        )?;
        let b = ColoredPointCloud::new(vec![[2.0, 0.0, 0.0]], vec![[0.0, 0.0, 1.0]])?;

        let merged = merge(&[a.clone(), b.clone()]);
        assert_eq!(merged.len(), a.len() + b.len());
        assert_eq!(&merged.points()[..2], a.points());
        assert_eq!(&merged.points()[2..], b.points());
        assert_eq!(merged.colors()[2], [0.0, 0.0, 1.0]);

        assert!(merge(&[]).is_empty());
        Ok(())
    }

    #[test]
    fn test_denoise_never_grows() -> Result<(), Box<dyn std::error::Error>> {
        let mut pointcloud = ColoredPointCloud::default();
        for i in 0..10 {
            for j in 0..10 {
                // two samples per location, closer than a voxel
                pointcloud.push([i as f64 * 0.01, j as f64 * 0.01, 1.0], [1.0, 0.0, 0.0]);
                pointcloud.push([i as f64 * 0.01, j as f64 * 0.01, 1.0005], [0.0, 0.0, 1.0]);
            }
        }
        pointcloud.push([5.0, 5.0, 5.0], [0.0, 1.0, 0.0]);

        let denoised = denoise(&pointcloud, &DenoiseParams::default())?;
        assert!(denoised.len() <= pointcloud.len());
        assert!(denoised.len() <= 100);
        assert!(!denoised.is_empty());
        assert!(denoised.points().iter().all(|p| p[2] < 2.0));
        Ok(())
    }

    #[test]
    fn test_denoise_empty() -> Result<(), VoxelGridError> {
        let denoised = denoise(&ColoredPointCloud::default(), &DenoiseParams::default())?;
        assert!(denoised.is_empty());
        Ok(())
    }

    #[test]
    fn test_denoise_invalid_voxel_size() {
        let params = DenoiseParams {
            voxel_size: 0.0,
            ..Default::default()
        };
        let res = denoise(&ColoredPointCloud::default(), &params);
        assert!(res.is_err());
    }
}
