use std::collections::HashMap;

use glam::DVec3;

use crate::pointcloud::ColoredPointCloud;

/// Error types for the voxel grid module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum VoxelGridError {
    /// The voxel size is not a finite positive number.
    #[error("Voxel size must be finite and positive, got {0}")]
    InvalidVoxelSize(f64),
}

// running sums of the points that fell into a voxel
#[derive(Debug, Default)]
struct VoxelAccumulator {
    point_sum: DVec3,
    color_sum: DVec3,
    count: usize,
}

/// A cubic voxel grid used to downsample point clouds.
///
/// The grid origin is placed half a voxel below the minimum bound of the
/// input, so that every point falls strictly inside a cell.
#[derive(Debug, Clone, Copy)]
pub struct VoxelGrid {
    voxel_size: f64,
}

impl VoxelGrid {
    /// Creates a new `VoxelGrid` with the specified voxel edge length.
    ///
    /// # Errors
    ///
    /// Returns [`VoxelGridError::InvalidVoxelSize`] if the size is not positive.
    pub fn new(voxel_size: f64) -> Result<Self, VoxelGridError> {
        if !voxel_size.is_finite() || voxel_size <= 0.0 {
            return Err(VoxelGridError::InvalidVoxelSize(voxel_size));
        }
        Ok(Self { voxel_size })
    }

    /// The voxel edge length.
    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    /// Compute the integer voxel coordinates of a point relative to `origin`.
    #[inline]
    pub fn get_voxel_index(&self, point: &[f64; 3], origin: &[f64; 3]) -> (i64, i64, i64) {
        let rel = (DVec3::from_array(*point) - DVec3::from_array(*origin)) / self.voxel_size;
        let idx = rel.floor();
        (idx.x as i64, idx.y as i64, idx.z as i64)
    }

    /// Downsample a point cloud by replacing the points of every occupied voxel
    /// with their centroid.
    ///
    /// Position and color of the output point are the unweighted mean of the
    /// members. The output follows the order in which voxels were first hit.
    ///
    /// # Arguments
    ///
    /// * `pointcloud` - The input point cloud.
    ///
    /// # Returns
    ///
    /// A point cloud with one point per occupied voxel.
    pub fn downsample(&self, pointcloud: &ColoredPointCloud) -> ColoredPointCloud {
        if pointcloud.is_empty() {
            return ColoredPointCloud::default();
        }

        let half = self.voxel_size / 2.0;
        let min_bound = pointcloud.min_bound();
        let origin = [min_bound[0] - half, min_bound[1] - half, min_bound[2] - half];

        let mut lookup: HashMap<(i64, i64, i64), usize> = HashMap::new();
        let mut voxels: Vec<VoxelAccumulator> = Vec::new();

        for (point, color) in pointcloud.iter() {
            let key = self.get_voxel_index(point, &origin);
            let slot = *lookup.entry(key).or_insert_with(|| {
                voxels.push(VoxelAccumulator::default());
                voxels.len() - 1
            });

            let voxel = &mut voxels[slot];
            voxel.point_sum += DVec3::from_array(*point);
            voxel.color_sum += DVec3::from_array(*color);
            voxel.count += 1;
        }

        let mut downsampled = ColoredPointCloud::with_capacity(voxels.len());
        for voxel in voxels {
            let inv_count = 1.0 / voxel.count as f64;
            downsampled.push(
                (voxel.point_sum * inv_count).to_array(),
                (voxel.color_sum * inv_count).to_array(),
            );
        }

        downsampled
    }
}
