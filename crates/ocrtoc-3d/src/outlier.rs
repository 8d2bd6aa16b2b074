use std::num::NonZeroUsize;

use kiddo::immutable::float::kdtree::ImmutableKdTree;

use crate::pointcloud::ColoredPointCloud;

/// Remove points whose neighbourhood is sparse compared to the rest of the cloud.
///
/// For every point the mean distance to its `nb_neighbors` nearest neighbours
/// is computed; the point itself is part of its neighbourhood. A point is
/// dropped when its mean distance exceeds `mu + std_ratio * sigma`, where `mu`
/// and `sigma` are the mean and the sample standard deviation of the mean
/// distances over the whole cloud. When the cloud has fewer points than
/// `nb_neighbors`, every point uses all the points available.
///
/// Clouds with fewer than two points, or `nb_neighbors == 0`, are returned
/// unchanged.
///
/// # Arguments
///
/// * `pointcloud` - The input point cloud.
/// * `nb_neighbors` - The number of neighbours used for the mean distance.
/// * `std_ratio` - The number of standard deviations tolerated above the mean.
///
/// # Returns
///
/// The filtered point cloud and the indices of the kept points in the input.
pub fn remove_statistical_outliers(
    pointcloud: &ColoredPointCloud,
    nb_neighbors: usize,
    std_ratio: f64,
) -> (ColoredPointCloud, Vec<usize>) {
    let num_points = pointcloud.len();
    let Some(k) = NonZeroUsize::new(nb_neighbors) else {
        return (pointcloud.clone(), (0..num_points).collect());
    };
    if num_points < 2 {
        return (pointcloud.clone(), (0..num_points).collect());
    }

    let kdtree: ImmutableKdTree<f64, u32, 3, 32> =
        ImmutableKdTree::new_from_slice(pointcloud.points());

    let mean_distances = pointcloud
        .points()
        .iter()
        .map(|p| {
            let neighbors = kdtree.nearest_n::<kiddo::SquaredEuclidean>(p, k);
            let sum = neighbors.iter().map(|nn| nn.distance.sqrt()).sum::<f64>();
            sum / neighbors.len().max(1) as f64
        })
        .collect::<Vec<_>>();

    let mean = mean_distances.iter().sum::<f64>() / num_points as f64;
    let variance = mean_distances
        .iter()
        .map(|d| (d - mean).powi(2))
        .sum::<f64>()
        / (num_points - 1) as f64;
    let threshold = mean + std_ratio * variance.sqrt();

    let inliers = mean_distances
        .iter()
        .enumerate()
        .filter(|(_, d)| **d <= threshold)
        .map(|(i, _)| i)
        .collect::<Vec<_>>();

    log::debug!(
        "statistical outlier removal: mean {mean:.6}, threshold {threshold:.6}, kept {} of {num_points}",
        inliers.len()
    );

    let mut filtered = ColoredPointCloud::with_capacity(inliers.len());
    for &i in inliers.iter() {
        filtered.push(pointcloud.points()[i], pointcloud.colors()[i]);
    }

    (filtered, inliers)
}
