use glam::DVec3;

use crate::transforms::RigidTransform;

/// Color given to points whose source carries no color information.
pub const DEFAULT_COLOR: [f64; 3] = [0.5, 0.5, 0.5];

/// Error types for the point cloud module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PointCloudError {
    /// The number of colors does not match the number of points.
    #[error("Number of colors ({1}) does not match the number of points ({0})")]
    LengthMismatch(usize, usize),
}

/// A point cloud where every point carries an RGB color in `[0, 1]`.
///
/// The points and colors are always of equal length. The order of the points
/// has no meaning and duplicated positions are allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColoredPointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The colors of the points.
    colors: Vec<[f64; 3]>,
}

impl ColoredPointCloud {
    /// Create a new point cloud from points and their colors.
    ///
    /// # Errors
    ///
    /// Returns [`PointCloudError::LengthMismatch`] if the lengths differ.
    pub fn new(points: Vec<[f64; 3]>, colors: Vec<[f64; 3]>) -> Result<Self, PointCloudError> {
        if points.len() != colors.len() {
            return Err(PointCloudError::LengthMismatch(points.len(), colors.len()));
        }
        Ok(Self { points, colors })
    }

    /// Create an empty point cloud with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
        }
    }

    /// Append a single colored point.
    #[inline]
    pub fn push(&mut self, point: [f64; 3], color: [f64; 3]) {
        self.points.push(point);
        self.colors.push(color);
    }

    /// Append all the points of another point cloud.
    pub fn extend_from(&mut self, other: &ColoredPointCloud) {
        self.points.extend_from_slice(&other.points);
        self.colors.extend_from_slice(&other.colors);
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> &[[f64; 3]] {
        &self.colors
    }

    /// Iterate over `(point, color)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64; 3], &[f64; 3])> {
        self.points.iter().zip(self.colors.iter())
    }

    /// Apply a rigid transform to every point in place.
    pub fn transform(&mut self, transform: &RigidTransform) {
        self.points
            .iter_mut()
            .for_each(|p| *p = transform.transform_point(p));
    }

    /// Get the minimum bound of the point cloud.
    ///
    /// Returns the origin if the point cloud is empty.
    pub fn min_bound(&self) -> [f64; 3] {
        self.points
            .iter()
            .map(|p| DVec3::from_array(*p))
            .reduce(|a, b| a.min(b))
            .unwrap_or(DVec3::ZERO)
            .to_array()
    }

    /// Get the maximum bound of the point cloud.
    ///
    /// Returns the origin if the point cloud is empty.
    pub fn max_bound(&self) -> [f64; 3] {
        self.points
            .iter()
            .map(|p| DVec3::from_array(*p))
            .reduce(|a, b| a.max(b))
            .unwrap_or(DVec3::ZERO)
            .to_array()
    }
}
