use glam::{DMat4, DVec3};

/// A 4x4 rigid body transform mapping points from a source frame to a
/// destination frame, e.g. a camera pose (camera to world) or an object pose
/// (object to world).
///
/// The matrix is stored as given; it is not re-orthonormalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform(DMat4);

impl RigidTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self(DMat4::IDENTITY);

    /// Create the identity transform.
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Create a transform from a row-major 4x4 matrix.
    ///
    /// Example:
    ///
    /// ```
    /// use ocrtoc_3d::transforms::RigidTransform;
    ///
    /// let pose = RigidTransform::from_rows([
    ///     [1.0, 0.0, 0.0, 0.1],
    ///     [0.0, 1.0, 0.0, 0.2],
    ///     [0.0, 0.0, 1.0, 0.3],
    ///     [0.0, 0.0, 0.0, 1.0],
    /// ]);
    /// assert_eq!(pose.translation(), [0.1, 0.2, 0.3]);
    /// ```
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        // glam is column-major
        Self(DMat4::from_cols_array_2d(&rows).transpose())
    }

    /// Get the translation part.
    pub fn translation(&self) -> [f64; 3] {
        self.0.w_axis.truncate().to_array()
    }

    /// Map a single point from the source to the destination frame.
    #[inline]
    pub fn transform_point(&self, point: &[f64; 3]) -> [f64; 3] {
        self.0.transform_point3(DVec3::from_array(*point)).to_array()
    }

    /// The inverse transform, mapping the destination frame back to the source.
    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
