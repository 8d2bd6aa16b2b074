use glam::DVec3;
use rand::Rng;

use crate::{
    pointcloud::{ColoredPointCloud, DEFAULT_COLOR},
    transforms::RigidTransform,
};

/// Error types for the mesh module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MeshError {
    /// The mesh has no triangles to sample from.
    #[error("The mesh has no triangles")]
    NoTriangles,

    /// All the triangles of the mesh are degenerate.
    #[error("The mesh has zero surface area")]
    ZeroSurfaceArea,

    /// A triangle references a vertex that does not exist.
    #[error("Triangle references vertex {0} but the mesh has {1} vertices")]
    InvalidVertexIndex(usize, usize),

    /// The number of vertex colors does not match the number of vertices.
    #[error("Number of vertex colors ({1}) does not match the number of vertices ({0})")]
    ColorLengthMismatch(usize, usize),
}

/// A triangle mesh with optional per-vertex colors in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    vertices: Vec<[f64; 3]>,
    triangles: Vec<[usize; 3]>,
    vertex_colors: Option<Vec<[f64; 3]>>,
}

impl TriangleMesh {
    /// Create a new mesh.
    ///
    /// # Errors
    ///
    /// Fails if a triangle references a missing vertex or if the colors do not
    /// match the vertices.
    pub fn new(
        vertices: Vec<[f64; 3]>,
        triangles: Vec<[usize; 3]>,
        vertex_colors: Option<Vec<[f64; 3]>>,
    ) -> Result<Self, MeshError> {
        if let Some(colors) = &vertex_colors {
            if colors.len() != vertices.len() {
                return Err(MeshError::ColorLengthMismatch(vertices.len(), colors.len()));
            }
        }

        if let Some(&idx) = triangles.iter().flatten().find(|&&i| i >= vertices.len()) {
            return Err(MeshError::InvalidVertexIndex(idx, vertices.len()));
        }

        Ok(Self {
            vertices,
            triangles,
            vertex_colors,
        })
    }

    /// The vertices of the mesh.
    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    /// The triangles of the mesh as vertex index triplets.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// The vertex colors, if any.
    pub fn vertex_colors(&self) -> Option<&[[f64; 3]]> {
        self.vertex_colors.as_deref()
    }

    /// Apply a rigid transform to every vertex in place.
    pub fn transform(&mut self, transform: &RigidTransform) {
        self.vertices
            .iter_mut()
            .for_each(|v| *v = transform.transform_point(v));
    }

    fn triangle_vertices(&self, triangle: &[usize; 3]) -> [DVec3; 3] {
        triangle.map(|i| DVec3::from_array(self.vertices[i]))
    }

    fn triangle_area(&self, triangle: &[usize; 3]) -> f64 {
        let [a, b, c] = self.triangle_vertices(triangle);
        0.5 * (b - a).cross(c - a).length()
    }

    /// The total area of all the triangles.
    pub fn surface_area(&self) -> f64 {
        self.triangles.iter().map(|t| self.triangle_area(t)).sum()
    }

    /// Sample points uniformly over the surface of the mesh.
    ///
    /// A triangle is picked with probability proportional to its area, then a
    /// point is drawn uniformly inside it. Colors are interpolated from the
    /// vertex colors with the same barycentric weights; meshes without colors
    /// give [`DEFAULT_COLOR`].
    ///
    /// # Arguments
    ///
    /// * `num_points` - The number of points to draw.
    /// * `rng` - The random number generator.
    ///
    /// # Returns
    ///
    /// A point cloud with exactly `num_points` points.
    pub fn sample_points_uniformly<R: Rng + ?Sized>(
        &self,
        num_points: usize,
        rng: &mut R,
    ) -> Result<ColoredPointCloud, MeshError> {
        if self.triangles.is_empty() {
            return Err(MeshError::NoTriangles);
        }

        // cumulative areas for the weighted triangle draw
        let mut cumulative = Vec::with_capacity(self.triangles.len());
        let mut total = 0.0;
        for triangle in self.triangles.iter() {
            total += self.triangle_area(triangle);
            cumulative.push(total);
        }

        if total <= 0.0 || !total.is_finite() {
            return Err(MeshError::ZeroSurfaceArea);
        }

        let mut pointcloud = ColoredPointCloud::with_capacity(num_points);
        for _ in 0..num_points {
            let r = rng.random::<f64>() * total;
            let tidx = cumulative
                .partition_point(|&c| c <= r)
                .min(self.triangles.len() - 1);
            let triangle = &self.triangles[tidx];

            let (mut u, mut v) = (rng.random::<f64>(), rng.random::<f64>());
            if u + v > 1.0 {
                u = 1.0 - u;
                v = 1.0 - v;
            }
            let w = 1.0 - u - v;

            let [a, b, c] = self.triangle_vertices(triangle);
            let point = a * w + b * u + c * v;

            let color = match &self.vertex_colors {
                Some(colors) => {
                    let [ca, cb, cc] = triangle.map(|i| DVec3::from_array(colors[i]));
                    (ca * w + cb * u + cc * v).to_array()
                }
                None => DEFAULT_COLOR,
            };

            pointcloud.push(point.to_array(), color);
        }

        Ok(pointcloud)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn two_squares() -> Result<TriangleMesh, MeshError> {
        // unit square at z = 0 and a 2x2 square at z = 1
        TriangleMesh::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [2.0, 0.0, 1.0],
                [2.0, 2.0, 1.0],
                [0.0, 2.0, 1.0],
            ],
            vec![[0, 1, 2], [0, 2, 3], [4, 5, 6], [4, 6, 7]],
            None,
        )
    }

    #[test]
    fn test_mesh_validation() {
        let res = TriangleMesh::new(vec![[0.0; 3]; 2], vec![[0, 1, 2]], None);
        assert_eq!(res, Err(MeshError::InvalidVertexIndex(2, 2)));

        let res = TriangleMesh::new(vec![[0.0; 3]; 3], vec![[0, 1, 2]], Some(vec![[0.0; 3]]));
        assert_eq!(res, Err(MeshError::ColorLengthMismatch(3, 1)));
    }

    #[test]
    fn test_surface_area() -> Result<(), MeshError> {
        let mesh = two_squares()?;
        assert_relative_eq!(mesh.surface_area(), 5.0);
        Ok(())
    }

    #[test]
    fn test_sample_uniform_over_area() -> Result<(), MeshError> {
        let mesh = two_squares()?;
        let mut rng = StdRng::seed_from_u64(42);
        let samples = mesh.sample_points_uniformly(10_000, &mut rng)?;
        assert_eq!(samples.len(), 10_000);
        assert!(samples.colors().iter().all(|c| *c == DEFAULT_COLOR));

        // the large square holds 4/5 of the area
        let upper = samples.points().iter().filter(|p| p[2] > 0.5).count();
        let ratio = upper as f64 / samples.len() as f64;
        assert!((ratio - 0.8).abs() < 0.03, "ratio was {ratio}");

        for p in samples.points() {
            let extent = if p[2] > 0.5 { 2.0 } else { 1.0 };
            assert!((0.0..=extent).contains(&p[0]));
            assert!((0.0..=extent).contains(&p[1]));
        }
        Ok(())
    }

    #[test]
    fn test_sample_interpolates_colors() -> Result<(), MeshError> {
        let mesh = TriangleMesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
            Some(vec![[0.2, 0.4, 0.6]; 3]),
        )?;
        let mut rng = StdRng::seed_from_u64(7);
        let samples = mesh.sample_points_uniformly(100, &mut rng)?;
        for (p, c) in samples.iter() {
            assert!(p[0] + p[1] <= 1.0 + 1e-12);
            assert_relative_eq!(c[0], 0.2, epsilon = 1e-12);
            assert_relative_eq!(c[2], 0.6, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_sample_degenerate() -> Result<(), MeshError> {
        let mut rng = StdRng::seed_from_u64(0);
        let empty = TriangleMesh::new(vec![[0.0; 3]; 3], vec![], None)?;
        assert_eq!(
            empty.sample_points_uniformly(10, &mut rng),
            Err(MeshError::NoTriangles)
        );

        let flat = TriangleMesh::new(vec![[0.0; 3]; 3], vec![[0, 1, 2]], None)?;
        assert_eq!(
            flat.sample_points_uniformly(10, &mut rng),
            Err(MeshError::ZeroSurfaceArea)
        );
        Ok(())
    }

    #[test]
    fn test_transform() -> Result<(), MeshError> {
        let mut mesh = two_squares()?;
        mesh.transform(&RigidTransform::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 3.0],
            [0.0, 0.0, 0.0, 1.0],
        ]));
        assert_eq!(mesh.vertices()[4], [0.0, 0.0, 4.0]);
        assert_relative_eq!(mesh.surface_area(), 5.0);
        Ok(())
    }
}
