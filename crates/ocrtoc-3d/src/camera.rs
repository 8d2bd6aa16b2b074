/// Default image width used when the real image size is unknown.
pub const DEFAULT_IMAGE_WIDTH: usize = 1280;

/// Default image height used when the real image size is unknown.
pub const DEFAULT_IMAGE_HEIGHT: usize = 720;

/// The intrinsic parameters of a pinhole camera.
///
/// The camera matrix is:
///
/// ```text
/// | fx  0 cx |
/// |  0 fy cy |
/// |  0  0  1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeIntrinsics {
    /// The focal length in pixels along the x axis.
    pub fx: f64,
    /// The focal length in pixels along the y axis.
    pub fy: f64,
    /// The principal point x coordinate in pixels.
    pub cx: f64,
    /// The principal point y coordinate in pixels.
    pub cy: f64,
}

impl PinholeIntrinsics {
    /// Create the intrinsics from a row-major 3x3 camera matrix.
    ///
    /// Only the focal lengths and the principal point are read; skew is ignored.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> Self {
        Self {
            fx: k[0][0],
            fy: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
        }
    }

    /// Get the row-major 3x3 camera matrix.
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Project a point in camera space to pixel coordinates.
    ///
    /// Returns `None` for points on or behind the camera plane.
    pub fn project(&self, point: &[f64; 3]) -> Option<[f64; 2]> {
        let [x, y, z] = *point;
        if z <= 0.0 {
            return None;
        }
        Some([x * self.fx / z + self.cx, y * self.fy / z + self.cy])
    }
}

/// Pinhole camera intrinsics together with the image size they apply to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCameraParameters {
    /// The image width in pixels.
    pub width: usize,
    /// The image height in pixels.
    pub height: usize,
    /// The camera intrinsics.
    pub intrinsics: PinholeIntrinsics,
}

impl PinholeCameraParameters {
    /// Create camera parameters with the principal point at the image center.
    ///
    /// The center follows the pixel-center convention `(w / 2 - 0.5, h / 2 - 0.5)`.
    pub fn centered(width: usize, height: usize, fx: f64, fy: f64) -> Self {
        Self {
            width,
            height,
            intrinsics: PinholeIntrinsics {
                fx,
                fy,
                cx: width as f64 / 2.0 - 0.5,
                cy: height as f64 / 2.0 - 0.5,
            },
        }
    }
}
