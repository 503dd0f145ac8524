//! # Camera Implementation
//!
//! This module contains the core camera implementation including:
//! - Camera representation as a position looking at a target point
//! - Projection matrix handling
//!
//! ## Key Components
//! - `Camera`: The eye position, the point it looks at, and the world up vector
//! - `Projection`: Manages perspective projection settings

use cgmath::*;

/// Transformation matrix to convert from OpenGL's coordinate system to WGPU's.
///
/// WGPU uses a coordinate system where:
/// - X is right
/// - Y is up
/// - NDC (Normalized Device Coordinates) range from -1 to 1 in X and Y, and 0 to 1 in Z
///
/// This matrix performs two main transformations:
/// 1. Scales the Z coordinate from [-1, 1] to [-0.5, 0.5]
/// 2. Translates the Z coordinate from [-0.5, 0.5] to [0, 1]
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,  // Scale Z from [-1,1] to [-0.5,0.5]
    0.0, 0.0, 0.5, 1.0,  // Translate Z from [-0.5,0.5] to [0,1]
);

/// A camera looking from `position` at `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// The camera's position in world space
    pub position: Point3<f32>,
    /// The point the camera looks at
    pub target: Point3<f32>,
    /// World up direction
    pub up: Vector3<f32>,
}

impl Camera {
    /// Creates a camera at `position` looking at `target` with +Y up.
    ///
    /// # Arguments
    /// * `position` - Eye position in world space
    /// * `target` - Point to look at
    pub fn new<V: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: V, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    /// Default framing: `distance` times `(0.7, 0.5, 0.7)`, looking at the origin.
    ///
    /// # Arguments
    /// * `distance` - Scale applied to the framing direction
    pub fn framing(distance: f32) -> Self {
        Self::new(
            Point3::new(distance * 0.7, distance * 0.5, distance * 0.7),
            Point3::origin(),
        )
    }

    /// Calculates the view matrix for this camera.
    ///
    /// # Returns
    /// A 4x4 view matrix transforming world space into view space
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// Unit vector pointing into the screen.
    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.position).normalize()
    }

    /// Unit vector pointing to the right of the screen.
    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(self.up).normalize()
    }

    /// Unit vector pointing to the top of the screen.
    pub fn screen_up(&self) -> Vector3<f32> {
        self.right().cross(self.forward())
    }
}

/// Represents a camera's projection matrix and related parameters.
///
/// This handles the perspective projection used to render the 3D scene.
/// It manages the aspect ratio, field of view, and near/far clipping planes.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Aspect ratio (width / height)
    aspect: f32,
    /// Vertical field of view in radians
    fovy: Rad<f32>,
    /// Near clipping plane distance
    znear: f32,
    /// Far clipping plane distance
    zfar: f32,
}

impl Projection {
    /// Creates a new projection with the given parameters.
    ///
    /// # Arguments
    /// * `width` - Viewport width in pixels
    /// * `height` - Viewport height in pixels
    /// * `fovy` - Vertical field of view (can be any type convertible to `Rad<f32>`)
    /// * `znear` - Near clipping plane distance
    /// * `zfar` - Far clipping plane distance
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: aspect_ratio(width, height),
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Updates the projection's aspect ratio for viewport resizing.
    ///
    /// # Arguments
    /// * `width` - New viewport width in pixels
    /// * `height` - New viewport height in pixels
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Vertical field of view.
    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    /// Calculates the projection matrix.
    ///
    /// Combines the perspective projection with the OpenGL to WGPU coordinate system transform.
    ///
    /// # Returns
    /// A 4x4 projection matrix ready for use in shaders
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// A zero-height surface keeps a square aspect instead of dividing by zero.
fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_looks_at_origin_from_the_upper_diagonal() {
        let camera = Camera::framing(15.0);
        assert_eq!(camera.position, Point3::new(10.5, 7.5, 10.5));
        assert_eq!(camera.target, Point3::origin());
        let forward = camera.forward();
        assert!(forward.x < 0.0 && forward.y < 0.0 && forward.z < 0.0);
    }

    #[test]
    fn basis_is_orthonormal() {
        let camera = Camera::framing(20.0);
        let (f, r, u) = (camera.forward(), camera.right(), camera.screen_up());
        assert!(f.dot(r).abs() < 1e-5 && f.dot(u).abs() < 1e-5 && r.dot(u).abs() < 1e-5);
        assert!((r.magnitude() - 1.0).abs() < 1e-5 && (u.magnitude() - 1.0).abs() < 1e-5);
        assert!(u.y > 0.0);
    }

    #[test]
    fn resize_updates_aspect_and_tolerates_zero_height() {
        let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
        assert!((projection.aspect() - 4.0 / 3.0).abs() < 1e-6);
        projection.resize(1000, 500);
        assert_eq!(projection.aspect(), 2.0);
        projection.resize(1000, 0);
        assert_eq!(projection.aspect(), 1.0);
    }

    #[test]
    fn origin_projects_inside_the_depth_range() {
        let camera = Camera::framing(15.0);
        let projection = Projection::new(640, 480, Deg(75.0), 0.1, 1000.0);
        let clip = projection.calc_matrix() * camera.calc_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
