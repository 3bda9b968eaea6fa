//! Camera collaborator
//!
//! The visibility query only needs a position and a view frustum; the camera
//! provides both together with the matrices render passes draw with.

use crate::foundation::geometry::PlaneSet;
use crate::foundation::math::{Mat4, Point3, Vec3};

/// Perspective camera
///
/// Right-handed, Y-up view space looking down -Z. The projection maps depth to
/// the OpenGL style `[-1, 1]` range.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Camera at `position` looking at `target` with a Y-up orientation
    pub fn look_at(position: Vec3, target: Vec3, fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: Vec3::y(), fov, aspect, near, far }
    }

    /// Set the position and the point to look at
    pub fn set_look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
    }

    /// Update the aspect ratio, e.g. after a viewport resize
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// World to view space
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(self.position), &Point3::from(self.target), &self.up)
    }

    /// View to clip space
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// World to clip space
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World space view frustum, near plane first
    pub fn frustum(&self) -> PlaneSet {
        PlaneSet::from_view_projection(&self.view_projection())
    }

    /// Normalized viewing direction
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::geometry::Aabb;
    use crate::foundation::math::transform_point;
    use approx::assert_relative_eq;

    fn camera() -> Camera {
        Camera::look_at(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::new(0.0, 0.0, 5.0),
            std::f32::consts::FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        )
    }

    #[test]
    fn test_view_matrix_moves_eye_to_origin() {
        let camera = camera();
        let eye = transform_point(&camera.view_matrix(), &camera.position);
        assert_relative_eq!(eye, Vec3::zeros(), epsilon = 1e-5);

        let ahead = transform_point(&camera.view_matrix(), &Vec3::new(0.0, 0.0, 0.0));
        assert!(ahead.z < 0.0);
    }

    #[test]
    fn test_frustum_planes() {
        let camera = camera();
        let frustum = camera.frustum();
        assert_eq!(frustum.len(), 6);

        let visible = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 5.0), Vec3::new(1.0, 1.0, 1.0));
        let behind = Aabb::from_center_extents(Vec3::new(0.0, 0.0, -10.0), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(frustum.intersects_aabb(&visible), Some(0));
        assert_eq!(frustum.intersects_aabb(&behind), None);
    }

    #[test]
    fn test_forward() {
        assert_relative_eq!(camera().forward(), Vec3::z());
    }
}
