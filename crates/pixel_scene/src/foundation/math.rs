//! Math utilities and types
//!
//! Provides the fundamental math types used by the scene graph and the
//! visibility system.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Local transform of a scene node: position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position relative to the owning container
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (container space from local space)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Matrix mapping container space back into local space
    ///
    /// Returns `None` for a degenerate (zero) scale.
    pub fn inverse_matrix(&self) -> Option<Mat4> {
        if self.scale.x == 0.0 || self.scale.y == 0.0 || self.scale.z == 0.0 {
            return None;
        }
        let inv_scale = Vec3::new(1.0 / self.scale.x, 1.0 / self.scale.y, 1.0 / self.scale.z);
        Some(
            Mat4::new_nonuniform_scaling(&inv_scale)
                * self.rotation.inverse().to_homogeneous()
                * Mat4::new_translation(&-self.position),
        )
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        transform_point(&self.to_matrix(), point)
    }
}

/// Transform a point by a homogeneous matrix (w is assumed to stay 1)
pub fn transform_point(matrix: &Mat4, point: &Vec3) -> Vec3 {
    matrix.transform_point(&Point3::from(*point)).coords
}

/// Translation part of a homogeneous matrix
pub fn translation(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix.m14, matrix.m24, matrix.m34)
}

/// Math utility functions
pub mod utils {
    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * DEG_TO_RAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse_matrix_round_trips_points() {
        let transform = Transform {
            position: Vec3::new(3.0, -2.0, 5.0),
            rotation: Quat::from_axis_angle(&Vec3::y_axis(), 0.7),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let inverse = transform.inverse_matrix().unwrap();
        let point = Vec3::new(1.0, 2.0, 3.0);

        let there = transform.transform_point(&point);
        let back = transform_point(&inverse, &there);
        assert_relative_eq!(back, point, epsilon = 1e-4);
    }

    #[test]
    fn test_zero_scale_has_no_inverse() {
        let transform = Transform {
            scale: Vec3::new(1.0, 0.0, 1.0),
            ..Default::default()
        };
        assert!(transform.inverse_matrix().is_none());
    }

    #[test]
    fn test_translation_extraction() {
        let matrix = Transform::from_position(Vec3::new(1.0, 2.0, 3.0)).to_matrix();
        assert_eq!(translation(&matrix), Vec3::new(1.0, 2.0, 3.0));
    }
}
