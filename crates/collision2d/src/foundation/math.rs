//! Math utilities and types
//!
//! Provides the 2D math types used by the collision core. Vectors come from
//! `nalgebra`; rotations are plain angles in radians wrapped in
//! [`Transform2D`].

use serde::{Deserialize, Serialize};

pub use nalgebra::{UnitComplex, Vector2};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// Unit complex number used for 2D rotations
pub type Rot2 = UnitComplex<f32>;

/// Values closer to zero than this are treated as zero by the geometry code
pub const EPSILON: f32 = 1.0e-6;

/// 2D transform: position, rotation in radians and per-axis scale.
///
/// Colliders carry two of these: the owner's world transform and a local
/// offset of the shape relative to the owner. Points are scaled first, then
/// rotated, then translated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    /// Position in world units
    pub position: Vec2,

    /// Counter-clockwise rotation in radians
    pub rotation: f32,

    /// Scale along the local x and y axes
    #[serde(default = "unit_scale")]
    pub scale: Vec2,
}

fn unit_scale() -> Vec2 {
    Vec2::new(1.0, 1.0)
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            rotation: 0.0,
            scale: unit_scale(),
        }
    }
}

impl Transform2D {
    /// Create a new unscaled transform
    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self {
            position,
            rotation,
            scale: unit_scale(),
        }
    }

    /// Same transform with a different scale
    #[must_use]
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Same position and rotation with unit scale
    #[must_use]
    pub fn without_scale(&self) -> Self {
        Self::new(self.position, self.rotation)
    }

    /// Identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Transform with only a translation
    pub fn from_position(x: f32, y: f32) -> Self {
        Self::new(Vec2::new(x, y), 0.0)
    }

    /// Transform with only a rotation
    pub fn from_rotation(rotation: f32) -> Self {
        Self::new(Vec2::zeros(), rotation)
    }

    /// Rotation as a unit complex number
    pub fn rotation_unit(&self) -> Rot2 {
        Rot2::new(self.rotation)
    }

    /// Rotate a direction vector by this transform (no translation)
    pub fn rotate_vector(&self, vector: &Vec2) -> Vec2 {
        self.rotation_unit() * *vector
    }

    /// Rotate a direction vector by the inverse of this transform
    pub fn inverse_rotate_vector(&self, vector: &Vec2) -> Vec2 {
        self.rotation_unit().inverse() * *vector
    }

    /// Map a local-space point into world space
    pub fn transform_point(&self, point: &Vec2) -> Vec2 {
        self.position + self.rotate_vector(&point.component_mul(&self.scale))
    }

    /// Map a world-space point into this transform's local space.
    ///
    /// A zero scale component collapses that axis and cannot be inverted.
    pub fn inverse_transform_point(&self, point: &Vec2) -> Vec2 {
        self.inverse_rotate_vector(&(point - self.position))
            .component_div(&self.scale)
    }

    /// Apply a local offset: `self * local`.
    ///
    /// The offset's position is scaled by the parent; scales multiply per axis.
    pub fn combine(&self, local: &Transform2D) -> Transform2D {
        Transform2D {
            position: self.transform_point(&local.position),
            rotation: self.rotation + local.rotation,
            scale: self.scale.component_mul(&local.scale),
        }
    }

    /// Local x and y axes of this transform in world space
    pub fn axes(&self) -> [Vec2; 2] {
        let (sin, cos) = self.rotation.sin_cos();
        [Vec2::new(cos, sin), Vec2::new(-sin, cos)]
    }

    /// Check that position, rotation and scale are finite
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.rotation.is_finite()
            && self.scale.iter().all(|v| v.is_finite())
    }
}

/// Math utility functions
pub mod utils {
    use super::{Vec2, EPSILON};

    /// 2D cross product (z component of the 3D cross product)
    pub fn cross(a: &Vec2, b: &Vec2) -> f32 {
        a.x * b.y - a.y * b.x
    }

    /// Left-hand perpendicular of a vector (rotated +90 degrees)
    pub fn perp(v: &Vec2) -> Vec2 {
        Vec2::new(-v.y, v.x)
    }

    /// Sign that maps zero to `+1.0`
    pub fn sign_or_positive(value: f32) -> f32 {
        if value < 0.0 { -1.0 } else { 1.0 }
    }

    /// Normalize a vector, or `None` if it is (near) zero length
    pub fn try_normalize(v: &Vec2) -> Option<Vec2> {
        v.try_normalize(EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    const TOLERANCE: f32 = 1e-5;

    #[test]
    fn test_transform_point_round_trip() {
        let transform = Transform2D::new(Vec2::new(3.0, -1.0), 0.7);
        let local = Vec2::new(0.5, 2.0);

        let world = transform.transform_point(&local);
        let back = transform.inverse_transform_point(&world);

        assert_relative_eq!(back, local, epsilon = TOLERANCE);
    }

    #[test]
    fn test_quarter_turn_axes() {
        let transform = Transform2D::from_rotation(FRAC_PI_2);
        let [x_axis, y_axis] = transform.axes();

        assert_relative_eq!(x_axis, Vec2::new(0.0, 1.0), epsilon = TOLERANCE);
        assert_relative_eq!(y_axis, Vec2::new(-1.0, 0.0), epsilon = TOLERANCE);
    }

    #[test]
    fn test_combine_applies_offset_in_parent_space() {
        let parent = Transform2D::new(Vec2::new(1.0, 1.0), FRAC_PI_2);
        let offset = Transform2D::new(Vec2::new(2.0, 0.0), 0.25);

        let combined = parent.combine(&offset);

        assert_relative_eq!(combined.position, Vec2::new(1.0, 3.0), epsilon = TOLERANCE);
        assert_relative_eq!(combined.rotation, FRAC_PI_2 + 0.25, epsilon = TOLERANCE);
    }

    #[test]
    fn test_scaled_point_round_trip() {
        let transform = Transform2D::new(Vec2::new(1.0, 2.0), FRAC_PI_2).with_scale(Vec2::new(2.0, 0.5));
        let local = Vec2::new(1.0, 4.0);

        // Scale to (2, 2), rotate to (-2, 2), translate
        let world = transform.transform_point(&local);
        assert_relative_eq!(world, Vec2::new(-1.0, 4.0), epsilon = TOLERANCE);
        assert_relative_eq!(transform.inverse_transform_point(&world), local, epsilon = TOLERANCE);
    }

    #[test]
    fn test_combine_multiplies_scale() {
        let parent = Transform2D::from_position(1.0, 0.0).with_scale(Vec2::new(2.0, 3.0));
        let offset = Transform2D::from_position(1.0, 1.0).with_scale(Vec2::new(0.5, 2.0));

        let combined = parent.combine(&offset);
        assert_relative_eq!(combined.position, Vec2::new(3.0, 3.0), epsilon = TOLERANCE);
        assert_relative_eq!(combined.scale, Vec2::new(1.0, 6.0), epsilon = TOLERANCE);
    }

    #[test]
    fn test_non_finite_scale_is_detected() {
        assert!(Transform2D::identity().is_finite());
        assert!(!Transform2D::identity().with_scale(Vec2::new(f32::NAN, 1.0)).is_finite());
    }

    #[test]
    fn test_missing_scale_deserializes_as_unit() {
        let transform: Transform2D = ron::from_str("(position: (1.0, 2.0), rotation: 0.5)").unwrap();
        assert_eq!(transform.scale, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_sign_or_positive() {
        assert_eq!(utils::sign_or_positive(0.0), 1.0);
        assert_eq!(utils::sign_or_positive(-0.5), -1.0);
    }
}
