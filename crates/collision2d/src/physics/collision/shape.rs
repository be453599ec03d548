//! Collision shape definitions
//!
//! Shapes are stored in model space and transformed to world space on demand
//! during tests, the same split the 3D engine used for its sphere/mesh shapes.

use serde::{Deserialize, Serialize};

use super::aabb::Aabb;
use crate::foundation::math::{utils, Transform2D, Vec2, EPSILON};
use crate::physics::error::{PhysicsError, PhysicsResult};

/// Collision shape types (stored in MODEL SPACE)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Circle centred on the collider origin
    Circle {
        /// Radius in world units
        radius: f32,
    },
    /// Oriented box centred on the collider origin; orientation comes from the transform
    Box {
        /// Half width and half height
        half_extents: Vec2,
    },
    /// Convex polygon, vertices in counter-clockwise order
    Polygon {
        /// Model-space vertices
        vertices: Vec<Vec2>,
    },
}

impl Default for Shape {
    fn default() -> Self {
        Self::Circle { radius: 0.5 }
    }
}

impl Shape {
    /// Create a circle shape
    pub fn circle(radius: f32) -> PhysicsResult<Self> {
        let shape = Self::Circle { radius };
        shape.validate()?;
        Ok(shape)
    }

    /// Create a box shape from its half width and half height
    pub fn box_shape(half_width: f32, half_height: f32) -> PhysicsResult<Self> {
        let shape = Self::Box {
            half_extents: Vec2::new(half_width, half_height),
        };
        shape.validate()?;
        Ok(shape)
    }

    /// Create a convex polygon. Clockwise input is rewound to counter-clockwise.
    pub fn polygon(mut vertices: Vec<Vec2>) -> PhysicsResult<Self> {
        if signed_area(&vertices) < 0.0 {
            vertices.reverse();
        }
        let shape = Self::Polygon { vertices };
        shape.validate()?;
        Ok(shape)
    }

    /// Check shape parameters. Zero-size circles and boxes are allowed.
    pub fn validate(&self) -> PhysicsResult<()> {
        match self {
            Self::Circle { radius } => {
                if !radius.is_finite() || *radius < 0.0 {
                    return Err(PhysicsError::InvalidShape(format!(
                        "circle radius must be finite and non-negative, got {radius}"
                    )));
                }
            }
            Self::Box { half_extents } => {
                let valid = |v: f32| v.is_finite() && v >= 0.0;
                if !valid(half_extents.x) || !valid(half_extents.y) {
                    return Err(PhysicsError::InvalidShape(format!(
                        "box half extents must be finite and non-negative, got ({}, {})",
                        half_extents.x, half_extents.y
                    )));
                }
            }
            Self::Polygon { vertices } => validate_polygon(vertices)?,
        }
        Ok(())
    }

    /// Radius of the smallest origin-centred circle containing the shape
    pub fn local_bounding_radius(&self) -> f32 {
        match self {
            Self::Circle { radius } => *radius,
            Self::Box { half_extents } => half_extents.magnitude(),
            Self::Polygon { vertices } => vertices
                .iter()
                .map(|v| v.magnitude())
                .fold(0.0, f32::max),
        }
    }

    /// Tight world-space AABB under the given transform
    pub fn compute_aabb(&self, transform: &Transform2D) -> Aabb {
        match self.to_world_space(transform) {
            WorldShape::Circle { center, radius } => {
                Aabb::from_center_extents(center, Vec2::new(radius, radius))
            }
            WorldShape::Box { transform, half_extents } => {
                // Rotated half extents: |R| * h
                let [x_axis, y_axis] = transform.axes();
                let extent = Vec2::new(
                    x_axis.x.abs() * half_extents.x + y_axis.x.abs() * half_extents.y,
                    x_axis.y.abs() * half_extents.x + y_axis.y.abs() * half_extents.y,
                );
                Aabb::from_center_extents(transform.position, extent)
            }
            WorldShape::Polygon { vertices } => Aabb::from_points(&vertices)
                .unwrap_or_else(|| Aabb::new(transform.position, transform.position)),
        }
    }

    /// Transform this shape to world space for collision testing.
    ///
    /// Scale is baked into the result: circles grow by the larger scale
    /// component, boxes and polygons per axis. Mirroring scales keep polygons
    /// counter-clockwise.
    pub fn to_world_space(&self, transform: &Transform2D) -> WorldShape {
        let scale = transform.scale.abs();
        match self {
            Self::Circle { radius } => WorldShape::Circle {
                center: transform.position,
                radius: radius * scale.x.max(scale.y),
            },
            Self::Box { half_extents } => WorldShape::Box {
                transform: transform.without_scale(),
                half_extents: half_extents.component_mul(&scale),
            },
            Self::Polygon { vertices } => {
                let mut world: Vec<Vec2> = vertices.iter().map(|v| transform.transform_point(v)).collect();
                if transform.scale.x * transform.scale.y < 0.0 {
                    world.reverse();
                }
                WorldShape::Polygon { vertices: world }
            }
        }
    }
}

/// World-space collision shape (temporary, for testing only)
#[derive(Debug, Clone, PartialEq)]
pub enum WorldShape {
    /// World-space circle
    Circle {
        /// Centre in world space
        center: Vec2,
        /// Radius
        radius: f32,
    },
    /// Oriented box, kept with its transform so tests can work in box space
    Box {
        /// Box pose in world space
        transform: Transform2D,
        /// Half width and half height
        half_extents: Vec2,
    },
    /// Convex polygon with world-space CCW vertices
    Polygon {
        /// World-space vertices
        vertices: Vec<Vec2>,
    },
}

impl WorldShape {
    /// Centre (or vertex centroid) of the shape
    pub fn center(&self) -> Vec2 {
        match self {
            Self::Circle { center, .. } => *center,
            Self::Box { transform, .. } => transform.position,
            Self::Polygon { vertices } => {
                vertices.iter().fold(Vec2::zeros(), |acc, v| acc + v) / vertices.len().max(1) as f32
            }
        }
    }

    /// Corner or vertex list for polygonal shapes; empty for circles
    pub fn vertices(&self) -> Vec<Vec2> {
        match self {
            Self::Circle { .. } => Vec::new(),
            Self::Box { transform, half_extents } => box_corners(transform, half_extents).to_vec(),
            Self::Polygon { vertices } => vertices.clone(),
        }
    }

    /// Candidate separating axes contributed by this shape (unit length).
    ///
    /// Boxes contribute their two face axes; polygons one normal per edge.
    pub fn face_axes(&self) -> Vec<Vec2> {
        match self {
            Self::Circle { .. } => Vec::new(),
            Self::Box { transform, .. } => transform.axes().to_vec(),
            Self::Polygon { vertices } => edge_normals(vertices),
        }
    }
}

/// World-space corners of an oriented box, counter-clockwise
pub fn box_corners(transform: &Transform2D, half_extents: &Vec2) -> [Vec2; 4] {
    let (hx, hy) = (half_extents.x, half_extents.y);
    [
        Vec2::new(-hx, -hy),
        Vec2::new(hx, -hy),
        Vec2::new(hx, hy),
        Vec2::new(-hx, hy),
    ]
    .map(|corner| transform.transform_point(&corner))
}

/// Outward unit normals of a CCW polygon's edges
fn edge_normals(vertices: &[Vec2]) -> Vec<Vec2> {
    let count = vertices.len();
    (0..count)
        .filter_map(|i| {
            let edge = vertices[(i + 1) % count] - vertices[i];
            utils::try_normalize(&Vec2::new(edge.y, -edge.x))
        })
        .collect()
}

/// Twice the signed area; positive for counter-clockwise winding
fn signed_area(vertices: &[Vec2]) -> f32 {
    let count = vertices.len();
    (0..count)
        .map(|i| utils::cross(&vertices[i], &vertices[(i + 1) % count]))
        .sum()
}

fn validate_polygon(vertices: &[Vec2]) -> PhysicsResult<()> {
    if vertices.len() < 3 {
        return Err(PhysicsError::InvalidShape(format!(
            "polygon needs at least 3 vertices, got {}",
            vertices.len()
        )));
    }
    if vertices.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
        return Err(PhysicsError::InvalidShape("polygon vertex is not finite".into()));
    }
    if signed_area(vertices) <= EPSILON {
        return Err(PhysicsError::InvalidShape(
            "polygon must have positive area and counter-clockwise winding".into(),
        ));
    }

    let count = vertices.len();
    for i in 0..count {
        let a = vertices[i];
        let b = vertices[(i + 1) % count];
        let c = vertices[(i + 2) % count];
        if (b - a).magnitude_squared() <= EPSILON * EPSILON {
            return Err(PhysicsError::InvalidShape(format!("polygon has a repeated vertex at index {i}")));
        }
        if utils::cross(&(b - a), &(c - b)) < -EPSILON {
            return Err(PhysicsError::InvalidShape("polygon is not convex".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_circle_aabb() {
        let shape = Shape::circle(1.0).unwrap();
        let aabb = shape.compute_aabb(&Transform2D::from_position(2.0, -1.0));

        assert_eq!(aabb.center(), Vec2::new(2.0, -1.0));
        assert_eq!(aabb.extents(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_rotated_box_aabb_is_tight() {
        let shape = Shape::box_shape(1.0, 1.0).unwrap();
        let aabb = shape.compute_aabb(&Transform2D::from_rotation(FRAC_PI_4));

        let diagonal = std::f32::consts::SQRT_2;
        assert_relative_eq!(aabb.max, Vec2::new(diagonal, diagonal), epsilon = 1e-5);
        assert_relative_eq!(aabb.min, Vec2::new(-diagonal, -diagonal), epsilon = 1e-5);
    }

    #[test]
    fn test_scale_grows_shapes() {
        let scaled = Transform2D::from_position(1.0, 0.0).with_scale(Vec2::new(2.0, 3.0));

        let circle = Shape::circle(0.5).unwrap().compute_aabb(&scaled);
        assert_relative_eq!(circle.extents(), Vec2::new(1.5, 1.5), epsilon = 1e-6);

        let boxed = Shape::box_shape(1.0, 0.5).unwrap();
        let aabb = boxed.compute_aabb(&scaled);
        assert_relative_eq!(aabb.extents(), Vec2::new(2.0, 1.5), epsilon = 1e-6);
        assert_relative_eq!(aabb.center(), Vec2::new(1.0, 0.0), epsilon = 1e-6);
        let WorldShape::Box { transform, half_extents } = boxed.to_world_space(&scaled) else {
            panic!("expected box");
        };
        assert_eq!(transform.scale, Vec2::new(1.0, 1.0));
        assert_relative_eq!(half_extents, Vec2::new(2.0, 1.5), epsilon = 1e-6);

        let triangle = Shape::polygon(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)]).unwrap();
        let aabb = triangle.compute_aabb(&scaled);
        assert_relative_eq!(aabb.min, Vec2::new(1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(aabb.max, Vec2::new(3.0, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn test_mirrored_polygon_stays_counter_clockwise() {
        let triangle = Shape::polygon(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)]).unwrap();
        let mirrored = Transform2D::identity().with_scale(Vec2::new(-1.0, 1.0));

        let WorldShape::Polygon { vertices } = triangle.to_world_space(&mirrored) else {
            panic!("expected polygon");
        };
        assert!(signed_area(&vertices) > 0.0);
    }

    #[test]
    fn test_negative_radius_is_rejected() {
        assert!(matches!(Shape::circle(-0.1), Err(PhysicsError::InvalidShape(_))));
        assert!(matches!(Shape::circle(f32::NAN), Err(PhysicsError::InvalidShape(_))));
        assert!(Shape::circle(0.0).is_ok());
    }

    #[test]
    fn test_zero_extent_box_is_allowed() {
        assert!(Shape::box_shape(0.0, 0.0).is_ok());
        assert!(Shape::box_shape(-1.0, 0.5).is_err());
    }

    #[test]
    fn test_clockwise_polygon_is_rewound() {
        let clockwise = vec![Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0)];
        let shape = Shape::polygon(clockwise).unwrap();

        let Shape::Polygon { vertices } = shape else {
            panic!("expected polygon");
        };
        assert!(signed_area(&vertices) > 0.0);
    }

    #[test]
    fn test_concave_polygon_is_rejected() {
        let concave = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 0.5),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        assert!(matches!(Shape::polygon(concave), Err(PhysicsError::InvalidShape(_))));
    }

    #[test]
    fn test_polygon_axes_are_outward() {
        let square = Shape::polygon(vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ])
        .unwrap();
        let world = square.to_world_space(&Transform2D::identity());
        let axes = world.face_axes();

        assert_eq!(axes.len(), 4);
        assert_relative_eq!(axes[0], Vec2::new(0.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(axes[1], Vec2::new(1.0, 0.0), epsilon = 1e-6);
    }
}
