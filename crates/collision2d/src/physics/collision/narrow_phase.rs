//! Narrow-phase shape tests
//!
//! Exact overlap tests between two world-space shapes. Every test reports a
//! [`ContactManifold`] whose normal points from the first shape towards the
//! second, so swapping the arguments negates the normal and keeps the
//! penetration depth.
//!
//! - circle / circle: centre distance
//! - circle / box: closest point in box space, with a least-penetration
//!   fallback when the centre is inside the box
//! - box / box, box / polygon, polygon / polygon: separating axis theorem
//! - circle / polygon: SAT plus the closest-vertex axis

use serde::{Deserialize, Serialize};

use super::shape::{Shape, WorldShape};
use crate::foundation::math::{utils, Transform2D, Vec2, EPSILON};

/// Result of a successful narrow-phase test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactManifold {
    /// Unit contact normal, pointing from shape A towards shape B
    pub normal: Vec2,
    /// Overlap depth along `normal`; always positive
    pub penetration: f32,
    /// Approximate world-space contact point
    pub point: Option<Vec2>,
}

impl ContactManifold {
    /// Create a new manifold
    pub fn new(normal: Vec2, penetration: f32, point: Option<Vec2>) -> Self {
        Self { normal, penetration, point }
    }

    /// Same contact seen from the other shape
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            penetration: self.penetration,
            point: self.point,
        }
    }
}

/// Test two model-space shapes under their world transforms
pub fn test(
    shape_a: &Shape,
    transform_a: &Transform2D,
    shape_b: &Shape,
    transform_b: &Transform2D,
) -> Option<ContactManifold> {
    test_world(&shape_a.to_world_space(transform_a), &shape_b.to_world_space(transform_b))
}

/// Boolean form of [`test`]
pub fn overlaps(
    shape_a: &Shape,
    transform_a: &Transform2D,
    shape_b: &Shape,
    transform_b: &Transform2D,
) -> bool {
    test(shape_a, transform_a, shape_b, transform_b).is_some()
}

/// Test two shapes that are already in world space
pub fn test_world(a: &WorldShape, b: &WorldShape) -> Option<ContactManifold> {
    match (a, b) {
        (
            WorldShape::Circle { center: center_a, radius: radius_a },
            WorldShape::Circle { center: center_b, radius: radius_b },
        ) => circle_vs_circle(center_a, *radius_a, center_b, *radius_b),

        (WorldShape::Box { transform, half_extents }, WorldShape::Circle { center, radius }) => {
            box_vs_circle(transform, half_extents, center, *radius)
        }
        (WorldShape::Circle { center, radius }, WorldShape::Box { transform, half_extents }) => {
            box_vs_circle(transform, half_extents, center, *radius).map(|m| m.flipped())
        }

        (polygon @ WorldShape::Polygon { .. }, WorldShape::Circle { center, radius }) => {
            polygon_vs_circle(polygon, center, *radius)
        }
        (WorldShape::Circle { center, radius }, polygon @ WorldShape::Polygon { .. }) => {
            polygon_vs_circle(polygon, center, *radius).map(|m| m.flipped())
        }

        // Box/box, box/polygon and polygon/polygon all go through SAT
        _ => polygon_vs_polygon(a, b),
    }
}

fn circle_vs_circle(
    center_a: &Vec2,
    radius_a: f32,
    center_b: &Vec2,
    radius_b: f32,
) -> Option<ContactManifold> {
    let delta = center_b - center_a;
    let distance_sq = delta.magnitude_squared();
    let radius_sum = radius_a + radius_b;

    if distance_sq >= radius_sum * radius_sum {
        return None;
    }

    let distance = distance_sq.sqrt();
    if distance < EPSILON {
        // Coincident centres: fixed normal instead of dividing by zero
        return Some(ContactManifold::new(Vec2::new(1.0, 0.0), radius_sum, Some(*center_a)));
    }

    let normal = delta / distance;
    let penetration = radius_sum - distance;
    let point = center_a + normal * (radius_a - penetration * 0.5);

    Some(ContactManifold::new(normal, penetration, Some(point)))
}

/// Box is shape A, circle is shape B
fn box_vs_circle(
    box_transform: &Transform2D,
    half_extents: &Vec2,
    center: &Vec2,
    radius: f32,
) -> Option<ContactManifold> {
    let local = box_transform.inverse_transform_point(center);
    let clamped = Vec2::new(
        local.x.clamp(-half_extents.x, half_extents.x),
        local.y.clamp(-half_extents.y, half_extents.y),
    );
    let inside = clamped == local;

    let (normal_local, penetration, contact_local) = if inside {
        // Clamp delta is zero here; push out along the axis of least penetration
        let dx = half_extents.x - local.x.abs();
        let dy = half_extents.y - local.y.abs();

        if dx <= dy {
            let sign = utils::sign_or_positive(local.x);
            (Vec2::new(sign, 0.0), dx + radius, Vec2::new(sign * half_extents.x, local.y))
        } else {
            let sign = utils::sign_or_positive(local.y);
            (Vec2::new(0.0, sign), dy + radius, Vec2::new(local.x, sign * half_extents.y))
        }
    } else {
        let delta = local - clamped;
        let distance_sq = delta.magnitude_squared();
        if distance_sq >= radius * radius {
            return None;
        }
        let distance = distance_sq.sqrt();
        (delta / distance, radius - distance, clamped)
    };

    if penetration <= 0.0 {
        return None;
    }

    Some(ContactManifold::new(
        box_transform.rotate_vector(&normal_local),
        penetration,
        Some(box_transform.transform_point(&contact_local)),
    ))
}

/// SAT between two polygonal shapes (boxes or convex polygons)
fn polygon_vs_polygon(a: &WorldShape, b: &WorldShape) -> Option<ContactManifold> {
    let vertices_a = a.vertices();
    let vertices_b = b.vertices();
    let center_delta = b.center() - a.center();

    let mut best: Option<(Vec2, f32)> = None;

    for axis in a.face_axes().into_iter().chain(b.face_axes()) {
        let interval_a = project(&vertices_a, &axis);
        let interval_b = project(&vertices_b, &axis);

        let (normal, depth) = axis_overlap(&axis, interval_a, interval_b, &center_delta)?;

        // Strict comparison keeps the earliest axis on ties (A's axes first)
        if best.map_or(true, |(_, best_depth)| depth < best_depth) {
            best = Some((normal, depth));
        }
    }

    let (normal, penetration) = best?;
    let point = support_point(&vertices_b, &-normal);

    Some(ContactManifold::new(normal, penetration, point))
}

/// Polygonal shape is A, circle is B
fn polygon_vs_circle(polygon: &WorldShape, center: &Vec2, radius: f32) -> Option<ContactManifold> {
    let vertices = polygon.vertices();
    let center_delta = center - polygon.center();

    let mut axes = polygon.face_axes();
    let closest_vertex = vertices
        .iter()
        .min_by(|p, q| {
            (*p - center)
                .magnitude_squared()
                .total_cmp(&(*q - center).magnitude_squared())
        })
        .copied();
    if let Some(axis) = closest_vertex.and_then(|vertex| utils::try_normalize(&(center - vertex))) {
        axes.push(axis);
    }

    let mut best: Option<(Vec2, f32)> = None;

    for axis in axes {
        let interval_polygon = project(&vertices, &axis);
        let projected_center = center.dot(&axis);
        let interval_circle = (projected_center - radius, projected_center + radius);

        let (normal, depth) = axis_overlap(&axis, interval_polygon, interval_circle, &center_delta)?;

        if best.map_or(true, |(_, best_depth)| depth < best_depth) {
            best = Some((normal, depth));
        }
    }

    let (normal, penetration) = best?;
    Some(ContactManifold::new(normal, penetration, Some(center - normal * radius)))
}

/// Overlap of two projected intervals along `axis`.
///
/// Returns `None` when the axis separates the shapes (touching counts as
/// separated). Otherwise returns the axis oriented from A towards B by the
/// centre delta, together with the length of the shared interval.
fn axis_overlap(
    axis: &Vec2,
    (min_a, max_a): (f32, f32),
    (min_b, max_b): (f32, f32),
    center_delta: &Vec2,
) -> Option<(Vec2, f32)> {
    let overlap = max_a.min(max_b) - min_a.max(min_b);
    if overlap <= 0.0 {
        return None;
    }

    let normal = if center_delta.dot(axis) >= 0.0 { *axis } else { -*axis };
    Some((normal, overlap))
}

fn project(vertices: &[Vec2], axis: &Vec2) -> (f32, f32) {
    vertices
        .iter()
        .map(|v| v.dot(axis))
        .fold((f32::MAX, f32::MIN), |(min, max), p| (min.min(p), max.max(p)))
}

/// Vertex furthest along `direction`
fn support_point(vertices: &[Vec2], direction: &Vec2) -> Option<Vec2> {
    vertices
        .iter()
        .max_by(|p, q| p.dot(direction).total_cmp(&q.dot(direction)))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    const TOLERANCE: f32 = 1e-4;

    fn at(x: f32, y: f32) -> Transform2D {
        Transform2D::from_position(x, y)
    }

    fn circle(radius: f32) -> Shape {
        Shape::circle(radius).unwrap()
    }

    fn rect(half_width: f32, half_height: f32) -> Shape {
        Shape::box_shape(half_width, half_height).unwrap()
    }

    fn assert_symmetric(shape_a: &Shape, xf_a: &Transform2D, shape_b: &Shape, xf_b: &Transform2D) {
        let forward = test(shape_a, xf_a, shape_b, xf_b);
        let backward = test(shape_b, xf_b, shape_a, xf_a);

        match (forward, backward) {
            (None, None) => {}
            (Some(f), Some(b)) => {
                assert_relative_eq!(f.penetration, b.penetration, epsilon = TOLERANCE);
                assert_relative_eq!(f.normal, -b.normal, epsilon = TOLERANCE);
            }
            (f, b) => panic!("asymmetric result: {f:?} vs {b:?}"),
        }
    }

    #[test]
    fn test_circle_collision() {
        assert!(overlaps(&circle(0.75), &at(0.0, 0.0), &circle(0.75), &at(1.0, 0.0)));
        assert!(!overlaps(&circle(0.4), &at(0.0, 0.0), &circle(0.4), &at(1.0, 0.0)));
    }

    #[test]
    fn test_small_circle_entering_big_circle() {
        let small = circle(0.4);
        let big = circle(0.6);

        assert!(test(&small, &at(0.0, 0.0), &big, &at(-3.0, 2.0)).is_none());

        let manifold = test(&small, &at(-3.0, 2.3), &big, &at(-3.0, 2.0))
            .expect("circles should overlap");
        assert_relative_eq!(manifold.normal, Vec2::new(0.0, -1.0), epsilon = TOLERANCE);
        assert_relative_eq!(manifold.penetration, 0.7, epsilon = TOLERANCE);
    }

    #[test]
    fn test_coincident_circles_use_fixed_normal() {
        let manifold = test(&circle(0.5), &at(1.0, 1.0), &circle(0.25), &at(1.0, 1.0)).unwrap();
        assert_eq!(manifold.normal, Vec2::new(1.0, 0.0));
        assert_relative_eq!(manifold.penetration, 0.75, epsilon = TOLERANCE);
    }

    #[test]
    fn test_touching_circles_do_not_collide() {
        assert!(test(&circle(0.5), &at(0.0, 0.0), &circle(0.5), &at(1.0, 0.0)).is_none());
    }

    #[test]
    fn test_circle_center_inside_box() {
        let manifold = test(&rect(1.5, 0.3), &at(0.0, 3.0), &circle(0.4), &at(0.0, 3.0))
            .expect("centre inside box must collide");

        assert_relative_eq!(manifold.normal, Vec2::new(0.0, 1.0), epsilon = TOLERANCE);
        assert_relative_eq!(manifold.penetration, 0.7, epsilon = TOLERANCE);
    }

    #[test]
    fn test_circle_outside_box_uses_closest_point() {
        // Circle just right of the box's right face
        let manifold = test(&rect(1.0, 1.0), &at(0.0, 0.0), &circle(0.5), &at(1.3, 0.2)).unwrap();
        assert_relative_eq!(manifold.normal, Vec2::new(1.0, 0.0), epsilon = TOLERANCE);
        assert_relative_eq!(manifold.penetration, 0.2, epsilon = TOLERANCE);
        assert_relative_eq!(manifold.point.unwrap(), Vec2::new(1.0, 0.2), epsilon = TOLERANCE);

        // Near a corner but outside the radius
        assert!(test(&rect(1.0, 1.0), &at(0.0, 0.0), &circle(0.3), &at(1.25, 1.25)).is_none());
    }

    #[test]
    fn test_circle_against_rotated_box() {
        let boxed = rect(1.0, 0.2);
        let rotated = Transform2D::new(Vec2::zeros(), std::f32::consts::FRAC_PI_2);

        // The box now spans y in [-1, 1]
        assert!(overlaps(&boxed, &rotated, &circle(0.2), &at(0.0, 1.1)));
        assert!(!overlaps(&boxed, &rotated, &circle(0.2), &at(0.5, 0.0)));
    }

    #[test]
    fn test_box_vs_box_min_axis() {
        let manifold = test(&rect(1.0, 1.0), &at(0.0, 0.0), &rect(1.0, 1.0), &at(1.5, 0.5)).unwrap();
        assert_relative_eq!(manifold.normal, Vec2::new(1.0, 0.0), epsilon = TOLERANCE);
        assert_relative_eq!(manifold.penetration, 0.5, epsilon = TOLERANCE);
    }

    #[test]
    fn test_box_vs_box_tie_prefers_first_box_axis() {
        // Equal overlap on x and y: A's x axis is tested first and wins
        let manifold = test(&rect(1.0, 1.0), &at(0.0, 0.0), &rect(1.0, 1.0), &at(1.5, 1.5)).unwrap();
        assert_relative_eq!(manifold.normal, Vec2::new(1.0, 0.0), epsilon = TOLERANCE);
        assert_relative_eq!(manifold.penetration, 0.5, epsilon = TOLERANCE);
    }

    #[test]
    fn test_rotated_boxes_separated_by_diagonal_axis() {
        // AABBs overlap, but the diamond's face axis separates them
        let diamond = Transform2D::new(Vec2::zeros(), FRAC_PI_4);
        assert!(!overlaps(&rect(0.5, 0.5), &diamond, &rect(0.5, 0.5), &at(1.0, 1.0)));
        assert!(overlaps(&rect(0.5, 0.5), &diamond, &rect(0.5, 0.5), &at(0.8, 0.3)));
    }

    #[test]
    fn test_contained_box_penetration_is_interval_overlap() {
        let manifold = test(&rect(2.0, 2.0), &at(0.0, 0.0), &rect(0.25, 0.25), &at(1.5, 0.0)).unwrap();
        // Small box lies fully inside: shared interval is its own width on both axes
        assert_relative_eq!(manifold.normal, Vec2::new(1.0, 0.0), epsilon = TOLERANCE);
        assert_relative_eq!(manifold.penetration, 0.5, epsilon = TOLERANCE);

        let swapped = test(&rect(0.25, 0.25), &at(1.5, 0.0), &rect(2.0, 2.0), &at(0.0, 0.0)).unwrap();
        assert_relative_eq!(swapped.normal, Vec2::new(-1.0, 0.0), epsilon = TOLERANCE);
        assert_relative_eq!(swapped.penetration, 0.5, epsilon = TOLERANCE);
    }

    #[test]
    fn test_partially_contained_box_uses_shared_interval() {
        // x intervals [-2, 2] and [1.0, 3.0] share 1.0; y fully contains B's 0.6
        let manifold = test(&rect(2.0, 2.0), &at(0.0, 0.0), &rect(1.0, 0.3), &at(2.0, -0.5)).unwrap();
        assert_relative_eq!(manifold.normal, Vec2::new(0.0, -1.0), epsilon = TOLERANCE);
        assert_relative_eq!(manifold.penetration, 0.6, epsilon = TOLERANCE);
    }

    #[test]
    fn test_scaled_shapes_collide_at_scaled_size() {
        let doubled = at(0.0, 0.0).with_scale(Vec2::new(2.0, 1.0));

        // Radius grows by the larger component: 0.5 * 2 + 0.5 reaches 1.5
        let manifold = test(&circle(0.5), &doubled, &circle(0.5), &at(1.4, 0.0)).unwrap();
        assert_relative_eq!(manifold.penetration, 0.1, epsilon = TOLERANCE);
        assert!(!overlaps(&circle(0.5), &at(0.0, 0.0), &circle(0.5), &at(1.4, 0.0)));

        // Box half extents become (2, 1)
        let manifold = test(&rect(1.0, 1.0), &doubled, &circle(0.5), &at(2.3, 0.0)).unwrap();
        assert_relative_eq!(manifold.normal, Vec2::new(1.0, 0.0), epsilon = TOLERANCE);
        assert_relative_eq!(manifold.penetration, 0.2, epsilon = TOLERANCE);
        assert!(!overlaps(&rect(1.0, 1.0), &doubled, &circle(0.5), &at(0.0, 1.6)));
    }

    #[test]
    fn test_triangle_vs_box_and_circle() {
        let triangle = Shape::polygon(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(0.0, 2.0),
        ])
        .unwrap();

        assert!(overlaps(&triangle, &at(0.0, 0.0), &rect(0.5, 0.5), &at(0.5, 0.5)));
        // Beyond the hypotenuse x + y = 2
        assert!(!overlaps(&triangle, &at(0.0, 0.0), &rect(0.2, 0.2), &at(1.5, 1.5)));

        assert!(overlaps(&triangle, &at(0.0, 0.0), &circle(0.5), &at(1.2, 1.2)));
        assert!(!overlaps(&triangle, &at(0.0, 0.0), &circle(0.3), &at(1.5, 1.5)));
        // Near the right-angle vertex from outside
        assert!(!overlaps(&triangle, &at(0.0, 0.0), &circle(0.3), &at(-0.3, -0.3)));
    }

    #[test]
    fn test_narrow_phase_symmetry() {
        let cases = [
            (circle(0.5), at(0.0, 0.0), circle(0.7), at(0.9, 0.2)),
            (circle(0.5), at(0.0, 0.0), rect(1.0, 0.5), at(0.4, 0.9)),
            (rect(1.0, 0.5), Transform2D::new(Vec2::new(0.3, 0.1), 0.4), circle(0.6), at(1.2, 0.0)),
            (rect(1.0, 1.0), Transform2D::new(Vec2::zeros(), 0.3), rect(0.5, 1.5), at(1.2, 0.4)),
            (rect(1.0, 1.0), at(0.0, 0.0), rect(1.0, 1.0), at(3.0, 0.0)),
            (circle(0.2), at(0.0, 0.0), rect(1.0, 1.0), at(5.0, 5.0)),
        ];

        for (shape_a, xf_a, shape_b, xf_b) in &cases {
            assert_symmetric(shape_a, xf_a, shape_b, xf_b);
        }
    }

    #[test]
    fn test_manifold_normals_are_unit_length() {
        let manifold = test(&rect(1.0, 1.0), &Transform2D::new(Vec2::zeros(), 0.5), &circle(0.5), &at(1.1, 0.6));
        let manifold = manifold.expect("should overlap");
        assert_relative_eq!(manifold.normal.magnitude(), 1.0, epsilon = TOLERANCE);
        assert!(manifold.penetration > 0.0);
    }
}
