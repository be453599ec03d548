//! Axis-aligned bounding boxes
//!
//! The broad-phase works entirely on these. Overlap tests are inclusive, so
//! boxes that only touch along an edge still count as overlapping; the
//! narrow-phase makes the exact call.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec2;

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec2,
    /// Maximum corner of the bounding box
    pub max: Vec2,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest AABB containing every point, or `None` for an empty slice
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Self::new(*first, *first);
        for point in rest {
            aabb.min = aabb.min.inf(point);
            aabb.max = aabb.max.sup(point);
        }
        Some(aabb)
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Get the half extents of the AABB
    pub fn extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: &Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Check if this AABB fully contains another
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// Check if this AABB intersects another AABB (touching counts)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Union of two boxes
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Perimeter, the 2D stand-in for surface area in tree cost heuristics
    pub fn perimeter(&self) -> f32 {
        let size = self.max - self.min;
        2.0 * (size.x + size.y)
    }

    /// Grow the box by `margin` on every side
    pub fn fatten(&self, margin: f32) -> Aabb {
        let margin = Vec2::new(margin, margin);
        Aabb {
            min: self.min - margin,
            max: self.max + margin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Aabb {
        Aabb::new(Vec2::new(min_x, min_y), Vec2::new(max_x, max_y))
    }

    #[test]
    fn test_aabb_overlap() {
        let a = aabb(0.0, 0.0, 1.0, 1.0);
        assert!(a.overlaps(&aabb(0.5, 0.5, 1.5, 1.5)));
        assert!(a.overlaps(&aabb(1.0, 0.0, 2.0, 1.0)), "touching edges overlap");
        assert!(!a.overlaps(&aabb(2.0, 2.0, 3.0, 3.0)));
    }

    #[test]
    fn test_merge_contains_both() {
        let a = aabb(0.0, 0.0, 1.0, 1.0);
        let b = aabb(-2.0, 0.5, 0.5, 3.0);
        let merged = a.merge(&b);

        assert!(merged.contains(&a));
        assert!(merged.contains(&b));
        assert_eq!(merged, aabb(-2.0, 0.0, 1.0, 3.0));
    }

    #[test]
    fn test_fatten_and_perimeter() {
        let a = aabb(0.0, 0.0, 2.0, 1.0);
        assert_eq!(a.perimeter(), 6.0);

        let fat = a.fatten(0.5);
        assert!(fat.contains(&a));
        assert_eq!(fat.perimeter(), 10.0);
    }

    #[test]
    fn test_from_points() {
        let points = [Vec2::new(1.0, -1.0), Vec2::new(-2.0, 0.5), Vec2::new(0.0, 3.0)];
        assert_eq!(Aabb::from_points(&points), Some(aabb(-2.0, -1.0, 1.0, 3.0)));
        assert_eq!(Aabb::from_points(&[]), None);
    }
}
