//! Spatial partitioning data structures
//!
//! Broad-phase acceleration for collision detection and region queries in 2D.

pub mod aabb_tree;

pub use aabb_tree::{AabbTree, NodeHandle, DEFAULT_AABB_MARGIN};
