//! Shapes and exact shape-versus-shape tests
//!
//! # Architecture
//!
//! - **Model Space Storage**: collision shapes are stored in local coordinates
//! - **On-Demand Transformation**: shapes move to world space only during tests
//! - **Coordinate Decoupling**: shape geometry is separate from the owner's transform
//!
//! # Module Organization
//!
//! - [`aabb`] - Axis-aligned bounds used by the broad-phase
//! - [`shape`] - Circle, oriented box and convex polygon shapes
//! - [`narrow_phase`] - Exact overlap tests producing contact manifolds

pub mod aabb;
pub mod narrow_phase;
pub mod shape;

pub use aabb::Aabb;
pub use narrow_phase::ContactManifold;
pub use shape::{Shape, WorldShape};
