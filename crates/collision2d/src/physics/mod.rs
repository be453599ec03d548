//! Collision detection core
//!
//! Broad-phase pairs come from a dynamic AABB tree, get filtered by layer
//! masks, and are confirmed by exact narrow-phase tests. The world diffs each
//! step's contacts against the previous step and reports enter, stay and exit
//! transitions to registered listeners. Nothing is simulated: there is no
//! impulse or position correction.

pub mod collider;
pub mod collision;
pub mod collision_layers;
pub mod collision_world;
pub mod commands;
pub mod error;
pub mod events;

#[cfg(test)]
mod tests;

pub use crate::spatial::aabb_tree;

pub use collider::{Collider, EntityId};
pub use collision::{narrow_phase, Aabb, ContactManifold, Shape};
pub use collision_layers::{compatible, LayerId, LayerMask, PhysicsLayers};
pub use collision_world::CollisionWorld;
pub use commands::{CommandSender, WorldCommand};
pub use error::{PhysicsError, PhysicsResult};
pub use events::{CollisionEvent, CollisionEventKind, CollisionListener, CollisionPair};
