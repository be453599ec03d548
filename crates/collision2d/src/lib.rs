//! # Collision2D
//!
//! A 2D collision detection core for game engines.
//!
//! ## Features
//!
//! - **Broad-phase**: dynamic AABB tree with fattened leaves and pair queries
//! - **Narrow-phase**: circles, oriented boxes and convex polygons with
//!   contact normals and penetration depths
//! - **Layer Filtering**: 32 collision layers with per-collider masks
//! - **Events**: enter / stay / exit callbacks diffed across steps
//! - **Deferred Commands**: thread-safe queue for mutations from callbacks
//!   or other threads
//!
//! ## Quick Start
//!
//! ```rust
//! use collision2d::prelude::*;
//!
//! struct Logger;
//!
//! impl CollisionListener for Logger {
//!     fn on_collision_enter(&mut self, this: EntityId, other: EntityId, normal: Vec2, depth: f32) {
//!         println!("{this} hit {other} along {normal:?} ({depth})");
//!     }
//!
//!     fn on_collision_exit(&mut self, this: EntityId, other: EntityId) {
//!         println!("{this} left {other}");
//!     }
//! }
//!
//! fn main() -> Result<(), PhysicsError> {
//!     let mut world = CollisionWorld::new(CollisionWorldConfig::default())?;
//!     let logger = world.add_listener(Box::new(Logger));
//!
//!     let player = world.add_collider(
//!         Collider::new(1)
//!             .with_shape(Shape::circle(0.4)?)
//!             .with_layer(PhysicsLayers::PLAYER)
//!             .with_mask(LayerMask::ENVIRONMENT)
//!             .with_listener(logger),
//!     )?;
//!     world.add_collider(
//!         Collider::new(2)
//!             .with_shape(Shape::box_shape(1.5, 0.3)?)
//!             .with_layer(PhysicsLayers::ENVIRONMENT)
//!             .with_transform(Transform2D::from_position(0.0, 3.0)),
//!     )?;
//!
//!     world.set_transform(player, Transform2D::from_position(0.0, 2.8))?;
//!     world.step();
//!     assert_eq!(world.active_pair_count(), 1);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod physics;
pub mod spatial;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, ConfigFormat, CollisionWorldConfig},
        foundation::{
            collections::{ColliderId, ListenerId},
            math::{Transform2D, Vec2},
        },
        physics::{
            Aabb, Collider, CollisionEvent, CollisionEventKind, CollisionListener, CollisionWorld,
            CommandSender, ContactManifold, EntityId, LayerId, LayerMask, PhysicsError,
            PhysicsLayers, PhysicsResult, Shape,
        },
    };
}
