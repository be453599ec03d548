//! Collider definitions
//!
//! A collider attaches one shape to an owning entity. The owner's world pose
//! is pushed in by the host every tick; the collider's own `offset` places the
//! shape relative to that pose.

use crate::foundation::collections::ListenerId;
use crate::foundation::math::Transform2D;
use crate::physics::collision::aabb::Aabb;
use crate::physics::collision::shape::Shape;
use crate::physics::collision_layers::{compatible, LayerId, LayerMask, PhysicsLayers};
use crate::physics::error::{PhysicsError, PhysicsResult};

/// Host-side identifier of the object that owns a collider
pub type EntityId = u32;

/// Collision volume attached to an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    owner: EntityId,
    shape: Shape,
    offset: Transform2D,
    layer: LayerId,
    mask: LayerMask,
    is_trigger: bool,
    listener: Option<ListenerId>,
    world_transform: Transform2D,
}

impl Collider {
    /// Collider with the default shape: circle of radius 0.5 on the DEFAULT
    /// layer, colliding with everything, not a trigger
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            shape: Shape::default(),
            offset: Transform2D::identity(),
            layer: PhysicsLayers::DEFAULT,
            mask: LayerMask::all(),
            is_trigger: false,
            listener: None,
            world_transform: Transform2D::identity(),
        }
    }

    /// Set the collider shape
    #[must_use]
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    /// Set the local pose of the shape relative to the owner
    #[must_use]
    pub fn with_offset(mut self, offset: Transform2D) -> Self {
        self.offset = offset;
        self
    }

    /// Set the physics layer
    #[must_use]
    pub fn with_layer(mut self, layer: LayerId) -> Self {
        self.layer = layer;
        self
    }

    /// Set the collision mask (layers this collider can collide with)
    #[must_use]
    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.mask = mask;
        self
    }

    /// Set whether this is a trigger volume
    #[must_use]
    pub fn as_trigger(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    /// Route collision callbacks for this collider to `listener`
    #[must_use]
    pub fn with_listener(mut self, listener: ListenerId) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Initial world pose of the owner
    #[must_use]
    pub fn with_transform(mut self, transform: Transform2D) -> Self {
        self.world_transform = transform;
        self
    }

    /// Owning entity
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Get the collider shape
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Replace the collider shape
    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    /// Local pose of the shape relative to the owner
    pub fn offset(&self) -> &Transform2D {
        &self.offset
    }

    /// Set the local pose of the shape
    pub fn set_offset(&mut self, offset: Transform2D) {
        self.offset = offset;
    }

    /// Get the physics layer
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Set the physics layer
    pub fn set_layer(&mut self, layer: LayerId) {
        self.layer = layer;
    }

    /// Get the collision mask
    pub fn collision_mask(&self) -> LayerMask {
        self.mask
    }

    /// Set the collision mask
    pub fn set_collision_mask(&mut self, mask: LayerMask) {
        self.mask = mask;
    }

    /// Check if this is a trigger
    pub fn is_trigger(&self) -> bool {
        self.is_trigger
    }

    /// Set whether this is a trigger
    pub fn set_trigger(&mut self, is_trigger: bool) {
        self.is_trigger = is_trigger;
    }

    /// Listener receiving this collider's callbacks
    pub fn listener(&self) -> Option<ListenerId> {
        self.listener
    }

    /// Attach or detach the callback listener
    pub fn set_listener(&mut self, listener: Option<ListenerId>) {
        self.listener = listener;
    }

    /// World pose of the owner
    pub fn world_transform(&self) -> &Transform2D {
        &self.world_transform
    }

    pub(crate) fn set_world_transform(&mut self, transform: Transform2D) {
        self.world_transform = transform;
    }

    /// World pose of the shape: owner pose composed with the offset
    pub fn shape_transform(&self) -> Transform2D {
        self.world_transform.combine(&self.offset)
    }

    /// Tight world-space bounds of the shape
    pub fn compute_aabb(&self) -> Aabb {
        self.shape.compute_aabb(&self.shape_transform())
    }

    /// Check if this collider should collide with another based on layers
    pub fn should_collide_with(&self, other: &Collider) -> bool {
        compatible(self.layer, self.mask, other.layer, other.mask)
    }

    /// Check the shape parameters, the offset and the owner pose
    pub fn validate(&self) -> PhysicsResult<()> {
        self.shape.validate()?;
        if !self.offset.is_finite() || !self.world_transform.is_finite() {
            return Err(PhysicsError::NonFiniteTransform);
        }
        Ok(())
    }
}
