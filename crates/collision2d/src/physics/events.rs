//! Collision events and listener callbacks

use crate::foundation::collections::ColliderId;
use crate::foundation::math::Vec2;
use crate::physics::collider::EntityId;
use crate::physics::collision::narrow_phase::ContactManifold;

/// Unordered collider pair, stored with the smaller id first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollisionPair {
    /// Smaller collider id
    pub a: ColliderId,
    /// Larger collider id
    pub b: ColliderId,
}

impl CollisionPair {
    /// Create a new collision pair (always stores the smaller id first)
    pub fn new(first: ColliderId, second: ColliderId) -> Self {
        if first <= second {
            Self { a: first, b: second }
        } else {
            Self { a: second, b: first }
        }
    }

    /// True if `id` is one of the two colliders
    pub fn contains(&self, id: ColliderId) -> bool {
        self.a == id || self.b == id
    }
}

/// Types of collision events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionEventKind {
    /// Contact started this step
    Enter,
    /// Contact present last step and this step
    Stay,
    /// Contact ended this step (including removal of either collider)
    Exit,
}

/// One pair transition observed during a step
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    /// What happened
    pub kind: CollisionEventKind,
    /// The two colliders involved
    pub pair: CollisionPair,
    /// Owner of `pair.a`
    pub owner_a: EntityId,
    /// Owner of `pair.b`
    pub owner_b: EntityId,
    /// Contact from `pair.a` towards `pair.b`; `None` for exits
    pub manifold: Option<ContactManifold>,
}

impl CollisionEvent {
    /// True if either collider belongs to `owner`
    pub fn involves(&self, owner: EntityId) -> bool {
        self.owner_a == owner || self.owner_b == owner
    }
}

/// Receives collision callbacks for the colliders that reference it.
///
/// `this` is the owner of the collider the listener is attached to and
/// `other` the owner of the collider it touched. Normals point from `this`
/// towards `other`.
pub trait CollisionListener {
    /// Contact between `this` and `other` started
    fn on_collision_enter(&mut self, this: EntityId, other: EntityId, normal: Vec2, penetration: f32);

    /// Contact continued for another step
    fn on_collision_stay(&mut self, _this: EntityId, _other: EntityId, _normal: Vec2, _penetration: f32) {}

    /// Contact ended
    fn on_collision_exit(&mut self, this: EntityId, other: EntityId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_pair_is_canonical() {
        let mut ids: SlotMap<ColliderId, ()> = SlotMap::with_key();
        let first = ids.insert(());
        let second = ids.insert(());

        assert_eq!(CollisionPair::new(first, second), CollisionPair::new(second, first));
        let pair = CollisionPair::new(second, first);
        assert!(pair.a < pair.b);
        assert!(pair.contains(first) && pair.contains(second));
    }
}
