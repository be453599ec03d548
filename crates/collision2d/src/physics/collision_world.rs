//! Collision world
//!
//! Owns every collider, the broad-phase tree and the set of pairs that were
//! touching at the end of the last step. Detection only: nothing is moved or
//! resolved here.
//!
//! One [`CollisionWorld::step`] runs, in order:
//! 1. drain queued [`WorldCommand`]s
//! 2. forced exits for colliders removed since the last step
//! 3. sync dirty collider bounds into the tree
//! 4. broad-phase pairs from the tree
//! 5. owner / layer / trigger filtering
//! 6. narrow-phase on the survivors
//! 7. diff against the active pairs and dispatch enter / stay / exit

use std::any::Any;
use std::collections::BTreeMap;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use crate::config::{CollisionWorldConfig, Config};
use crate::foundation::collections::{ColliderId, ListenerId, SlotMap};
use crate::foundation::math::Transform2D;
use crate::physics::collider::{Collider, EntityId};
use crate::physics::collision::aabb::Aabb;
use crate::physics::collision::narrow_phase::{self, ContactManifold};
use crate::physics::collision::shape::Shape;
use crate::physics::collision_layers::{LayerId, LayerMask, PhysicsLayers};
use crate::physics::commands::{CommandQueue, CommandSender, WorldCommand};
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::events::{CollisionEvent, CollisionEventKind, CollisionListener, CollisionPair};
use crate::spatial::{AabbTree, NodeHandle};

/// Collider plus its broad-phase bookkeeping
#[derive(Debug)]
struct ColliderEntry {
    collider: Collider,
    proxy: Option<NodeHandle>,
    /// Bounds changed since the last sync
    dirty: bool,
    /// Removed by the host; detached at the start of the next step
    pending_removal: bool,
}

type ListenerMap = SlotMap<ListenerId, Box<dyn CollisionListener>>;

/// Per-world collision detection state
pub struct CollisionWorld {
    config: CollisionWorldConfig,
    layers: PhysicsLayers,
    colliders: SlotMap<ColliderId, ColliderEntry>,
    listeners: ListenerMap,
    tree: AabbTree<ColliderId>,
    active_pairs: BTreeMap<CollisionPair, ContactManifold>,
    pending_removals: Vec<ColliderId>,
    events: Vec<CollisionEvent>,
    commands: CommandQueue,
    step_count: u64,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self {
            config: CollisionWorldConfig::default(),
            layers: PhysicsLayers::new(),
            colliders: SlotMap::with_key(),
            listeners: SlotMap::with_key(),
            tree: AabbTree::new(),
            active_pairs: BTreeMap::new(),
            pending_removals: Vec::new(),
            events: Vec::new(),
            commands: CommandQueue::new(),
            step_count: 0,
        }
    }
}

impl CollisionWorld {
    /// Create a world from a configuration.
    ///
    /// Fails with [`PhysicsError::InvalidConfig`] if the margin is negative
    /// or not finite, or if the configured layers clash with each other or
    /// with the built-in ones.
    pub fn new(config: CollisionWorldConfig) -> PhysicsResult<Self> {
        config
            .validate()
            .map_err(|e| PhysicsError::InvalidConfig(e.to_string()))?;
        let layers = config.build_layers()?;
        let tree = AabbTree::with_margin(config.aabb_margin);
        log::debug!(
            "Created collision world (margin {}, require_trigger {}, stay events {})",
            config.aabb_margin,
            config.require_trigger,
            config.report_stay_events
        );

        Ok(Self {
            config,
            layers,
            tree,
            ..Self::default()
        })
    }

    /// Active configuration
    pub fn config(&self) -> &CollisionWorldConfig {
        &self.config
    }

    /// Named layer registry
    pub fn layers(&self) -> &PhysicsLayers {
        &self.layers
    }

    /// Mutable named layer registry
    pub fn layers_mut(&mut self) -> &mut PhysicsLayers {
        &mut self.layers
    }

    /// Number of completed steps
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    // ---------------------------------------------------------------------
    // Colliders
    // ---------------------------------------------------------------------

    /// Register a collider and insert it into the broad-phase.
    ///
    /// The shape, transforms and listener are validated first. The collider
    /// takes part in detection from the next step.
    pub fn add_collider(&mut self, collider: Collider) -> PhysicsResult<ColliderId> {
        collider.validate()?;
        if let Some(listener) = collider.listener() {
            self.check_listener(listener)?;
        }

        let id = self.colliders.insert(ColliderEntry {
            collider,
            proxy: None,
            dirty: true,
            pending_removal: false,
        });
        self.sync_proxy(id);
        log::debug!("Added collider {id:?}");
        Ok(id)
    }

    /// Remove a collider.
    ///
    /// The collider disappears from queries immediately. Exit events for its
    /// active contacts fire at the start of the next step, after which the
    /// broad-phase proxy is dropped.
    pub fn remove_collider(&mut self, id: ColliderId) -> PhysicsResult<()> {
        let entry = self.live_entry_mut(id)?;
        entry.pending_removal = true;
        self.pending_removals.push(id);
        log::debug!("Collider {id:?} scheduled for removal");
        Ok(())
    }

    /// Update the owner's world pose for a collider
    pub fn set_transform(&mut self, id: ColliderId, transform: Transform2D) -> PhysicsResult<()> {
        if !transform.is_finite() {
            return Err(PhysicsError::NonFiniteTransform);
        }
        let entry = self.live_entry_mut(id)?;
        entry.collider.set_world_transform(transform);
        entry.dirty = true;
        Ok(())
    }

    /// Replace a collider's shape after validating it
    pub fn set_shape(&mut self, id: ColliderId, shape: Shape) -> PhysicsResult<()> {
        shape.validate()?;
        let entry = self.live_entry_mut(id)?;
        entry.collider.set_shape(shape);
        entry.dirty = true;
        Ok(())
    }

    /// Look up a live collider
    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders
            .get(id)
            .filter(|entry| !entry.pending_removal)
            .map(|entry| &entry.collider)
    }

    /// Move the shape relative to its owner
    pub fn set_offset(&mut self, id: ColliderId, offset: Transform2D) -> PhysicsResult<()> {
        if !offset.is_finite() {
            return Err(PhysicsError::NonFiniteTransform);
        }
        let entry = self.live_entry_mut(id)?;
        entry.collider.set_offset(offset);
        entry.dirty = true;
        Ok(())
    }

    /// Move a collider to another layer; takes effect on the next step
    pub fn set_layer(&mut self, id: ColliderId, layer: LayerId) -> PhysicsResult<()> {
        self.live_entry_mut(id)?.collider.set_layer(layer);
        Ok(())
    }

    /// Replace the set of layers a collider reacts to
    pub fn set_collision_mask(&mut self, id: ColliderId, mask: LayerMask) -> PhysicsResult<()> {
        self.live_entry_mut(id)?.collider.set_collision_mask(mask);
        Ok(())
    }

    /// Toggle the trigger flag
    pub fn set_trigger(&mut self, id: ColliderId, is_trigger: bool) -> PhysicsResult<()> {
        self.live_entry_mut(id)?.collider.set_trigger(is_trigger);
        Ok(())
    }

    /// Attach a registered listener, or detach with `None`
    pub fn set_listener(&mut self, id: ColliderId, listener: Option<ListenerId>) -> PhysicsResult<()> {
        if let Some(listener) = listener {
            self.check_listener(listener)?;
        }
        self.live_entry_mut(id)?.collider.set_listener(listener);
        Ok(())
    }

    /// First live collider owned by `owner`
    pub fn collider_by_owner(&self, owner: EntityId) -> Option<ColliderId> {
        self.colliders()
            .find(|(_, collider)| collider.owner() == owner)
            .map(|(id, _)| id)
    }

    /// Iterate over live colliders
    pub fn colliders(&self) -> impl Iterator<Item = (ColliderId, &Collider)> {
        self.colliders
            .iter()
            .filter(|(_, entry)| !entry.pending_removal)
            .map(|(id, entry)| (id, &entry.collider))
    }

    /// Number of live colliders
    pub fn collider_count(&self) -> usize {
        self.colliders.len() - self.pending_removals.len()
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    /// Register a callback listener; attach it with [`Collider::with_listener`]
    pub fn add_listener(&mut self, listener: Box<dyn CollisionListener>) -> ListenerId {
        self.listeners.insert(listener)
    }

    /// Unregister a listener and detach it from every collider
    pub fn remove_listener(&mut self, id: ListenerId) -> PhysicsResult<Box<dyn CollisionListener>> {
        let listener = self.listeners.remove(id).ok_or(PhysicsError::UnknownListener(id))?;
        for (_, entry) in self.colliders.iter_mut() {
            if entry.collider.listener() == Some(id) {
                entry.collider.set_listener(None);
            }
        }
        Ok(listener)
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Handle for queueing mutations from callbacks or other threads
    pub fn command_sender(&self) -> CommandSender {
        self.commands.sender()
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Pairs touching as of the last step, in pair order
    pub fn active_pairs(&self) -> impl Iterator<Item = (&CollisionPair, &ContactManifold)> {
        self.active_pairs.iter()
    }

    /// Number of pairs touching as of the last step
    pub fn active_pair_count(&self) -> usize {
        self.active_pairs.len()
    }

    /// Contact between two colliders as of the last step, normal pointing
    /// from `a` towards `b`
    pub fn contact(&self, a: ColliderId, b: ColliderId) -> Option<ContactManifold> {
        let pair = CollisionPair::new(a, b);
        let manifold = self.active_pairs.get(&pair)?;
        Some(if pair.a == a { *manifold } else { manifold.flipped() })
    }

    /// True if the two colliders were touching at the end of the last step
    pub fn is_touching(&self, a: ColliderId, b: ColliderId) -> bool {
        self.active_pairs.contains_key(&CollisionPair::new(a, b))
    }

    /// Events produced by the last step, in dispatch order
    pub fn events(&self) -> &[CollisionEvent] {
        &self.events
    }

    /// Live colliders whose bounds overlap `region`
    pub fn query_region(&self, region: &Aabb) -> Vec<ColliderId> {
        self.tree
            .query(region)
            .into_iter()
            .filter(|id| {
                self.collider(*id)
                    .is_some_and(|collider| collider.compute_aabb().overlaps(region))
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Step
    // ---------------------------------------------------------------------

    /// Run one detection step and dispatch its callbacks
    pub fn step(&mut self) {
        self.events.clear();

        self.apply_commands();
        self.flush_removals();
        self.sync_dirty();

        let candidates = self.tree.query_pairs();
        let candidate_count = candidates.len();
        let contacts = self.narrow_phase(candidates);

        self.diff_and_dispatch(contacts);
        self.step_count += 1;

        log::trace!(
            "Step {}: {} colliders, {} candidates, {} active pairs, {} events",
            self.step_count,
            self.colliders.len(),
            candidate_count,
            self.active_pairs.len(),
            self.events.len()
        );
    }

    fn apply_commands(&mut self) {
        for command in self.commands.drain() {
            let result = match command {
                WorldCommand::AddCollider(collider) => self.add_collider(collider).map(|_| ()),
                WorldCommand::RemoveCollider(id) => self.remove_collider(id),
                WorldCommand::SetTransform(id, transform) => self.set_transform(id, transform),
            };
            if let Err(e) = result {
                log::warn!("Ignoring queued collision command: {e}");
            }
        }
    }

    /// Exit every contact of each removed collider, then detach it
    fn flush_removals(&mut self) {
        for id in mem::take(&mut self.pending_removals) {
            let pairs: Vec<CollisionPair> = self
                .active_pairs
                .keys()
                .filter(|pair| pair.contains(id))
                .copied()
                .collect();

            for pair in pairs {
                self.active_pairs.remove(&pair);
                if let Some(event) = self.make_event(CollisionEventKind::Exit, pair, None) {
                    log::debug!("Forced exit {:?} <-> {:?}", pair.a, pair.b);
                    self.dispatch(&event);
                    self.events.push(event);
                }
            }

            if let Some(entry) = self.colliders.remove(id) {
                if let Some(proxy) = entry.proxy {
                    self.tree.remove(proxy);
                }
            }
            log::debug!("Removed collider {id:?}");
        }
    }

    fn sync_dirty(&mut self) {
        let dirty: Vec<ColliderId> = self
            .colliders
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(id, _)| id)
            .collect();

        for id in dirty {
            self.sync_proxy(id);
        }
    }

    /// Push a collider's current bounds into the tree
    fn sync_proxy(&mut self, id: ColliderId) {
        let Some(entry) = self.colliders.get_mut(id) else {
            return;
        };
        let aabb = entry.collider.compute_aabb();

        match entry.proxy {
            Some(proxy) => {
                if self.tree.update(proxy, aabb) {
                    log::trace!("Collider {id:?} re-inserted into broad-phase");
                }
            }
            None => match self.tree.insert(id, aabb) {
                Ok(proxy) => entry.proxy = Some(proxy),
                Err(e) => log::error!("Failed to insert collider {id:?} into broad-phase: {e}"),
            },
        }
        entry.dirty = false;
    }

    fn narrow_phase(&self, candidates: Vec<(ColliderId, ColliderId)>) -> BTreeMap<CollisionPair, ContactManifold> {
        let mut contacts = BTreeMap::new();

        for (id_a, id_b) in candidates {
            let (Some(a), Some(b)) = (self.collider(id_a), self.collider(id_b)) else {
                continue;
            };

            if a.owner() == b.owner() || !a.should_collide_with(b) {
                continue;
            }
            if self.config.require_trigger && !a.is_trigger() && !b.is_trigger() {
                continue;
            }

            if let Some(manifold) =
                narrow_phase::test(a.shape(), &a.shape_transform(), b.shape(), &b.shape_transform())
            {
                contacts.insert(CollisionPair::new(id_a, id_b), manifold);
            }
        }

        contacts
    }

    fn diff_and_dispatch(&mut self, contacts: BTreeMap<CollisionPair, ContactManifold>) {
        let previous = mem::take(&mut self.active_pairs);
        let mut transitions = Vec::new();

        for (pair, manifold) in &contacts {
            if previous.contains_key(pair) {
                if self.config.report_stay_events {
                    transitions.push((CollisionEventKind::Stay, *pair, Some(*manifold)));
                }
            } else {
                log::debug!("Collision enter {:?} <-> {:?}", pair.a, pair.b);
                transitions.push((CollisionEventKind::Enter, *pair, Some(*manifold)));
            }
        }
        for pair in previous.keys() {
            if !contacts.contains_key(pair) {
                log::debug!("Collision exit {:?} <-> {:?}", pair.a, pair.b);
                transitions.push((CollisionEventKind::Exit, *pair, None));
            }
        }

        self.active_pairs = contacts;

        for (kind, pair, manifold) in transitions {
            if let Some(event) = self.make_event(kind, pair, manifold) {
                self.dispatch(&event);
                self.events.push(event);
            }
        }
    }

    fn make_event(
        &self,
        kind: CollisionEventKind,
        pair: CollisionPair,
        manifold: Option<ContactManifold>,
    ) -> Option<CollisionEvent> {
        let owner_a = self.colliders.get(pair.a)?.collider.owner();
        let owner_b = self.colliders.get(pair.b)?.collider.owner();
        Some(CollisionEvent {
            kind,
            pair,
            owner_a,
            owner_b,
            manifold,
        })
    }

    /// Deliver an event to both colliders' listeners. B sees the negated normal.
    fn dispatch(&mut self, event: &CollisionEvent) {
        let listener_of = |id: ColliderId| {
            self.colliders
                .get(id)
                .and_then(|entry| entry.collider.listener())
        };
        let (listener_a, listener_b) = (listener_of(event.pair.a), listener_of(event.pair.b));
        let (owner_a, owner_b) = (event.owner_a, event.owner_b);

        match (event.kind, event.manifold) {
            (CollisionEventKind::Enter, Some(m)) => {
                notify(&mut self.listeners, listener_a, |l| {
                    l.on_collision_enter(owner_a, owner_b, m.normal, m.penetration);
                });
                notify(&mut self.listeners, listener_b, |l| {
                    l.on_collision_enter(owner_b, owner_a, -m.normal, m.penetration);
                });
            }
            (CollisionEventKind::Stay, Some(m)) => {
                notify(&mut self.listeners, listener_a, |l| {
                    l.on_collision_stay(owner_a, owner_b, m.normal, m.penetration);
                });
                notify(&mut self.listeners, listener_b, |l| {
                    l.on_collision_stay(owner_b, owner_a, -m.normal, m.penetration);
                });
            }
            (CollisionEventKind::Exit, _) => {
                notify(&mut self.listeners, listener_a, |l| l.on_collision_exit(owner_a, owner_b));
                notify(&mut self.listeners, listener_b, |l| l.on_collision_exit(owner_b, owner_a));
            }
            (kind, None) => log::error!("{kind:?} event for {:?} has no manifold", event.pair),
        }
    }

    fn check_listener(&self, listener: ListenerId) -> PhysicsResult<()> {
        if self.listeners.contains_key(listener) {
            Ok(())
        } else {
            Err(PhysicsError::UnknownListener(listener))
        }
    }

    fn live_entry_mut(&mut self, id: ColliderId) -> PhysicsResult<&mut ColliderEntry> {
        self.colliders
            .get_mut(id)
            .filter(|entry| !entry.pending_removal)
            .ok_or(PhysicsError::UnknownCollider(id))
    }
}

/// Run one callback, isolating panics so the rest of the step still runs
fn notify(
    listeners: &mut ListenerMap,
    id: Option<ListenerId>,
    callback: impl FnOnce(&mut dyn CollisionListener),
) {
    let Some(id) = id else {
        return;
    };
    let Some(listener) = listeners.get_mut(id) else {
        log::warn!("Collision listener {id:?} no longer exists");
        return;
    };

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(listener.as_mut()))) {
        log::error!("Collision listener {id:?} panicked: {}", panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
