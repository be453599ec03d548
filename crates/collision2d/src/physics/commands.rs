//! Deferred world mutations
//!
//! Anything that cannot hold `&mut CollisionWorld` (listener callbacks, other
//! threads) queues commands through a [`CommandSender`]. The world drains the
//! queue at the start of its next step, in send order.

use crossbeam_channel::{Receiver, Sender};

use crate::foundation::collections::ColliderId;
use crate::foundation::math::Transform2D;
use crate::physics::collider::Collider;
use crate::physics::error::{PhysicsError, PhysicsResult};

/// A queued mutation of the collision world
#[derive(Debug, Clone)]
pub enum WorldCommand {
    /// Register a collider; find it afterwards with `collider_by_owner`
    AddCollider(Collider),
    /// Remove a collider, firing exits for its active contacts
    RemoveCollider(ColliderId),
    /// Move a collider's owner
    SetTransform(ColliderId, Transform2D),
}

/// Cloneable, `Send` handle for queueing world commands
#[derive(Debug, Clone)]
pub struct CommandSender {
    sender: Sender<WorldCommand>,
}

impl CommandSender {
    /// Queue a raw command
    pub fn send(&self, command: WorldCommand) -> PhysicsResult<()> {
        self.sender.send(command).map_err(|_| PhysicsError::WorldClosed)
    }

    /// Queue a collider registration
    pub fn add_collider(&self, collider: Collider) -> PhysicsResult<()> {
        self.send(WorldCommand::AddCollider(collider))
    }

    /// Queue a collider removal
    pub fn remove_collider(&self, id: ColliderId) -> PhysicsResult<()> {
        self.send(WorldCommand::RemoveCollider(id))
    }

    /// Queue a transform update
    pub fn set_transform(&self, id: ColliderId, transform: Transform2D) -> PhysicsResult<()> {
        self.send(WorldCommand::SetTransform(id, transform))
    }
}

/// Receiving end owned by the world
#[derive(Debug)]
pub(crate) struct CommandQueue {
    sender: Sender<WorldCommand>,
    receiver: Receiver<WorldCommand>,
}

impl CommandQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub(crate) fn sender(&self) -> CommandSender {
        CommandSender {
            sender: self.sender.clone(),
        }
    }

    /// Take everything queued so far without blocking
    pub(crate) fn drain(&self) -> Vec<WorldCommand> {
        self.receiver.try_iter().collect()
    }
}
