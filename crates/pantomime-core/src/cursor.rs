//! Suspension records for the animation interpreter.
//!
//! A cursor is the *entire* suspension state: the animation bytecode has no
//! intra-sequence call nesting, so instruction pointer plus sprite/zone
//! context fully represents "where to resume". No host call stack, no fibers.

use serde::{Deserialize, Serialize};

use crate::ids::{CodeOffset, SpriteId, SyncId, ZoneId};

/// The resumption unit: an instruction pointer into the animation bytecode
/// plus the sprite/zone it animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationCursor {
    /// Owning zone.
    pub zone: ZoneId,
    /// Sprite this cursor animates.
    pub sprite: SpriteId,
    /// Arena offset of the next opcode.
    pub ip: CodeOffset,
}

impl AnimationCursor {
    /// Build a cursor.
    pub fn new(zone: ZoneId, sprite: SpriteId, ip: CodeOffset) -> Self {
        Self { zone, sprite, ip }
    }
}

/// A deferred resumption: run `cursor` once `ready_tick` is reached.
/// Dequeued exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    /// Scheduler tick at which the cursor becomes runnable.
    pub ready_tick: u64,
    /// The cursor to resume.
    pub cursor: AnimationCursor,
}

/// A cursor parked on a rendezvous id. Removed the instant a matching signal
/// is issued; one signal releases all waiters on the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWait {
    /// The rendezvous id.
    pub id: SyncId,
    /// The parked cursor.
    pub cursor: AnimationCursor,
}

/// A cursor parked until another sprite's sequence terminates. The same
/// rendezvous mechanism as [`SyncWait`], keyed by the terminating cursor's
/// sprite id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndWait {
    /// Zone of the awaited sprite.
    pub zone: ZoneId,
    /// The awaited sprite.
    pub target: SpriteId,
    /// The parked cursor.
    pub cursor: AnimationCursor,
}
