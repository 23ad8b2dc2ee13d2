//! The continuation queue, the rendezvous tables, and the loop side table.
//!
//! All "concurrency" in the engine is simulated through these three
//! structures. Entries are plain vectors in registration order: a signal
//! releases all of its current waiters in that order, and a drained batch of
//! continuations resumes in queue order.

use rustc_hash::FxHashMap;

use pantomime_core::{AnimationCursor, CodeOffset, Continuation, EndWait, SpriteId, SyncId, SyncWait, ZoneId};

/// Deferred resumptions, ordered by registration.
#[derive(Debug, Clone, Default)]
pub struct ContinuationQueue {
    pending: Vec<Continuation>,
}

impl ContinuationQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending continuations.
    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Enqueue a continuation.
    pub fn push(&mut self, continuation: Continuation) {
        self.pending.push(continuation);
    }

    /// Remove and return every continuation whose ready tick has arrived,
    /// preserving queue order. Each entry is dequeued exactly once.
    pub fn take_due(&mut self, now: u64) -> Vec<AnimationCursor> {
        let mut due = Vec::new();
        self.pending.retain(|c| {
            if c.ready_tick <= now {
                due.push(c.cursor);
                false
            } else {
                true
            }
        });
        due
    }

    /// Drop every continuation belonging to a sprite.
    pub fn purge_sprite(&mut self, zone: ZoneId, sprite: SpriteId) {
        self.pending
            .retain(|c| !(c.cursor.zone == zone && c.cursor.sprite == sprite));
    }

    /// Keep only continuations accepted by `keep`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Continuation) -> bool,
    {
        self.pending.retain(|c| keep(c));
    }

    /// Iterate pending continuations in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &Continuation> {
        self.pending.iter()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// The two rendezvous tables: id-keyed sync waits and sprite-keyed end
/// waits. Signals are broadcasts: one signal releases every matching
/// waiter, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SyncTable {
    waits: Vec<SyncWait>,
    ends: Vec<EndWait>,
}

impl SyncTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a cursor on a rendezvous id.
    pub fn wait(&mut self, id: SyncId, cursor: AnimationCursor) {
        self.waits.push(SyncWait { id, cursor });
    }

    /// Broadcast a rendezvous id: move every matching waiter to the
    /// continuation queue with ready tick `now` and remove it here. Returns
    /// the number released; zero waiters is a no-op.
    pub fn signal(&mut self, id: SyncId, queue: &mut ContinuationQueue, now: u64) -> usize {
        let mut released = 0;
        self.waits.retain(|w| {
            if w.id == id {
                queue.push(Continuation {
                    ready_tick: now,
                    cursor: w.cursor,
                });
                released += 1;
                false
            } else {
                true
            }
        });
        released
    }

    /// Park a cursor until `target` in `zone` terminates.
    pub fn wait_end(&mut self, zone: ZoneId, target: SpriteId, cursor: AnimationCursor) {
        self.ends.push(EndWait {
            zone,
            target,
            cursor,
        });
    }

    /// Broadcast a sprite's termination to its end-waiters.
    pub fn signal_end(&mut self, zone: ZoneId, sprite: SpriteId, queue: &mut ContinuationQueue, now: u64) -> usize {
        let mut released = 0;
        self.ends.retain(|w| {
            if w.zone == zone && w.target == sprite {
                queue.push(Continuation {
                    ready_tick: now,
                    cursor: w.cursor,
                });
                released += 1;
                false
            } else {
                true
            }
        });
        released
    }

    /// Number of waiters currently parked on an id.
    pub fn waiter_count(&self, id: SyncId) -> usize {
        self.waits.iter().filter(|w| w.id == id).count()
    }

    /// Number of cursors parked on a sprite's termination.
    pub fn end_waiter_count(&self, zone: ZoneId, target: SpriteId) -> usize {
        self.ends
            .iter()
            .filter(|w| w.zone == zone && w.target == target)
            .count()
    }

    /// Drop every entry whose *parked cursor* belongs to the sprite. Entries
    /// of other cursors waiting on that sprite stay parked; a cursor never
    /// signalled stalls forever by design.
    pub fn purge_sprite(&mut self, zone: ZoneId, sprite: SpriteId) {
        self.waits
            .retain(|w| !(w.cursor.zone == zone && w.cursor.sprite == sprite));
        self.ends
            .retain(|w| !(w.cursor.zone == zone && w.cursor.sprite == sprite));
    }

    /// Keep only entries whose parked cursor is accepted by `keep`.
    pub fn retain_cursor<F>(&mut self, mut keep: F)
    where
        F: FnMut(&AnimationCursor) -> bool,
    {
        self.waits.retain(|w| keep(&w.cursor));
        self.ends.retain(|w| keep(&w.cursor));
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.waits.clear();
        self.ends.clear();
    }
}

/// One active `Repeat` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopFrame {
    /// Arena offset of the first body opcode, the return address.
    pub body: CodeOffset,
    /// Iterations left, counting the one in flight.
    pub remaining: u16,
}

/// Per-cursor loop-counter stacks, keyed by (zone, sprite).
///
/// This replaces the historical trick of rewriting the remaining-count into
/// the instruction stream itself; bytecode stays immutable and a suspended
/// cursor still resumes into the right iteration.
#[derive(Debug, Clone, Default)]
pub struct LoopTable {
    stacks: FxHashMap<(ZoneId, SpriteId), Vec<LoopFrame>>,
}

impl LoopTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The loop stack for a cursor, created on first use.
    pub fn stack_mut(&mut self, zone: ZoneId, sprite: SpriteId) -> &mut Vec<LoopFrame> {
        self.stacks.entry((zone, sprite)).or_default()
    }

    /// Drop a cursor's stack (sequence terminated or sprite halted).
    pub fn clear_cursor(&mut self, zone: ZoneId, sprite: SpriteId) {
        self.stacks.remove(&(zone, sprite));
    }

    /// Keep only stacks whose cursor key is accepted by `keep`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(ZoneId, SpriteId) -> bool,
    {
        self.stacks.retain(|(zone, sprite), _| keep(*zone, *sprite));
    }

    /// Iterate non-empty stacks for persistence.
    pub fn iter(&self) -> impl Iterator<Item = (ZoneId, SpriteId, &[LoopFrame])> {
        self.stacks
            .iter()
            .filter(|(_, frames)| !frames.is_empty())
            .map(|((zone, sprite), frames)| (*zone, *sprite, frames.as_slice()))
    }

    /// Install a restored stack.
    pub fn restore(&mut self, zone: ZoneId, sprite: SpriteId, frames: Vec<LoopFrame>) {
        self.stacks.insert((zone, sprite), frames);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.stacks.clear();
    }
}
