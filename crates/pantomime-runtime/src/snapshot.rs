//! Session persistence.
//!
//! A snapshot holds one record per pending continuation (zone, sprite,
//! zone-relative resume offset, and a ready tick *relative* to the session
//! elapsed-time accumulator, so saved delays survive real-world pauses), the
//! visible sprite list, the variable and flag arrays verbatim, and the loop
//! side table (the non-mutating loop redesign moves the counters out of the
//! bytecode, so they must ride along or a delayed loop body would restart
//! after restore).
//!
//! Rendezvous entries are deliberately **not** persisted, an inherited,
//! documented limitation. Cursors parked on a sync id at save time come back
//! unparked-never-to-resume; content that saves mid-rendezvous re-arms it by
//! signalling after load.
//!
//! The embedded fingerprint ties a snapshot to the title configuration that
//! wrote it; restoring against different opcode tables would misinterpret
//! every resume offset, so a mismatch is fatal.

use log::warn;
use serde::{Deserialize, Serialize};

use pantomime_core::{
    AnimationCursor, CodeOffset, Continuation, EngineError, EngineResult, SpriteId, VisibleSprite,
    ZoneId,
};

use crate::anim::LoopFrame;
use crate::loader::ZoneSource;
use crate::world::World;

/// One pending continuation, with the resume offset relative to its zone's
/// bytecode base and the ready tick relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedContinuation {
    /// Owning zone.
    pub zone: ZoneId,
    /// Sprite the cursor animates.
    pub sprite: SpriteId,
    /// Resume offset within the zone's bytecode.
    pub offset: u32,
    /// Ticks left until the cursor is runnable.
    pub delay: u64,
}

/// One saved loop frame, zone-relative like a continuation offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedLoopFrame {
    /// Body offset within the zone's bytecode.
    pub body: u32,
    /// Iterations left.
    pub remaining: u16,
}

/// One cursor's loop stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedLoopStack {
    /// Owning zone.
    pub zone: ZoneId,
    /// Sprite key.
    pub sprite: SpriteId,
    /// Innermost frame last.
    pub frames: Vec<SavedLoopFrame>,
}

/// Everything the core persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Title-configuration fingerprint of the writing engine.
    pub fingerprint: u64,
    /// Pending continuations in queue order.
    pub continuations: Vec<SavedContinuation>,
    /// The visible sprite list in draw order.
    pub sprites: Vec<VisibleSprite>,
    /// The global variable array, verbatim.
    pub variables: Vec<i16>,
    /// The flag bit array, packed words, verbatim.
    pub flags: Vec<u64>,
    /// Active loop stacks.
    pub loops: Vec<SavedLoopStack>,
}

/// Capture the persistable state of a world.
pub fn capture(w: &World) -> Snapshot {
    let zone_rel = |zone: ZoneId, at: CodeOffset| -> Option<u32> {
        match w.zone(zone) {
            Some(zd) => Some(at.index() - zd.code.index()),
            None => {
                warn!("{zone} vanished while saving; dropping its record");
                None
            }
        }
    };

    let continuations = w
        .queue
        .iter()
        .filter_map(|c| {
            Some(SavedContinuation {
                zone: c.cursor.zone,
                sprite: c.cursor.sprite,
                offset: zone_rel(c.cursor.zone, c.cursor.ip)?,
                delay: c.ready_tick.saturating_sub(w.tick),
            })
        })
        .collect();

    let loops = w
        .loops
        .iter()
        .filter_map(|(zone, sprite, frames)| {
            let frames = frames
                .iter()
                .map(|f| {
                    Some(SavedLoopFrame {
                        body: zone_rel(zone, f.body)?,
                        remaining: f.remaining,
                    })
                })
                .collect::<Option<Vec<_>>>()?;
            Some(SavedLoopStack {
                zone,
                sprite,
                frames,
            })
        })
        .collect();

    Snapshot {
        fingerprint: w.config.fingerprint(),
        continuations,
        sprites: w.sprites.iter().copied().collect(),
        variables: w.state.vars.raw().to_vec(),
        flags: w.state.flags.raw().to_vec(),
        loops,
    }
}

/// Restore a snapshot into a world, with the elapsed-tick accumulator back
/// at zero. Records for zones the source no longer knows are dropped with a
/// warning; a fingerprint mismatch is fatal.
pub fn apply<Z: ZoneSource>(
    snapshot: &Snapshot,
    w: &mut World,
    zone_src: &mut Z,
) -> EngineResult<()> {
    let engine = w.config.fingerprint();
    if snapshot.fingerprint != engine {
        return Err(EngineError::SnapshotMismatch {
            engine,
            snapshot: snapshot.fingerprint,
        });
    }

    w.tick = 0;
    w.sprites.clear();
    w.queue.clear();
    w.syncs.clear();
    w.loops.clear();
    w.state.vars.restore(&snapshot.variables);
    w.state.flags.restore(&snapshot.flags);

    for sprite in &snapshot.sprites {
        if w.ensure_zone(zone_src, sprite.zone)? {
            w.sprites.insert(*sprite);
        }
    }

    for saved in &snapshot.continuations {
        if !w.ensure_zone(zone_src, saved.zone)? {
            continue;
        }
        let zd = w.zone(saved.zone).expect("zone just ensured");
        if saved.offset >= zd.code_len {
            warn!("saved cursor outside {} bytecode; dropped", saved.zone);
            continue;
        }
        w.queue.push(Continuation {
            ready_tick: saved.delay,
            cursor: AnimationCursor::new(saved.zone, saved.sprite, zd.code.add(saved.offset)),
        });
    }

    for stack in &snapshot.loops {
        if !w.ensure_zone(zone_src, stack.zone)? {
            continue;
        }
        let zd = w.zone(stack.zone).expect("zone just ensured");
        let frames = stack
            .frames
            .iter()
            .map(|f| LoopFrame {
                body: zd.code.add(f.body),
                remaining: f.remaining,
            })
            .collect();
        w.loops.restore(stack.zone, stack.sprite, frames);
    }

    Ok(())
}
