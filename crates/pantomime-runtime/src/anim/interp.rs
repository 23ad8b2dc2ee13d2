//! The animation interpreter.
//!
//! [`AnimInterp::resume`] executes one cursor to a suspend point or to the
//! terminator. A cursor is its entire suspension state; suspending means
//! recording `(ready, cursor)` in the continuation queue or a rendezvous
//! table and returning [`Resumed::Suspended`]; there is no host call stack
//! to unwind. The suspension points are exactly `Delay`, `WaitSync` and
//! `WaitEnd`.
//!
//! Condition opcodes never suspend; a failed condition skips exactly one
//! following opcode using the per-title length table (encodings vary by
//! title, so the width cannot be derived from the opcode identity alone).

use bumpalo::Bump;
use log::warn;

use pantomime_core::{
    AnimOp, AnimationCursor, CodeOffset, Continuation, EngineError, EngineResult, ImageId,
    SpriteFlags, SpriteId, SyncId, ZoneId,
};

use crate::anim::queue::LoopFrame;
use crate::gfx;
use crate::world::World;

/// What a resumed cursor did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumed {
    /// The cursor parked itself; a queue or rendezvous entry holds it.
    Suspended,
    /// The sequence finished (or its sprite was halted). Nothing holds the
    /// cursor anymore.
    Terminated,
}

/// One decoded instruction: the opcode plus up to three operands, widened.
struct Fetched {
    op: AnimOp,
    args: [i32; 3],
    next: CodeOffset,
}

/// The animation bytecode executor.
#[derive(Debug, Default)]
pub struct AnimInterp {
    scratch: Bump,
}

impl AnimInterp {
    /// Create an interpreter with an empty scratch arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute `cursor` until it suspends or terminates.
    pub fn resume(&mut self, w: &mut World, cursor: AnimationCursor) -> EngineResult<Resumed> {
        let zone = cursor.zone;
        let sprite = cursor.sprite;
        let mut pos = cursor.ip;

        loop {
            let Fetched { op, args, next } = fetch(w, pos)?;

            match op {
                AnimOp::Stop => {
                    w.loops.clear_cursor(zone, sprite);
                    w.signal_end(zone, sprite);
                    return Ok(Resumed::Terminated);
                }

                // ---- suspension points ------------------------------------
                AnimOp::Delay => {
                    w.queue.push(Continuation {
                        ready_tick: w.tick + args[0] as u64,
                        cursor: AnimationCursor::new(zone, sprite, next),
                    });
                    return Ok(Resumed::Suspended);
                }
                AnimOp::WaitSync => {
                    let id = SyncId::new(args[0] as u16);
                    w.syncs.wait(id, AnimationCursor::new(zone, sprite, next));
                    return Ok(Resumed::Suspended);
                }
                AnimOp::WaitEnd => {
                    let target = SpriteId::new(args[0] as u16);
                    if w.sprites.find(target, zone).is_some() {
                        w.syncs
                            .wait_end(zone, target, AnimationCursor::new(zone, sprite, next));
                        return Ok(Resumed::Suspended);
                    }
                    // Nothing to wait for; fall through.
                    pos = next;
                }
                AnimOp::Sync => {
                    w.signal(SyncId::new(args[0] as u16));
                    pos = next;
                }

                // ---- conditions -------------------------------------------
                AnimOp::IfFlag => {
                    pos = if w.state.flags.get(args[0] as u16) {
                        next
                    } else {
                        skip_one(w, next)?
                    };
                }
                AnimOp::IfVarEq => {
                    pos = if w.state.vars.get(args[0] as u16) == args[1] as i16 {
                        next
                    } else {
                        skip_one(w, next)?
                    };
                }
                AnimOp::IfNearPoint => {
                    let near = w.sprites.find(sprite, zone).is_some_and(|s| {
                        let dx = (s.x as i32 - args[0]).abs();
                        let dy = (s.y as i32 - args[1]).abs();
                        dx.max(dy) <= args[2]
                    });
                    pos = if near { next } else { skip_one(w, next)? };
                }

                // ---- shared state -----------------------------------------
                AnimOp::SetVar => {
                    w.state.vars.set(args[0] as u16, args[1] as i16);
                    pos = next;
                }
                AnimOp::AddVar => {
                    let var = args[0] as u16;
                    let sum = w.state.vars.get(var).wrapping_add(args[1] as i16);
                    w.state.vars.set(var, sum);
                    pos = next;
                }
                AnimOp::SetFlag => {
                    w.state.flags.set(args[0] as u16, true);
                    pos = next;
                }
                AnimOp::ClearFlag => {
                    w.state.flags.set(args[0] as u16, false);
                    pos = next;
                }

                // ---- sprite lifecycle -------------------------------------
                AnimOp::SetImage => {
                    let image = ImageId::new(args[0] as u16);
                    let size = w.zone(zone).and_then(|zd| gfx::image_size(&w.store, zd, image));
                    let found = w.sprites.update(sprite, zone, |s| {
                        s.image = image;
                        if let Some((width, height)) = size {
                            s.width = width;
                            s.height = height;
                        }
                    });
                    if !found {
                        warn!("image swap on unregistered {sprite} in {zone}");
                    }
                    pos = next;
                }
                AnimOp::SetPosition => {
                    if !w.sprites.update(sprite, zone, |s| {
                        s.x = args[0] as i16;
                        s.y = args[1] as i16;
                    }) {
                        warn!("reposition of unregistered {sprite} in {zone}");
                    }
                    pos = next;
                }
                AnimOp::Move => {
                    if !w.sprites.update(sprite, zone, |s| {
                        s.x = s.x.saturating_add(args[0] as i16);
                        s.y = s.y.saturating_add(args[1] as i16);
                    }) {
                        warn!("move of unregistered {sprite} in {zone}");
                    }
                    pos = next;
                }
                AnimOp::SetPriority => {
                    if !w.sprites.update(sprite, zone, |s| {
                        if args[0] >= 0 {
                            s.priority = args[0] as i16;
                            s.flags.insert(SpriteFlags::FIXED_PRIORITY);
                        } else {
                            s.flags.remove(SpriteFlags::FIXED_PRIORITY);
                        }
                    }) {
                        warn!("priority change on unregistered {sprite} in {zone}");
                    }
                    pos = next;
                }
                AnimOp::Draw => {
                    self.draw(w, zone, sprite, args[0] as u16, args[1] as u8);
                    pos = next;
                }
                AnimOp::PaletteCycle => {
                    w.palette.cycle(args[0] as u8, args[1] as u8);
                    pos = next;
                }
                AnimOp::Halt => {
                    w.halt_sprite(zone, sprite);
                    return Ok(Resumed::Terminated);
                }
                AnimOp::HaltOther => {
                    let other_zone = ZoneId::new(args[0] as u16);
                    let other = SpriteId::new(args[1] as u16);
                    w.halt_sprite(other_zone, other);
                    if other_zone == zone && other == sprite {
                        return Ok(Resumed::Terminated);
                    }
                    pos = next;
                }
                AnimOp::Reset => {
                    w.reset_animation();
                    pos = next;
                }

                // ---- control ----------------------------------------------
                AnimOp::Repeat => {
                    let count = args[0] as u16;
                    if count == 0 {
                        pos = skip_repeat_body(w, next)?;
                    } else {
                        w.loops.stack_mut(zone, sprite).push(LoopFrame {
                            body: next,
                            remaining: count,
                        });
                        pos = next;
                    }
                }
                AnimOp::EndRepeat => {
                    let stack = w.loops.stack_mut(zone, sprite);
                    match stack.last_mut() {
                        Some(frame) => {
                            frame.remaining -= 1;
                            if frame.remaining > 0 {
                                pos = frame.body;
                            } else {
                                stack.pop();
                                pos = next;
                            }
                        }
                        None => {
                            warn!("unbalanced loop close for {sprite} in {zone}");
                            pos = next;
                        }
                    }
                }
                AnimOp::Jump => {
                    let target = next.index() as i64 + args[0] as i64;
                    if target < 0 {
                        return Err(EngineError::TruncatedStream { offset: next });
                    }
                    pos = CodeOffset::new(target as u32);
                }
            }
        }
    }

    fn draw(&mut self, w: &mut World, zone: ZoneId, sprite: SpriteId, image: u16, attr: u8) {
        let image = ImageId::new(image);
        let Some(zd) = w.zone(zone) else {
            warn!("draw into unloaded {zone} ignored");
            return;
        };
        let size = gfx::image_size(&w.store, zd, image);
        let found = w.sprites.update(sprite, zone, |s| {
            s.image = image;
            s.flags.set(SpriteFlags::MIRRORED, attr & 0x01 != 0);
            s.flags.set(SpriteFlags::FLIPPED, attr & 0x02 != 0);
            if let Some((width, height)) = size {
                s.width = width;
                s.height = height;
            }
        });
        if !found {
            warn!("draw for unregistered {sprite} in {zone}");
            return;
        }
        let World {
            store,
            sprites,
            surface,
            ..
        } = w;
        if let Some(record) = sprites.find(sprite, zone) {
            gfx::render_sprite(store, zd, surface, &self.scratch, record);
        }
        self.scratch.reset();
    }
}

/// Decode one instruction at `pos`. A byte outside the instruction set is
/// the fatal malformed class.
fn fetch(w: &World, pos: CodeOffset) -> EngineResult<Fetched> {
    let mut r = w.store.reader(pos);
    let byte = r.read_u8()?;
    let op = AnimOp::try_from(byte).map_err(|_| EngineError::MalformedOpcode {
        opcode: byte,
        offset: pos,
    })?;

    let mut args = [0i32; 3];
    match op {
        AnimOp::Stop | AnimOp::EndRepeat | AnimOp::Halt | AnimOp::Reset => {}
        AnimOp::Delay
        | AnimOp::SetImage
        | AnimOp::Repeat
        | AnimOp::Sync
        | AnimOp::WaitSync
        | AnimOp::WaitEnd
        | AnimOp::IfFlag
        | AnimOp::SetFlag
        | AnimOp::ClearFlag => {
            args[0] = r.read_u16()? as i32;
        }
        AnimOp::SetPriority | AnimOp::Jump => {
            args[0] = r.read_i16()? as i32;
        }
        AnimOp::SetPosition | AnimOp::Move => {
            args[0] = r.read_i16()? as i32;
            args[1] = r.read_i16()? as i32;
        }
        AnimOp::IfVarEq | AnimOp::SetVar | AnimOp::AddVar => {
            args[0] = r.read_u16()? as i32;
            args[1] = r.read_i16()? as i32;
        }
        AnimOp::IfNearPoint => {
            args[0] = r.read_i16()? as i32;
            args[1] = r.read_i16()? as i32;
            args[2] = r.read_u16()? as i32;
        }
        AnimOp::Draw => {
            args[0] = r.read_u16()? as i32;
            args[1] = r.read_u8()? as i32;
        }
        AnimOp::PaletteCycle => {
            args[0] = r.read_u8()? as i32;
            args[1] = r.read_u8()? as i32;
        }
        AnimOp::HaltOther => {
            args[0] = r.read_u16()? as i32;
            args[1] = r.read_u16()? as i32;
        }
    }

    Ok(Fetched {
        op,
        args,
        next: r.offset(),
    })
}

/// Skip exactly one opcode (a failed condition's successor) using the
/// per-title length table.
fn skip_one(w: &World, pos: CodeOffset) -> EngineResult<CodeOffset> {
    let mut r = w.store.reader(pos);
    let byte = r.read_u8()?;
    let len = w
        .config
        .anim_lengths
        .lookup(byte)
        .ok_or(EngineError::MalformedOpcode {
            opcode: byte,
            offset: pos,
        })?;
    r.skip(len)?;
    Ok(r.offset())
}

/// Scan forward past the matching `EndRepeat`, honoring nesting. Used for a
/// zero-iteration `Repeat`.
fn skip_repeat_body(w: &World, pos: CodeOffset) -> EngineResult<CodeOffset> {
    let mut r = w.store.reader(pos);
    let mut depth = 1usize;
    loop {
        let at = r.offset();
        let byte = r.read_u8()?;
        let len = w
            .config
            .anim_lengths
            .lookup(byte)
            .ok_or(EngineError::MalformedOpcode {
                opcode: byte,
                offset: at,
            })?;
        r.skip(len)?;
        match AnimOp::try_from(byte) {
            Ok(AnimOp::Repeat) => depth += 1,
            Ok(AnimOp::EndRepeat) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(r.offset());
                }
            }
            _ => {}
        }
    }
}
