//! The logic interpreter.
//!
//! Runs one subroutine: walk its line list, evaluate the verb/noun match
//! test per line, and execute a matched line's opcode stream to a
//! terminator. Operand encodings are read through the per-title shape table:
//! which and how wide the arguments are is title content, not part of the
//! opcode's identity.
//!
//! Class iteration is the interpreter's one cooperative suspension: a
//! `ForClass` opcode remembers the matched line and re-enters the scan from
//! it for the next qualifying item, one item per scheduler tick, so the
//! animation interpreter and the renderer run between subjects instead of
//! inside a tight loop.

use log::warn;

use pantomime_core::{
    AnimationCursor, CodeOffset, Continuation, EngineError, EngineResult, ItemId, LogicOp,
    Operand, SpriteId, SubroutineId, SyncId, VisibleSprite, ZoneId, ITEM_POINTER, ITEM_SUBJECT,
    MATCH_ANY, MATCH_CARRYOVER, OFFSET_NONE,
};
use pantomime_core::config::MAX_OPERANDS;

use crate::loader::{LogicSource, ZoneSource};
use crate::script::registry::{SubroutineRegistry, LINE_BODY};
use crate::world::{Selection, World};

/// How a subroutine run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every line was scanned (or the subroutine was unknown).
    Completed,
    /// An `Abort` terminator cut the remaining lines; propagated to callers.
    Aborted,
}

/// How one line's opcode stream ended.
enum ExecEnd {
    /// Terminator 0: success, keep scanning.
    Done,
    /// A condition failed; this line only is finished.
    NextLine,
    /// Restart the subroutine from its first line.
    Restart,
    /// Abort the remaining lines.
    Abort,
}

#[derive(Debug, Clone, Copy)]
struct LineCtx {
    line: CodeOffset,
    first: CodeOffset,
    gated: bool,
}

/// Suspended multi-subject iteration state.
#[derive(Debug, Clone, Copy)]
struct ClassRescan {
    line: CodeOffset,
    first: CodeOffset,
    gated: bool,
    mask: u16,
    last: ItemId,
    /// The remembered line sits in the swap region, so it dangles if the
    /// registry pages a different group in before the iteration drains.
    in_swap: bool,
    epoch: u64,
}

/// The logic bytecode executor.
#[derive(Debug, Default)]
pub struct LogicInterp {
    depth: usize,
    rescan: Option<ClassRescan>,
    subject: Option<ItemId>,
}

impl LogicInterp {
    /// Create an idle interpreter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a class rescan is waiting for its next subject.
    #[inline]
    pub fn rescan_pending(&self) -> bool {
        self.rescan.is_some()
    }

    /// The current class-rescan subject, if any.
    #[inline]
    pub fn subject(&self) -> Option<ItemId> {
        self.subject
    }

    /// Run a subroutine to completion (or abort). Nested runs through
    /// `CallSub` share the depth guard; exceeding it is fatal.
    pub fn run<L: LogicSource, Z: ZoneSource>(
        &mut self,
        w: &mut World,
        registry: &mut SubroutineRegistry,
        logic_src: &mut L,
        zone_src: &mut Z,
        id: SubroutineId,
    ) -> EngineResult<RunOutcome> {
        if self.depth >= w.config.recursion_limit {
            return Err(EngineError::RecursionLimit {
                limit: w.config.recursion_limit,
            });
        }
        let Some(sub) = registry.lookup(id, &mut w.store, logic_src)? else {
            warn!("run of unknown {id} is a no-op");
            return Ok(RunOutcome::Completed);
        };
        let Some(first) = sub.first_line else {
            return Ok(RunOutcome::Completed);
        };

        self.depth += 1;
        let outcome = self.scan(w, registry, logic_src, zone_src, first, first, id.index() == 0);
        self.depth -= 1;
        outcome
    }

    /// Drain one class-rescan subject: re-enter the scan at the remembered
    /// line for the next qualifying item. Reports whether a subject ran.
    pub fn step<L: LogicSource, Z: ZoneSource>(
        &mut self,
        w: &mut World,
        registry: &mut SubroutineRegistry,
        logic_src: &mut L,
        zone_src: &mut Z,
    ) -> EngineResult<bool> {
        let Some(rescan) = self.rescan else {
            return Ok(false);
        };
        if rescan.in_swap && rescan.epoch != registry.swap_epoch() {
            warn!("class iteration dropped: its program group was paged out");
            self.rescan = None;
            self.subject = None;
            return Ok(true);
        }
        match w.state.items.next_of_class(rescan.mask, Some(rescan.last)) {
            None => {
                self.rescan = None;
                self.subject = None;
            }
            Some(item) => {
                self.rescan = Some(ClassRescan {
                    last: item,
                    ..rescan
                });
                self.subject = Some(item);
                self.depth += 1;
                let outcome = self.scan(
                    w,
                    registry,
                    logic_src,
                    zone_src,
                    rescan.line,
                    rescan.first,
                    rescan.gated,
                );
                self.depth -= 1;
                outcome?;
            }
        }
        Ok(true)
    }

    fn scan<L: LogicSource, Z: ZoneSource>(
        &mut self,
        w: &mut World,
        registry: &mut SubroutineRegistry,
        logic_src: &mut L,
        zone_src: &mut Z,
        start: CodeOffset,
        first: CodeOffset,
        gated: bool,
    ) -> EngineResult<RunOutcome> {
        let mut line = Some(start);
        while let Some(off) = line {
            let (verb, noun1, noun2, next) = {
                let mut r = w.store.reader(off);
                let verb = r.read_i16()?;
                let noun1 = r.read_i16()?;
                let noun2 = r.read_i16()?;
                let next = r.read_u32()?;
                (verb, noun1, noun2, next)
            };
            let next = (next != OFFSET_NONE).then(|| CodeOffset::new(next));

            if !gated || matches(&w.selection, verb, noun1, noun2) {
                let ctx = LineCtx {
                    line: off,
                    first,
                    gated,
                };
                match self.exec_line(w, registry, logic_src, zone_src, ctx)? {
                    ExecEnd::Done | ExecEnd::NextLine => {}
                    ExecEnd::Restart => {
                        line = Some(first);
                        continue;
                    }
                    ExecEnd::Abort => return Ok(RunOutcome::Aborted),
                }
            }
            line = next;
        }
        Ok(RunOutcome::Completed)
    }

    fn exec_line<L: LogicSource, Z: ZoneSource>(
        &mut self,
        w: &mut World,
        registry: &mut SubroutineRegistry,
        logic_src: &mut L,
        zone_src: &mut Z,
        ctx: LineCtx,
    ) -> EngineResult<ExecEnd> {
        let mut pos = ctx.line.add(LINE_BODY);
        loop {
            let (op, args, next) = fetch(w, pos)?;
            pos = next;

            match op {
                LogicOp::End => return Ok(ExecEnd::Done),
                LogicOp::Restart => return Ok(ExecEnd::Restart),
                LogicOp::Abort => return Ok(ExecEnd::Abort),

                LogicOp::SetVar => w.state.vars.set(args[0] as u16, args[1] as i16),
                LogicOp::AddVar => {
                    let var = args[0] as u16;
                    let sum = w.state.vars.get(var).wrapping_add(args[1] as i16);
                    w.state.vars.set(var, sum);
                }
                LogicOp::SubVar => {
                    let var = args[0] as u16;
                    let diff = w.state.vars.get(var).wrapping_sub(args[1] as i16);
                    w.state.vars.set(var, diff);
                }
                LogicOp::CopyVar => {
                    let value = w.state.vars.get(args[1] as u16);
                    w.state.vars.set(args[0] as u16, value);
                }
                LogicOp::SetFlag => w.state.flags.set(args[0] as u16, true),
                LogicOp::ClearFlag => w.state.flags.set(args[0] as u16, false),

                LogicOp::IfVarEq => {
                    if w.state.vars.get(args[0] as u16) != args[1] as i16 {
                        return Ok(ExecEnd::NextLine);
                    }
                }
                LogicOp::IfVarGt => {
                    if w.state.vars.get(args[0] as u16) <= args[1] as i16 {
                        return Ok(ExecEnd::NextLine);
                    }
                }
                LogicOp::IfFlag => {
                    if !w.state.flags.get(args[0] as u16) {
                        return Ok(ExecEnd::NextLine);
                    }
                }
                LogicOp::IfParent => {
                    let item = self.resolve_item(w, args[0]);
                    let parent = self.resolve_item(w, args[1]);
                    let actual = item.and_then(|i| w.state.items.parent(i));
                    if item.is_none() || actual != parent {
                        return Ok(ExecEnd::NextLine);
                    }
                }

                LogicOp::SetParent => {
                    if let Some(item) = self.resolve_item(w, args[0]) {
                        let parent = self.resolve_item(w, args[1]);
                        w.state.items.set_parent(item, parent);
                    }
                }
                LogicOp::SetClass => {
                    if let Some(item) = self.resolve_item(w, args[0]) {
                        w.state.items.set_class(item, args[1] as u16);
                    }
                }
                LogicOp::ClearClass => {
                    if let Some(item) = self.resolve_item(w, args[0]) {
                        w.state.items.clear_class(item, args[1] as u16);
                    }
                }

                LogicOp::StartAnim => {
                    self.start_anim(
                        w,
                        zone_src,
                        ZoneId::new(args[0] as u16),
                        SpriteId::new(args[1] as u16),
                        args[2] as u16,
                    )?;
                }
                LogicOp::StopAnim => {
                    w.halt_sprite(ZoneId::new(args[0] as u16), SpriteId::new(args[1] as u16));
                }
                LogicOp::SendSync => {
                    w.signal(SyncId::new(args[0] as u16));
                }

                LogicOp::CallSub => {
                    let callee = SubroutineId::new(args[0] as u16);
                    if let RunOutcome::Aborted =
                        self.run(w, registry, logic_src, zone_src, callee)?
                    {
                        return Ok(ExecEnd::Abort);
                    }
                }

                LogicOp::ForClass => {
                    let mask = args[0] as u16;
                    match self.rescan {
                        // Re-entry pass for the current subject: keep going.
                        Some(r) if r.line == ctx.line => {}
                        Some(_) => {
                            warn!("nested class iteration ignored");
                            return Ok(ExecEnd::NextLine);
                        }
                        None => match w.state.items.next_of_class(mask, None) {
                            None => return Ok(ExecEnd::NextLine),
                            Some(item) => {
                                self.rescan = Some(ClassRescan {
                                    line: ctx.line,
                                    first: ctx.first,
                                    gated: ctx.gated,
                                    mask,
                                    last: item,
                                    in_swap: w.store.in_swap(ctx.line),
                                    epoch: registry.swap_epoch(),
                                });
                                self.subject = Some(item);
                            }
                        },
                    }
                }
            }
        }
    }

    fn start_anim<Z: ZoneSource>(
        &mut self,
        w: &mut World,
        zone_src: &mut Z,
        zone: ZoneId,
        sprite: SpriteId,
        entry: u16,
    ) -> EngineResult<()> {
        if !w.ensure_zone(zone_src, zone)? {
            return Ok(());
        }
        let zd = w.zone(zone).expect("zone just ensured");
        if entry as u32 >= zd.code_len {
            warn!("animation entry {entry} outside {zone} bytecode; ignored");
            return Ok(());
        }
        w.purge_cursor(zone, sprite);
        w.sprites.insert(VisibleSprite::new(sprite, zone));
        w.queue.push(Continuation {
            ready_tick: w.tick,
            cursor: AnimationCursor::new(zone, sprite, zd.code.add(entry as u32)),
        });
        Ok(())
    }

    /// Resolve an item operand. Non-negative values are ids; negative values
    /// are the ambient sentinels. Unknown ids resolve to `None` (logged by
    /// the graph).
    fn resolve_item(&self, w: &World, value: i32) -> Option<ItemId> {
        if value >= 0 {
            let id = ItemId::new(value as u16);
            return w.state.items.get(id).map(|_| id);
        }
        match value as i16 {
            ITEM_POINTER => w.selection.pointer,
            ITEM_SUBJECT => self.subject,
            _ => None,
        }
    }
}

/// The verb/noun match test. −1 is a wildcard; −2 matches only while the
/// ambient selection is flagged as carried over from a previous dispatch.
fn matches(selection: &Selection, verb: i16, noun1: i16, noun2: i16) -> bool {
    fn one(pattern: i16, actual: i16, carryover: bool) -> bool {
        match pattern {
            MATCH_ANY => true,
            MATCH_CARRYOVER => carryover,
            p => p == actual,
        }
    }
    one(verb, selection.verb, false)
        && one(noun1, selection.noun1, selection.carryover)
        && one(noun2, selection.noun2, selection.carryover)
}

/// Decode one logic instruction at `pos` through the shape table.
fn fetch(w: &World, pos: CodeOffset) -> EngineResult<(LogicOp, [i32; MAX_OPERANDS], CodeOffset)> {
    let mut r = w.store.reader(pos);
    let byte = r.read_u8()?;
    let malformed = EngineError::MalformedOpcode {
        opcode: byte,
        offset: pos,
    };
    let op = LogicOp::try_from(byte).map_err(|_| malformed.clone())?;
    let shape = w.config.logic_shapes.lookup(byte).ok_or(malformed)?;

    let mut args = [0i32; MAX_OPERANDS];
    for (slot, operand) in args.iter_mut().zip(shape.iter()) {
        *slot = match operand {
            Operand::Byte => r.read_u8()? as i32,
            Operand::Word => r.read_i16()? as i32,
            Operand::VarRef => r.read_u16()? as i32,
            Operand::ItemRef => r.read_i16()? as i32,
        };
    }
    Ok((op, args, r.offset()))
}
