//! Shared harness for the integration suites: in-memory resource sources
//! and small assemblers for both bytecode languages.

#![allow(dead_code)]

use std::collections::HashMap;

use pantomime::prelude::*;

// =============================================================================
// In-memory resource sources
// =============================================================================

/// A `LogicSource` backed by a map of group images.
#[derive(Debug, Default, Clone)]
pub struct MapLogic {
    pub groups: HashMap<u16, Vec<u8>>,
    pub extension: Option<Vec<u8>>,
    pub fetches: usize,
}

impl LogicSource for MapLogic {
    fn group(&mut self, group: u16) -> Option<Vec<u8>> {
        self.fetches += 1;
        self.groups.get(&group).cloned()
    }

    fn extension(&mut self) -> Option<Vec<u8>> {
        self.extension.clone()
    }
}

/// A `ZoneSource` backed by a map of zone blobs.
#[derive(Debug, Default, Clone)]
pub struct MapZones {
    pub zones: HashMap<u16, ZoneBlobs>,
}

impl ZoneSource for MapZones {
    fn zone(&mut self, zone: ZoneId) -> Option<ZoneBlobs> {
        self.zones.get(&zone.index()).cloned()
    }
}

// =============================================================================
// Group images
// =============================================================================

/// One subroutine line for `build_group`.
#[derive(Debug, Clone)]
pub struct LineSpec {
    pub verb: i16,
    pub noun1: i16,
    pub noun2: i16,
    pub body: Vec<u8>,
}

impl LineSpec {
    /// An unconditional line (wildcards everywhere).
    pub fn always(body: Vec<u8>) -> Self {
        Self {
            verb: -1,
            noun1: -1,
            noun2: -1,
            body,
        }
    }

    /// A verb/noun-gated line.
    pub fn gated(verb: i16, noun1: i16, noun2: i16, body: Vec<u8>) -> Self {
        Self {
            verb,
            noun1,
            noun2,
            body,
        }
    }
}

/// Assemble a compiled group image in the registry's wire shape.
pub fn build_group(subs: &[(u16, Vec<LineSpec>)]) -> Vec<u8> {
    let mut w = CodeWriter::new();
    w.u16(subs.len() as u16);
    for (id, lines) in subs {
        w.u16(*id).u16(lines.len() as u16);
        for line in lines {
            w.i16(line.verb).i16(line.noun1).i16(line.noun2);
            w.u16(line.body.len() as u16);
            w.bytes(&line.body);
        }
    }
    w.finish()
}

// =============================================================================
// Logic stream assembler
// =============================================================================

/// Assembles one line's opcode stream with the default title's encodings.
#[derive(Debug, Default)]
pub struct LogicAsm {
    w: CodeWriter,
}

impl LogicAsm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_var(mut self, var: u16, value: i16) -> Self {
        self.w.op(LogicOp::SetVar as u8).u16(var).i16(value);
        self
    }

    pub fn add_var(mut self, var: u16, value: i16) -> Self {
        self.w.op(LogicOp::AddVar as u8).u16(var).i16(value);
        self
    }

    pub fn set_flag(mut self, flag: u16) -> Self {
        self.w.op(LogicOp::SetFlag as u8).u16(flag);
        self
    }

    pub fn clear_flag(mut self, flag: u16) -> Self {
        self.w.op(LogicOp::ClearFlag as u8).u16(flag);
        self
    }

    pub fn if_var_eq(mut self, var: u16, value: i16) -> Self {
        self.w.op(LogicOp::IfVarEq as u8).u16(var).i16(value);
        self
    }

    pub fn if_flag(mut self, flag: u16) -> Self {
        self.w.op(LogicOp::IfFlag as u8).u16(flag);
        self
    }

    pub fn if_parent(mut self, item: i16, parent: i16) -> Self {
        self.w.op(LogicOp::IfParent as u8).i16(item).i16(parent);
        self
    }

    pub fn set_parent(mut self, item: i16, parent: i16) -> Self {
        self.w.op(LogicOp::SetParent as u8).i16(item).i16(parent);
        self
    }

    pub fn set_class(mut self, item: i16, mask: u16) -> Self {
        self.w.op(LogicOp::SetClass as u8).i16(item).i16(mask as i16);
        self
    }

    pub fn start_anim(mut self, zone: u16, sprite: u16, entry: u16) -> Self {
        self.w
            .op(LogicOp::StartAnim as u8)
            .u16(zone)
            .u16(sprite)
            .u16(entry);
        self
    }

    pub fn stop_anim(mut self, zone: u16, sprite: u16) -> Self {
        self.w.op(LogicOp::StopAnim as u8).u16(zone).u16(sprite);
        self
    }

    pub fn send_sync(mut self, id: u16) -> Self {
        self.w.op(LogicOp::SendSync as u8).u16(id);
        self
    }

    pub fn call_sub(mut self, id: u16) -> Self {
        self.w.op(LogicOp::CallSub as u8).u16(id);
        self
    }

    pub fn for_class(mut self, mask: u16) -> Self {
        self.w.op(LogicOp::ForClass as u8).u16(mask);
        self
    }

    pub fn raw(mut self, byte: u8) -> Self {
        self.w.u8(byte);
        self
    }

    pub fn restart(mut self) -> Vec<u8> {
        self.w.op(LogicOp::Restart as u8);
        self.w.finish()
    }

    pub fn abort(mut self) -> Vec<u8> {
        self.w.op(LogicOp::Abort as u8);
        self.w.finish()
    }

    /// Close the stream with the success terminator.
    pub fn end(mut self) -> Vec<u8> {
        self.w.op(LogicOp::End as u8);
        self.w.finish()
    }
}

// =============================================================================
// Animation stream assembler
// =============================================================================

/// Assembles a zone's animation bytecode; `position` marks entry points.
#[derive(Debug, Default)]
pub struct AnimAsm {
    w: CodeWriter,
}

impl AnimAsm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current offset, used as a cursor entry point.
    pub fn position(&self) -> u16 {
        self.w.position() as u16
    }

    pub fn delay(mut self, ticks: u16) -> Self {
        self.w.op(AnimOp::Delay as u8).u16(ticks);
        self
    }

    pub fn set_image(mut self, image: u16) -> Self {
        self.w.op(AnimOp::SetImage as u8).u16(image);
        self
    }

    pub fn set_position(mut self, x: i16, y: i16) -> Self {
        self.w.op(AnimOp::SetPosition as u8).i16(x).i16(y);
        self
    }

    pub fn mv(mut self, dx: i16, dy: i16) -> Self {
        self.w.op(AnimOp::Move as u8).i16(dx).i16(dy);
        self
    }

    pub fn set_priority(mut self, priority: i16) -> Self {
        self.w.op(AnimOp::SetPriority as u8).i16(priority);
        self
    }

    pub fn draw(mut self, image: u16, attr: u8) -> Self {
        self.w.op(AnimOp::Draw as u8).u16(image).u8(attr);
        self
    }

    pub fn palette_cycle(mut self, first: u8, last: u8) -> Self {
        self.w.op(AnimOp::PaletteCycle as u8).u8(first).u8(last);
        self
    }

    pub fn if_flag(mut self, flag: u16) -> Self {
        self.w.op(AnimOp::IfFlag as u8).u16(flag);
        self
    }

    pub fn if_var_eq(mut self, var: u16, value: i16) -> Self {
        self.w.op(AnimOp::IfVarEq as u8).u16(var).i16(value);
        self
    }

    pub fn set_var(mut self, var: u16, value: i16) -> Self {
        self.w.op(AnimOp::SetVar as u8).u16(var).i16(value);
        self
    }

    pub fn add_var(mut self, var: u16, value: i16) -> Self {
        self.w.op(AnimOp::AddVar as u8).u16(var).i16(value);
        self
    }

    pub fn set_flag(mut self, flag: u16) -> Self {
        self.w.op(AnimOp::SetFlag as u8).u16(flag);
        self
    }

    pub fn clear_flag(mut self, flag: u16) -> Self {
        self.w.op(AnimOp::ClearFlag as u8).u16(flag);
        self
    }

    pub fn sync(mut self, id: u16) -> Self {
        self.w.op(AnimOp::Sync as u8).u16(id);
        self
    }

    pub fn wait_sync(mut self, id: u16) -> Self {
        self.w.op(AnimOp::WaitSync as u8).u16(id);
        self
    }

    pub fn wait_end(mut self, sprite: u16) -> Self {
        self.w.op(AnimOp::WaitEnd as u8).u16(sprite);
        self
    }

    pub fn repeat(mut self, count: u16) -> Self {
        self.w.op(AnimOp::Repeat as u8).u16(count);
        self
    }

    pub fn end_repeat(mut self) -> Self {
        self.w.op(AnimOp::EndRepeat as u8);
        self
    }

    pub fn halt(mut self) -> Self {
        self.w.op(AnimOp::Halt as u8);
        self
    }

    pub fn halt_other(mut self, zone: u16, sprite: u16) -> Self {
        self.w.op(AnimOp::HaltOther as u8).u16(zone).u16(sprite);
        self
    }

    pub fn reset(mut self) -> Self {
        self.w.op(AnimOp::Reset as u8);
        self
    }

    pub fn raw(mut self, byte: u8) -> Self {
        self.w.u8(byte);
        self
    }

    /// Close the current sequence with the terminator.
    pub fn stop(mut self) -> Self {
        self.w.op(AnimOp::Stop as u8);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.w.finish()
    }
}

// =============================================================================
// Image blobs and engines
// =============================================================================

/// Assemble an image blob of raw (un-run-length) descriptors.
pub fn image_blob(images: &[(u16, u16, Vec<u8>)]) -> Vec<u8> {
    let mut w = CodeWriter::new();
    w.u16(images.len() as u16);
    let mut offset = 2 + 4 * images.len() as u32;
    for (_, _, data) in images {
        w.u32(offset);
        offset += 6 + data.len() as u32;
    }
    for (width, height, data) in images {
        w.u16(*width).u16(*height).u8(0).u8(0);
        w.bytes(data);
    }
    w.finish()
}

/// A zone with animation code and no images.
pub fn code_zone(code: Vec<u8>) -> ZoneBlobs {
    ZoneBlobs {
        code,
        images: image_blob(&[]),
    }
}

/// Build an engine over in-memory sources with the default title.
pub fn engine(
    groups: Vec<(u16, Vec<u8>)>,
    ranges: Vec<GroupRange>,
    zones: Vec<(u16, ZoneBlobs)>,
) -> Engine<MapLogic, MapZones> {
    engine_with(TitleConfig::default_title(), groups, None, ranges, zones)
}

/// Build an engine with full control over the configuration.
pub fn engine_with(
    config: TitleConfig,
    groups: Vec<(u16, Vec<u8>)>,
    extension: Option<Vec<u8>>,
    ranges: Vec<GroupRange>,
    zones: Vec<(u16, ZoneBlobs)>,
) -> Engine<MapLogic, MapZones> {
    let logic = MapLogic {
        groups: groups.into_iter().collect(),
        extension,
        fetches: 0,
    };
    let zones = MapZones {
        zones: zones.into_iter().collect(),
    };
    Engine::new(config, ranges, logic, zones).expect("engine boot")
}

/// The whole-id-space range table for one group.
pub fn one_group_ranges(group: u16) -> Vec<GroupRange> {
    vec![GroupRange {
        min: SubroutineId::new(0),
        max: SubroutineId::new(999),
        group,
    }]
}
