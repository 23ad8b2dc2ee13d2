//! Per-title configuration.
//!
//! The opcode-operand-shape table and the opcode-length table are external
//! content, not VM logic: the same opcode id reads different encodings in
//! different compiled titles. They are loaded here as plain data. A default
//! title is built in so the engine is runnable and testable without external
//! content.
//!
//! [`TitleConfig::fingerprint`] hashes the tables and limits; snapshots embed
//! the fingerprint so restoring against a different title build fails cleanly
//! instead of misinterpreting resume offsets.

use xxhash_rust::xxh64::xxh64;

use crate::ids::SpriteId;
use crate::opcodes::{AnimOp, LogicOp};

/// Shape of one logic-opcode operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Unsigned byte.
    Byte,
    /// Signed 16-bit word.
    Word,
    /// Variable index, 16 bits.
    VarRef,
    /// Item reference, signed 16 bits (negative values are sentinels).
    ItemRef,
}

impl Operand {
    /// Encoded width in bytes.
    #[inline]
    pub fn width(self) -> usize {
        match self {
            Operand::Byte => 1,
            Operand::Word | Operand::VarRef | Operand::ItemRef => 2,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Operand::Byte => 0,
            Operand::Word => 1,
            Operand::VarRef => 2,
            Operand::ItemRef => 3,
        }
    }
}

/// Most operands any logic opcode takes.
pub const MAX_OPERANDS: usize = 4;

/// Per-title operand shapes for the logic instruction set, indexed by opcode
/// byte. A `None` entry makes that opcode the fatal malformed class.
#[derive(Debug, Clone)]
pub struct LogicShapeTable {
    shapes: Vec<Option<Vec<Operand>>>,
}

impl LogicShapeTable {
    /// Build a table from `(opcode byte, operand shapes)` entries.
    pub fn from_entries(entries: &[(u8, &[Operand])]) -> Self {
        let top = entries.iter().map(|(op, _)| *op as usize).max().unwrap_or(0);
        let mut shapes = vec![None; top + 1];
        for (op, shape) in entries {
            shapes[*op as usize] = Some(shape.to_vec());
        }
        Self { shapes }
    }

    /// Look up the shape for an opcode byte.
    #[inline]
    pub fn lookup(&self, opcode: u8) -> Option<&[Operand]> {
        self.shapes
            .get(opcode as usize)
            .and_then(|s| s.as_deref())
    }

    fn hash_into(&self, buf: &mut Vec<u8>) {
        for (op, shape) in self.shapes.iter().enumerate() {
            if let Some(shape) = shape {
                buf.push(op as u8);
                buf.push(shape.len() as u8);
                buf.extend(shape.iter().map(|o| o.tag()));
            }
        }
    }
}

/// Per-title operand byte lengths for the animation instruction set, indexed
/// by opcode byte. Used for skip-on-false and for scanning over a `Repeat`
/// body; a `None` entry makes that opcode the fatal malformed class.
#[derive(Debug, Clone)]
pub struct AnimLengthTable {
    lengths: Vec<Option<u8>>,
}

impl AnimLengthTable {
    /// Build a table from `(opcode byte, operand length)` entries.
    pub fn from_entries(entries: &[(u8, u8)]) -> Self {
        let top = entries.iter().map(|(op, _)| *op as usize).max().unwrap_or(0);
        let mut lengths = vec![None; top + 1];
        for (op, len) in entries {
            lengths[*op as usize] = Some(*len);
        }
        Self { lengths }
    }

    /// Operand byte length for an opcode byte, excluding the opcode itself.
    #[inline]
    pub fn lookup(&self, opcode: u8) -> Option<usize> {
        self.lengths
            .get(opcode as usize)
            .and_then(|l| l.map(usize::from))
    }

    fn hash_into(&self, buf: &mut Vec<u8>) {
        for (op, len) in self.lengths.iter().enumerate() {
            if let Some(len) = len {
                buf.push(op as u8);
                buf.push(*len);
            }
        }
    }
}

/// Everything that varies per compiled title.
#[derive(Debug, Clone)]
pub struct TitleConfig {
    /// Bytecode arena budget in bytes.
    pub arena_capacity: usize,
    /// Nested logic `run()` depth limit.
    pub recursion_limit: usize,
    /// Size of the global variable array.
    pub variable_count: usize,
    /// Size of the flag bit array.
    pub flag_count: usize,
    /// Number of items in the item graph.
    pub item_count: usize,
    /// Frame surface width in pixels.
    pub surface_width: u16,
    /// Frame surface height in pixels.
    pub surface_height: u16,
    /// Sprites spared by the global reset opcode (UI overlays and the like).
    pub persistent_sprites: Vec<SpriteId>,
    /// Logic operand shapes.
    pub logic_shapes: LogicShapeTable,
    /// Animation opcode lengths.
    pub anim_lengths: AnimLengthTable,
}

impl TitleConfig {
    /// The engine's built-in title: the default tables plus modest limits.
    pub fn default_title() -> Self {
        Self {
            arena_capacity: 128 * 1024,
            recursion_limit: 64,
            variable_count: 256,
            flag_count: 256,
            item_count: 128,
            surface_width: 320,
            surface_height: 200,
            persistent_sprites: Vec::new(),
            logic_shapes: default_logic_shapes(),
            anim_lengths: default_anim_lengths(),
        }
    }

    /// Hash of the tables and limits that interpret bytecode. Two configs
    /// with the same fingerprint decode streams identically.
    pub fn fingerprint(&self) -> u64 {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&(self.variable_count as u32).to_be_bytes());
        buf.extend_from_slice(&(self.flag_count as u32).to_be_bytes());
        buf.extend_from_slice(&(self.item_count as u32).to_be_bytes());
        self.logic_shapes.hash_into(&mut buf);
        self.anim_lengths.hash_into(&mut buf);
        xxh64(&buf, 0)
    }
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self::default_title()
    }
}

/// Operand shapes for the built-in title.
pub fn default_logic_shapes() -> LogicShapeTable {
    use Operand::{ItemRef, VarRef, Word};
    LogicShapeTable::from_entries(&[
        (LogicOp::End as u8, &[]),
        (LogicOp::SetVar as u8, &[VarRef, Word]),
        (LogicOp::AddVar as u8, &[VarRef, Word]),
        (LogicOp::SubVar as u8, &[VarRef, Word]),
        (LogicOp::CopyVar as u8, &[VarRef, VarRef]),
        (LogicOp::SetFlag as u8, &[Word]),
        (LogicOp::ClearFlag as u8, &[Word]),
        (LogicOp::IfVarEq as u8, &[VarRef, Word]),
        (LogicOp::IfVarGt as u8, &[VarRef, Word]),
        (LogicOp::IfFlag as u8, &[Word]),
        (LogicOp::IfParent as u8, &[ItemRef, ItemRef]),
        (LogicOp::SetParent as u8, &[ItemRef, ItemRef]),
        (LogicOp::SetClass as u8, &[ItemRef, Word]),
        (LogicOp::ClearClass as u8, &[ItemRef, Word]),
        (LogicOp::StartAnim as u8, &[Word, Word, Word]),
        (LogicOp::StopAnim as u8, &[Word, Word]),
        (LogicOp::SendSync as u8, &[Word]),
        (LogicOp::CallSub as u8, &[Word]),
        (LogicOp::ForClass as u8, &[Word]),
        (LogicOp::Restart as u8, &[]),
        (LogicOp::Abort as u8, &[]),
    ])
}

/// Operand lengths for the built-in title.
pub fn default_anim_lengths() -> AnimLengthTable {
    AnimLengthTable::from_entries(&[
        (AnimOp::Stop as u8, 0),
        (AnimOp::Delay as u8, 2),
        (AnimOp::SetImage as u8, 2),
        (AnimOp::SetPosition as u8, 4),
        (AnimOp::Move as u8, 4),
        (AnimOp::SetPriority as u8, 2),
        (AnimOp::Draw as u8, 3),
        (AnimOp::PaletteCycle as u8, 2),
        (AnimOp::IfFlag as u8, 2),
        (AnimOp::IfVarEq as u8, 4),
        (AnimOp::IfNearPoint as u8, 6),
        (AnimOp::SetVar as u8, 4),
        (AnimOp::AddVar as u8, 4),
        (AnimOp::SetFlag as u8, 2),
        (AnimOp::ClearFlag as u8, 2),
        (AnimOp::Sync as u8, 2),
        (AnimOp::WaitSync as u8, 2),
        (AnimOp::WaitEnd as u8, 2),
        (AnimOp::Repeat as u8, 2),
        (AnimOp::EndRepeat as u8, 0),
        (AnimOp::Jump as u8, 2),
        (AnimOp::Halt as u8, 0),
        (AnimOp::HaltOther as u8, 4),
        (AnimOp::Reset as u8, 0),
    ])
}
