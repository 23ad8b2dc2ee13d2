//! The two instruction sets.
//!
//! Each opcode is a single byte with big-endian operands following inline.
//! The *identity* of an opcode is fixed here; the *encoding* of its operands
//! is title data (see [`crate::config`]): compiled titles disagree about
//! operand widths and counts, so the logic interpreter reads operands through
//! a per-title shape table and the animation interpreter skips a failed
//! condition's successor through a per-title length table. A byte with no
//! enum value (or no table entry) is the fatal malformed-stream class.

use num_enum::TryFromPrimitive;

/// Logic-program opcodes.
///
/// A line's stream executes to one of the terminators: [`LogicOp::End`]
/// (success, scanning continues with the next line), [`LogicOp::Restart`]
/// (restart the subroutine from its first line), or [`LogicOp::Abort`]
/// (abort the remaining lines, propagated to the caller). Condition opcodes
/// that fail end the current line only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum LogicOp {
    /// Terminator: the line succeeded.
    End = 0,
    /// `SetVar var, value`
    SetVar,
    /// `AddVar var, value`
    AddVar,
    /// `SubVar var, value`
    SubVar,
    /// `CopyVar dst, src`
    CopyVar,
    /// `SetFlag flag`
    SetFlag,
    /// `ClearFlag flag`
    ClearFlag,
    /// Condition: variable equals value.
    IfVarEq,
    /// Condition: variable greater than value.
    IfVarGt,
    /// Condition: flag is set.
    IfFlag,
    /// Condition: item's parent is the given item.
    IfParent,
    /// `SetParent item, parent` moves an item in the graph; parent -1 detaches.
    SetParent,
    /// `SetClass item, mask` ors the mask into the item's class bits.
    SetClass,
    /// `ClearClass item, mask`
    ClearClass,
    /// `StartAnim zone, sprite, entry`: create a sprite and enqueue a cursor.
    StartAnim,
    /// `StopAnim zone, sprite`: halt a sprite and purge its pending entries.
    StopAnim,
    /// `SendSync id`: broadcast-release every cursor waiting on the id.
    SendSync,
    /// `CallSub id`: run another subroutine; depth-guarded.
    CallSub,
    /// `ForClass mask`: repeat the rest of the subroutine for every
    /// remaining item carrying the mask, one item per scheduler tick.
    ForClass,
    /// Terminator: restart this subroutine from the top.
    Restart,
    /// Terminator: abort the remaining lines.
    Abort,
}

/// Animation-program opcodes.
///
/// [`AnimOp::Stop`] terminates the cursor and releases end-waiters keyed by
/// its sprite. `Delay`, `WaitSync` and `WaitEnd` are the suspension points;
/// everything else runs to completion within the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum AnimOp {
    /// Terminator: the sequence is finished.
    Stop = 0,
    /// `Delay n`: park the cursor for n ticks.
    Delay,
    /// `SetImage image`: swap the sprite's image handle.
    SetImage,
    /// `SetPosition x, y`
    SetPosition,
    /// `Move dx, dy`
    Move,
    /// `SetPriority p`: p >= 0 pins the draw priority; -1 returns the sprite
    /// to dynamic (effective-y) ordering.
    SetPriority,
    /// `Draw image, attr`: decode, transform and composite now. Attr bit 0
    /// mirrors, bit 1 flips; both persist on the sprite record.
    Draw,
    /// `PaletteCycle first, last`: rotate a palette range by one entry.
    PaletteCycle,
    /// Condition: flag is set.
    IfFlag,
    /// Condition: variable equals value.
    IfVarEq,
    /// Condition: sprite within a Chebyshev radius of a point.
    IfNearPoint,
    /// `SetVar var, value`
    SetVar,
    /// `AddVar var, value`
    AddVar,
    /// `SetFlag flag`
    SetFlag,
    /// `ClearFlag flag`
    ClearFlag,
    /// `Sync id`: broadcast-release; never suspends.
    Sync,
    /// `WaitSync id`: park until the id is signalled.
    WaitSync,
    /// `WaitEnd sprite`: park until that sprite's sequence terminates.
    WaitEnd,
    /// `Repeat n`: run the body up to the matching `EndRepeat` exactly n
    /// times. The count lives in a per-cursor side table, not the bytecode.
    Repeat,
    /// Close the innermost `Repeat` body.
    EndRepeat,
    /// `Jump disp`: signed displacement from the following opcode.
    Jump,
    /// Halt the cursor's own sprite: remove it and purge its pending entries.
    Halt,
    /// `HaltOther zone, sprite`: halt another sprite.
    HaltOther,
    /// Clear sprites, continuations and rendezvous tables, sparing the
    /// configured persistent set.
    Reset,
}

/// Noun/verb wildcard: matches any ambient value.
pub const MATCH_ANY: i16 = -1;
/// Matches only while the ambient noun is flagged "still selected from before".
pub const MATCH_CARRYOVER: i16 = -2;

/// Item operand sentinel: the input layer's pointer object.
pub const ITEM_POINTER: i16 = -2;
/// Item operand sentinel: the current class-rescan subject.
pub const ITEM_SUBJECT: i16 = -3;
