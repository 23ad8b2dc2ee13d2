//! Collaborator traits for the resource layer.
//!
//! Resource-file parsing and decompression live outside the core. The engine
//! consumes already-compiled byte images through these traits: logic program
//! groups keyed by the registry's range table, and per-zone animation
//! bytecode plus image blobs. Returning `None` is the recoverable path: the
//! engine logs and carries on.

use pantomime_core::ZoneId;

/// Supplies compiled logic program images.
///
/// A group image is `count:u16` followed by `count` subroutine records:
/// `id:u16 line_count:u16`, then per line
/// `verb:i16 noun1:i16 noun2:i16 len:u16 body`. All big-endian. The registry
/// relocates line links into arena offsets at install time.
pub trait LogicSource {
    /// Fetch one program group by its range-table key.
    fn group(&mut self, group: u16) -> Option<Vec<u8>>;

    /// Fetch the independently-loaded extension space, if the title has one.
    /// Extension subroutines survive group swaps.
    fn extension(&mut self) -> Option<Vec<u8>> {
        None
    }
}

/// A zone's animation bytecode and image blob.
#[derive(Debug, Clone, Default)]
pub struct ZoneBlobs {
    /// Animation opcode streams; entry points are offsets into this blob.
    pub code: Vec<u8>,
    /// Image directory and descriptors (see `gfx`).
    pub images: Vec<u8>,
}

/// Supplies per-zone animation content.
pub trait ZoneSource {
    /// Fetch a zone's blobs. `None` marks the zone unknown; references to it
    /// become logged no-ops.
    fn zone(&mut self, zone: ZoneId) -> Option<ZoneBlobs>;
}
