//! Identifier types for the runtime core.
//!
//! Everything the two interpreters pass around is referred to by one of these
//! small copyable ids. `CodeOffset` is the arena-relative handle into the
//! bytecode store: references that must survive a swap of the demand-paged
//! region are always stored as offsets, never as pointers or slices.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u16);

        impl $name {
            /// Create a new id with the given index.
            #[inline]
            pub const fn new(index: u16) -> Self {
                Self(index)
            }

            /// Get the underlying index.
            #[inline]
            pub const fn index(self) -> u16 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<u16> for $name {
            fn from(index: u16) -> Self {
                Self::new(index)
            }
        }

        impl From<$name> for u16 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_type!(
    /// Identifies a logic-program subroutine.
    ///
    /// Subroutine 0 is the verb/noun-gated dispatch subroutine; every other id
    /// runs its lines unconditionally.
    SubroutineId,
    "sub_"
);

id_type!(
    /// Identifies an animation sprite within its zone.
    SpriteId,
    "sprite_"
);

id_type!(
    /// Identifies a content zone, the partition that animation bytecode and
    /// its owning sprites belong to.
    ZoneId,
    "zone_"
);

id_type!(
    /// Identifies an item in the item graph.
    ItemId,
    "item_"
);

id_type!(
    /// Identifies a rendezvous point. Rendezvous ids are bytecode operands,
    /// which is why they are numeric rather than strings.
    SyncId,
    "sync_"
);

id_type!(
    /// Identifies an image descriptor within a zone's image blob.
    ImageId,
    "img_"
);

/// An arena-relative offset into the bytecode store.
///
/// Offsets stay valid across a swap of the demand-paged region as long as the
/// allocation they point into does; the registry is responsible for dropping
/// handles into an evicted region before it is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CodeOffset(u32);

impl CodeOffset {
    /// Create a handle from a raw arena offset.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw arena offset.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Offset this handle forward by `bytes`.
    #[inline]
    pub const fn add(self, bytes: u32) -> Self {
        Self(self.0 + bytes)
    }
}

impl fmt::Display for CodeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:#06x}", self.0)
    }
}

impl From<u32> for CodeOffset {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}

impl From<CodeOffset> for u32 {
    fn from(off: CodeOffset) -> Self {
        off.0
    }
}
