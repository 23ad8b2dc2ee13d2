//! Unified error types for the runtime core.
//!
//! Only the fatal classes appear here. Recoverable conditions (an unknown
//! subroutine id after a failed demand-page, or a reference to a sprite that
//! is not registered) are handled where they occur as logged no-ops and are
//! never surfaced as `Err`. Fatal classes mean the content and the build do
//! not agree and the session cannot continue:
//!
//! ```text
//! EngineError
//! ├── ArenaExhausted    - bytecode store budget overrun at load time
//! ├── MalformedOpcode   - opcode byte with no table entry
//! ├── TruncatedStream   - a stream ended in the middle of an operand
//! ├── RecursionLimit    - runaway nested logic subroutine calls
//! └── SnapshotMismatch  - snapshot written by a different title build
//! ```

use thiserror::Error;

use crate::ids::CodeOffset;

/// Fatal runtime errors. Each one terminates the session with a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The bytecode store could not satisfy an allocation. This is a
    /// content/build mismatch detected at load time, not a runtime condition.
    #[error("bytecode arena exhausted: requested {requested} bytes with {free} free of {capacity}")]
    ArenaExhausted {
        /// Size of the failed allocation.
        requested: usize,
        /// Bytes still unallocated between the two regions.
        free: usize,
        /// Total arena capacity.
        capacity: usize,
    },

    /// An opcode byte with no entry in the active table. Continuing would
    /// desynchronize cursor alignment irrecoverably.
    #[error("malformed opcode stream: byte {opcode:#04x} at {offset}")]
    MalformedOpcode {
        /// The unrecognized opcode byte.
        opcode: u8,
        /// Arena offset of the opcode byte.
        offset: CodeOffset,
    },

    /// A stream ended in the middle of an opcode's operands.
    #[error("opcode stream truncated at {offset}")]
    TruncatedStream {
        /// Arena offset of the failed read.
        offset: CodeOffset,
    },

    /// Nested logic subroutine calls exceeded the configured depth. Malformed
    /// program detection.
    #[error("logic subroutine recursion exceeded the limit of {limit}")]
    RecursionLimit {
        /// The configured depth limit.
        limit: usize,
    },

    /// A snapshot carries the fingerprint of a different title configuration.
    #[error("snapshot fingerprint mismatch: engine {engine:#018x}, snapshot {snapshot:#018x}")]
    SnapshotMismatch {
        /// Fingerprint of the running configuration.
        engine: u64,
        /// Fingerprint stored in the snapshot.
        snapshot: u64,
    },
}

/// Result alias used throughout the runtime.
pub type EngineResult<T> = Result<T, EngineError>;
