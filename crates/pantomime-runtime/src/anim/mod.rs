//! The animation half of the runtime: the bytecode executor and the
//! structures that simulate concurrency for it.

mod interp;
mod queue;

pub use interp::{AnimInterp, Resumed};
pub use queue::{ContinuationQueue, LoopFrame, LoopTable, SyncTable};
