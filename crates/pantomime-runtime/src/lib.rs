//! Runtime for the pantomime adventure-game engine.
//!
//! Two coupled bytecode interpreters execute against the shared world: the
//! logic interpreter (verb/noun dispatch, puzzles, inventory) and the
//! animation interpreter (sprites, palette effects, timed sequences), glued
//! together by a single-threaded cooperative scheduler. Concurrency is
//! simulated entirely through the continuation queue and the rendezvous
//! tables; no parallel execution exists, and shared state needs no locking
//! because only one interpreter step runs at a time.

pub mod anim;
pub mod engine;
pub mod gfx;
pub mod loader;
pub mod script;
pub mod snapshot;
pub mod world;

pub use anim::{AnimInterp, ContinuationQueue, LoopFrame, LoopTable, Resumed, SyncTable};
pub use engine::Engine;
pub use loader::{LogicSource, ZoneBlobs, ZoneSource};
pub use script::{GroupRange, LogicInterp, RunOutcome, SubroutineRef, SubroutineRegistry};
pub use snapshot::{SavedContinuation, SavedLoopFrame, SavedLoopStack, Snapshot};
pub use world::{Selection, World, ZoneData};
