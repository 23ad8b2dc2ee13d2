//! Pantomime: the runtime core of a scripted adventure-game engine.
//!
//! Two coupled bytecode virtual machines (a *logic program* for puzzles,
//! dialogue and verb/noun dispatch, and an *animation program* for sprites,
//! palette effects and timed sequences) execute against shared simulation
//! state under a single-threaded cooperative scheduler with time-deferred
//! continuations and rendezvous points.
//!
//! This crate is the facade over [`pantomime_core`] (data model, bytecode
//! store, configuration) and [`pantomime_runtime`] (interpreters, scheduler,
//! persistence). Resource-file parsing, audio, and the rendering backend are
//! external collaborators behind the [`prelude::LogicSource`] and
//! [`prelude::ZoneSource`] traits.

pub use pantomime_core as core;
pub use pantomime_runtime as runtime;

/// The commonly needed surface in one import.
pub mod prelude {
    pub use pantomime_core::{
        AnimOp, AnimationCursor, CodeOffset, CodeStore, CodeWriter, Continuation, EngineError,
        EngineResult, ImageId, ItemId, LogicOp, SpriteFlags, SpriteId, SpriteRegistry,
        SubroutineId, SyncId, TitleConfig, VisibleSprite, ZoneId,
    };
    pub use pantomime_runtime::{
        Engine, GroupRange, LogicSource, Resumed, RunOutcome, Selection, Snapshot, ZoneBlobs,
        ZoneSource,
    };
}
