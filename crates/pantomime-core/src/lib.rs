//! Core data model for the pantomime adventure-game runtime.
//!
//! This crate holds everything the two interpreters and the scheduler agree
//! on: identifier types, the fatal error taxonomy, the two-region bytecode
//! arena with its arena-relative handles, per-title configuration tables, the
//! shared simulation state, sprite records and the sorted sprite registry,
//! suspension records, and the frame surface. The interpreters themselves
//! live in `pantomime-runtime`.

pub mod config;
pub mod cursor;
pub mod error;
pub mod ids;
pub mod opcodes;
pub mod sprite;
pub mod state;
pub mod store;
pub mod surface;

pub use config::{AnimLengthTable, LogicShapeTable, Operand, TitleConfig};
pub use cursor::{AnimationCursor, Continuation, EndWait, SyncWait};
pub use error::{EngineError, EngineResult};
pub use ids::{CodeOffset, ImageId, ItemId, SpriteId, SubroutineId, SyncId, ZoneId};
pub use opcodes::{AnimOp, LogicOp, ITEM_POINTER, ITEM_SUBJECT, MATCH_ANY, MATCH_CARRYOVER};
pub use sprite::{SpriteFlags, SpriteRegistry, VisibleSprite};
pub use state::{Flags, GlobalState, Item, ItemGraph, Variables};
pub use store::{CodeStore, CodeWriter, StreamReader, OFFSET_NONE};
pub use surface::{Palette, Surface, TRANSPARENT};
