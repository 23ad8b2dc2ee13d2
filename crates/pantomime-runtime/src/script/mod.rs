//! The logic half of the runtime: the subroutine registry with its
//! demand-paged program groups, and the line-scanning interpreter.

mod interp;
mod registry;

pub use interp::{LogicInterp, RunOutcome};
pub use registry::{GroupRange, SubroutineRef, SubroutineRegistry, LINE_BODY, LINE_LEN, LINE_NEXT};
