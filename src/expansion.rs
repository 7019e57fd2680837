//! The expansion engine
//!
//! Leaves first: [`mode`] classifies characters, [`macros`] stores definitions in a
//! bounded arena, [`buffer`] is the bounded scratch area for invocations,
//! [`include`] resolves include files, [`frames`] is the explicit call stack, and
//! [`engine`] ties them together into the state machine. [`commands`] holds the
//! built-ins.

pub mod buffer;
pub mod commands;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub(crate) mod frames;
pub mod include;
pub mod macros;
pub mod mode;

pub use diagnostics::{Diagnostic, Severity};
pub use engine::Engine;
pub use error::ExpandError;
