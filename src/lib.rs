//! # mx
//!
//! A streaming macro expander. Text is copied from a character source to a
//! character sink; an escape character introduces commands that define, remove and
//! invoke named text macros or include other files. Runs of whitespace are
//! collapsed to a single space, or to a paragraph break when they span more than
//! one newline.
//!
//! ```text
//! \define{greet who}{Hello, \who!}
//! \greet{World}                      →  Hello, World!
//! ```
//!
//! ## Layout
//!
//! 1. [`stream`]: the character source and sink abstractions.
//! 2. [`settings`]: special characters, buffer limits, include paths, and the
//!    layered loader for them.
//! 3. [`expansion`]: the engine itself.
//!
//! The `mx` binary is a thin command-line front end over [`expansion::Engine`].

pub mod expansion;
pub mod settings;
pub mod stream;

pub use expansion::{Diagnostic, Engine, ExpandError};
pub use settings::{EngineConfig, Loader};
