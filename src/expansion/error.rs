//! Expansion errors
//!
//! Some of these abort the whole run, most are scoped to the command or invocation
//! that raised them. See [`ExpandError::is_recoverable`].

use crate::settings::ConfigError;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExpandError {
    Config(ConfigError),
    Io(io::Error),
    MacroBufferOverflow {
        name: String,
        requested: usize,
        available: usize,
    },
    ExpansionBufferOverflow {
        capacity: usize,
    },
    UndefinedMacro(String),
    UnterminatedGroup {
        command: String,
    },
    CircularInclude(PathBuf),
    IncludeNotFound(String),
    RecursionLimit {
        name: String,
        limit: usize,
    },
    MissingArgument {
        command: String,
        expected: usize,
        found: usize,
    },
    InvalidMacroName(String),
}

impl ExpandError {
    /// Short stable identifier, used in diagnostics and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            ExpandError::Config(_) => "config",
            ExpandError::Io(_) => "io",
            ExpandError::MacroBufferOverflow { .. } => "macro-buffer-overflow",
            ExpandError::ExpansionBufferOverflow { .. } => "expansion-buffer-overflow",
            ExpandError::UndefinedMacro(_) => "undefined-macro",
            ExpandError::UnterminatedGroup { .. } => "unterminated-group",
            ExpandError::CircularInclude(_) => "circular-include",
            ExpandError::IncludeNotFound(_) => "include-not-found",
            ExpandError::RecursionLimit { .. } => "recursion-limit",
            ExpandError::MissingArgument { .. } => "missing-argument",
            ExpandError::InvalidMacroName(_) => "invalid-macro-name",
        }
    }

    /// Whether the run can continue after reporting this error somewhere below the
    /// root source. Configuration and I/O failures always abort.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ExpandError::Config(_) | ExpandError::Io(_))
    }
}

impl fmt::Display for ExpandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpandError::Config(e) => write!(f, "invalid configuration: {}", e),
            ExpandError::Io(e) => write!(f, "I/O error: {}", e),
            ExpandError::MacroBufferOverflow {
                name,
                requested,
                available,
            } => write!(
                f,
                "macro buffer overflow defining '{}': body needs {} characters, {} available",
                name, requested, available
            ),
            ExpandError::ExpansionBufferOverflow { capacity } => write!(
                f,
                "expansion buffer overflow: capacity of {} characters exceeded",
                capacity
            ),
            ExpandError::UndefinedMacro(name) => write!(f, "undefined macro '{}'", name),
            ExpandError::UnterminatedGroup { command } => {
                write!(f, "unterminated argument group for '{}'", command)
            }
            ExpandError::CircularInclude(path) => {
                write!(f, "circular include of '{}'", path.display())
            }
            ExpandError::IncludeNotFound(name) => {
                write!(f, "include file '{}' not found in any include path", name)
            }
            ExpandError::RecursionLimit { name, limit } => write!(
                f,
                "expansion depth limit of {} exceeded while expanding '{}'",
                limit, name
            ),
            ExpandError::MissingArgument {
                command,
                expected,
                found,
            } => write!(
                f,
                "'{}' expects {} argument(s), found {}",
                command, expected, found
            ),
            ExpandError::InvalidMacroName(name) => write!(f, "invalid macro name '{}'", name),
        }
    }
}

impl std::error::Error for ExpandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExpandError::Config(e) => Some(e),
            ExpandError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ExpandError {
    fn from(e: io::Error) -> Self {
        ExpandError::Io(e)
    }
}

impl From<ConfigError> for ExpandError {
    fn from(e: ConfigError) -> Self {
        ExpandError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = ExpandError::UndefinedMacro("greet".to_string());
        assert_eq!(err.to_string(), "undefined macro 'greet'");

        let err = ExpandError::CircularInclude(PathBuf::from("/tmp/a.mx"));
        assert!(err.to_string().contains("/tmp/a.mx"));
    }

    #[test]
    fn test_io_is_not_recoverable() {
        let err = ExpandError::from(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert!(!err.is_recoverable());
        assert_eq!(err.code(), "io");
        assert!(ExpandError::IncludeNotFound("x".into()).is_recoverable());
    }
}
