//! Diagnostic collection
//!
//! Errors the engine recovers from are not returned from `execute`; each one is
//! recorded as a [`Diagnostic`] so that callers can still see every problem. The
//! records are serializable for machine-readable reporting.

use super::error::ExpandError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A recovered expansion problem and where it happened.
///
/// `origin` is the name of the input or include file being read when the problem
/// was detected. Problems inside a macro body are attributed to the file the
/// outermost invocation came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub origin: String,
    pub line: usize,
}

impl Diagnostic {
    pub fn from_error(error: &ExpandError, origin: impl Into<String>, line: usize) -> Self {
        let severity = match error {
            ExpandError::UndefinedMacro(_) => Severity::Warning,
            _ => Severity::Error,
        };
        Self {
            severity,
            code: error.code(),
            message: error.to_string(),
            origin: origin.into(),
            line,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}]: {}",
            self.origin, self.line, self.severity, self.code, self.message
        )
    }
}
