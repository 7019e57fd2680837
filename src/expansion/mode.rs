//! Character classification for the mode state machine
//!
//! The engine is always in exactly one mode. Which one is decided by the next
//! unconsumed character alone, so no mode ever carries state over from a previous
//! command.

use crate::settings::CharacterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Literal text, with quoted regions copied verbatim.
    Normal,
    /// A run of whitespace being collapsed.
    Whitespace,
    /// An escape-introduced command or macro invocation.
    Command,
}

impl Mode {
    /// Mode that handles `next`.
    pub fn for_char(next: char, chars: &CharacterConfig) -> Mode {
        if next == chars.escape {
            Mode::Command
        } else if next.is_whitespace() {
            Mode::Whitespace
        } else {
            Mode::Normal
        }
    }
}

pub fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tally of one maximal whitespace run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitespaceRun {
    pub chars: usize,
    pub newlines: usize,
}

impl WhitespaceRun {
    pub fn add(&mut self, c: char) {
        self.chars += 1;
        if c == '\n' {
            self.newlines += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    /// A run with more than one newline is a paragraph break, anything else is a
    /// single space.
    pub fn collapsed(&self) -> &'static str {
        if self.newlines > 1 {
            "\n\n"
        } else {
            " "
        }
    }
}
