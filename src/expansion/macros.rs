//! Macro table and the bounded arena holding macro bodies
//!
//! Bodies live in a single [`MacroBuffer`] and are addressed by [`BodyRef`]s. A body
//! is never mutated: redefining a macro stores a fresh copy and releases the old
//! region. Released regions are reclaimed lazily by compacting the arena when the
//! tail runs out of room, so the only hard limit is the sum of live body lengths.

use super::error::ExpandError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Names reserved for the built-in commands.
pub const RESERVED_NAMES: [&str; 3] = ["define", "undefine", "include"];

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name pattern"));

/// Whether `name` is a syntactically valid macro or parameter name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Location of a body inside the macro buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyRef {
    offset: usize,
    len: usize,
}

/// Bounded character arena for macro bodies.
#[derive(Debug)]
pub struct MacroBuffer {
    chars: Vec<char>,
    capacity: usize,
    live: usize,
}

impl MacroBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chars: Vec::new(),
            capacity,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Characters owned by currently defined macros.
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn available(&self) -> usize {
        self.capacity - self.live
    }

    pub fn body(&self, body: BodyRef) -> &[char] {
        &self.chars[body.offset..body.offset + body.len]
    }

    fn tail_room(&self) -> usize {
        self.capacity - self.chars.len()
    }

    fn store(&mut self, body: &[char]) -> BodyRef {
        debug_assert!(body.len() <= self.tail_room());
        let offset = self.chars.len();
        self.chars.extend_from_slice(body);
        self.live += body.len();
        BodyRef {
            offset,
            len: body.len(),
        }
    }

    fn release(&mut self, body: BodyRef) {
        self.live -= body.len;
    }

    /// Rewrite the arena so that the given bodies are packed at the front.
    fn compact<'m>(&mut self, bodies: impl Iterator<Item = &'m mut BodyRef>) {
        let old = std::mem::take(&mut self.chars);
        for body in bodies {
            let offset = self.chars.len();
            self.chars
                .extend_from_slice(&old[body.offset..body.offset + body.len]);
            body.offset = offset;
        }
        debug_assert_eq!(self.chars.len(), self.live);
    }
}

/// A stored macro definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    body: BodyRef,
}

impl Macro {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Name to definition mapping, owning the macro buffer.
#[derive(Debug)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
    buffer: MacroBuffer,
}

impl MacroTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            macros: HashMap::new(),
            buffer: MacroBuffer::with_capacity(capacity),
        }
    }

    pub fn buffer(&self) -> &MacroBuffer {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn body(&self, mac: &Macro) -> &[char] {
        self.buffer.body(mac.body)
    }

    /// Body text of `name`, if defined.
    pub fn body_text(&self, name: &str) -> Option<String> {
        self.lookup(name).map(|m| self.body(m).iter().collect())
    }

    /// Room a body for `name` may take, counting the body it would replace.
    pub fn available_for(&self, name: &str) -> usize {
        let replaced = self.macros.get(name).map_or(0, |m| m.body.len);
        self.buffer.available() + replaced
    }

    /// Define or replace `name`.
    ///
    /// Fails with `MacroBufferOverflow` when the live bodies plus the new one would
    /// exceed the buffer capacity. On failure the table is left untouched, including
    /// any previous definition of `name`.
    pub fn define(
        &mut self,
        name: &str,
        params: Vec<String>,
        body: &[char],
    ) -> Result<(), ExpandError> {
        let available = self.available_for(name);
        if body.len() > available {
            return Err(ExpandError::MacroBufferOverflow {
                name: name.to_string(),
                requested: body.len(),
                available,
            });
        }

        if let Some(old) = self.macros.remove(name) {
            self.buffer.release(old.body);
        }
        if body.len() > self.buffer.tail_room() {
            self.buffer
                .compact(self.macros.values_mut().map(|m| &mut m.body));
        }

        let body = self.buffer.store(body);
        self.macros.insert(
            name.to_string(),
            Macro {
                name: name.to_string(),
                params,
                body,
            },
        );
        Ok(())
    }

    /// Remove `name`. Returns whether it was defined.
    pub fn undefine(&mut self, name: &str) -> bool {
        match self.macros.remove(name) {
            Some(old) => {
                self.buffer.release(old.body);
                true
            }
            None => false,
        }
    }
}
