//! The expansion engine
//!
//! [`Engine`] owns everything that outlives a single run: the configuration, the
//! macro table, the expansion buffer and the collected diagnostics. Each call to
//! [`Engine::execute`] builds a short-lived [`Run`] that drives the mode state
//! machine over an explicit [`CallStack`] of sources.
//!
//! # Output routing
//!
//! The root source and include files stream straight to the sink. A macro frame's
//! output is held in the expansion buffer right above the frame's own input until
//! the frame ends; it then moves down onto the frame's mark, which makes it part of
//! the enclosing macro frame's output, or is flushed to the sink when no macro
//! frame is left. An aborted macro frame therefore emits nothing.
//!
//! Whitespace is held back as one pending run until the next character is written,
//! so runs on both sides of an invocation boundary collapse together.

use super::buffer::ExpansionBuffer;
use super::diagnostics::Diagnostic;
use super::error::ExpandError;
use super::frames::{CallStack, Frame, FrameInput, FrameKind};
use super::include::IncludeResolver;
use super::macros::MacroTable;
use super::mode::{is_name_char, is_name_start, Mode, WhitespaceRun};
use crate::settings::{CharacterConfig, ConfigError, EngineConfig};
use crate::stream::{CharSink, CharSource, StrSource};
use std::ops::Range;

/// Origin reported for the caller's source when it has no better name.
pub const ROOT_ORIGIN: &str = "<input>";

pub struct Engine {
    config: EngineConfig,
    macros: MacroTable,
    expansion: ExpansionBuffer,
    includes: IncludeResolver,
    diagnostics: Vec<Diagnostic>,
}

impl Engine {
    /// Build an engine, rejecting an invalid configuration up front.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            macros: MacroTable::new(config.limits.macro_buffer_capacity),
            expansion: ExpansionBuffer::with_capacity(config.limits.expansion_buffer_capacity),
            includes: IncludeResolver::new(config.include.paths.clone()),
            diagnostics: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Macros defined so far. Definitions persist across runs of the same engine.
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Errors recovered from during the runs so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Expand `source` into `sink` until the source is exhausted, then flush.
    pub fn execute<S, K>(&mut self, source: S, sink: K) -> Result<(), ExpandError>
    where
        S: CharSource,
        K: CharSink,
    {
        self.execute_named(ROOT_ORIGIN, source, sink)
    }

    /// Like [`Engine::execute`], reporting diagnostics against `origin`.
    pub fn execute_named<S, K>(
        &mut self,
        origin: &str,
        source: S,
        mut sink: K,
    ) -> Result<(), ExpandError>
    where
        S: CharSource,
        K: CharSink,
    {
        self.expansion.clear();
        self.includes.reset();

        let mut run = Run {
            chars: self.config.characters,
            max_depth: self.config.limits.max_depth,
            macros: &mut self.macros,
            expansion: &mut self.expansion,
            includes: &mut self.includes,
            diagnostics: &mut self.diagnostics,
            stack: CallStack::new(origin.to_string(), Box::new(source)),
            pending: WhitespaceRun::default(),
            sink: &mut sink,
        };
        let result = run.run();
        drop(run);

        if let Err(e) = &result {
            tracing::debug!(origin, error = %e, "expansion aborted");
        }
        result?;
        sink.flush()?;
        Ok(())
    }

    /// Expand in-memory text, returning the output.
    pub fn expand_str(&mut self, input: &str) -> Result<String, ExpandError> {
        let mut output = String::new();
        self.execute(StrSource::new(input), &mut output)?;
        Ok(output)
    }
}

/// Argument groups collected into the expansion buffer.
#[derive(Debug)]
pub(crate) struct Arguments {
    pub mark: usize,
    pub groups: Vec<Range<usize>>,
    /// Index and length of the first group that did not fit. Its range is empty.
    pub dropped: Option<(usize, usize)>,
}

/// A group being read: where its text starts and whether it still fits.
struct GroupText {
    start: usize,
    len: usize,
    fits: bool,
}

/// State of one `execute` call.
pub(crate) struct Run<'a> {
    pub chars: CharacterConfig,
    pub max_depth: usize,
    pub macros: &'a mut MacroTable,
    pub expansion: &'a mut ExpansionBuffer,
    pub includes: &'a mut IncludeResolver,
    pub diagnostics: &'a mut Vec<Diagnostic>,
    pub stack: CallStack<'a>,
    pub pending: WhitespaceRun,
    pub sink: &'a mut dyn CharSink,
}

impl<'a> Run<'a> {
    fn run(&mut self) -> Result<(), ExpandError> {
        loop {
            let Some(next) = self.peek()? else {
                if self.stack.at_root() {
                    return self.flush_whitespace();
                }
                self.finish_frame()?;
                continue;
            };

            let step = match Mode::for_char(next, &self.chars) {
                Mode::Normal => self.normal(),
                Mode::Whitespace => self.whitespace(),
                Mode::Command => self.command(),
            };
            if let Err(error) = step {
                self.recover(error)?;
            }
        }
    }

    // ----- input -----

    pub(crate) fn peek(&mut self) -> Result<Option<char>, ExpandError> {
        match &mut self.stack.top_mut().input {
            FrameInput::Stream {
                source,
                peeked,
                exhausted,
                ..
            } => {
                if peeked.is_none() && !*exhausted {
                    *peeked = source.read_next()?;
                    *exhausted = peeked.is_none();
                }
                Ok(*peeked)
            }
            FrameInput::Buffer { mark, len, pos } => Ok(if *pos < *len {
                self.expansion.get(*mark + *pos)
            } else {
                None
            }),
        }
    }

    pub(crate) fn next(&mut self) -> Result<Option<char>, ExpandError> {
        let next = self.peek()?;
        if let Some(c) = next {
            match &mut self.stack.top_mut().input {
                FrameInput::Stream { peeked, line, .. } => {
                    *peeked = None;
                    if c == '\n' {
                        *line += 1;
                    }
                }
                FrameInput::Buffer { pos, .. } => *pos += 1,
            }
        }
        Ok(next)
    }

    // ----- output -----

    pub(crate) fn emit(&mut self, c: char) -> Result<(), ExpandError> {
        self.flush_whitespace()?;
        self.put(c)
    }

    /// Write the pending whitespace run, collapsed.
    fn flush_whitespace(&mut self) -> Result<(), ExpandError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let run = std::mem::take(&mut self.pending);
        run.collapsed().chars().try_for_each(|c| self.put(c))
    }

    fn put(&mut self, c: char) -> Result<(), ExpandError> {
        if self.stack.macro_frames() > 0 {
            self.expansion.push(c)
        } else {
            self.sink.write(c).map_err(ExpandError::from)
        }
    }

    // ----- modes -----

    /// Copy one literal character, or a whole quoted region.
    fn normal(&mut self) -> Result<(), ExpandError> {
        let Some(c) = self.next()? else {
            return Ok(());
        };
        if c != self.chars.quote {
            return self.emit(c);
        }

        while let Some(c) = self.next()? {
            if c == self.chars.quote {
                break;
            }
            if c == self.chars.escape && self.peek()? == Some(self.chars.quote) {
                self.next()?;
                self.emit(self.chars.quote)?;
                continue;
            }
            self.emit(c)?;
        }
        Ok(())
    }

    fn whitespace(&mut self) -> Result<(), ExpandError> {
        while let Some(c) = self.peek()? {
            if !c.is_whitespace() {
                break;
            }
            self.next()?;
            self.pending.add(c);
        }
        Ok(())
    }

    fn command(&mut self) -> Result<(), ExpandError> {
        let escape = self.next()?;
        debug_assert_eq!(escape, Some(self.chars.escape));

        match self.peek()? {
            None => self.emit(self.chars.escape),
            Some(c) if is_name_start(c) => {
                let name = self.read_name()?;
                self.dispatch(&name)
            }
            Some(c) => {
                self.next()?;
                self.emit(c)
            }
        }
    }

    fn read_name(&mut self) -> Result<String, ExpandError> {
        let mut name = String::new();
        while let Some(c) = self.peek()? {
            if !is_name_char(c) {
                break;
            }
            self.next()?;
            name.push(c);
        }
        Ok(name)
    }

    fn dispatch(&mut self, name: &str) -> Result<(), ExpandError> {
        match name {
            "define" => self.define(),
            "undefine" => self.undefine(),
            "include" => self.include(),
            _ => self.invoke(name),
        }
    }

    // ----- arguments -----

    /// Collect up to `arity` group arguments following a command name.
    ///
    /// Collection stops at the first character that does not open a group. A group
    /// too long for the expansion buffer is consumed anyway and recorded in
    /// [`Arguments::dropped`]. On failure nothing collected stays in the buffer.
    pub(crate) fn collect_arguments(
        &mut self,
        command: &str,
        arity: usize,
    ) -> Result<Arguments, ExpandError> {
        let mut args = Arguments {
            mark: self.expansion.len(),
            groups: Vec::new(),
            dropped: None,
        };
        while args.groups.len() < arity && self.peek()? == Some(self.chars.group_open) {
            let group = match self.read_group(command) {
                Ok(group) => group,
                Err(e) => {
                    self.expansion.truncate(args.mark);
                    return Err(e);
                }
            };
            if !group.fits {
                args.dropped.get_or_insert((args.groups.len(), group.len));
            }
            args.groups.push(group.start..self.expansion.len());
        }
        Ok(args)
    }

    /// Fail with `ExpansionBufferOverflow` if a group of `args` was dropped.
    pub(crate) fn require_stored(&mut self, args: &Arguments) -> Result<(), ExpandError> {
        if args.dropped.is_none() {
            return Ok(());
        }
        self.expansion.truncate(args.mark);
        Err(ExpandError::ExpansionBufferOverflow {
            capacity: self.expansion.capacity(),
        })
    }

    /// Read one balanced group into the expansion buffer, without its delimiters.
    fn read_group(&mut self, command: &str) -> Result<GroupText, ExpandError> {
        let unterminated = || ExpandError::UnterminatedGroup {
            command: command.to_string(),
        };

        self.next()?;
        let mut group = GroupText {
            start: self.expansion.len(),
            len: 0,
            fits: true,
        };
        let mut depth = 1usize;
        loop {
            let c = self.next()?.ok_or_else(unterminated)?;
            if c == self.chars.escape {
                self.keep(&mut group, c);
                let escaped = self.next()?.ok_or_else(unterminated)?;
                self.keep(&mut group, escaped);
            } else if c == self.chars.quote {
                self.keep(&mut group, c);
                if !self.read_quoted_raw(&mut group)? {
                    return Err(unterminated());
                }
            } else if c == self.chars.group_open {
                depth += 1;
                self.keep(&mut group, c);
            } else if c == self.chars.group_close {
                depth -= 1;
                if depth == 0 {
                    return Ok(group);
                }
                self.keep(&mut group, c);
            } else {
                self.keep(&mut group, c);
            }
        }
    }

    /// Copy a quoted region inside a group, closing quote included. Returns false
    /// when the input ends first.
    fn read_quoted_raw(&mut self, group: &mut GroupText) -> Result<bool, ExpandError> {
        loop {
            let Some(c) = self.next()? else {
                return Ok(false);
            };
            self.keep(group, c);
            if c == self.chars.quote {
                return Ok(true);
            }
            if c == self.chars.escape && self.peek()? == Some(self.chars.quote) {
                self.next()?;
                self.keep(group, self.chars.quote);
            }
        }
    }

    /// Append one group character, or only count it once the group has overflowed.
    fn keep(&mut self, group: &mut GroupText, c: char) {
        group.len += 1;
        if group.fits && self.expansion.push(c).is_err() {
            group.fits = false;
            self.expansion.truncate(group.start);
        }
    }

    /// Report a non-fatal error when fewer groups than expected were supplied.
    pub(crate) fn check_arity(&mut self, command: &str, args: &Arguments, expected: usize) -> bool {
        if args.groups.len() == expected {
            return true;
        }
        self.report(ExpandError::MissingArgument {
            command: command.to_string(),
            expected,
            found: args.groups.len(),
        });
        false
    }

    // ----- macro invocation -----

    fn invoke(&mut self, name: &str) -> Result<(), ExpandError> {
        let Some(arity) = self.macros.lookup(name).map(|mac| mac.arity()) else {
            // the groups written right after an unknown name go with it
            let args = self.collect_arguments(name, usize::MAX)?;
            self.expansion.truncate(args.mark);
            return Err(ExpandError::UndefinedMacro(name.to_string()));
        };

        let args = self.collect_arguments(name, arity)?;
        self.require_stored(&args)?;
        if self.stack.depth() >= self.max_depth {
            self.expansion.truncate(args.mark);
            return Err(ExpandError::RecursionLimit {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }
        self.check_arity(name, &args, arity);

        let text_start = self.expansion.len();
        if let Err(e) = self.substitute(name, &args) {
            self.expansion.truncate(args.mark);
            return Err(e);
        }
        self.expansion.collapse(args.mark..text_start);
        let len = self.expansion.len() - args.mark;

        tracing::trace!(name, depth = self.stack.depth() + 1, "expanding macro");
        self.stack.push(Frame::buffer(name.to_string(), args.mark, len));
        Ok(())
    }

    /// Copy the body of `name` to the top of the expansion buffer, replacing each
    /// parameter reference by the matching argument text.
    fn substitute(&mut self, name: &str, args: &Arguments) -> Result<(), ExpandError> {
        let mac = self
            .macros
            .lookup(name)
            .ok_or_else(|| ExpandError::UndefinedMacro(name.to_string()))?;
        let body = self.macros.body(mac);
        let escape = self.chars.escape;

        let mut i = 0;
        while i < body.len() {
            let c = body[i];
            if c != escape || i + 1 == body.len() {
                self.expansion.push(c)?;
                i += 1;
                continue;
            }

            if !is_name_start(body[i + 1]) {
                self.expansion.extend_from_slice(&body[i..i + 2])?;
                i += 2;
                continue;
            }

            let end = (i + 1..body.len())
                .find(|&j| !is_name_char(body[j]))
                .unwrap_or(body.len());
            let reference: String = body[i + 1..end].iter().collect();
            match mac.params.iter().position(|p| *p == reference) {
                Some(k) => {
                    if let Some(group) = args.groups.get(k) {
                        self.expansion.extend_from_within(group.clone())?;
                    }
                }
                None => self.expansion.extend_from_slice(&body[i..end])?,
            }
            i = end;
        }
        Ok(())
    }

    // ----- frames -----

    /// Pop an exhausted frame, routing a macro frame's output to its parent.
    fn finish_frame(&mut self) -> Result<(), ExpandError> {
        let Some(frame) = self.stack.pop() else {
            return Ok(());
        };
        match (&frame.kind, &frame.input) {
            (FrameKind::Include { path }, _) => {
                tracing::debug!(path = %path.display(), "leaving include");
                self.includes.leave(path);
            }
            (FrameKind::Macro { .. }, FrameInput::Buffer { mark, len, .. }) => {
                self.expansion.collapse(*mark..*mark + *len);
                if self.stack.macro_frames() == 0 {
                    self.flush_from(*mark)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn flush_from(&mut self, mark: usize) -> Result<(), ExpandError> {
        for i in mark..self.expansion.len() {
            if let Some(c) = self.expansion.get(i) {
                self.sink.write(c)?;
            }
        }
        self.expansion.truncate(mark);
        Ok(())
    }

    /// Pop the top frame without using its output.
    fn abort_frame(&mut self) {
        if let Some(frame) = self.stack.pop() {
            if let Some(mark) = frame.mark() {
                self.expansion.truncate(mark);
            }
            if let FrameKind::Include { path } = &frame.kind {
                self.includes.leave(path);
            }
        }
    }

    /// Pop frames up to and including the innermost macro frame.
    fn abort_innermost_macro(&mut self) {
        while self.stack.macro_frames() > 0 {
            let was_macro = self.stack.top().is_macro();
            self.abort_frame();
            if was_macro {
                break;
            }
        }
    }

    // ----- errors -----

    pub(crate) fn report(&mut self, error: ExpandError) {
        let (origin, line) = self.stack.location();
        self.record(&error, origin, line);
    }

    fn record(&mut self, error: &ExpandError, origin: String, line: usize) {
        let diagnostic = Diagnostic::from_error(error, origin, line);
        tracing::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Contain a failed step to the invocation that caused it, or give up.
    fn recover(&mut self, error: ExpandError) -> Result<(), ExpandError> {
        if !error.is_recoverable() {
            return Err(error);
        }
        // located before any frame is unwound
        let (origin, line) = self.stack.location();
        match &error {
            ExpandError::RecursionLimit { .. } => {
                while self.stack.top().is_macro() {
                    self.abort_frame();
                }
            }
            ExpandError::ExpansionBufferOverflow { .. } => {
                if self.stack.macro_frames() > 0 {
                    self.abort_innermost_macro();
                } else if self.stack.at_root() {
                    return Err(error);
                } else {
                    self.abort_frame();
                }
            }
            ExpandError::UnterminatedGroup { .. } => {
                if self.stack.at_root() {
                    return Err(error);
                }
                self.abort_frame();
            }
            _ => {}
        }
        self.record(&error, origin, line);
        Ok(())
    }
}
