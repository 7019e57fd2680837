//! Explicit expansion call stack
//!
//! Nested macro and include expansion push a frame instead of recursing, so the
//! depth limit is a counter check that does not depend on the host stack size.
//! The bottom frame is always the caller's source.

use crate::stream::CharSource;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Root { origin: String },
    Include { path: PathBuf },
    Macro { name: String },
}

/// Where a frame reads its characters from.
pub(crate) enum FrameInput<'a> {
    /// A streaming source with one character of lookahead.
    Stream {
        source: Box<dyn CharSource + 'a>,
        peeked: Option<char>,
        exhausted: bool,
        line: usize,
    },
    /// `len` characters of the expansion buffer starting at `mark`.
    Buffer { mark: usize, len: usize, pos: usize },
}

pub(crate) struct Frame<'a> {
    pub kind: FrameKind,
    pub input: FrameInput<'a>,
}

impl<'a> Frame<'a> {
    pub fn stream(kind: FrameKind, source: Box<dyn CharSource + 'a>) -> Self {
        Self {
            kind,
            input: FrameInput::Stream {
                source,
                peeked: None,
                exhausted: false,
                line: 1,
            },
        }
    }

    pub fn buffer(name: String, mark: usize, len: usize) -> Self {
        Self {
            kind: FrameKind::Macro { name },
            input: FrameInput::Buffer { mark, len, pos: 0 },
        }
    }

    pub fn is_macro(&self) -> bool {
        matches!(self.kind, FrameKind::Macro { .. })
    }

    /// Expansion buffer mark of a macro frame.
    pub fn mark(&self) -> Option<usize> {
        match self.input {
            FrameInput::Buffer { mark, .. } => Some(mark),
            FrameInput::Stream { .. } => None,
        }
    }
}

pub(crate) struct CallStack<'a> {
    frames: Vec<Frame<'a>>,
    macro_frames: usize,
}

impl<'a> CallStack<'a> {
    pub fn new(origin: String, source: Box<dyn CharSource + 'a>) -> Self {
        Self {
            frames: vec![Frame::stream(FrameKind::Root { origin }, source)],
            macro_frames: 0,
        }
    }

    /// Number of frames above the root.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Number of macro frames, whose output is still buffered.
    pub fn macro_frames(&self) -> usize {
        self.macro_frames
    }

    pub fn top(&self) -> &Frame<'a> {
        self.frames.last().expect("root frame is never popped")
    }

    pub fn top_mut(&mut self) -> &mut Frame<'a> {
        self.frames.last_mut().expect("root frame is never popped")
    }

    pub fn at_root(&self) -> bool {
        self.frames.len() == 1
    }

    pub fn push(&mut self, frame: Frame<'a>) {
        if frame.is_macro() {
            self.macro_frames += 1;
        }
        self.frames.push(frame);
    }

    /// Pop the top frame. The root frame stays in place.
    pub fn pop(&mut self) -> Option<Frame<'a>> {
        if self.at_root() {
            return None;
        }
        let frame = self.frames.pop()?;
        if frame.is_macro() {
            self.macro_frames -= 1;
        }
        Some(frame)
    }

    /// Origin name and line of the innermost streaming frame.
    pub fn location(&self) -> (String, usize) {
        for frame in self.frames.iter().rev() {
            if let FrameInput::Stream { line, .. } = frame.input {
                let origin = match &frame.kind {
                    FrameKind::Root { origin } => origin.clone(),
                    FrameKind::Include { path } => path.display().to_string(),
                    FrameKind::Macro { name } => name.clone(),
                };
                return (origin, line);
            }
        }
        unreachable!("root frame is a stream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StrSource;

    #[test]
    fn test_root_is_never_popped() {
        let mut stack = CallStack::new("<input>".into(), Box::new(StrSource::new("")));
        assert!(stack.pop().is_none());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_macro_frames_are_counted() {
        let mut stack = CallStack::new("<input>".into(), Box::new(StrSource::new("")));
        stack.push(Frame::buffer("a".into(), 0, 3));
        stack.push(Frame::stream(
            FrameKind::Include {
                path: PathBuf::from("inc.mx"),
            },
            Box::new(StrSource::new("")),
        ));
        stack.push(Frame::buffer("b".into(), 5, 1));
        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.macro_frames(), 2);
        assert_eq!(stack.location(), ("inc.mx".to_string(), 1));

        let top = stack.pop().unwrap();
        assert_eq!(top.mark(), Some(5));
        assert_eq!(stack.macro_frames(), 1);
    }
}
