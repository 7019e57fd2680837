//! Bounded expansion scratch buffer
//!
//! The buffer is used as a stack arena addressed by a single cursor (its length).
//! Argument text being collected and the substituted body of every active macro
//! frame are allocated at the top; a finished frame is collapsed back onto its mark.
//! Appending past the capacity is an `ExpansionBufferOverflow`, never a reallocation
//! beyond the configured bound.

use super::error::ExpandError;
use std::ops::Range;

#[derive(Debug)]
pub struct ExpansionBuffer {
    chars: Vec<char>,
    capacity: usize,
}

impl ExpansionBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chars: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current cursor.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    fn ensure_room(&self, extra: usize) -> Result<(), ExpandError> {
        if self.chars.len() + extra > self.capacity {
            return Err(ExpandError::ExpansionBufferOverflow {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn push(&mut self, c: char) -> Result<(), ExpandError> {
        self.ensure_room(1)?;
        self.chars.push(c);
        Ok(())
    }

    pub fn extend_from_slice(&mut self, text: &[char]) -> Result<(), ExpandError> {
        self.ensure_room(text.len())?;
        self.chars.extend_from_slice(text);
        Ok(())
    }

    /// Append a copy of an earlier region to the top.
    pub fn extend_from_within(&mut self, range: Range<usize>) -> Result<(), ExpandError> {
        self.ensure_room(range.len())?;
        self.chars.extend_from_within(range);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    pub fn slice(&self, range: Range<usize>) -> &[char] {
        &self.chars[range]
    }

    pub fn text(&self, range: Range<usize>) -> String {
        self.chars[range].iter().collect()
    }

    /// Remove a region, moving everything above it down.
    pub fn collapse(&mut self, range: Range<usize>) {
        self.chars.drain(range);
    }

    /// Reset the cursor to `mark`, discarding everything above it.
    pub fn truncate(&mut self, mark: usize) {
        self.chars.truncate(mark);
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_capacity() {
        let mut buffer = ExpansionBuffer::with_capacity(3);
        for c in "abc".chars() {
            buffer.push(c).unwrap();
        }
        assert_eq!(buffer.len(), 3);
        assert!(matches!(
            buffer.push('d'),
            Err(ExpandError::ExpansionBufferOverflow { capacity: 3 })
        ));
        assert_eq!(buffer.text(0..3), "abc");
    }

    #[test]
    fn test_overflowing_extend_appends_nothing() {
        let mut buffer = ExpansionBuffer::with_capacity(4);
        buffer.extend_from_slice(&['a', 'b']).unwrap();
        assert!(buffer.extend_from_slice(&['c', 'd', 'e']).is_err());
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_collapse_moves_tail_down() {
        let mut buffer = ExpansionBuffer::with_capacity(16);
        buffer.extend_from_slice(&['x', 'a', 'r', 'g', 'o', 'u', 't']).unwrap();
        buffer.collapse(1..4);
        assert_eq!(buffer.text(0..buffer.len()), "xout");
    }

    #[test]
    fn test_extend_from_within_copies_region() {
        let mut buffer = ExpansionBuffer::with_capacity(16);
        buffer.extend_from_slice(&['h', 'i', '!']).unwrap();
        buffer.extend_from_within(0..2).unwrap();
        assert_eq!(buffer.text(0..buffer.len()), "hi!hi");
        buffer.truncate(3);
        assert_eq!(buffer.len(), 3);
    }
}
