//! Character sources and sinks
//!
//! The expansion engine never sees files or processes. It pulls characters one at a
//! time from a [`CharSource`] and pushes expanded characters into a [`CharSink`].
//! End of input is `Ok(None)`, not an error.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::str::Chars;

/// Pull-one-character interface consumed by the engine.
pub trait CharSource {
    /// Returns the next character, or `Ok(None)` once the input is exhausted.
    fn read_next(&mut self) -> io::Result<Option<char>>;
}

/// Push-one-character interface consumed by the engine.
pub trait CharSink {
    fn write(&mut self, c: char) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: CharSource + ?Sized> CharSource for Box<S> {
    fn read_next(&mut self) -> io::Result<Option<char>> {
        (**self).read_next()
    }
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    fn read_next(&mut self) -> io::Result<Option<char>> {
        (**self).read_next()
    }
}

impl<K: CharSink + ?Sized> CharSink for &mut K {
    fn write(&mut self, c: char) -> io::Result<()> {
        (**self).write(c)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// In-memory source over borrowed text.
pub struct StrSource<'a> {
    chars: Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars(),
        }
    }
}

impl CharSource for StrSource<'_> {
    fn read_next(&mut self) -> io::Result<Option<char>> {
        Ok(self.chars.next())
    }
}

/// Source decoding UTF-8 incrementally from any reader.
///
/// Only as many bytes as one character needs are consumed per call, so the reader
/// can be a pipe or a terminal.
pub struct ReaderSource<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.reader.fill_buf()? {
            [] => return Ok(None),
            [first, ..] => *first,
        };
        self.reader.consume(1);
        Ok(Some(byte))
    }
}

impl<R: Read> CharSource for ReaderSource<R> {
    fn read_next(&mut self) -> io::Result<Option<char>> {
        let Some(lead) = self.next_byte()? else {
            return Ok(None);
        };

        let width = utf8_width(lead)
            .ok_or_else(|| invalid_utf8(format!("invalid leading byte 0x{lead:02x}")))?;

        let mut bytes = [lead, 0, 0, 0];
        for slot in bytes.iter_mut().take(width).skip(1) {
            *slot = self
                .next_byte()?
                .ok_or_else(|| invalid_utf8("truncated multi-byte sequence".to_string()))?;
        }

        std::str::from_utf8(&bytes[..width])
            .map_err(|e| invalid_utf8(e.to_string()))
            .map(|s| s.chars().next())
    }
}

fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7f => Some(1),
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

fn invalid_utf8(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Sink encoding characters as UTF-8 into a buffered writer.
pub struct WriterSink<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }
}

impl<W: Write> CharSink for WriterSink<W> {
    fn write(&mut self, c: char) -> io::Result<()> {
        let mut encoded = [0u8; 4];
        self.writer.write_all(c.encode_utf8(&mut encoded).as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl CharSink for String {
    fn write(&mut self, c: char) -> io::Result<()> {
        self.push(c);
        Ok(())
    }
}
