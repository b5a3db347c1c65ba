//! Sequential element supplies feeding a [`RingBuffer`](crate::RingBuffer).
//!
//! A [`Source`] hands out elements in order with best-effort
//! [`read`](Source::read) semantics. Once it is exhausted the buffer above it
//! substitutes [`end_marker`](Source::end_marker) for every further element,
//! so consumers see an endless stream terminated by a repeating sentinel.

use crate::{Error, Result};
use std::io::{self, BufReader, Read};

/// Sentinel character produced forever once a character source is exhausted.
///
/// `U+FFFF` is a Unicode noncharacter; the character sources in this module
/// replace any real occurrence with `U+FFFD`, so it never collides with input.
pub const EOF_CHAR: char = '\u{FFFF}';

/// A sequential, pull-based supply of elements.
pub trait Source {
    /// Element type produced by this source.
    type Item: Clone;

    /// Best-effort read: writes up to `buf.len()` elements into a prefix of
    /// `buf` and returns how many were written. `Ok(0)` for a non-empty `buf`
    /// means the source is exhausted.
    fn read(&mut self, buf: &mut [Self::Item]) -> Result<usize>;

    /// The element standing for "past the end".
    fn end_marker(&self) -> Self::Item;

    /// Blocking read: fills all of `buf`, padding with
    /// [`end_marker`](Source::end_marker) after exhaustion. Returns the number
    /// of real (non-padding) elements written.
    fn read_exact(&mut self, buf: &mut [Self::Item]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                let marker = self.end_marker();
                buf[filled..].fill(marker);
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

/// A [`Source`] over any iterator.
///
/// The iterator is fused internally, so once it returns `None` the source
/// stays exhausted.
#[derive(Debug, Clone)]
pub struct IterSource<I>
where
    I: Iterator,
{
    iter: std::iter::Fuse<I>,
    end_marker: I::Item,
}

impl<I> IterSource<I>
where
    I: Iterator,
    I::Item: Clone,
{
    /// Wraps `iter`, using `end_marker` past its end.
    pub fn new(iter: I, end_marker: I::Item) -> Self {
        Self {
            iter: iter.fuse(),
            end_marker,
        }
    }
}

impl<I> IterSource<CharGuard<I>>
where
    I: Iterator<Item = char>,
{
    /// A character source over `iter`, terminated by [`EOF_CHAR`].
    pub fn chars(iter: I) -> Self {
        Self::new(CharGuard(iter), EOF_CHAR)
    }
}

impl IterSource<CharGuard<std::vec::IntoIter<char>>> {
    /// A character source over a copy of `s`.
    pub fn from_text(s: &str) -> Self {
        Self::chars(s.chars().collect::<Vec<_>>().into_iter())
    }
}

impl<I> Source for IterSource<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = I::Item;

    fn read(&mut self, buf: &mut [Self::Item]) -> Result<usize> {
        let mut n = 0;
        for slot in buf.iter_mut() {
            match self.iter.next() {
                Some(x) => {
                    *slot = x;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn end_marker(&self) -> Self::Item {
        self.end_marker.clone()
    }
}

/// Iterator adapter that keeps real input from colliding with [`EOF_CHAR`].
#[derive(Debug, Clone)]
pub struct CharGuard<I>(I);

impl<I> Iterator for CharGuard<I>
where
    I: Iterator<Item = char>,
{
    type Item = char;

    #[inline]
    fn next(&mut self) -> Option<char> {
        self.0.next().map(guard_char)
    }
}

#[inline]
fn guard_char(c: char) -> char {
    if c == EOF_CHAR {
        char::REPLACEMENT_CHARACTER
    } else {
        c
    }
}

/// A character [`Source`] decoding UTF-8 from any [`Read`]er.
///
/// Bytes are pulled lazily through a [`BufReader`]; a short read of the
/// underlying reader only ends the stream when it returns zero bytes.
/// Invalid UTF-8 is reported as [`Error::Input`].
pub struct ReaderSource<R: Read> {
    reader: BufReader<R>,
    done: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            done: false,
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut b = [0u8; 1];
        loop {
            match self.reader.read(&mut b) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(b[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn next_char(&mut self) -> Result<Option<char>> {
        let Some(first) = self.next_byte()? else {
            return Ok(None);
        };
        let width = match first {
            0x00..=0x7F => 1,
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Err(invalid_utf8(first)),
        };
        let mut bytes = [first, 0, 0, 0];
        for slot in bytes.iter_mut().take(width).skip(1) {
            match self.next_byte()? {
                Some(b) => *slot = b,
                None => {
                    return Err(Error::Input(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "truncated UTF-8 sequence",
                    )));
                }
            }
        }
        let s = std::str::from_utf8(&bytes[..width]).map_err(|e| {
            Error::Input(io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        Ok(s.chars().next().map(guard_char))
    }
}

fn invalid_utf8(b: u8) -> Error {
    Error::Input(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("invalid UTF-8 lead byte {b:#04x}"),
    ))
}

impl<R: Read> Source for ReaderSource<R> {
    type Item = char;

    fn read(&mut self, buf: &mut [char]) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() && !self.done {
            match self.next_char()? {
                Some(c) => {
                    buf[n] = c;
                    n += 1;
                }
                None => self.done = true,
            }
        }
        Ok(n)
    }

    fn end_marker(&self) -> char {
        EOF_CHAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<S: Source>(src: &mut S, n: usize) -> Vec<S::Item> {
        let mut buf = vec![src.end_marker(); n];
        src.read_exact(&mut buf).unwrap();
        buf
    }

    #[test]
    fn read_exact_pads_with_end_marker() {
        let mut src = IterSource::from_text("ab");
        let mut buf = [' '; 5];
        let real = src.read_exact(&mut buf).unwrap();
        assert_eq!(real, 2);
        assert_eq!(buf, ['a', 'b', EOF_CHAR, EOF_CHAR, EOF_CHAR]);
        assert_eq!(src.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn real_sentinel_characters_are_replaced() {
        let mut src = IterSource::from_text("x\u{FFFF}y");
        assert_eq!(drain(&mut src, 3), vec!['x', '\u{FFFD}', 'y']);
    }

    #[test]
    fn reader_source_decodes_multibyte_utf8() {
        let text = "a⟨λ⟩€𝔽";
        let mut src = ReaderSource::new(text.as_bytes());
        let got: String = drain(&mut src, 7).into_iter().collect();
        assert_eq!(got, format!("{text}{EOF_CHAR}"));
    }

    #[test]
    fn reader_source_reports_invalid_utf8() {
        let bytes: &[u8] = &[b'a', 0xFF, b'b'];
        let mut src = ReaderSource::new(bytes);
        let mut buf = [' '; 3];
        assert!(matches!(src.read(&mut buf), Err(Error::Input(_))));
    }

    #[test]
    fn reader_source_reports_truncated_sequences() {
        let bytes: &[u8] = &[0xE2, 0x9F];
        let mut src = ReaderSource::new(bytes);
        let mut buf = [' '; 1];
        assert!(matches!(src.read(&mut buf), Err(Error::Input(_))));
    }
}
