//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Streaming runtime for hand-written lexers and parsers.
//!
//! This crate supplies the language-independent half of a scanning pipeline:
//! input is pulled lazily from a [`Source`] into a growable [`RingBuffer`],
//! and a [`Cursor`] walks the buffer with arbitrary lookahead and nested
//! mark/rollback speculation. Nothing is buffered beyond the oldest
//! outstanding mark, so memory stays bounded on arbitrarily long input.
//!
//! Key components:
//! - `source`: the [`Source`] trait, iterator and `std::io::Read` adapters
//! - `ring`: the power-of-two [`RingBuffer`] and its [`BufferLimits`]
//! - `marks`: the [`MarkStack`] of saved offsets
//! - `cursor`: the generic [`Cursor`] over any [`Element`]
//! - `error`: [`Position`], [`Span`] and the shared [`Error`] taxonomy
//!
//! A lexer built on a `Cursor<impl Source<Item = char>>` can itself implement
//! [`Source`] for its tokens, so the same cursor algorithm serves the parser.
//!
//! # Examples
//!
//! ```rust
//! # use flowscan::{BufferLimits, Cursor, IterSource};
//! let mut c = Cursor::new(IterSource::from_text("a+b"), BufferLimits::default());
//! c.mark();
//! assert_eq!(c.consume()?, 'a');
//! assert_eq!(*c.peek()?, '+');
//! c.rollback_mark();
//! c.match_kind('a')?;
//! # Ok::<(), flowscan::Error>(())
//! ```

mod cursor;
mod error;
mod marks;
mod ring;
mod source;

pub use crate::cursor::{CONTEXT_RADIUS, Cursor, Element};
pub use crate::error::{Error, Position, Result, Span};
pub use crate::marks::MarkStack;
pub use crate::ring::{BufferLimits, RingBuffer};
pub use crate::source::{CharGuard, EOF_CHAR, IterSource, ReaderSource, Source};
