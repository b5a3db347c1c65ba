//! Source locations and the error taxonomy shared by the scanning pipeline.
//!
//! Every stage of a `flowscan` pipeline (sources, ring buffers, cursors and
//! the lexers/parsers layered on top of them) reports failures through the
//! single [`Error`] enum defined here. All variants are fatal: a pipeline
//! never retries internally and never returns partial results.
//!
//! # Examples
//!
//! ```rust
//! # use flowscan::{Error, Position, Span, span};
//! let sp = Span::new(Position::new(3, 5), Position::new(3, 10));
//! assert!(!sp.is_empty());
//! assert_eq!(sp.line_range(), (3, 3));
//!
//! let err = Error::UnterminatedLiteral { position: sp.start };
//! assert!(err.to_string().contains("3:5"));
//!
//! assert_eq!(span!(0, 0, 0, 4).end.column, 4);
//! ```

use smartstring::alias::String;
use std::fmt;
use thiserror::Error;

/// A 0-based line/column position in source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// 0-based line number.
    pub line: usize,
    /// 0-based column number (character position in the line).
    pub column: usize,
}

impl Position {
    /// Creates a new `Position`.
    #[inline]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Advances past one character, starting a new line after `'\n'`.
    #[inline]
    pub fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open source range: `[start, end)`.
///
/// Invariants are not enforced here, but it is conventional for `start <= end`
/// in lexicographic `(line, column)` ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Starting position (inclusive).
    pub start: Position,
    /// Ending position (exclusive).
    pub end: Position,
}

impl Span {
    /// Creates a new `Span`.
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// An empty span at `at`.
    #[inline]
    pub const fn point(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Merge two spans into one that covers both.
    #[inline]
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Returns `true` if the span is empty (same start and end position).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the inclusive line range spanned by this `Span`.
    #[inline]
    pub fn line_range(&self) -> (usize, usize) {
        (self.start.line, self.end.line)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Everything that can stop a scan or a parse.
///
/// [`Error::Input`] and [`Error::Builder`] transport failures of the
/// collaborators around the pipeline (the byte reader and the semantic
/// builder); every other variant is raised by the pipeline itself.
#[derive(Debug, Error)]
pub enum Error {
    /// A ring buffer would have to grow past its configured hard cap to
    /// satisfy a lookahead request.
    #[error("buffer capacity exceeded: {requested} elements needed, limit is {limit}")]
    BufferCapacityExceeded {
        /// Capacity the buffer would have needed.
        requested: usize,
        /// The configured maximum capacity.
        limit: usize,
    },

    /// No lexical rule accepts the character at `position`.
    #[error("unexpected character {ch:?} at {position}")]
    UnexpectedCharacter { ch: char, position: Position },

    /// End of input was reached inside a quoted literal opened at `position`.
    #[error("unterminated literal starting at {position}")]
    UnterminatedLiteral { position: Position },

    /// A cursor `match` found a different element than the one required.
    #[error("expected {expected}, found {found:?} near `{context}`{}", fmt_span(.span))]
    TokenMismatch {
        expected: String,
        found: String,
        context: String,
        span: Option<Span>,
    },

    /// The element in operand position starts no operand production.
    #[error("unexpected operand {found:?} near `{context}`{}", fmt_span(.span))]
    UnexpectedOperand {
        found: String,
        context: String,
        span: Option<Span>,
    },

    /// The underlying reader failed or produced undecodable bytes.
    #[error("input error: {0}")]
    Input(#[from] std::io::Error),

    /// The external builder rejected a construct.
    #[error(transparent)]
    Builder(#[from] anyhow::Error),
}

fn fmt_span(span: &Option<Span>) -> std::string::String {
    match span {
        Some(span) => format!(" at {}", span.start),
        None => std::string::String::new(),
    }
}

/// Result alias used throughout the pipeline.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Build a `Span` inline from 0-based line/column coordinates.
///
/// # Examples
///
/// ```rust
/// # use flowscan::span;
/// let s = span!(0, 0, 1, 4);
/// assert_eq!(s.end.line, 1);
/// ```
#[macro_export]
macro_rules! span {
    ($line_start:expr, $col_start:expr, $line_end:expr, $col_end:expr) => {
        $crate::Span {
            start: $crate::Position {
                line: $line_start,
                column: $col_start,
            },
            end: $crate::Position {
                line: $line_end,
                column: $col_end,
            },
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_advances_over_newlines() {
        let mut p = Position::default();
        for c in "ab\ncd".chars() {
            p.advance(c);
        }
        assert_eq!(p, Position::new(1, 2));
    }

    #[test]
    fn merge_covers_both_spans() {
        let a = span!(0, 5, 0, 10);
        let b = span!(0, 2, 1, 1);
        let m = a.merge(&b);
        assert_eq!(m.start, Position::new(0, 2));
        assert_eq!(m.end, Position::new(1, 1));
    }

    #[test]
    fn mismatch_message_names_everything() {
        let err = Error::TokenMismatch {
            expected: "Executor".into(),
            found: "+".into(),
            context: "a b + c".into(),
            span: Some(span!(2, 4, 2, 5)),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected Executor"));
        assert!(msg.contains("\"+\""));
        assert!(msg.contains("a b + c"));
        assert!(msg.contains("at 2:4"));
    }

    #[test]
    fn builder_errors_are_transparent() {
        let err: Error = anyhow::anyhow!("no bus named {:?}", "b0").into();
        assert_eq!(err.to_string(), "no bus named \"b0\"");
    }

    fn _assert_send_sync_static<T: Send + Sync + 'static>() {}
    #[test]
    fn error_is_send_sync_static() {
        _assert_send_sync_static::<Error>();
    }
}
