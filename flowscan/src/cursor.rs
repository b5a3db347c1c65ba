//! A backtracking cursor over a buffered [`Source`].
//!
//! The same algorithm drives both scanning levels of a pipeline: a
//! `Cursor<impl Source<Item = char>>` walks characters for a lexer, and a
//! cursor over the lexer (which is itself a [`Source`] of tokens) walks tokens
//! for a parser.
//!
//! Consumed elements stay buffered while any mark is outstanding, so
//! [`rollback_mark`](Cursor::rollback_mark) can always return to the marked
//! position. Once no marks remain, the consumed prefix is dropped every
//! `4 * initial_capacity` consumes, or sooner if keeping it would make the
//! buffer grow.

use crate::{BufferLimits, EOF_CHAR, Error, MarkStack, Result, RingBuffer, Source, Span};
use smartstring::alias::String;
use std::fmt;

/// Number of elements shown on each side of the current one in diagnostics.
pub const CONTEXT_RADIUS: usize = 3;

/// An element a [`Cursor`] can match on.
pub trait Element: Clone {
    /// What [`Cursor::match_kind`] compares.
    type Kind: Copy + PartialEq + fmt::Debug;

    /// Joins neighbouring elements in a rendered context window.
    const CONTEXT_SEPARATOR: &'static str = " ";

    fn kind(&self) -> Self::Kind;

    /// Human-readable text of the element, used in diagnostics.
    fn describe(&self) -> String;

    /// Source range covered by the element, if it tracks one.
    fn span(&self) -> Option<Span> {
        None
    }
}

impl Element for char {
    type Kind = char;

    const CONTEXT_SEPARATOR: &'static str = "";

    #[inline]
    fn kind(&self) -> char {
        *self
    }

    fn describe(&self) -> String {
        if *self == EOF_CHAR {
            String::from("end of input")
        } else {
            let mut s = String::new();
            s.push(*self);
            s
        }
    }
}

/// Sequential access to a [`Source`] with lookahead and nested backtracking.
pub struct Cursor<S>
where
    S: Source,
    S::Item: Element,
{
    ring: RingBuffer<S>,
    marks: MarkStack,
    /// Ring index of the next element to consume.
    offset: usize,
    /// Consumes since the last compaction.
    consumed: usize,
    compact_after: usize,
}

impl<S> Cursor<S>
where
    S: Source,
    S::Item: Element,
{
    /// Creates a cursor at the start of `source`, buffering within `limits`.
    pub fn new(source: S, limits: BufferLimits) -> Self {
        Self {
            ring: RingBuffer::new(source, limits),
            marks: MarkStack::new(),
            offset: 0,
            consumed: 0,
            compact_after: limits.effective_initial() * 4,
        }
    }

    /// Switches to a new source, dropping buffered input and outstanding
    /// marks. Returns the old source.
    pub fn reset(&mut self, source: S) -> S {
        log::debug!(
            "cursor reset with {} mark(s) outstanding",
            self.marks.len()
        );
        self.marks.clear();
        self.offset = 0;
        self.consumed = 0;
        self.ring.reset(source)
    }

    /// Returns the next element and advances past it.
    pub fn consume(&mut self) -> Result<S::Item> {
        self.make_room(0);
        let e = self.ring.element_at(self.offset)?.clone();
        self.offset += 1;
        self.consumed += 1;
        if self.marks.is_empty() && self.consumed > self.compact_after {
            self.compact();
        }
        Ok(e)
    }

    /// Returns the element `k` positions ahead without consuming anything.
    #[inline]
    pub fn lookahead_at(&mut self, k: usize) -> Result<&S::Item> {
        self.make_room(k);
        self.ring.element_at(self.offset + k)
    }

    /// Same as `lookahead_at(0)`.
    #[inline]
    pub fn peek(&mut self) -> Result<&S::Item> {
        self.lookahead_at(0)
    }

    /// Kind of the element `k` positions ahead.
    #[inline]
    pub fn kind_at(&mut self, k: usize) -> Result<<S::Item as Element>::Kind> {
        Ok(self.lookahead_at(k)?.kind())
    }

    /// Consumes the next element if it has the given kind.
    pub fn accept(&mut self, kind: <S::Item as Element>::Kind) -> Result<Option<S::Item>> {
        if self.peek()?.kind() == kind {
            self.consume().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Consumes the next element, failing with [`Error::TokenMismatch`]
    /// unless it has the given kind.
    pub fn match_kind(&mut self, kind: <S::Item as Element>::Kind) -> Result<()> {
        self.match_get(kind).map(|_| ())
    }

    /// Like [`match_kind`](Self::match_kind) but returns the matched element.
    pub fn match_get(&mut self, kind: <S::Item as Element>::Kind) -> Result<S::Item> {
        match self.accept(kind)? {
            Some(e) => Ok(e),
            None => Err(self.mismatch(format!("{kind:?}"))),
        }
    }

    /// Builds a [`Error::TokenMismatch`] for the next element.
    pub fn mismatch(&mut self, expected: impl Into<String>) -> Error {
        let (found, span) = self.current();
        Error::TokenMismatch {
            expected: expected.into(),
            found,
            context: self.context(),
            span,
        }
    }

    /// Builds a [`Error::UnexpectedOperand`] for the next element.
    pub fn unexpected_operand(&mut self) -> Error {
        let (found, span) = self.current();
        Error::UnexpectedOperand {
            found,
            context: self.context(),
            span,
        }
    }

    fn current(&mut self) -> (String, Option<Span>) {
        match self.peek() {
            Ok(e) => (e.describe(), e.span()),
            Err(_) => (String::from("unreadable input"), None),
        }
    }

    /// Renders up to [`CONTEXT_RADIUS`] elements on each side of the next one.
    ///
    /// Elements before the cursor are shown only while still buffered.
    pub fn context(&mut self) -> String {
        let end_kind = self.ring.source().end_marker().kind();
        let first = self.offset.saturating_sub(CONTEXT_RADIUS);
        let mut parts: Vec<String> = (first..self.offset)
            .filter_map(|i| self.ring.buffered(i).map(Element::describe))
            .collect();
        for k in 0..=CONTEXT_RADIUS {
            let Ok(e) = self.ring.element_at(self.offset + k) else {
                break;
            };
            let at_end = e.kind() == end_kind;
            parts.push(e.describe());
            if at_end {
                break;
            }
        }
        let mut out = String::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                out.push_str(<S::Item as Element>::CONTEXT_SEPARATOR);
            }
            out.push_str(part);
        }
        out
    }

    /// Saves the current position.
    #[inline]
    pub fn mark(&mut self) {
        self.marks.mark(self.offset);
    }

    /// Forgets the innermost mark, keeping everything consumed since.
    #[inline]
    pub fn commit_mark(&mut self) {
        self.marks.commit();
    }

    /// Returns to the innermost mark and forgets it.
    #[inline]
    pub fn rollback_mark(&mut self) {
        let offset = self.marks.rollback();
        log::trace!("rollback over {} element(s)", self.offset - offset);
        self.offset = offset;
    }

    /// Number of marks not yet committed or rolled back.
    pub fn marks_outstanding(&self) -> usize {
        self.marks.len()
    }

    /// Buffered elements behind the cursor that compaction has not dropped yet.
    pub fn retained(&self) -> usize {
        self.offset
    }

    /// Current capacity of the underlying ring.
    pub fn buffer_capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// The source being read.
    pub fn source(&self) -> &S {
        self.ring.source()
    }

    /// Mutable access to the source, e.g. to a lexer's operator table.
    pub fn source_mut(&mut self) -> &mut S {
        self.ring.source_mut()
    }

    /// Drops the consumed prefix early when reaching `k` ahead would
    /// otherwise grow the ring. Up to [`CONTEXT_RADIUS`] consumed elements
    /// stay behind for diagnostics when they fit.
    #[inline]
    fn make_room(&mut self, k: usize) {
        let capacity = self.ring.capacity();
        if !self.marks.is_empty() || self.offset + k < capacity {
            return;
        }
        let keep = CONTEXT_RADIUS
            .min(self.offset)
            .min(capacity.saturating_sub(k + 1));
        if self.offset > keep {
            self.drop_consumed(keep);
        }
    }

    fn compact(&mut self) {
        self.drop_consumed(0);
    }

    /// Removes consumed elements, keeping the last `keep` of them.
    fn drop_consumed(&mut self, keep: usize) {
        let n = self.offset - keep;
        log::trace!(
            "compacting {} consumed element(s), capacity {}",
            n,
            self.ring.capacity()
        );
        self.ring.remove_front(n);
        self.offset = keep;
        self.consumed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IterSource;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn cursor(text: &str) -> Cursor<impl Source<Item = char>> {
        Cursor::new(IterSource::from_text(text), BufferLimits::new(4, 1 << 16))
    }

    fn take<S: Source<Item = char>>(c: &mut Cursor<S>, n: usize) -> std::string::String {
        (0..n).map(|_| c.consume().unwrap()).collect()
    }

    #[test]
    fn lookahead_does_not_consume() {
        init();
        let mut c = cursor("abc");
        assert_eq!(*c.lookahead_at(2).unwrap(), 'c');
        assert_eq!(*c.peek().unwrap(), 'a');
        assert_eq!(take(&mut c, 3), "abc");
        assert_eq!(c.consume().unwrap(), EOF_CHAR);
        assert_eq!(c.consume().unwrap(), EOF_CHAR);
    }

    #[test]
    fn rollback_is_indistinguishable_from_not_consuming() {
        init();
        let text: std::string::String = ('a'..='z').cycle().take(500).collect();
        for k in [0, 1, 5, 17, 200] {
            let mut c = cursor(&text);
            take(&mut c, 3);
            c.mark();
            take(&mut c, k);
            c.rollback_mark();
            assert_eq!(take(&mut c, 497), text[3..]);
        }
    }

    #[test]
    fn commit_makes_consumption_permanent() {
        init();
        let mut c = cursor("hello world");
        c.mark();
        assert_eq!(take(&mut c, 6), "hello ");
        c.commit_mark();
        assert_eq!(c.marks_outstanding(), 0);
        assert_eq!(take(&mut c, 5), "world");
    }

    #[test]
    fn nested_rollbacks_restore_the_outer_position() {
        init();
        let mut c = cursor("0123456789");
        take(&mut c, 1);
        c.mark();
        take(&mut c, 2);
        c.mark();
        take(&mut c, 3);
        c.rollback_mark();
        c.rollback_mark();
        assert_eq!(c.consume().unwrap(), '1');
    }

    #[test]
    fn committed_inner_mark_still_rolls_back_with_the_outer_one() {
        init();
        let mut c = cursor("0123456789");
        c.mark();
        take(&mut c, 2);
        c.mark();
        take(&mut c, 3);
        c.commit_mark();
        c.rollback_mark();
        assert_eq!(c.consume().unwrap(), '0');
    }

    #[test]
    fn match_kind_advances_or_fails_with_context() {
        init();
        let mut c = cursor("abcdefghij");
        take(&mut c, 4);
        c.match_kind('e').unwrap();
        match c.match_kind('x') {
            Err(Error::TokenMismatch {
                expected,
                found,
                context,
                span,
            }) => {
                assert_eq!(expected.as_str(), "'x'");
                assert_eq!(found.as_str(), "f");
                assert_eq!(context.as_str(), "cdefghi");
                assert_eq!(span, None);
            }
            other => panic!("unexpected {other:?}"),
        }
        // a failed match consumes nothing
        assert_eq!(c.consume().unwrap(), 'f');
    }

    #[test]
    fn context_stops_at_end_of_input() {
        let mut c = cursor("ab");
        take(&mut c, 1);
        assert_eq!(c.context().as_str(), "abend of input");
    }

    #[test]
    fn compaction_keeps_memory_bounded_without_marks() {
        init();
        let text: std::string::String = "xyz".repeat(10_000);
        let mut c = cursor(&text);
        for _ in 0..30_000 {
            c.consume().unwrap();
            assert!(c.retained() <= 17);
        }
        assert!(c.buffer_capacity() <= 32);
        assert_eq!(c.consume().unwrap(), EOF_CHAR);
    }

    #[test]
    fn tight_cap_streams_without_marks() {
        init();
        let text = "a".repeat(200);
        let mut c = Cursor::new(IterSource::from_text(&text), BufferLimits::new(16, 32));
        for i in 0..200 {
            assert_eq!(c.consume().unwrap(), 'a', "consume #{i}");
            assert_eq!(*c.lookahead_at(1).unwrap(), if i < 198 { 'a' } else { EOF_CHAR });
        }
        assert!(c.buffer_capacity() <= 32);
        assert_eq!(c.consume().unwrap(), EOF_CHAR);

        let mut c = Cursor::new(IterSource::from_text(&text), BufferLimits::new(16, 32));
        c.mark();
        let err = (0..200).map(|_| c.consume()).find_map(Result::err);
        assert!(matches!(err, Some(Error::BufferCapacityExceeded { limit: 32, .. })));
    }

    #[test]
    fn marks_hold_back_compaction() {
        init();
        let text: std::string::String = "0123456789".repeat(20);
        let mut c = cursor(&text);
        c.mark();
        take(&mut c, 150);
        assert_eq!(c.retained(), 150);
        c.rollback_mark();
        assert_eq!(take(&mut c, 200), text);
    }

    #[test]
    fn bounded_capacity_surfaces_as_error() {
        let text: std::string::String = "a".repeat(100);
        let mut c = Cursor::new(IterSource::from_text(&text), BufferLimits::new(4, 16));
        c.mark();
        for _ in 0..16 {
            c.consume().unwrap();
        }
        assert!(matches!(
            c.consume(),
            Err(Error::BufferCapacityExceeded { limit: 16, .. })
        ));
    }

    #[test]
    fn reset_discards_marks_and_input() {
        let mut c = Cursor::new(IterSource::from_text("abc"), BufferLimits::default());
        c.mark();
        c.consume().unwrap();
        c.reset(IterSource::from_text("xyz"));
        assert_eq!(c.marks_outstanding(), 0);
        assert_eq!(c.consume().unwrap(), 'x');
    }
}
