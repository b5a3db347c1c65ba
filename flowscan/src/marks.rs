//! LIFO stack of saved consume offsets.

/// Saved cursor offsets supporting nested speculation.
///
/// Popping an empty stack is a logic error in the caller and panics.
#[derive(Debug, Clone, Default)]
pub struct MarkStack {
    offsets: Vec<usize>,
}

impl MarkStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves `offset` as the innermost mark.
    #[inline]
    pub fn mark(&mut self, offset: usize) {
        self.offsets.push(offset);
    }

    /// Discards the innermost mark.
    #[inline]
    pub fn commit(&mut self) {
        self.pop("commit");
    }

    /// Discards the innermost mark and returns the offset it saved.
    #[inline]
    pub fn rollback(&mut self) -> usize {
        self.pop("rollback")
    }

    /// Number of outstanding marks.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Forgets every mark, as on a reset.
    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    fn pop(&mut self, op: &str) -> usize {
        match self.offsets.pop() {
            Some(offset) => offset,
            None => panic!("{op} without an outstanding mark"),
        }
    }
}
