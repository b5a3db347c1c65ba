//! Pull-based circular buffer over a [`Source`].

use crate::{Error, Result, Source};

/// Capacity limits of a [`RingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLimits {
    /// Capacity allocated up front; rounded up to a power of two.
    pub initial_capacity: usize,
    /// Hard cap; growing past it fails with [`Error::BufferCapacityExceeded`].
    pub max_capacity: usize,
}

impl BufferLimits {
    /// Initial capacity of [`BufferLimits::default`].
    pub const DEFAULT_INITIAL_CAPACITY: usize = 16;
    /// Hard cap of [`BufferLimits::default`], in elements.
    pub const DEFAULT_MAX_CAPACITY: usize = 1 << 20;

    /// Limits with the given initial capacity and hard cap, both counted in
    /// elements.
    pub const fn new(initial_capacity: usize, max_capacity: usize) -> Self {
        Self {
            initial_capacity,
            max_capacity,
        }
    }

    /// The initial capacity as actually allocated.
    pub fn effective_initial(&self) -> usize {
        self.initial_capacity.max(1).next_power_of_two()
    }
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL_CAPACITY, Self::DEFAULT_MAX_CAPACITY)
    }
}

/// A circular FIFO holding the not-yet-discarded prefix of a [`Source`].
///
/// Logical index `i` lives in slot `(head + i) & (capacity - 1)`. Elements are
/// pulled from the source only when [`element_at`](Self::element_at) asks for
/// an index that is not buffered yet. When the buffer is full it doubles,
/// copying the live elements to the front of the new storage.
pub struct RingBuffer<S: Source> {
    source: S,
    slots: Vec<S::Item>,
    head: usize,
    len: usize,
    max_capacity: usize,
    exhausted: bool,
}

impl<S: Source> RingBuffer<S> {
    /// Creates an empty buffer over `source`. Nothing is read until an
    /// element is requested.
    pub fn new(source: S, limits: BufferLimits) -> Self {
        let capacity = limits.effective_initial();
        let slots = vec![source.end_marker(); capacity];
        Self {
            source,
            slots,
            head: 0,
            len: 0,
            max_capacity: limits.max_capacity,
            exhausted: false,
        }
    }

    /// Number of buffered elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current capacity; always a power of two.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the underlying source. Elements already buffered
    /// are not affected.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Returns the `i`-th buffered element, pulling from the source first if
    /// fewer than `i + 1` elements are buffered.
    pub fn element_at(&mut self, i: usize) -> Result<&S::Item> {
        if i >= self.len {
            self.fill(i + 1 - self.len)?;
        }
        let mask = self.mask();
        Ok(&self.slots[(self.head + i) & mask])
    }

    /// Returns the `i`-th element if it is already buffered.
    pub fn buffered(&self, i: usize) -> Option<&S::Item> {
        (i < self.len).then(|| &self.slots[(self.head + i) & self.mask()])
    }

    /// Drops the first `n` buffered elements.
    pub fn remove_front(&mut self, n: usize) {
        assert!(
            n <= self.len,
            "cannot remove {n} elements from a buffer holding {}",
            self.len
        );
        self.head = (self.head + n) & self.mask();
        self.len -= n;
        if self.len == 0 {
            self.head = 0;
        }
    }

    /// Replaces the source and forgets every buffered element. The allocated
    /// capacity is kept.
    pub fn reset(&mut self, source: S) -> S {
        self.head = 0;
        self.len = 0;
        self.exhausted = false;
        std::mem::replace(&mut self.source, source)
    }

    fn fill(&mut self, n: usize) -> Result<()> {
        let needed = self.len + n;
        if needed > self.capacity() {
            self.grow(needed)?;
        }

        let capacity = self.capacity();
        let start = (self.head + self.len) & self.mask();
        let first = n.min(capacity - start);
        self.pull(start, first)?;
        if n > first {
            self.pull(0, n - first)?;
        }
        self.len = needed;
        Ok(())
    }

    fn pull(&mut self, start: usize, n: usize) -> Result<()> {
        let region = &mut self.slots[start..start + n];
        if self.exhausted {
            region.fill(self.source.end_marker());
        } else if self.source.read_exact(region)? < n {
            self.exhausted = true;
        }
        Ok(())
    }

    fn grow(&mut self, needed: usize) -> Result<()> {
        let mut capacity = self.capacity();
        while capacity < needed {
            capacity *= 2;
        }
        if capacity > self.max_capacity {
            return Err(Error::BufferCapacityExceeded {
                requested: capacity,
                limit: self.max_capacity,
            });
        }
        log::trace!(
            "ring buffer grows from {} to {} ({} live)",
            self.capacity(),
            capacity,
            self.len
        );

        let marker = self.source.end_marker();
        let mut slots = vec![marker; capacity];
        let mask = self.mask();
        for (i, slot) in slots.iter_mut().take(self.len).enumerate() {
            std::mem::swap(slot, &mut self.slots[(self.head + i) & mask]);
        }
        self.slots = slots;
        self.head = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IterSource;

    fn numbers(n: u32) -> IterSource<std::ops::Range<u32>> {
        IterSource::new(0..n, u32::MAX)
    }

    #[test]
    fn sequential_reads_reproduce_the_source_for_any_capacity() {
        for initial in [1, 2, 3, 8, 64, 1000] {
            let mut ring = RingBuffer::new(numbers(300), BufferLimits::new(initial, 1 << 12));
            for i in 0..300 {
                assert_eq!(*ring.element_at(i as usize).unwrap(), i);
            }
            assert_eq!(*ring.element_at(300).unwrap(), u32::MAX);
            assert!(ring.capacity().is_power_of_two());
        }
    }

    #[test]
    fn pulls_lazily() {
        let mut ring = RingBuffer::new(numbers(100), BufferLimits::new(4, 64));
        assert_eq!(ring.len(), 0);
        ring.element_at(2).unwrap();
        assert_eq!(ring.len(), 3);
        ring.element_at(1).unwrap();
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn deep_lookahead_survives_growth_after_wraparound() {
        let mut ring = RingBuffer::new(numbers(1000), BufferLimits::new(4, 1 << 12));
        let mut base = 0u32;
        for round in 0..50 {
            ring.element_at(2).unwrap();
            ring.remove_front(3);
            base += 3;
            let depth = round * 3 + 1;
            assert_eq!(*ring.element_at(depth).unwrap(), base + depth as u32);
            assert_eq!(*ring.element_at(0).unwrap(), base);
            assert!(ring.capacity().is_power_of_two());
        }
    }

    #[test]
    fn capacity_is_capped() {
        let mut ring = RingBuffer::new(numbers(1000), BufferLimits::new(8, 32));
        assert_eq!(*ring.element_at(31).unwrap(), 31);
        match ring.element_at(32) {
            Err(Error::BufferCapacityExceeded { requested, limit }) => {
                assert_eq!(requested, 64);
                assert_eq!(limit, 32);
            }
            other => panic!("expected BufferCapacityExceeded, got {:?}", other.map(|x| *x)),
        }
    }

    #[test]
    fn end_marker_repeats_forever() {
        let mut ring = RingBuffer::new(numbers(2), BufferLimits::new(2, 64));
        for i in 2..40 {
            assert_eq!(*ring.element_at(i).unwrap(), u32::MAX);
        }
        assert_eq!(*ring.element_at(1).unwrap(), 1);
    }

    #[test]
    fn remove_front_and_reset() {
        let mut ring = RingBuffer::new(numbers(10), BufferLimits::default());
        ring.element_at(5).unwrap();
        ring.remove_front(4);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.buffered(0), Some(&4));
        assert_eq!(ring.buffered(2), None);

        ring.reset(numbers(3));
        assert!(ring.is_empty());
        assert_eq!(*ring.element_at(0).unwrap(), 0);
        assert_eq!(*ring.element_at(3).unwrap(), u32::MAX);
    }

    #[test]
    #[should_panic(expected = "cannot remove")]
    fn removing_unbuffered_elements_panics() {
        let mut ring = RingBuffer::new(numbers(10), BufferLimits::default());
        ring.element_at(1).unwrap();
        ring.remove_front(3);
    }
}
