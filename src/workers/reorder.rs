use std::collections::HashMap;

/// Holding area that turns out-of-order arrivals into an in-order stream.
///
/// Items are keyed by a monotonic sequence number starting at zero. An item is
/// released only once every item with a smaller sequence number has been
/// released before it.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next: usize,
    held: HashMap<usize, T>,
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReorderBuffer<T> {
    pub fn new() -> Self {
        Self { next: 0, held: HashMap::with_capacity(128) }
    }

    /// Stores `item` under `seq`. Returns `false` (and drops the item) if `seq`
    /// was already released or is already held.
    pub fn insert(&mut self, seq: usize, item: T) -> bool {
        if seq < self.next || self.held.contains_key(&seq) {
            return false;
        }
        self.held.insert(seq, item);
        true
    }

    /// Releases the item with the next expected sequence number, if it has arrived.
    pub fn pop_next(&mut self) -> Option<T> {
        let item = self.held.remove(&self.next)?;
        self.next += 1;
        Some(item)
    }

    /// Sequence number of the next item to be released.
    pub fn next_seq(&self) -> usize {
        self.next
    }

    /// Number of items waiting for a predecessor.
    pub fn held(&self) -> usize {
        self.held.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_arrivals_pass_straight_through() {
        let mut buf = ReorderBuffer::new();
        for i in 0..5 {
            assert!(buf.insert(i, i * 10));
            assert_eq!(buf.pop_next(), Some(i * 10));
        }
        assert_eq!(buf.next_seq(), 5);
        assert_eq!(buf.held(), 0);
    }

    #[test]
    fn early_arrivals_wait_for_the_gap() {
        let mut buf = ReorderBuffer::new();
        buf.insert(2, "c");
        buf.insert(1, "b");
        assert_eq!(buf.pop_next(), None);
        assert_eq!(buf.held(), 2);

        buf.insert(0, "a");
        let drained: Vec<_> = std::iter::from_fn(|| buf.pop_next()).collect();
        assert_eq!(drained, vec!["a", "b", "c"]);
        assert_eq!(buf.next_seq(), 3);
    }

    #[test]
    fn duplicates_and_stale_items_are_rejected() {
        let mut buf = ReorderBuffer::new();
        assert!(buf.insert(0, 'x'));
        assert!(!buf.insert(0, 'y'));
        assert_eq!(buf.pop_next(), Some('x'));
        assert!(!buf.insert(0, 'z'));
        assert_eq!(buf.pop_next(), None);
    }
}
