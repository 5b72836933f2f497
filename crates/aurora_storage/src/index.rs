//! Sorted multiset index over fixed-width keys.
//!
//! Every table, every derived source and every aggregate is backed by one
//! `SortedIndex`. Keys are stored as [`Bound`] tuples so that partial keys
//! padded with `Least`/`Greatest` can be used directly as seek targets.
//! The map is persistent (`im::OrdMap`), so cloning an index is O(1).

use std::ops::Bound as RangeBound;

use aurora_foundation::{Bound, Row, Value};
use im::OrdMap;

/// A sorted key → count multiset.
///
/// Counts are signed: table indexes only ever hold positive counts, while
/// delta indexes (e.g. aggregate output diffs) may hold negative ones. An
/// entry whose count reaches zero is removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SortedIndex {
    key_len: usize,
    entries: OrdMap<Vec<Bound>, i64>,
}

impl SortedIndex {
    /// Creates an empty index over keys of `key_len` columns.
    #[must_use]
    pub fn new(key_len: usize) -> Self {
        Self {
            key_len,
            entries: OrdMap::new(),
        }
    }

    /// Returns the key width.
    #[must_use]
    pub const fn key_len(&self) -> usize {
        self.key_len
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.entries = OrdMap::new();
    }

    /// Inserts `row` with count 1 if absent.
    ///
    /// Returns true if the row was new, false if it was already present.
    pub fn insert(&mut self, row: &[Value]) -> bool {
        debug_assert_eq!(row.len(), self.key_len);
        let key = to_key(row);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, 1);
        true
    }

    /// Adds `delta` to the count of `row`, returning the new count.
    pub fn update(&mut self, row: &[Value], delta: i64) -> i64 {
        debug_assert_eq!(row.len(), self.key_len);
        self.update_key(to_key(row), delta)
    }

    /// Adds `delta` to the count of an already-bounded key.
    pub fn update_key(&mut self, key: Vec<Bound>, delta: i64) -> i64 {
        if delta == 0 {
            return self.entries.get(&key).copied().unwrap_or(0);
        }
        let count = self.entries.get(&key).copied().unwrap_or(0) + delta;
        if count == 0 {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, count);
        }
        count
    }

    /// Removes `row` entirely, returning the count it had.
    pub fn remove(&mut self, row: &[Value]) -> i64 {
        self.entries.remove(&to_key(row)).unwrap_or(0)
    }

    /// Returns the count stored for an exact key (0 if absent).
    #[must_use]
    pub fn lookup(&self, key: &[Bound]) -> i64 {
        self.entries.get(key).copied().unwrap_or(0)
    }

    /// Returns the count stored for a row (0 if absent).
    #[must_use]
    pub fn count(&self, row: &[Value]) -> i64 {
        self.lookup(&to_key(row))
    }

    /// Returns true if the row is present.
    #[must_use]
    pub fn contains(&self, row: &[Value]) -> bool {
        self.count(row) != 0
    }

    /// Returns the smallest stored key that is `>= target`.
    #[must_use]
    pub fn seek_gte(&self, target: &[Bound]) -> Option<&[Bound]> {
        self.entries
            .range::<_, [Bound]>((RangeBound::Included(target), RangeBound::Unbounded))
            .next()
            .map(|(key, _)| key.as_slice())
    }

    /// Returns the smallest stored key that is `> target`.
    #[must_use]
    pub fn seek_gt(&self, target: &[Bound]) -> Option<&[Bound]> {
        self.entries
            .range::<_, [Bound]>((RangeBound::Excluded(target), RangeBound::Unbounded))
            .next()
            .map(|(key, _)| key.as_slice())
    }

    /// Iterates keys and counts in ascending order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&[Bound], i64)> + '_ {
        self.entries.iter().map(|(key, count)| (key.as_slice(), *count))
    }

    /// Iterates rows and counts in ascending order.
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = (Row, i64)> + '_ {
        self.iter().map(|(key, count)| (to_row(key), count))
    }

    /// Dumps every row with its count, in ascending order.
    #[must_use]
    pub fn elems(&self) -> Vec<(Row, i64)> {
        self.rows().collect()
    }
}

/// Wraps each value of a row as a bounded key column.
#[must_use]
pub fn to_key(row: &[Value]) -> Vec<Bound> {
    row.iter().cloned().map(Bound::Value).collect()
}

/// Unwraps a stored key back into a row.
///
/// Stored keys never contain sentinels; any that did would be dropped.
#[must_use]
pub fn to_row(key: &[Bound]) -> Row {
    key.iter().filter_map(|b| b.value().cloned()).collect()
}

/// Returns true if the first `n` columns of `a` and `b` differ.
#[must_use]
pub fn prefix_ne<T: PartialEq>(a: &[T], b: &[T], n: usize) -> bool {
    a.iter().take(n).ne(b.iter().take(n))
}

/// Returns a key of width `n` that sorts after every stored key.
#[must_use]
pub fn greatest_key(n: usize) -> Vec<Bound> {
    vec![Bound::Greatest; n]
}
