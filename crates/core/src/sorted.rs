//! Sorted, duplicate-free sequences
//!
//! `SortedList<T>` backs both [`RoutingKeys`](crate::key::RoutingKeys) and
//! [`Ranges`](crate::range::Ranges). Every constructor except
//! [`SortedList::from_sorted_unchecked`] establishes the invariant itself.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sorted (ascending), duplicate-free sequence.
///
/// Serialized as a plain sequence; deserializing rejects input that is not
/// strictly ascending.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SortedList<T> {
    items: Vec<T>,
}

impl<T> SortedList<T> {
    /// The empty sequence.
    pub const EMPTY: SortedList<T> = SortedList { items: Vec::new() };

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the sequence is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at position `i`, if any
    pub fn get(&self, i: usize) -> Option<&T> {
        self.items.get(i)
    }

    /// Iterate in ascending order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Borrow as a slice
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Take the underlying vector
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Ord> SortedList<T> {
    /// Build from arbitrary elements, sorting and removing duplicates.
    pub fn of(items: impl IntoIterator<Item = T>) -> Self {
        let mut items: Vec<T> = items.into_iter().collect();
        items.sort();
        items.dedup();
        SortedList { items }
    }

    /// Wrap a vector the caller guarantees is already sorted and duplicate-free.
    ///
    /// Used on trusted paths (wire decoding after validation, builders).
    /// The order is only checked in debug builds.
    pub fn from_sorted_unchecked(items: Vec<T>) -> Self {
        debug_assert!(
            is_strictly_ascending(&items),
            "SortedList::from_sorted_unchecked given unsorted or duplicated input"
        );
        SortedList { items }
    }

    /// Position of `item`, if present (binary search).
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.binary_search(item).ok()
    }

    /// Check whether `item` is present
    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// True if every element of `self` is in `superset`.
    pub fn is_subset_of(&self, superset: &SortedList<T>) -> bool {
        is_subset(&self.items, &superset.items)
    }

    /// Keep the elements matching `keep`; order is preserved.
    pub fn filter(&self, mut keep: impl FnMut(&T) -> bool) -> Self
    where
        T: Clone,
    {
        SortedList {
            items: self.items.iter().filter(|t| keep(t)).cloned().collect(),
        }
    }

    /// Sorted union of two sequences.
    pub fn union(&self, other: &SortedList<T>) -> Self
    where
        T: Clone,
    {
        let (a, b) = (&self.items, &other.items);
        let mut out = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => {
                    out.push(a[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    out.push(b[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    out.push(a[i].clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&a[i..]);
        out.extend_from_slice(&b[j..]);
        SortedList { items: out }
    }
}

impl<'de, T: Deserialize<'de> + Ord> Deserialize<'de> for SortedList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        if !is_strictly_ascending(&items) {
            return Err(de::Error::custom(
                "sorted list elements are not strictly ascending",
            ));
        }
        Ok(SortedList { items })
    }
}

impl<T> Default for SortedList<T> {
    fn default() -> Self {
        SortedList { items: Vec::new() }
    }
}

impl<'a, T> IntoIterator for &'a SortedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Ord> FromIterator<T> for SortedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        SortedList::of(iter)
    }
}

/// True if `items` is strictly ascending (sorted and duplicate-free).
pub fn is_strictly_ascending<T: Ord>(items: &[T]) -> bool {
    items.windows(2).all(|w| w[0] < w[1])
}

/// Subset test over two sorted, duplicate-free sequences.
///
/// Folds over `superset`, co-iterating `test`, and counts the elements of
/// `superset` that also occur in `test`. The test holds iff that count equals
/// `test.len()`. A single pass, `O(|test| + |superset|)`.
///
/// Unsorted input never panics but the answer is unspecified.
pub fn is_subset<T: Ord>(test: &[T], superset: &[T]) -> bool {
    if test.len() > superset.len() {
        return false;
    }
    let mut t = 0;
    let found = superset.iter().fold(0usize, |found, item| {
        while t < test.len() && test[t] < *item {
            t += 1;
        }
        if t < test.len() && test[t] == *item {
            t += 1;
            found + 1
        } else {
            found
        }
    });
    found == test.len()
}
