//! Parallel-array bipartite mapping
//!
//! [`Bipartite<T>`] maps each of a sorted set of keys (or ranges) to the set
//! of transactions depending on it. It is stored as three flat arrays:
//!
//! ```text
//! keys:            [k0, k1, k2]
//! txn_ids:         [A, B, C]                    sorted, duplicate-free
//! keys_to_txn_ids: [5, 7, 8 | 0, 1 | 1, 2 | 2]
//!                   ^^^^^^^   ^^^^   ^^^^   ^
//!                   end offsets  k0    k1    k2
//! ```
//!
//! The first `keys.len()` entries of `keys_to_txn_ids` are cumulative end
//! offsets into the same array; the run of key `i` starts where the run of
//! key `i - 1` ends (the first run starts at `keys.len()`). Each run holds
//! strictly increasing indexes into `txn_ids`.
//!
//! This is the exact layout the dependency codec puts on the wire, so a
//! graph decodes with no re-indexing.

use crate::error::{Error, Result};
use crate::sorted::{is_strictly_ascending, SortedList};
use crate::types::TxnId;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

/// Reversible mapping `T -> set<TxnId>` in parallel-array form.
///
/// Deserializing checks the shape and ordering of all three arrays, so a
/// malformed record is an error rather than a graph that panics on access.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Bipartite<T> {
    keys: SortedList<T>,
    txn_ids: Vec<TxnId>,
    keys_to_txn_ids: Vec<u32>,
}

impl<T> Bipartite<T> {
    /// The empty mapping.
    pub const NONE: Bipartite<T> = Bipartite {
        keys: SortedList::EMPTY,
        txn_ids: Vec::new(),
        keys_to_txn_ids: Vec::new(),
    };

    /// The empty mapping
    pub const fn none() -> Self {
        Self::NONE
    }

    /// Build from raw parallel arrays without validating them.
    ///
    /// Callers are responsible for every invariant in the module docs. Only
    /// the shape is checked, and only in debug builds.
    pub fn from_parts_unchecked(
        keys: SortedList<T>,
        txn_ids: Vec<TxnId>,
        keys_to_txn_ids: Vec<u32>,
    ) -> Self {
        debug_assert!(
            check_shape(keys.len(), txn_ids.len(), &keys_to_txn_ids).is_ok(),
            "Bipartite::from_parts_unchecked given inconsistent arrays"
        );
        Bipartite {
            keys,
            txn_ids,
            keys_to_txn_ids,
        }
    }

    /// Build from raw parallel arrays, verifying their shape.
    ///
    /// Sort order is not re-validated; only the structure the accessors rely
    /// on is: header length, monotonic in-bounds offsets, a final offset equal
    /// to the array length, and txn indexes within `txn_ids`.
    ///
    /// # Errors
    ///
    /// `Error::Corruption` describing the first inconsistency found.
    pub fn try_from_parts(
        keys: SortedList<T>,
        txn_ids: Vec<TxnId>,
        keys_to_txn_ids: Vec<u32>,
    ) -> Result<Self> {
        check_shape(keys.len(), txn_ids.len(), &keys_to_txn_ids)?;
        Ok(Bipartite {
            keys,
            txn_ids,
            keys_to_txn_ids,
        })
    }

    /// The keys (or ranges), ascending
    pub fn keys(&self) -> &SortedList<T> {
        &self.keys
    }

    /// Number of keys (or ranges)
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Key at position `i`.
    ///
    /// # Panics
    ///
    /// If `i >= key_count()`.
    pub fn key(&self, i: usize) -> &T {
        &self.keys.as_slice()[i]
    }

    /// Every transaction referenced by any key, ascending
    pub fn txn_ids(&self) -> &[TxnId] {
        &self.txn_ids
    }

    /// Number of distinct transactions
    pub fn txn_id_count(&self) -> usize {
        self.txn_ids.len()
    }

    /// Transaction at position `i`.
    ///
    /// # Panics
    ///
    /// If `i >= txn_id_count()`.
    pub fn txn_id(&self, i: usize) -> TxnId {
        self.txn_ids[i]
    }

    /// Length of the raw offsets-plus-runs array
    pub fn keys_to_txn_ids_count(&self) -> usize {
        self.keys_to_txn_ids.len()
    }

    /// Raw entry `i` of the offsets-plus-runs array
    pub fn keys_to_txn_ids(&self, i: usize) -> u32 {
        self.keys_to_txn_ids[i]
    }

    /// Number of (key, txn) associations
    pub fn total_associations(&self) -> usize {
        self.keys_to_txn_ids.len() - self.keys.len()
    }

    /// True if no key has any dependency
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Check whether `txn_id` is referenced by any key
    pub fn contains(&self, txn_id: &TxnId) -> bool {
        self.txn_ids.binary_search(txn_id).is_ok()
    }

    fn run(&self, key_index: usize) -> Range<usize> {
        let start = if key_index == 0 {
            self.keys.len()
        } else {
            self.keys_to_txn_ids[key_index - 1] as usize
        };
        start..self.keys_to_txn_ids[key_index] as usize
    }

    /// Transactions depending on the key at position `key_index`, ascending.
    ///
    /// # Panics
    ///
    /// If `key_index >= key_count()`.
    pub fn txn_ids_for_key(&self, key_index: usize) -> RunIter<'_> {
        RunIter {
            txn_ids: &self.txn_ids,
            indexes: self.keys_to_txn_ids[self.run(key_index)].iter(),
        }
    }

    /// Iterate by key: each key with the transactions depending on it.
    pub fn for_each_key(&self) -> impl Iterator<Item = (&T, RunIter<'_>)> + '_ {
        self.keys
            .iter()
            .enumerate()
            .map(move |(i, key)| (key, self.txn_ids_for_key(i)))
    }

    /// Every `(key, txn)` association, key-major.
    pub fn pairs(&self) -> impl Iterator<Item = (&T, TxnId)> + '_ {
        self.for_each_key()
            .flat_map(|(key, txns)| txns.map(move |txn| (key, txn)))
    }

    /// Iterate by transaction: each transaction with the keys it appears under.
    pub fn by_txn_id(&self) -> Vec<(TxnId, Vec<&T>)> {
        let mut inverted: Vec<Vec<&T>> = vec![Vec::new(); self.txn_ids.len()];
        for (i, key) in self.keys.iter().enumerate() {
            for &idx in &self.keys_to_txn_ids[self.run(i)] {
                inverted[idx as usize].push(key);
            }
        }
        self.txn_ids.iter().copied().zip(inverted).collect()
    }

    /// Keys that `txn_id` depends on, ascending.
    pub fn keys_for_txn_id(&self, txn_id: &TxnId) -> Vec<&T> {
        let Ok(idx) = self.txn_ids.binary_search(txn_id) else {
            return Vec::new();
        };
        let idx = idx as u32;
        self.keys
            .iter()
            .enumerate()
            .filter(|(i, _)| self.keys_to_txn_ids[self.run(*i)].binary_search(&idx).is_ok())
            .map(|(_, key)| key)
            .collect()
    }
}

impl<T: Ord + Clone> Bipartite<T> {
    /// Start building a canonical mapping from arbitrary pairs
    pub fn builder() -> BipartiteBuilder<T> {
        BipartiteBuilder::new()
    }

    /// Transactions depending on `key`; empty if the key is absent
    pub fn txn_ids_for(&self, key: &T) -> Vec<TxnId> {
        match self.keys.index_of(key) {
            Some(i) => self.txn_ids_for_key(i).collect(),
            None => Vec::new(),
        }
    }

    /// Union of several mappings.
    pub fn merge<'a>(graphs: impl IntoIterator<Item = &'a Bipartite<T>>) -> Self
    where
        T: 'a,
    {
        let mut builder = BipartiteBuilder::new();
        for graph in graphs {
            for (key, txn_id) in graph.pairs() {
                builder.add(key.clone(), txn_id);
            }
        }
        builder.build()
    }

    /// Restrict to the keys matching `keep`.
    pub fn filter_keys(&self, mut keep: impl FnMut(&T) -> bool) -> Self {
        let mut builder = BipartiteBuilder::new();
        for (key, txns) in self.for_each_key() {
            if keep(key) {
                builder.add_all(key.clone(), txns);
            }
        }
        builder.build()
    }

    /// Restrict to the associations whose transaction matches `keep`.
    pub fn filter_txn_ids(&self, mut keep: impl FnMut(&TxnId) -> bool) -> Self {
        let mut builder = BipartiteBuilder::new();
        for (key, txn_id) in self.pairs() {
            if keep(&txn_id) {
                builder.add(key.clone(), txn_id);
            }
        }
        builder.build()
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Ord"))]
struct BipartiteParts<T> {
    keys: SortedList<T>,
    txn_ids: Vec<TxnId>,
    keys_to_txn_ids: Vec<u32>,
}

impl<'de, T: Deserialize<'de> + Ord> Deserialize<'de> for Bipartite<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let parts = BipartiteParts::<T>::deserialize(deserializer)?;
        check_order(parts.keys.len(), &parts.txn_ids, &parts.keys_to_txn_ids)
            .and_then(|()| {
                Bipartite::try_from_parts(parts.keys, parts.txn_ids, parts.keys_to_txn_ids)
            })
            .map_err(de::Error::custom)
    }
}

impl<T> Default for Bipartite<T> {
    fn default() -> Self {
        Self::NONE
    }
}

/// Iterator over the transactions in one key's run.
#[derive(Clone, Debug)]
pub struct RunIter<'a> {
    txn_ids: &'a [TxnId],
    indexes: std::slice::Iter<'a, u32>,
}

impl Iterator for RunIter<'_> {
    type Item = TxnId;

    fn next(&mut self) -> Option<TxnId> {
        self.indexes.next().map(|&i| self.txn_ids[i as usize])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indexes.size_hint()
    }
}

impl ExactSizeIterator for RunIter<'_> {}

/// Accumulates `(key, txn)` pairs in any order and emits a canonical graph.
#[derive(Clone, Debug)]
pub struct BipartiteBuilder<T> {
    map: BTreeMap<T, BTreeSet<TxnId>>,
}

impl<T: Ord + Clone> BipartiteBuilder<T> {
    /// Empty builder
    pub fn new() -> Self {
        BipartiteBuilder {
            map: BTreeMap::new(),
        }
    }

    /// Record that `txn_id` depends on `key`
    pub fn add(&mut self, key: T, txn_id: TxnId) -> &mut Self {
        self.map.entry(key).or_default().insert(txn_id);
        self
    }

    /// Record several transactions under one key
    pub fn add_all(&mut self, key: T, txn_ids: impl IntoIterator<Item = TxnId>) -> &mut Self {
        // keys without dependencies are never stored
        let mut txn_ids = txn_ids.into_iter().peekable();
        if txn_ids.peek().is_some() {
            self.map.entry(key).or_default().extend(txn_ids);
        }
        self
    }

    /// Number of keys recorded so far
    pub fn key_count(&self) -> usize {
        self.map.len()
    }

    /// Emit the canonical parallel-array form
    pub fn build(self) -> Bipartite<T> {
        let txn_ids: Vec<TxnId> = self
            .map
            .values()
            .flatten()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: BTreeMap<TxnId, u32> = txn_ids
            .iter()
            .enumerate()
            .map(|(i, t)| (*t, i as u32))
            .collect();

        let key_count = self.map.len();
        let associations: usize = self.map.values().map(BTreeSet::len).sum();
        let mut keys = Vec::with_capacity(key_count);
        let mut keys_to_txn_ids = vec![0u32; key_count];
        keys_to_txn_ids.reserve(associations);

        for (i, (key, txns)) in self.map.into_iter().enumerate() {
            keys_to_txn_ids.extend(txns.iter().map(|t| index[t]));
            keys_to_txn_ids[i] = keys_to_txn_ids.len() as u32;
            keys.push(key);
        }

        Bipartite {
            keys: SortedList::from_sorted_unchecked(keys),
            txn_ids,
            keys_to_txn_ids,
        }
    }
}

impl<T: Ord + Clone> Default for BipartiteBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape plus ordering: ascending txn ids and strictly ascending runs.
fn check_order(key_count: usize, txn_ids: &[TxnId], keys_to_txn_ids: &[u32]) -> Result<()> {
    check_shape(key_count, txn_ids.len(), keys_to_txn_ids)?;
    if !is_strictly_ascending(txn_ids) {
        return Err(Error::Corruption(
            "txn ids are not strictly ascending".to_string(),
        ));
    }
    let mut start = key_count;
    for (i, &end) in keys_to_txn_ids[..key_count].iter().enumerate() {
        let end = end as usize;
        if !is_strictly_ascending(&keys_to_txn_ids[start..end]) {
            return Err(Error::Corruption(format!(
                "txn run of key {} is not strictly ascending",
                i
            )));
        }
        start = end;
    }
    Ok(())
}

fn check_shape(key_count: usize, txn_id_count: usize, keys_to_txn_ids: &[u32]) -> Result<()> {
    if keys_to_txn_ids.len() < key_count {
        return Err(Error::Corruption(format!(
            "keys_to_txn_ids has {} entries, fewer than the {} keys it indexes",
            keys_to_txn_ids.len(),
            key_count
        )));
    }
    let mut prev = key_count;
    for (i, &end) in keys_to_txn_ids[..key_count].iter().enumerate() {
        let end = end as usize;
        if end < prev || end > keys_to_txn_ids.len() {
            return Err(Error::Corruption(format!(
                "run offset {} for key {} out of order or bounds (previous {}, length {})",
                end,
                i,
                prev,
                keys_to_txn_ids.len()
            )));
        }
        prev = end;
    }
    if prev != keys_to_txn_ids.len() {
        return Err(Error::Corruption(format!(
            "last run ends at {} but keys_to_txn_ids has {} entries",
            prev,
            keys_to_txn_ids.len()
        )));
    }
    if let Some(bad) = keys_to_txn_ids[key_count..]
        .iter()
        .find(|&&idx| idx as usize >= txn_id_count)
    {
        return Err(Error::Corruption(format!(
            "txn index {} out of bounds for {} txn ids",
            bad, txn_id_count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(hlc: u64) -> TxnId {
        TxnId::new(1, hlc, 0, 1)
    }

    fn sample() -> Bipartite<u32> {
        let mut b = Bipartite::builder();
        b.add(1, txn(10)).add(2, txn(10)).add(2, txn(20)).add(3, txn(20));
        b.build()
    }

    #[test]
    fn test_builder_layout() {
        let g = sample();
        assert_eq!(g.keys().as_slice(), &[1, 2, 3]);
        assert_eq!(g.txn_ids(), &[txn(10), txn(20)]);
        // offsets [4, 6, 7], then runs [0] [0, 1] [1]
        let raw: Vec<u32> = (0..g.keys_to_txn_ids_count())
            .map(|i| g.keys_to_txn_ids(i))
            .collect();
        assert_eq!(raw, vec![4, 6, 7, 0, 0, 1, 1]);
        assert_eq!(g.total_associations(), 4);
    }

    #[test]
    fn test_iterate_by_key() {
        let g = sample();
        assert_eq!(g.txn_ids_for(&1), vec![txn(10)]);
        assert_eq!(g.txn_ids_for(&2), vec![txn(10), txn(20)]);
        assert_eq!(g.txn_ids_for(&3), vec![txn(20)]);
        assert!(g.txn_ids_for(&4).is_empty());
        assert_eq!(g.txn_ids_for_key(1).len(), 2);
    }

    #[test]
    fn test_iterate_by_txn() {
        let g = sample();
        let inverted = g.by_txn_id();
        assert_eq!(inverted.len(), 2);
        assert_eq!(inverted[0], (txn(10), vec![&1, &2]));
        assert_eq!(inverted[1], (txn(20), vec![&2, &3]));
        assert_eq!(g.keys_for_txn_id(&txn(20)), vec![&2, &3]);
        assert!(g.keys_for_txn_id(&txn(99)).is_empty());
    }

    #[test]
    fn test_builder_collapses_duplicates() {
        let mut b = Bipartite::builder();
        b.add(5, txn(1)).add(5, txn(1)).add(5, txn(1));
        let g = b.build();
        assert_eq!(g.key_count(), 1);
        assert_eq!(g.total_associations(), 1);
    }

    #[test]
    fn test_add_all_with_no_txns_stores_nothing() {
        let mut b = Bipartite::<u32>::builder();
        b.add_all(7, Vec::new());
        assert_eq!(b.key_count(), 0);
        assert!(b.build().is_empty());
    }

    #[test]
    fn test_merge_is_union() {
        let mut a = Bipartite::builder();
        a.add(1, txn(1));
        let mut b = Bipartite::builder();
        b.add(1, txn(2)).add(2, txn(1));
        let merged = Bipartite::merge([&a.build(), &b.build()]);
        assert_eq!(merged.txn_ids_for(&1), vec![txn(1), txn(2)]);
        assert_eq!(merged.txn_ids_for(&2), vec![txn(1)]);
    }

    #[test]
    fn test_filters() {
        let g = sample();
        let keys = g.filter_keys(|k| *k != 2);
        assert_eq!(keys.keys().as_slice(), &[1, 3]);
        let txns = g.filter_txn_ids(|t| *t == txn(20));
        assert_eq!(txns.keys().as_slice(), &[2, 3]);
        assert_eq!(txns.txn_ids(), &[txn(20)]);
    }

    #[test]
    fn test_try_from_parts_accepts_builder_output() {
        let g = sample();
        let rebuilt = Bipartite::try_from_parts(
            g.keys().clone(),
            g.txn_ids().to_vec(),
            (0..g.keys_to_txn_ids_count())
                .map(|i| g.keys_to_txn_ids(i))
                .collect(),
        )
        .unwrap();
        assert_eq!(rebuilt, g);
    }

    #[test]
    fn test_try_from_parts_rejects_bad_shapes() {
        let keys = SortedList::of(vec![1u32, 2]);
        let txns = vec![txn(1)];
        // header shorter than key count
        assert!(Bipartite::try_from_parts(keys.clone(), txns.clone(), vec![2]).is_err());
        // offsets decreasing
        assert!(Bipartite::try_from_parts(keys.clone(), txns.clone(), vec![4, 3, 0, 0]).is_err());
        // final offset short of array length
        assert!(Bipartite::try_from_parts(keys.clone(), txns.clone(), vec![3, 3, 0, 0]).is_err());
        // txn index out of bounds
        assert!(Bipartite::try_from_parts(keys.clone(), txns.clone(), vec![3, 4, 0, 1]).is_err());
        // fine
        assert!(Bipartite::try_from_parts(keys, txns, vec![3, 4, 0, 0]).is_ok());
    }

    #[test]
    fn test_deserialize_validates_arrays() {
        let good = sample();
        let bytes = rmp_serde::to_vec(&good).unwrap();
        assert_eq!(rmp_serde::from_slice::<Bipartite<u32>>(&bytes).unwrap(), good);

        // run offset points past the array and no txn ids back the index
        let bytes = rmp_serde::to_vec(&(vec![1u32], Vec::<TxnId>::new(), vec![3u32, 0])).unwrap();
        assert!(rmp_serde::from_slice::<Bipartite<u32>>(&bytes).is_err());

        // txn ids out of order
        let bytes = rmp_serde::to_vec(&(vec![1u32], vec![txn(2), txn(1)], vec![2u32, 0])).unwrap();
        assert!(rmp_serde::from_slice::<Bipartite<u32>>(&bytes).is_err());

        // run not strictly ascending
        let bytes =
            rmp_serde::to_vec(&(vec![1u32], vec![txn(1), txn(2)], vec![3u32, 1, 0])).unwrap();
        assert!(rmp_serde::from_slice::<Bipartite<u32>>(&bytes).is_err());

        // unsorted keys
        let bytes = rmp_serde::to_vec(&(vec![2u32, 1], vec![txn(1)], vec![3u32, 4, 0, 0])).unwrap();
        assert!(rmp_serde::from_slice::<Bipartite<u32>>(&bytes).is_err());
    }

    #[test]
    fn test_none() {
        let g: Bipartite<u32> = Bipartite::NONE;
        assert!(g.is_empty());
        assert_eq!(g.total_associations(), 0);
        assert_eq!(g, Bipartite::default());
        assert_eq!(g, Bipartite::none());
        assert!(Bipartite::<u32>::try_from_parts(SortedList::EMPTY, Vec::new(), Vec::new()).is_ok());
    }
}
