//! Dependency graphs
//!
//! A transaction's dependencies are the other transactions that conflict with
//! it, either on an individual key or on a token range. They are kept as three
//! bipartite mappings merged into one [`Deps`]:
//!
//! - `key_deps`: key -> transactions
//! - `range_deps`: range -> transactions
//! - `direct_key_deps`: key -> transactions discovered by exact-key access,
//!   usually keyed by a subset of `key_deps`' keys
//!
//! The union of the three is the complete conflict set the ordering algorithm
//! must respect. [`PartialDeps`] adds the slice of the keyspace the graph is
//! known to represent accurately.

mod aggregate;
mod bipartite;

pub use aggregate::{Deps, PartialDeps};
pub use bipartite::{Bipartite, BipartiteBuilder, RunIter};
pub use crate::sorted::is_subset;

use crate::key::RoutingKey;
use crate::range::{Participants, TokenRange};
use crate::types::TxnId;

/// Key -> transactions mapping.
pub type KeyDeps = Bipartite<RoutingKey>;

/// Range -> transactions mapping.
pub type RangeDeps = Bipartite<TokenRange>;

impl Bipartite<RoutingKey> {
    /// Keep only the keys inside `covering`.
    pub fn slice(&self, covering: &Participants) -> KeyDeps {
        self.filter_keys(|key| covering.contains_key(key))
    }
}

impl Bipartite<TokenRange> {
    /// Number of ranges
    pub fn range_count(&self) -> usize {
        self.key_count()
    }

    /// Range at position `i`.
    ///
    /// # Panics
    ///
    /// If `i >= range_count()`.
    pub fn range(&self, i: usize) -> &TokenRange {
        self.key(i)
    }

    /// Keep only the ranges touching `covering`.
    pub fn slice(&self, covering: &Participants) -> RangeDeps {
        self.filter_keys(|range| covering.intersects_range(range))
    }

    /// Transactions whose ranges contain `key`, ascending and deduplicated.
    pub fn txn_ids_containing(&self, key: &RoutingKey) -> Vec<TxnId> {
        let mut out: Vec<TxnId> = self
            .for_each_key()
            .filter(|(range, _)| range.contains(key))
            .flat_map(|(_, txns)| txns)
            .collect();
        out.sort();
        out.dedup();
        out
    }
}
