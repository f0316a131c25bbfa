//! Per-transaction dependency aggregate

use super::{KeyDeps, RangeDeps};
use crate::error::{Error, Result};
use crate::key::RoutingKey;
use crate::range::Participants;
use crate::types::TxnId;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Complete dependency set of one transaction.
///
/// None of the three mappings may be dropped: each one can carry conflicts
/// the others do not.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deps {
    /// Key -> transactions
    pub key_deps: KeyDeps,
    /// Range -> transactions
    pub range_deps: RangeDeps,
    /// Key -> transactions discovered through exact-key access
    pub direct_key_deps: KeyDeps,
}

impl Deps {
    /// No dependencies.
    pub const NONE: Deps = Deps {
        key_deps: KeyDeps::NONE,
        range_deps: RangeDeps::NONE,
        direct_key_deps: KeyDeps::NONE,
    };

    /// Assemble from the three mappings
    pub fn new(key_deps: KeyDeps, range_deps: RangeDeps, direct_key_deps: KeyDeps) -> Self {
        Deps {
            key_deps,
            range_deps,
            direct_key_deps,
        }
    }

    /// True if there is no dependency of any kind
    pub fn is_empty(&self) -> bool {
        self.key_deps.is_empty() && self.range_deps.is_empty() && self.direct_key_deps.is_empty()
    }

    /// Every transaction referenced by any of the three mappings, ascending
    pub fn txn_ids(&self) -> Vec<TxnId> {
        let mut out: Vec<TxnId> = self
            .key_deps
            .txn_ids()
            .iter()
            .chain(self.range_deps.txn_ids())
            .chain(self.direct_key_deps.txn_ids())
            .copied()
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Check whether `txn_id` is a dependency
    pub fn contains(&self, txn_id: &TxnId) -> bool {
        self.key_deps.contains(txn_id)
            || self.range_deps.contains(txn_id)
            || self.direct_key_deps.contains(txn_id)
    }

    /// Transactions conflicting on `key`, through any mapping, ascending
    pub fn txn_ids_for_key(&self, key: &RoutingKey) -> Vec<TxnId> {
        let mut out = self.key_deps.txn_ids_for(key);
        out.extend(self.direct_key_deps.txn_ids_for(key));
        out.extend(self.range_deps.txn_ids_containing(key));
        out.sort();
        out.dedup();
        out
    }

    /// Latest dependency, if any
    pub fn max_txn_id(&self) -> Option<TxnId> {
        [
            self.key_deps.txn_ids().last(),
            self.range_deps.txn_ids().last(),
            self.direct_key_deps.txn_ids().last(),
        ]
        .into_iter()
        .flatten()
        .max()
        .copied()
    }

    /// Union of several dependency sets, mapping by mapping.
    pub fn merge<'a>(all: impl IntoIterator<Item = &'a Deps> + Clone) -> Deps {
        Deps {
            key_deps: KeyDeps::merge(all.clone().into_iter().map(|d| &d.key_deps)),
            range_deps: RangeDeps::merge(all.clone().into_iter().map(|d| &d.range_deps)),
            direct_key_deps: KeyDeps::merge(all.into_iter().map(|d| &d.direct_key_deps)),
        }
    }

    /// Drop the dependencies matching `remove`.
    pub fn without(&self, mut remove: impl FnMut(&TxnId) -> bool) -> Deps {
        Deps {
            key_deps: self.key_deps.filter_txn_ids(|t| !remove(t)),
            range_deps: self.range_deps.filter_txn_ids(|t| !remove(t)),
            direct_key_deps: self.direct_key_deps.filter_txn_ids(|t| !remove(t)),
        }
    }

    /// Restrict to the part of the keyspace in `covering`.
    pub fn slice(&self, covering: &Participants) -> PartialDeps {
        PartialDeps {
            covering: covering.clone(),
            deps: Deps {
                key_deps: self.key_deps.slice(covering),
                range_deps: self.range_deps.slice(covering),
                direct_key_deps: self.direct_key_deps.slice(covering),
            },
        }
    }
}

/// Dependencies known to be complete for the `covering` part of the keyspace.
///
/// A replica computes dependencies only for what it replicates, so the
/// covering set records how far the graph can be trusted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialDeps {
    covering: Participants,
    deps: Deps,
}

impl PartialDeps {
    /// Wrap `deps` with the covering set it is accurate for
    pub fn new(covering: Participants, deps: Deps) -> Self {
        PartialDeps { covering, deps }
    }

    /// Empty graph covering `covering`
    pub fn none(covering: Participants) -> Self {
        PartialDeps {
            covering,
            deps: Deps::NONE,
        }
    }

    /// Keys or ranges this graph accurately represents
    pub fn covering(&self) -> &Participants {
        &self.covering
    }

    /// The underlying dependency set
    pub fn deps(&self) -> &Deps {
        &self.deps
    }

    /// Check whether this graph is known accurate for all of `participants`
    pub fn covers(&self, participants: &Participants) -> bool {
        self.covering.covers(participants)
    }

    /// Combine with another partial graph of the same covering domain.
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` if the covering sets are of different domains.
    pub fn with(&self, other: &PartialDeps) -> Result<PartialDeps> {
        let covering = self.covering.union(&other.covering).map_err(|e| match e {
            Error::InvalidArgument(msg) => {
                Error::InvalidArgument(format!("cannot combine partial deps: {}", msg))
            }
            other => other,
        })?;
        Ok(PartialDeps {
            covering,
            deps: Deps::merge([&self.deps, &other.deps]),
        })
    }

    /// Discard the covering set
    pub fn into_deps(self) -> Deps {
        self.deps
    }
}

impl Deref for PartialDeps {
    type Target = Deps;

    fn deref(&self) -> &Deps {
        &self.deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{RoutingKeys, TableId};
    use crate::range::{Domain, Ranges, TokenRange};

    fn table() -> TableId {
        TableId::from_u128(7)
    }

    fn key(token: i64) -> RoutingKey {
        RoutingKey::token(table(), token)
    }

    fn txn(hlc: u64) -> TxnId {
        TxnId::new(1, hlc, 0, 1)
    }

    fn range(start: i64, end: i64) -> TokenRange {
        TokenRange::create(key(start), key(end)).unwrap()
    }

    fn sample() -> Deps {
        let mut keys = KeyDeps::builder();
        keys.add(key(1), txn(1)).add(key(2), txn(1)).add(key(2), txn(2));
        let mut ranges = RangeDeps::builder();
        ranges.add(range(0, 100), txn(3));
        let mut direct = KeyDeps::builder();
        direct.add(key(2), txn(2));
        Deps::new(keys.build(), ranges.build(), direct.build())
    }

    #[test]
    fn test_none_is_empty() {
        assert!(Deps::NONE.is_empty());
        assert!(Deps::default().is_empty());
        assert!(!sample().is_empty());
        assert_eq!(Deps::NONE.max_txn_id(), None);
    }

    #[test]
    fn test_txn_ids_union_of_all_three() {
        let deps = sample();
        assert_eq!(deps.txn_ids(), vec![txn(1), txn(2), txn(3)]);
        assert!(deps.contains(&txn(3)));
        assert!(!deps.contains(&txn(4)));
        assert_eq!(deps.max_txn_id(), Some(txn(3)));
    }

    #[test]
    fn test_txn_ids_for_key_includes_range_conflicts() {
        let deps = sample();
        assert_eq!(deps.txn_ids_for_key(&key(2)), vec![txn(1), txn(2), txn(3)]);
        assert_eq!(deps.txn_ids_for_key(&key(50)), vec![txn(3)]);
        assert!(deps.txn_ids_for_key(&key(500)).is_empty());
    }

    #[test]
    fn test_merge() {
        let mut extra = KeyDeps::builder();
        extra.add(key(9), txn(9));
        let other = Deps::new(extra.build(), RangeDeps::NONE, KeyDeps::NONE);
        let merged = Deps::merge([&sample(), &other]);
        assert_eq!(merged.key_deps.key_count(), 3);
        assert_eq!(merged.range_deps.range_count(), 1);
        assert_eq!(merged.direct_key_deps.key_count(), 1);
        assert!(merged.contains(&txn(9)));
    }

    #[test]
    fn test_without() {
        let deps = sample().without(|t| *t == txn(2));
        assert_eq!(deps.txn_ids(), vec![txn(1), txn(3)]);
        assert!(deps.direct_key_deps.is_empty());
    }

    #[test]
    fn test_slice_by_keys() {
        let covering = Participants::Keys(RoutingKeys::of(vec![key(1)]));
        let partial = sample().slice(&covering);
        assert_eq!(partial.key_deps.keys().as_slice(), &[key(1)]);
        assert!(partial.direct_key_deps.is_empty());
        // the range (0, 100] contains key 1
        assert_eq!(partial.range_deps.range_count(), 1);
        assert!(partial.covers(&covering));
    }

    #[test]
    fn test_slice_by_ranges() {
        let covering = Participants::Ranges(Ranges::of(vec![range(1, 10)]));
        let partial = sample().slice(&covering);
        assert_eq!(partial.key_deps.keys().as_slice(), &[key(2)]);
        assert_eq!(partial.direct_key_deps.keys().as_slice(), &[key(2)]);
        assert_eq!(partial.range_deps.range_count(), 1);
    }

    #[test]
    fn test_partial_with() {
        let a = sample().slice(&Participants::Keys(RoutingKeys::of(vec![key(1)])));
        let b = sample().slice(&Participants::Keys(RoutingKeys::of(vec![key(2)])));
        let both = a.with(&b).unwrap();
        assert_eq!(both.covering().len(), 2);
        assert_eq!(both.key_deps, sample().key_deps);

        let ranged = PartialDeps::none(Participants::empty(Domain::Range));
        let err = a.with(&ranged).unwrap_err();
        assert!(err.to_string().contains("cannot combine partial deps"));
    }

    #[test]
    fn test_merged_partials_cover_across_boundary() {
        let left = sample().slice(&Participants::Ranges(Ranges::of(vec![range(0, 50)])));
        let right = sample().slice(&Participants::Ranges(Ranges::of(vec![range(50, 300)])));
        let merged = left.with(&right).unwrap();
        let straddling = Participants::Ranges(Ranges::of(vec![range(40, 60)]));
        assert!(!left.covers(&straddling));
        assert!(!right.covers(&straddling));
        assert!(merged.covers(&straddling));
        assert!(!merged.covers(&Participants::Ranges(Ranges::of(vec![range(250, 400)]))));
    }

    #[test]
    fn test_serde_preserves_parallel_arrays() {
        let partial = sample().slice(&Participants::Ranges(Ranges::of(vec![range(0, 10)])));
        let bytes = rmp_serde::to_vec(&partial).unwrap();
        let back: PartialDeps = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, partial);
    }

    #[test]
    fn test_into_deps() {
        let partial = PartialDeps::new(Participants::empty(Domain::Key), sample());
        assert_eq!(partial.deps(), &sample());
        assert_eq!(partial.into_deps(), sample());
    }
}
