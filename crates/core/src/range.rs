//! Token ranges and covering sets
//!
//! A `TokenRange` is end-inclusive: it contains every key `k` with
//! `start < k <= end`. Both endpoints must belong to the same table.
//! [`TokenRange::create`] enforces this; [`TokenRange::create_unsafe`]
//! exists for paths that already validated it.

use crate::error::{Error, Result};
use crate::key::{RoutingKey, RoutingKeyKind, RoutingKeys, TableId};
use crate::sorted::SortedList;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contiguous, end-inclusive interval `(start, end]` within one table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TokenRange {
    start: RoutingKey,
    end: RoutingKey,
}

#[derive(Deserialize)]
struct TokenRangeBounds {
    start: RoutingKey,
    end: RoutingKey,
}

impl<'de> Deserialize<'de> for TokenRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let bounds = TokenRangeBounds::deserialize(deserializer)?;
        TokenRange::create(bounds.start, bounds.end).map_err(de::Error::custom)
    }
}

impl TokenRange {
    /// Create a range, rejecting endpoints from different tables.
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` if `start` and `end` belong to different tables.
    pub fn create(start: RoutingKey, end: RoutingKey) -> Result<Self> {
        if start.table() != end.table() {
            return Err(Error::InvalidArgument(format!(
                "Token ranges cannot cover more than one table start:{}, end:{}",
                start, end
            )));
        }
        Ok(TokenRange { start, end })
    }

    /// Create a range without checking that both endpoints share a table.
    ///
    /// The caller is responsible for the invariant.
    pub fn create_unsafe(start: RoutingKey, end: RoutingKey) -> Self {
        TokenRange { start, end }
    }

    /// The range covering all of `table`
    pub fn full_range(table: TableId) -> Self {
        TokenRange {
            start: RoutingKey::min(table),
            end: RoutingKey::max(table),
        }
    }

    /// Exclusive lower bound
    pub fn start(&self) -> RoutingKey {
        self.start
    }

    /// Inclusive upper bound
    pub fn end(&self) -> RoutingKey {
        self.end
    }

    /// Table the range belongs to
    pub fn table(&self) -> TableId {
        self.start.table()
    }

    /// True if both endpoints are sentinels
    pub fn is_full_range(&self) -> bool {
        self.start.kind() == RoutingKeyKind::MinSentinel
            && self.end.kind() == RoutingKeyKind::MaxSentinel
    }

    /// Check whether `key` falls in `(start, end]`
    pub fn contains(&self, key: &RoutingKey) -> bool {
        self.start < *key && *key <= self.end
    }

    /// Check whether `other` lies entirely within this range
    pub fn contains_range(&self, other: &TokenRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check whether the two ranges share at least one key
    pub fn intersects(&self, other: &TokenRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TokenRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}]", self.start, self.end)
    }
}

/// Sorted, duplicate-free set of token ranges.
pub type Ranges = SortedList<TokenRange>;

impl SortedList<TokenRange> {
    /// Check whether any range contains `key`
    pub fn contains_key(&self, key: &RoutingKey) -> bool {
        self.iter().any(|r| r.contains(key))
    }

    /// Check whether any range intersects `range`
    pub fn intersects(&self, range: &TokenRange) -> bool {
        self.iter().any(|r| r.intersects(range))
    }

    /// Ranges intersecting at least one of `other`
    pub fn slice(&self, other: &Ranges) -> Ranges {
        self.filter(|r| other.intersects(r))
    }

    /// Check whether the union of these ranges includes every key of `range`.
    ///
    /// Touching and overlapping ranges chain: `(0,50]` and `(50,300]`
    /// together cover `(40,60]`.
    pub fn covers_range(&self, range: &TokenRange) -> bool {
        let mut reached = range.start;
        // same-table ranges are contiguous in the list, ordered by start
        for r in self.iter().filter(|r| r.table() == range.table()) {
            if reached >= range.end || r.start > reached {
                break;
            }
            if r.end > reached {
                reached = r.end;
            }
        }
        reached >= range.end
    }
}

/// Which kind of routable a set is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Individual routing keys
    Key,
    /// Token ranges
    Range,
}

/// A set of keys or a set of ranges.
///
/// Used as the `covering` set of a `PartialDeps` and as the known superset
/// handed to subset-relative encoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Participants {
    /// Explicit keys
    Keys(RoutingKeys),
    /// Token ranges
    Ranges(Ranges),
}

impl Participants {
    /// Empty set of the given domain
    pub fn empty(domain: Domain) -> Self {
        match domain {
            Domain::Key => Participants::Keys(RoutingKeys::EMPTY),
            Domain::Range => Participants::Ranges(Ranges::EMPTY),
        }
    }

    /// Key or range domain
    pub fn domain(&self) -> Domain {
        match self {
            Participants::Keys(_) => Domain::Key,
            Participants::Ranges(_) => Domain::Range,
        }
    }

    /// Number of keys or ranges
    pub fn len(&self) -> usize {
        match self {
            Participants::Keys(k) => k.len(),
            Participants::Ranges(r) => r.len(),
        }
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The keys, if this is a key set
    pub fn as_keys(&self) -> Option<&RoutingKeys> {
        match self {
            Participants::Keys(k) => Some(k),
            Participants::Ranges(_) => None,
        }
    }

    /// The ranges, if this is a range set
    pub fn as_ranges(&self) -> Option<&Ranges> {
        match self {
            Participants::Keys(_) => None,
            Participants::Ranges(r) => Some(r),
        }
    }

    /// Check whether `key` is a member (keys) or is contained (ranges)
    pub fn contains_key(&self, key: &RoutingKey) -> bool {
        match self {
            Participants::Keys(k) => k.contains(key),
            Participants::Ranges(r) => r.contains_key(key),
        }
    }

    /// Check whether `range` touches this set
    pub fn intersects_range(&self, range: &TokenRange) -> bool {
        match self {
            Participants::Keys(k) => k.iter().any(|key| range.contains(key)),
            Participants::Ranges(r) => r.intersects(range),
        }
    }

    /// Check whether every element of `other` is covered by this set.
    ///
    /// A key set never covers a non-empty range set.
    pub fn covers(&self, other: &Participants) -> bool {
        match (self, other) {
            (Participants::Keys(mine), Participants::Keys(theirs)) => theirs.is_subset_of(mine),
            (Participants::Ranges(mine), Participants::Keys(theirs)) => {
                theirs.iter().all(|key| mine.contains_key(key))
            }
            (Participants::Ranges(mine), Participants::Ranges(theirs)) => {
                theirs.iter().all(|range| mine.covers_range(range))
            }
            (Participants::Keys(_), Participants::Ranges(theirs)) => theirs.is_empty(),
        }
    }

    /// Union of two sets of the same domain.
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` if the domains differ.
    pub fn union(&self, other: &Participants) -> Result<Participants> {
        match (self, other) {
            (Participants::Keys(a), Participants::Keys(b)) => Ok(Participants::Keys(a.union(b))),
            (Participants::Ranges(a), Participants::Ranges(b)) => {
                Ok(Participants::Ranges(a.union(b)))
            }
            _ => Err(Error::InvalidArgument(format!(
                "cannot union {:?} participants with {:?} participants",
                self.domain(),
                other.domain()
            ))),
        }
    }
}

impl From<RoutingKeys> for Participants {
    fn from(keys: RoutingKeys) -> Self {
        Participants::Keys(keys)
    }
}

impl From<Ranges> for Participants {
    fn from(ranges: Ranges) -> Self {
        Participants::Ranges(ranges)
    }
}
