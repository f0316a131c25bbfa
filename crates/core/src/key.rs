//! Routing keys
//!
//! A `RoutingKey` is a single addressable point in the keyspace: a token
//! within one table, or one of the two sentinels bounding that table.
//!
//! ## Ordering
//!
//! Keys order by table first, then `MinSentinel < Token(_) < MaxSentinel`,
//! then by token value. The derived `Ord` implements exactly this because
//! `RoutingKeyKind` variants are declared in that order.

use crate::range::Ranges;
use crate::sorted::SortedList;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Partition namespace a key belongs to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TableId(Uuid);

impl TableId {
    /// Generate a new random table id
    pub fn new() -> Self {
        TableId(Uuid::new_v4())
    }

    /// Build from raw UUID bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        TableId(Uuid::from_bytes(bytes))
    }

    /// Build from a 128-bit value; handy for deterministic fixtures
    pub fn from_u128(value: u128) -> Self {
        TableId(Uuid::from_u128(value))
    }

    /// Raw UUID bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for TableId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a key within its table.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum RoutingKeyKind {
    /// Sorts before every token of the table
    MinSentinel,
    /// A partitioner token
    Token(i64),
    /// Sorts after every token of the table
    MaxSentinel,
}

/// A single addressable point in the keyspace.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RoutingKey {
    table: TableId,
    kind: RoutingKeyKind,
}

impl RoutingKey {
    /// Key for a token within `table`
    pub fn token(table: TableId, token: i64) -> Self {
        RoutingKey {
            table,
            kind: RoutingKeyKind::Token(token),
        }
    }

    /// Lower sentinel of `table`
    pub fn min(table: TableId) -> Self {
        RoutingKey {
            table,
            kind: RoutingKeyKind::MinSentinel,
        }
    }

    /// Upper sentinel of `table`
    pub fn max(table: TableId) -> Self {
        RoutingKey {
            table,
            kind: RoutingKeyKind::MaxSentinel,
        }
    }

    /// Build from parts
    pub fn new(table: TableId, kind: RoutingKeyKind) -> Self {
        RoutingKey { table, kind }
    }

    /// Table this key belongs to
    pub fn table(&self) -> TableId {
        self.table
    }

    /// Sentinel or token
    pub fn kind(&self) -> RoutingKeyKind {
        self.kind
    }

    /// True for either sentinel
    pub fn is_sentinel(&self) -> bool {
        !matches!(self.kind, RoutingKeyKind::Token(_))
    }

    /// Token value, `None` for sentinels
    pub fn token_value(&self) -> Option<i64> {
        match self.kind {
            RoutingKeyKind::Token(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RoutingKeyKind::MinSentinel => write!(f, "{}:-inf", self.table),
            RoutingKeyKind::Token(t) => write!(f, "{}:{}", self.table, t),
            RoutingKeyKind::MaxSentinel => write!(f, "{}:+inf", self.table),
        }
    }
}

/// Sorted, duplicate-free set of routing keys.
pub type RoutingKeys = SortedList<RoutingKey>;

impl SortedList<RoutingKey> {
    /// Keys contained in at least one of `ranges`.
    pub fn slice(&self, ranges: &Ranges) -> RoutingKeys {
        self.filter(|key| ranges.contains_key(key))
    }
}
