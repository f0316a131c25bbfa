//! Core types for strand
//!
//! This crate defines the foundational types used throughout the system:
//! - TxnId / Ballot: logical transaction identifiers
//! - RoutingKey / TableId: points in the keyspace
//! - TokenRange / Participants: end-inclusive ranges and covering sets
//! - KeyDeps / RangeDeps / Deps / PartialDeps: dependency graphs
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod deps;
pub mod error;
pub mod key;
pub mod limits;
pub mod range;
pub mod sorted;
pub mod types;

pub use deps::{is_subset, Bipartite, BipartiteBuilder, Deps, KeyDeps, PartialDeps, RangeDeps};
pub use error::{Error, Result};
pub use key::{RoutingKey, RoutingKeyKind, RoutingKeys, TableId};
pub use range::{Domain, Participants, Ranges, TokenRange};
pub use sorted::SortedList;
pub use types::{Ballot, NodeId, TxnId};
