//! strand - dependency graphs and safe-state caching for leaderless transactions
//!
//! strand provides the per-node substrate a leaderless transaction protocol
//! orders and executes on: compact dependency graphs, an exact binary codec
//! for them, and a single-writer cache of transaction records.
//!
//! # Quick Start
//!
//! ```
//! use strand::{CommandCache, DepsCodec, Deps, InMemoryJournal, KeyDeps, RangeDeps};
//! use strand::{RoutingKey, TableId, TxnId, WireVersion};
//!
//! let table = TableId::from_u128(1);
//! let mut keys = KeyDeps::builder();
//! keys.add(RoutingKey::token(table, 10), TxnId::new(1, 100, 0, 1));
//! let deps = Deps::new(keys.build(), RangeDeps::NONE, KeyDeps::NONE);
//!
//! let codec = DepsCodec::default();
//! let bytes = codec.encode_to_vec(&deps, WireVersion::CURRENT)?;
//! assert_eq!(codec.decode_from_slice(&bytes, WireVersion::CURRENT)?, deps);
//!
//! let cache = CommandCache::default();
//! let journal = InMemoryJournal::new();
//! let mut safe = cache.acquire(TxnId::new(1, 200, 0, 1))?;
//! safe.initialise();
//! cache.commit(&mut safe, &journal)?;
//! assert_eq!(journal.len(), 1);
//! # Ok::<(), strand::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `strand-core`: ids, keys, ranges, `Deps` / `PartialDeps`, errors
//! - `strand-durability`: wire primitives and `DepsCodec`
//! - `strand-concurrency`: `CacheEntry`, `SafeCommand`, `CommandCache`, `Journal`

pub use strand_concurrency::{
    AcquirePolicy, CacheConfig, CacheEntry, Command, CommandCache, CommandEntry, CommandUpdate,
    Exclusive, ExclusiveToken, InMemoryJournal, Journal, SafeCommand, SafeState, SaveStatus,
};
pub use strand_core::{
    is_subset, Ballot, Bipartite, BipartiteBuilder, Deps, Domain, Error, KeyDeps, NodeId,
    PartialDeps, Participants, RangeDeps, Ranges, Result, RoutingKey, RoutingKeyKind,
    RoutingKeys, SortedList, TableId, TokenRange, TxnId,
};
pub use strand_durability::{
    CodecConfig, DepsCodec, RangeCodec, SimpleRangeCodec, TokenRangeCodec, WireReader,
    WireVersion,
};

#[cfg(feature = "debug-refs")]
pub use strand_concurrency::ref_tracker;
