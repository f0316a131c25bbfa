//! Safe-state cache for strand
//!
//! This crate mediates concurrent execution contexts' access to the
//! authoritative record of each transaction:
//! - CacheEntry: exclusive-access slot with ordered grants
//! - SafeCommand: per-attempt original/current snapshot with explicit invalidation
//! - CommandCache: id -> entry map and the journal-then-publish commit
//! - Journal: seam to durable storage
//!
//! Building with the `debug-refs` feature (always on in this crate's tests)
//! registers every wrapper with `ref_tracker` so leaks can be asserted.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod command;
pub mod config;
pub mod entry;
pub mod journal;
#[cfg(any(test, feature = "debug-refs"))]
pub mod ref_tracker;
pub mod safe_command;

pub use cache::CommandCache;
pub use command::{Command, SaveStatus};
pub use config::{AcquirePolicy, CacheConfig};
pub use entry::{CacheEntry, Exclusive, ExclusiveToken};
pub use journal::{InMemoryJournal, Journal};
pub use safe_command::{CommandEntry, CommandUpdate, SafeCommand, SafeState};
