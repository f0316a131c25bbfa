//! Error types for strand
//!
//! This module defines the recoverable error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Programming errors (touching a safe-state wrapper after it has been
//! invalidated, re-acquiring a wrapper) are not represented here: they panic.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for strand operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for strand
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed bytes: truncated buffer, inconsistent counts, bad tags
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// A constructor or operation received an argument violating its contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Subset-relative encoding requested against a superset that does not
    /// contain every element of the subset
    #[error("Subset violation: {missing} of {subset_len} elements absent from superset of {superset_len}")]
    SubsetViolation {
        /// Number of elements in the set being encoded
        subset_len: usize,
        /// Number of elements in the declared superset
        superset_len: usize,
        /// Elements of the subset not found in the superset
        missing: usize,
    },

    /// Wire version unknown to, or refused by, this codec
    #[error("Unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    /// Exclusive acquisition refused because another holder is outstanding
    #[error("Cache entry busy: {0}")]
    EntryBusy(String),

    /// Exclusive acquisition did not succeed within the configured wait
    #[error("Timed out after {waited:?} acquiring {key}")]
    AcquireTimeout {
        /// Debug rendering of the entry key
        key: String,
        /// How long the caller waited
        waited: Duration,
    },

    /// A release was attempted with a token that is not the outstanding grant
    #[error("Stale exclusive token for {key}: token {token}, outstanding {outstanding:?}")]
    StaleToken {
        /// Debug rendering of the entry key
        key: String,
        /// Grant sequence carried by the rejected token
        token: u64,
        /// Grant sequence currently holding the entry, if any
        outstanding: Option<u64>,
    },

    /// The durable journal refused or failed to record an update
    #[error("Journal error: {0}")]
    Journal(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Corruption error annotated with the byte offset it was detected at.
    pub fn corruption_at(offset: usize, detail: impl std::fmt::Display) -> Self {
        Error::Corruption(format!("offset {}: {}", offset, detail))
    }

    /// True for errors caused by malformed input bytes.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}
