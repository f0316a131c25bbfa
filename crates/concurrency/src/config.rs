//! Cache configuration

use std::time::Duration;
use strand_core::error::{Error, Result};

/// What `get_exclusive` does when the entry is already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquirePolicy {
    /// Wait until the holder releases
    #[default]
    Block,
    /// Return `Error::EntryBusy` immediately
    FailFast,
    /// Wait up to the given duration, then return `Error::AcquireTimeout`
    Timeout(Duration),
}

/// Command cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Wait policy for exclusive acquisition
    pub acquire_policy: AcquirePolicy,
    /// Entries to reserve space for up front
    pub initial_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            acquire_policy: AcquirePolicy::Block,
            initial_capacity: 1024,
        }
    }
}

impl CacheConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config for testing
    ///
    /// Bounded waits so a lost release fails the test instead of hanging it.
    pub fn for_testing() -> Self {
        CacheConfig {
            acquire_policy: AcquirePolicy::Timeout(Duration::from_secs(5)),
            initial_capacity: 16,
        }
    }

    /// Set the wait policy
    pub fn with_acquire_policy(mut self, policy: AcquirePolicy) -> Self {
        self.acquire_policy = policy;
        self
    }

    /// Set the initial capacity
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.acquire_policy == AcquirePolicy::Timeout(Duration::ZERO) {
            return Err(Error::Config(
                "acquire timeout must be positive; use FailFast for no wait".into(),
            ));
        }
        Ok(())
    }
}
