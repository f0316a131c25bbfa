//! Command cache
//!
//! Maps each transaction to its shared [`CommandEntry`] and coordinates the
//! commit of a [`SafeCommand`]:
//!
//! ```text
//! 1. update()          - read the (before, after) delta
//! 2. journal.append()  - durability
//! 3. entry.release()   - visibility, ends exclusivity
//! 4. invalidate()      - seal the wrapper
//! ```
//!
//! If the journal refuses the update the entry is abandoned (previous value
//! kept) and the wrapper is still invalidated.

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::journal::Journal;
use crate::safe_command::{CommandEntry, CommandUpdate, SafeCommand};
use dashmap::DashMap;
use std::sync::Arc;
use strand_core::error::{Error, Result};
use strand_core::types::TxnId;
use tracing::{debug, error};

/// Per-node cache of command entries
#[derive(Debug)]
pub struct CommandCache {
    entries: DashMap<TxnId, Arc<CommandEntry>>,
    config: CacheConfig,
}

impl CommandCache {
    /// Create a cache.
    ///
    /// # Errors
    ///
    /// `Error::Config` if `config` does not validate.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(CommandCache {
            entries: DashMap::with_capacity(config.initial_capacity),
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Shared entry for `txn_id`, created empty on first use.
    pub fn entry(&self, txn_id: TxnId) -> Arc<CommandEntry> {
        Arc::clone(
            &self
                .entries
                .entry(txn_id)
                .or_insert_with(|| Arc::new(CacheEntry::new(txn_id, None))),
        )
    }

    /// Existing entry for `txn_id`
    pub fn get(&self, txn_id: &TxnId) -> Option<Arc<CommandEntry>> {
        self.entries.get(txn_id).map(|e| Arc::clone(e.value()))
    }

    /// New wrapper for `txn_id` holding exclusive access.
    ///
    /// # Errors
    ///
    /// Busy or timeout errors per the configured `AcquirePolicy`.
    pub fn acquire(&self, txn_id: TxnId) -> Result<SafeCommand> {
        let mut safe = SafeCommand::new(self.entry(txn_id));
        if let Err(e) = safe.pre_execute(self.config.acquire_policy) {
            safe.invalidate();
            return Err(e);
        }
        Ok(safe)
    }

    /// Journal the wrapper's delta, publish it in the entry, and invalidate
    /// the wrapper.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidArgument` if the wrapper no longer holds its token
    /// - the journal's error, after abandoning the entry
    /// - `Error::StaleToken` if the entry rejects the release
    ///
    /// The wrapper is invalidated in every case.
    ///
    /// # Panics
    ///
    /// If `safe` is not active.
    pub fn commit(&self, safe: &mut SafeCommand, journal: &dyn Journal) -> Result<CommandUpdate> {
        let update = safe.update();
        let entry = Arc::clone(safe.global());
        let Some(token) = safe.take_token() else {
            safe.invalidate();
            return Err(Error::InvalidArgument(format!(
                "safe command for {} no longer holds exclusive access",
                update.txn_id
            )));
        };

        if let Err(e) = journal.append(&update) {
            error!(
                txn_id = %update.txn_id,
                error = %e,
                "Journal append failed, keeping previous command"
            );
            let abandoned = entry.abandon(token);
            safe.invalidate();
            abandoned?;
            return Err(e);
        }

        let released = entry.release(token, update.after.clone());
        safe.invalidate();
        released?;
        debug!(txn_id = %update.txn_id, noop = update.is_noop(), "Committed command");
        Ok(update)
    }

    /// Release the wrapper's exclusivity without changing the entry, then
    /// invalidate it.
    pub fn release_unchanged(&self, safe: &mut SafeCommand) -> Result<()> {
        let result = match safe.take_token() {
            Some(token) => safe.global().abandon(token),
            None => Ok(()),
        };
        safe.invalidate();
        result
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries are cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the entry for `txn_id` if nobody holds or references it.
    ///
    /// Returns true if an entry was removed.
    pub fn evict(&self, txn_id: &TxnId) -> bool {
        self.entries
            .remove_if(txn_id, |_, entry| {
                Arc::strong_count(entry) == 1 && !entry.is_held()
            })
            .is_some()
    }
}

impl Default for CommandCache {
    fn default() -> Self {
        CommandCache {
            entries: DashMap::new(),
            config: CacheConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, SaveStatus};
    use crate::config::AcquirePolicy;
    use crate::journal::InMemoryJournal;

    struct RefusingJournal;

    impl Journal for RefusingJournal {
        fn append(&self, _update: &CommandUpdate) -> Result<()> {
            Err(Error::Journal("disk full".into()))
        }
    }

    fn id(hlc: u64) -> TxnId {
        TxnId::new(1, hlc, 0, 1)
    }

    fn cache() -> CommandCache {
        CommandCache::new(CacheConfig::for_testing().with_acquire_policy(AcquirePolicy::FailFast))
            .unwrap()
    }

    #[test]
    fn test_entry_is_shared() {
        let cache = cache();
        let a = cache.entry(id(1));
        let b = cache.entry(id(1));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&id(2)).is_none());
    }

    #[test]
    fn test_commit_publishes_and_journals() {
        let cache = cache();
        let journal = InMemoryJournal::new();

        let mut safe = cache.acquire(id(1)).unwrap();
        assert!(safe.is_uninitialised());
        safe.initialise();
        safe.set(Command::uninitialised(id(1)).with_status(SaveStatus::PreAccepted));
        let update = cache.commit(&mut safe, &journal).unwrap();

        assert!(safe.invalidated());
        assert_eq!(update.before, None);
        assert_eq!(journal.len(), 1);
        let entry = cache.entry(id(1));
        assert!(!entry.is_held());
        assert_eq!(entry.peek().unwrap().save_status, SaveStatus::PreAccepted);
        assert_eq!(journal.replay(&id(1)).unwrap(), entry.peek());

        // the next acquirer sees the committed value
        let mut next = cache.acquire(id(1)).unwrap();
        assert_eq!(
            next.original().unwrap().save_status,
            SaveStatus::PreAccepted
        );
        cache.release_unchanged(&mut next).unwrap();
    }

    #[test]
    fn test_journal_failure_keeps_previous_value() {
        let cache = cache();
        let mut safe = cache.acquire(id(1)).unwrap();
        safe.set(Command::uninitialised(id(1)).with_status(SaveStatus::Committed));
        let err = cache.commit(&mut safe, &RefusingJournal).unwrap_err();
        assert!(matches!(err, Error::Journal(_)));
        assert!(safe.invalidated());

        let entry = cache.entry(id(1));
        assert!(!entry.is_held());
        assert_eq!(entry.peek(), None);
    }

    #[test]
    fn test_acquire_busy_fails_fast() {
        let cache = cache();
        let mut first = cache.acquire(id(1)).unwrap();
        let err = cache.acquire(id(1)).unwrap_err();
        assert!(matches!(err, Error::EntryBusy(_)));
        cache.release_unchanged(&mut first).unwrap();
        assert!(cache.acquire(id(1)).is_ok());
    }

    #[test]
    fn test_commit_without_token() {
        let cache = cache();
        let mut safe = cache.acquire(id(1)).unwrap();
        let token = safe.take_token().unwrap();
        let err = cache.commit(&mut safe, &InMemoryJournal::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(safe.invalidated());
        cache.entry(id(1)).abandon(token).unwrap();
    }

    #[test]
    fn test_evict_only_idle_entries() {
        let cache = cache();
        let mut safe = cache.acquire(id(1)).unwrap();
        assert!(!cache.evict(&id(1)));
        cache.release_unchanged(&mut safe).unwrap();
        drop(safe);
        assert!(cache.evict(&id(1)));
        assert!(cache.is_empty());
        assert!(!cache.evict(&id(1)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CacheConfig::new()
            .with_acquire_policy(AcquirePolicy::Timeout(std::time::Duration::ZERO));
        assert!(CommandCache::new(config).is_err());
    }
}
