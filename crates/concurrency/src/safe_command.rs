//! Safe-state wrapper over a cached command
//!
//! One `SafeCommand` exists per execution attempt of a transaction. It moves
//! through three states and never goes back:
//!
//! ```text
//! Unacquired --pre_execute--> Active --invalidate--> Invalidated
//!      \___________________invalidate___________________/
//! ```
//!
//! `pre_execute` takes the shared entry exclusively and snapshots its value
//! as `original`; `current` starts as a copy and is replaced with `set`.
//! `update` reads back the `(original, current)` delta for the journal.
//! The wrapper commits nothing itself: see `CommandCache::commit`.
//!
//! Touching `current`, `original`, `global`, `set` or `update` after
//! `invalidate` is a programming error and panics.

use crate::command::Command;
use crate::config::AcquirePolicy;
use crate::entry::{CacheEntry, Exclusive, ExclusiveToken};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use strand_core::error::{Error, Result};
use strand_core::types::TxnId;
use tracing::{debug, warn};

#[cfg(any(test, feature = "debug-refs"))]
use crate::ref_tracker::{self, RefId};

/// Shared entry for one transaction; `None` until first initialised.
pub type CommandEntry = CacheEntry<TxnId, Option<Command>>;

/// Lifecycle state of a [`SafeCommand`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeState {
    /// Bound to an entry, no snapshot taken
    Unacquired,
    /// Holding exclusive access
    Active,
    /// Terminal
    Invalidated,
}

/// Before/after pair produced by [`SafeCommand::update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandUpdate {
    /// Transaction the update applies to
    pub txn_id: TxnId,
    /// Value snapshotted at acquisition
    pub before: Option<Command>,
    /// Value to store
    pub after: Option<Command>,
}

impl CommandUpdate {
    /// True if applying the update changes nothing
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(self)
            .map_err(|e| Error::Journal(format!("Failed to serialize command update: {}", e)))
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes)
            .map_err(|e| Error::Corruption(format!("Failed to deserialize command update: {}", e)))
    }
}

/// Single-attempt guard over a shared command entry.
pub struct SafeCommand {
    state: SafeState,
    entry: Arc<CommandEntry>,
    original: Option<Command>,
    current: Option<Command>,
    token: Option<ExclusiveToken>,
    uninitialised: bool,
    #[cfg(any(test, feature = "debug-refs"))]
    tracked: RefId,
}

impl SafeCommand {
    /// Bind a new wrapper to `entry`.
    pub fn new(entry: Arc<CommandEntry>) -> Self {
        SafeCommand {
            #[cfg(any(test, feature = "debug-refs"))]
            tracked: ref_tracker::register(entry.key().to_string()),
            state: SafeState::Unacquired,
            entry,
            original: None,
            current: None,
            token: None,
            uninitialised: false,
        }
    }

    /// Transaction this wrapper is bound to
    pub fn txn_id(&self) -> TxnId {
        *self.entry.key()
    }

    /// Lifecycle state
    pub fn state(&self) -> SafeState {
        self.state
    }

    /// True once [`invalidate`](Self::invalidate) has been called
    pub fn invalidated(&self) -> bool {
        self.state == SafeState::Invalidated
    }

    /// True if the acquired record had never been initialised
    pub fn is_uninitialised(&self) -> bool {
        self.uninitialised
    }

    /// Registry id of this wrapper
    #[cfg(any(test, feature = "debug-refs"))]
    pub fn ref_id(&self) -> RefId {
        self.tracked
    }

    /// Take exclusive access to the entry and snapshot its value.
    ///
    /// # Panics
    ///
    /// If the wrapper is not `Unacquired`: wrappers are never reused.
    ///
    /// # Errors
    ///
    /// Whatever the entry returns under `policy` (busy, timeout). The wrapper
    /// stays `Unacquired`.
    pub fn pre_execute(&mut self, policy: AcquirePolicy) -> Result<()> {
        self.check_not_invalidated("pre_execute");
        assert!(
            self.state == SafeState::Unacquired,
            "pre_execute on {:?} wrapper for {}: wrappers are never reused",
            self.state,
            self.txn_id()
        );
        let Exclusive { value, token } = self.entry.get_exclusive(policy)?;
        self.uninitialised = value.is_none();
        self.original = value.clone();
        self.current = value;
        self.token = Some(token);
        self.state = SafeState::Active;
        self.trace("acquired");
        debug!(txn_id = %self.txn_id(), uninitialised = self.uninitialised, "Acquired command");
        Ok(())
    }

    /// Install `Command::uninitialised` as `current` if it is unset.
    pub fn initialise(&mut self) -> &Command {
        self.check_active("initialise");
        let txn_id = self.txn_id();
        self.current.get_or_insert_with(|| Command::uninitialised(txn_id))
    }

    /// Working value
    pub fn current(&self) -> Option<&Command> {
        self.check_not_invalidated("current");
        self.current.as_ref()
    }

    /// Value snapshotted at acquisition
    pub fn original(&self) -> Option<&Command> {
        self.check_not_invalidated("original");
        self.original.as_ref()
    }

    /// The shared entry this wrapper is bound to
    pub fn global(&self) -> &Arc<CommandEntry> {
        self.check_not_invalidated("global");
        &self.entry
    }

    /// Replace the working value.
    pub fn set(&mut self, command: Command) {
        self.check_active("set");
        self.current = Some(command);
    }

    /// The `(original, current)` delta. Commits nothing.
    pub fn update(&self) -> CommandUpdate {
        self.check_active("update");
        CommandUpdate {
            txn_id: self.txn_id(),
            before: self.original.clone(),
            after: self.current.clone(),
        }
    }

    /// Hand the exclusive token to the caller that commits the update.
    pub fn take_token(&mut self) -> Option<ExclusiveToken> {
        self.check_not_invalidated("take_token");
        self.token.take()
    }

    /// Seal the wrapper. Unconditional and permanent.
    ///
    /// A token still held at this point is abandoned: the entry keeps its
    /// previous value and becomes available again.
    pub fn invalidate(&mut self) {
        if let Some(token) = self.token.take() {
            debug!(txn_id = %self.txn_id(), "Invalidated while holding exclusive access, abandoning");
            if let Err(e) = self.entry.abandon(token) {
                warn!(txn_id = %self.txn_id(), error = %e, "Abandon on invalidate failed");
            }
        }
        self.state = SafeState::Invalidated;
        #[cfg(any(test, feature = "debug-refs"))]
        ref_tracker::release(self.tracked);
    }

    fn trace(&self, _message: &str) {
        #[cfg(any(test, feature = "debug-refs"))]
        ref_tracker::trace(self.tracked, _message);
    }

    fn check_not_invalidated(&self, op: &str) {
        assert!(
            self.state != SafeState::Invalidated,
            "{} on invalidated safe command for {}",
            op,
            self.txn_id()
        );
    }

    fn check_active(&self, op: &str) {
        self.check_not_invalidated(op);
        assert!(
            self.state == SafeState::Active,
            "{} on unacquired safe command for {}",
            op,
            self.txn_id()
        );
    }
}

impl PartialEq for SafeCommand {
    fn eq(&self, other: &Self) -> bool {
        self.original == other.original && self.current == other.current
    }
}

impl fmt::Debug for SafeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeCommand")
            .field("state", &self.state)
            .field("txn_id", self.entry.key())
            .field("original", &self.original)
            .field("current", &self.current)
            .finish()
    }
}

impl Drop for SafeCommand {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            warn!(
                txn_id = %self.txn_id(),
                "Safe command dropped while holding exclusive access, abandoning"
            );
            let _ = self.entry.abandon(token);
        }
    }
}
