//! Command record held by the cache
//!
//! A `Command` is the per-node state of one transaction: how far it has
//! progressed, when it executes, the highest ballot promised, and the
//! dependencies known so far.

use serde::{Deserialize, Serialize};
use strand_core::deps::PartialDeps;
use strand_core::types::{Ballot, TxnId};

/// How far a command has progressed, in protocol order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum SaveStatus {
    /// Nothing recorded yet
    #[default]
    Uninitialised,
    /// Known only as a dependency of another command
    NotDefined,
    /// Pre-accepted with an initial execution timestamp
    PreAccepted,
    /// A proposed execution timestamp was accepted
    Accepted,
    /// Execution timestamp and dependencies committed
    Committed,
    /// Committed and stable everywhere it needs to be
    Stable,
    /// Outcome known, waiting on dependencies to apply
    PreApplied,
    /// Applied locally
    Applied,
    /// Will never execute
    Invalidated,
    /// State discarded after being applied everywhere
    Truncated,
}

impl SaveStatus {
    /// Check whether this status is at or past `status`.
    ///
    /// An invalidated command has only been through the statuses that
    /// precede any agreement; nothing but `Invalidated` itself is past it.
    pub fn has_been(self, status: SaveStatus) -> bool {
        match self {
            SaveStatus::Invalidated => matches!(
                status,
                SaveStatus::Uninitialised | SaveStatus::NotDefined | SaveStatus::Invalidated
            ),
            _ => status != SaveStatus::Invalidated && self >= status,
        }
    }

    /// True for statuses a command never leaves
    pub fn is_final(self) -> bool {
        matches!(self, SaveStatus::Invalidated | SaveStatus::Truncated)
    }
}

/// Per-node record of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Transaction this record describes
    pub txn_id: TxnId,
    /// Progress
    pub save_status: SaveStatus,
    /// Agreed or proposed execution timestamp
    pub execute_at: Option<TxnId>,
    /// Highest ballot promised
    pub promised: Ballot,
    /// Dependencies known so far
    pub partial_deps: Option<PartialDeps>,
}

impl Command {
    /// Initial record for `txn_id`
    pub fn uninitialised(txn_id: TxnId) -> Self {
        Command {
            txn_id,
            save_status: SaveStatus::Uninitialised,
            execute_at: None,
            promised: Ballot::ZERO,
            partial_deps: None,
        }
    }

    /// True if nothing has been recorded yet
    pub fn is_uninitialised(&self) -> bool {
        self.save_status == SaveStatus::Uninitialised
    }

    /// Set the status
    pub fn with_status(mut self, status: SaveStatus) -> Self {
        self.save_status = status;
        self
    }

    /// Set the execution timestamp
    pub fn with_execute_at(mut self, execute_at: TxnId) -> Self {
        self.execute_at = Some(execute_at);
        self
    }

    /// Set the promised ballot
    pub fn with_promised(mut self, promised: Ballot) -> Self {
        self.promised = promised;
        self
    }

    /// Set the known dependencies
    pub fn with_partial_deps(mut self, deps: PartialDeps) -> Self {
        self.partial_deps = Some(deps);
        self
    }
}
