//! Durable journal seam
//!
//! The cache hands every committed `(before, after)` delta to a `Journal`
//! before making it visible in the entry. Applying the deltas to durable
//! storage is the journal's business.

use crate::command::Command;
use crate::safe_command::CommandUpdate;
use parking_lot::Mutex;
use strand_core::error::Result;
use strand_core::types::TxnId;

/// Consumer of committed command updates.
///
/// Implementations must be `Send + Sync`: one journal serves every
/// execution context.
pub trait Journal: Send + Sync {
    /// Record `update`. An error aborts the commit.
    fn append(&self, update: &CommandUpdate) -> Result<()>;
}

/// Journal keeping MessagePack-encoded updates in memory, in append order.
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    records: Mutex<Vec<Vec<u8>>>,
}

impl InMemoryJournal {
    /// Empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded updates
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode every recorded update, oldest first.
    pub fn updates(&self) -> Result<Vec<CommandUpdate>> {
        self.records
            .lock()
            .iter()
            .map(|bytes| CommandUpdate::from_bytes(bytes))
            .collect()
    }

    /// Updates recorded for `txn_id`, oldest first.
    pub fn updates_for(&self, txn_id: &TxnId) -> Result<Vec<CommandUpdate>> {
        Ok(self
            .updates()?
            .into_iter()
            .filter(|u| u.txn_id == *txn_id)
            .collect())
    }

    /// Value `txn_id` holds after replaying the journal.
    pub fn replay(&self, txn_id: &TxnId) -> Result<Option<Command>> {
        Ok(self
            .updates_for(txn_id)?
            .into_iter()
            .last()
            .and_then(|u| u.after))
    }
}

impl Journal for InMemoryJournal {
    fn append(&self, update: &CommandUpdate) -> Result<()> {
        let bytes = update.to_bytes()?;
        self.records.lock().push(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SaveStatus;

    fn update(hlc: u64, status: SaveStatus) -> CommandUpdate {
        let txn_id = TxnId::new(1, hlc, 0, 1);
        CommandUpdate {
            txn_id,
            before: None,
            after: Some(Command::uninitialised(txn_id).with_status(status)),
        }
    }

    #[test]
    fn test_append_and_decode_in_order() {
        let journal = InMemoryJournal::new();
        assert!(journal.is_empty());
        journal.append(&update(1, SaveStatus::PreAccepted)).unwrap();
        journal.append(&update(2, SaveStatus::PreAccepted)).unwrap();
        journal.append(&update(1, SaveStatus::Committed)).unwrap();
        assert_eq!(journal.len(), 3);

        let all = journal.updates().unwrap();
        assert_eq!(all[2], update(1, SaveStatus::Committed));

        let id = TxnId::new(1, 1, 0, 1);
        assert_eq!(journal.updates_for(&id).unwrap().len(), 2);
        assert_eq!(
            journal.replay(&id).unwrap().unwrap().save_status,
            SaveStatus::Committed
        );
        assert!(journal.replay(&TxnId::new(9, 9, 0, 9)).unwrap().is_none());
    }
}
