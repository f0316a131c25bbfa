//! Core identifiers for strand
//!
//! - `TxnId`: totally ordered logical timestamp identifying a transaction
//! - `NodeId`: identifier of the node that coordinated a transaction
//! - `Ballot`: promise counter used by recovery coordinators

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical node identifier.
pub type NodeId = u32;

/// Unique, totally ordered transaction identifier.
///
/// Ordering is lexicographic over `(epoch, hlc, flags, node)`, which is the
/// field declaration order, so the derived `Ord` is the protocol order.
///
/// # Example
///
/// ```
/// use strand_core::types::TxnId;
///
/// let a = TxnId::new(1, 100, 0, 1);
/// let b = TxnId::new(1, 101, 0, 1);
/// assert!(a < b);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TxnId {
    /// Topology epoch the transaction was created in
    pub epoch: u64,
    /// Hybrid logical clock reading at creation
    pub hlc: u64,
    /// Kind and domain bits
    pub flags: u16,
    /// Coordinating node
    pub node: NodeId,
}

impl TxnId {
    /// The smallest possible id; never assigned to a real transaction.
    pub const NONE: TxnId = TxnId::new(0, 0, 0, 0);

    /// Create a transaction id.
    pub const fn new(epoch: u64, hlc: u64, flags: u16, node: NodeId) -> Self {
        TxnId {
            epoch,
            hlc,
            flags,
            node,
        }
    }

    /// True if this is [`TxnId::NONE`].
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},{},{}]",
            self.epoch, self.hlc, self.flags, self.node
        )
    }
}

/// Ballot used to order competing recovery coordinators.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Ballot {
    /// Promise counter
    pub counter: u64,
    /// Node that issued the ballot
    pub node: NodeId,
}

impl Ballot {
    /// The initial ballot every command starts with.
    pub const ZERO: Ballot = Ballot {
        counter: 0,
        node: 0,
    };

    /// Create a ballot.
    pub const fn new(counter: u64, node: NodeId) -> Self {
        Ballot { counter, node }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txn_id_ordering_is_lexicographic() {
        let base = TxnId::new(1, 10, 0, 5);
        assert!(base < TxnId::new(2, 0, 0, 0));
        assert!(base < TxnId::new(1, 11, 0, 0));
        assert!(base < TxnId::new(1, 10, 1, 0));
        assert!(base < TxnId::new(1, 10, 0, 6));
        assert!(TxnId::NONE < base);
    }

    #[test]
    fn test_txn_id_display() {
        assert_eq!(TxnId::new(3, 42, 1, 7).to_string(), "[3,42,1,7]");
    }

    #[test]
    fn test_txn_id_none() {
        assert!(TxnId::NONE.is_none());
        assert!(TxnId::default().is_none());
        assert!(!TxnId::new(0, 1, 0, 0).is_none());
    }

    #[test]
    fn test_ballot_ordering() {
        assert!(Ballot::ZERO < Ballot::new(1, 0));
        assert!(Ballot::new(1, 1) < Ballot::new(1, 2));
        assert!(Ballot::new(1, 9) < Ballot::new(2, 0));
    }
}
