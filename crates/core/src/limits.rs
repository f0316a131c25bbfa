//! Size limits for decoded collections
//!
//! Counts read off the wire are checked against these limits before any
//! allocation happens, so a corrupt or hostile length prefix cannot make a
//! decoder reserve unbounded memory.

/// Default upper bound on any decoded collection (keys, ranges, txn ids,
/// association entries).
pub const MAX_COLLECTION_LEN: usize = 1 << 24;

/// Supersets smaller than this encode a subset as a single bitmap.
pub const SUBSET_BITMAP_THRESHOLD: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmap_threshold_fits_in_u64() {
        assert!(SUBSET_BITMAP_THRESHOLD <= u64::BITS as usize);
    }

    #[test]
    fn test_collection_limit_fits_in_u32() {
        assert!(MAX_COLLECTION_LEN <= u32::MAX as usize);
    }
}
