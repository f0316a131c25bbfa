//! Wire format versions
//!
//! V1 writes a superset-relative top-level key set with no mode flag, so a
//! key set that is not a subset of the supplied superset cannot be encoded at
//! all. V2 adds a one-byte flag and falls back to full encoding instead.

use std::fmt;
use strand_core::error::Error;

/// Dependency wire format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WireVersion {
    /// Unflagged superset-relative top-level keys
    V1 = 1,
    /// Flagged top-level keys with automatic fallback
    V2 = 2,
}

impl WireVersion {
    /// Version written by default
    pub const CURRENT: WireVersion = WireVersion::V2;

    /// Every version this codec decodes, oldest first
    pub const ALL: [WireVersion; 2] = [WireVersion::V1, WireVersion::V2];

    /// Numeric tag
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// True if superset-relative top-level key sets carry a mode flag
    pub fn flags_top_level_keys(self) -> bool {
        self >= WireVersion::V2
    }
}

impl TryFrom<u8> for WireVersion {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(WireVersion::V1),
            2 => Ok(WireVersion::V2),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

impl Default for WireVersion {
    fn default() -> Self {
        WireVersion::CURRENT
    }
}

impl fmt::Display for WireVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from() {
        assert_eq!(WireVersion::try_from(1).unwrap(), WireVersion::V1);
        assert_eq!(WireVersion::try_from(2).unwrap(), WireVersion::V2);
        assert_eq!(WireVersion::try_from(0), Err(Error::UnsupportedVersion(0)));
        assert_eq!(WireVersion::try_from(3), Err(Error::UnsupportedVersion(3)));
    }

    #[test]
    fn test_current_is_newest() {
        assert_eq!(WireVersion::default(), WireVersion::V2);
        assert_eq!(*WireVersion::ALL.last().unwrap(), WireVersion::CURRENT);
        assert!(!WireVersion::V1.flags_top_level_keys());
        assert!(WireVersion::V2.flags_top_level_keys());
        assert_eq!(WireVersion::V1.to_string(), "v1");
    }
}
