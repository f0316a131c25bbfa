//! Codec configuration

use crate::version::WireVersion;
use strand_core::error::{Error, Result};
use strand_core::limits::MAX_COLLECTION_LEN;

/// Dependency codec configuration
///
/// Controls which wire versions are accepted and how large a declared
/// collection may be before decoding gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Oldest wire version accepted for encode, decode and size calls
    pub min_version: WireVersion,
    /// Largest element count a decoder will accept for any collection
    pub max_collection_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            min_version: WireVersion::V1,
            max_collection_len: MAX_COLLECTION_LEN,
        }
    }
}

impl CodecConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config for testing
    ///
    /// Small collection limit so oversized-count paths are cheap to hit.
    pub fn for_testing() -> Self {
        CodecConfig {
            min_version: WireVersion::V1,
            max_collection_len: 4096,
        }
    }

    /// Set the oldest accepted wire version
    pub fn with_min_version(mut self, version: WireVersion) -> Self {
        self.min_version = version;
        self
    }

    /// Set the collection length limit
    pub fn with_max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_collection_len == 0 {
            return Err(Error::Config("max_collection_len must be positive".into()));
        }
        if self.max_collection_len > u32::MAX as usize {
            return Err(Error::Config(format!(
                "max_collection_len {} exceeds u32 index space",
                self.max_collection_len
            )));
        }
        Ok(())
    }

    /// Fail with `UnsupportedVersion` if `version` is older than allowed.
    pub fn check_version(&self, version: WireVersion) -> Result<()> {
        if version < self.min_version {
            return Err(Error::UnsupportedVersion(version.as_u8()));
        }
        Ok(())
    }
}
