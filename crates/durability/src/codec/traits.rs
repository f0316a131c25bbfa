//! Range codec trait definitions.

use crate::wire::WireReader;
use strand_core::error::Result;
use strand_core::range::TokenRange;

/// Range codec trait.
///
/// Every token range inside an encoded dependency graph (range deps and
/// range-domain covering sets) goes through the codec, so the host system
/// decides how ranges are laid out on the wire.
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync`: a single `DepsCodec` is shared across
/// threads.
///
/// # Codec Identity
///
/// Each codec has an identifier. Both ends of a connection must agree on it;
/// the bytes carry no codec tag.
pub trait RangeCodec: Send + Sync {
    /// Append the encoding of `range` to `out`.
    fn encode(&self, range: &TokenRange, out: &mut Vec<u8>);

    /// Read one range.
    ///
    /// Returns `Error::Corruption` on truncated or invalid input.
    fn decode(&self, reader: &mut WireReader<'_>) -> Result<TokenRange>;

    /// Exact number of bytes `encode` appends for `range`.
    fn encoded_size(&self, range: &TokenRange) -> usize;

    /// Unique codec identifier.
    fn codec_id(&self) -> &str;
}
