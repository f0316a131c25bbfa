//! Self-describing range codec

use super::traits::RangeCodec;
use crate::wire::{put_routing_key, read_routing_key, routing_key_size, WireReader};
use strand_core::error::{Error, Result};
use strand_core::range::TokenRange;

/// Writes both endpoints as full routing keys.
///
/// Decoding goes through the checking constructor, so a range whose
/// endpoints name different tables is reported as corruption.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenRangeCodec;

impl RangeCodec for TokenRangeCodec {
    fn encode(&self, range: &TokenRange, out: &mut Vec<u8>) {
        put_routing_key(&range.start(), out);
        put_routing_key(&range.end(), out);
    }

    fn decode(&self, reader: &mut WireReader<'_>) -> Result<TokenRange> {
        let at = reader.position();
        let start = read_routing_key(reader)?;
        let end = read_routing_key(reader)?;
        TokenRange::create(start, end).map_err(|e| Error::corruption_at(at, e))
    }

    fn encoded_size(&self, range: &TokenRange) -> usize {
        routing_key_size(&range.start()) + routing_key_size(&range.end())
    }

    fn codec_id(&self) -> &str {
        "token"
    }
}
