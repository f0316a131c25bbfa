//! Compact range codec for single-table harnesses

use super::traits::RangeCodec;
use crate::wire::{put_uvarint, unzigzag, uvarint_size, zigzag, WireReader};
use strand_core::error::{Error, Result};
use strand_core::key::{RoutingKey, RoutingKeyKind, TableId};
use strand_core::range::TokenRange;

const MIN_SENTINEL: u8 = 0;
const TOKEN: u8 = 1;
const MAX_SENTINEL: u8 = 2;

/// Writes each endpoint as a kind byte, plus a zig-zag varint for tokens.
///
/// Every range is assumed to belong to `table`; the table itself is never
/// written. Ranges are rebuilt with `TokenRange::create_unsafe`.
#[derive(Debug, Clone, Copy)]
pub struct SimpleRangeCodec {
    table: TableId,
}

impl SimpleRangeCodec {
    /// Codec bound to `table`
    pub fn new(table: TableId) -> Self {
        SimpleRangeCodec { table }
    }

    /// Table every decoded range is placed in
    pub fn table(&self) -> TableId {
        self.table
    }

    fn put_endpoint(key: &RoutingKey, out: &mut Vec<u8>) {
        match key.kind() {
            RoutingKeyKind::MinSentinel => out.push(MIN_SENTINEL),
            RoutingKeyKind::Token(token) => {
                out.push(TOKEN);
                put_uvarint(zigzag(token), out);
            }
            RoutingKeyKind::MaxSentinel => out.push(MAX_SENTINEL),
        }
    }

    fn endpoint_size(key: &RoutingKey) -> usize {
        match key.kind() {
            RoutingKeyKind::Token(token) => 1 + uvarint_size(zigzag(token)),
            _ => 1,
        }
    }

    fn read_endpoint(&self, reader: &mut WireReader<'_>) -> Result<RoutingKey> {
        let at = reader.position();
        match reader.read_u8()? {
            MIN_SENTINEL => Ok(RoutingKey::min(self.table)),
            TOKEN => Ok(RoutingKey::token(self.table, unzigzag(reader.read_uvarint()?))),
            MAX_SENTINEL => Ok(RoutingKey::max(self.table)),
            other => Err(Error::corruption_at(at, format!("unknown endpoint kind {}", other))),
        }
    }
}

impl RangeCodec for SimpleRangeCodec {
    fn encode(&self, range: &TokenRange, out: &mut Vec<u8>) {
        Self::put_endpoint(&range.start(), out);
        Self::put_endpoint(&range.end(), out);
    }

    fn decode(&self, reader: &mut WireReader<'_>) -> Result<TokenRange> {
        let start = self.read_endpoint(reader)?;
        let end = self.read_endpoint(reader)?;
        Ok(TokenRange::create_unsafe(start, end))
    }

    fn encoded_size(&self, range: &TokenRange) -> usize {
        Self::endpoint_size(&range.start()) + Self::endpoint_size(&range.end())
    }

    fn codec_id(&self) -> &str {
        "simple"
    }
}
