//! Wire primitives
//!
//! Everything the dependency codec writes is built from these pieces:
//!
//! - unsigned LEB128 varints for counts, indexes and id components
//! - single-byte booleans and tags
//! - big-endian fixed-width integers (`byteorder`) for tokens
//!
//! Reads go through [`WireReader`], a cursor that reports truncation and
//! malformed values as `Error::Corruption` tagged with the byte offset.

use byteorder::{BigEndian, ByteOrder};
use strand_core::error::{Error, Result};
use strand_core::key::{RoutingKey, RoutingKeyKind, RoutingKeys, TableId};
use strand_core::sorted::is_strictly_ascending;
use strand_core::types::TxnId;

/// Routing key kind tags
const KEY_MIN_SENTINEL: u8 = 0;
const KEY_TOKEN: u8 = 1;
const KEY_MAX_SENTINEL: u8 = 2;

// ============================================================================
// Varint (LEB128) Codec
// ============================================================================

/// Append `value` as an unsigned LEB128 varint.
pub fn put_uvarint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Encoded size of `value` as an unsigned varint.
pub fn uvarint_size(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    (bits.max(1) + 6) / 7
}

/// Zig-zag map a signed value so small magnitudes encode small.
pub fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag`].
pub fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Append a boolean as one byte.
pub fn put_bool(value: bool, out: &mut Vec<u8>) {
    out.push(u8::from(value));
}

/// Append a big-endian `i64`.
pub fn put_i64(value: i64, out: &mut Vec<u8>) {
    let mut buf = [0u8; 8];
    BigEndian::write_i64(&mut buf, value);
    out.extend_from_slice(&buf);
}

// ============================================================================
// WireReader
// ============================================================================

/// Cursor over an encoded buffer.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Start reading at the beginning of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        WireReader { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True once every byte has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Fail unless every byte has been consumed.
    pub fn expect_exhausted(&self) -> Result<()> {
        if self.is_exhausted() {
            Ok(())
        } else {
            Err(Error::corruption_at(
                self.pos,
                format!("{} trailing bytes after value", self.remaining()),
            ))
        }
    }

    /// Corruption error at the current offset
    pub fn corruption(&self, detail: impl std::fmt::Display) -> Error {
        Error::corruption_at(self.pos, detail)
    }

    /// Borrow the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(self.corruption(format!(
                "unexpected end of buffer: needed {} bytes, {} left",
                n,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a one-byte boolean; only 0 and 1 are valid.
    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::corruption_at(
                self.pos - 1,
                format!("invalid boolean byte {:#04x}", other),
            )),
        }
    }

    /// Read a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.read_bytes(8)?))
    }

    /// Read an unsigned LEB128 varint.
    pub fn read_uvarint(&mut self) -> Result<u64> {
        let start = self.pos;
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift == 63 && byte > 1 {
                return Err(Error::corruption_at(start, "varint overflows u64"));
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(Error::corruption_at(start, "varint longer than 10 bytes"));
            }
        }
    }

    /// Read a varint that must fit in a `u32`.
    pub fn read_uvarint32(&mut self) -> Result<u32> {
        let start = self.pos;
        let value = self.read_uvarint()?;
        u32::try_from(value)
            .map_err(|_| Error::corruption_at(start, format!("varint {} overflows u32", value)))
    }

    /// Read a collection length and check it against `limit`.
    ///
    /// Done before any allocation sized by the count.
    pub fn read_count(&mut self, limit: usize) -> Result<usize> {
        let start = self.pos;
        let count = self.read_uvarint()?;
        if count > limit as u64 {
            return Err(Error::corruption_at(
                start,
                format!("declared count {} exceeds limit {}", count, limit),
            ));
        }
        Ok(count as usize)
    }
}

// ============================================================================
// Transaction ids and routing keys
// ============================================================================

/// Append a transaction id: `uvarint(epoch) uvarint(hlc) uvarint(flags) uvarint(node)`.
pub fn put_txn_id(txn_id: &TxnId, out: &mut Vec<u8>) {
    put_uvarint(txn_id.epoch, out);
    put_uvarint(txn_id.hlc, out);
    put_uvarint(u64::from(txn_id.flags), out);
    put_uvarint(u64::from(txn_id.node), out);
}

/// Encoded size of a transaction id.
pub fn txn_id_size(txn_id: &TxnId) -> usize {
    uvarint_size(txn_id.epoch)
        + uvarint_size(txn_id.hlc)
        + uvarint_size(u64::from(txn_id.flags))
        + uvarint_size(u64::from(txn_id.node))
}

/// Read a transaction id.
pub fn read_txn_id(reader: &mut WireReader<'_>) -> Result<TxnId> {
    let epoch = reader.read_uvarint()?;
    let hlc = reader.read_uvarint()?;
    let start = reader.position();
    let flags = u16::try_from(reader.read_uvarint()?)
        .map_err(|_| Error::corruption_at(start, "txn id flags overflow u16"))?;
    let node = reader.read_uvarint32()?;
    Ok(TxnId::new(epoch, hlc, flags, node))
}

/// Append a routing key: table bytes, kind tag, then the token for token keys.
pub fn put_routing_key(key: &RoutingKey, out: &mut Vec<u8>) {
    out.extend_from_slice(key.table().as_bytes());
    match key.kind() {
        RoutingKeyKind::MinSentinel => out.push(KEY_MIN_SENTINEL),
        RoutingKeyKind::Token(token) => {
            out.push(KEY_TOKEN);
            put_i64(token, out);
        }
        RoutingKeyKind::MaxSentinel => out.push(KEY_MAX_SENTINEL),
    }
}

/// Encoded size of a routing key.
pub fn routing_key_size(key: &RoutingKey) -> usize {
    match key.kind() {
        RoutingKeyKind::Token(_) => 16 + 1 + 8,
        _ => 16 + 1,
    }
}

/// Read a routing key.
pub fn read_routing_key(reader: &mut WireReader<'_>) -> Result<RoutingKey> {
    let mut table = [0u8; 16];
    table.copy_from_slice(reader.read_bytes(16)?);
    let table = TableId::from_bytes(table);
    let kind = match reader.read_u8()? {
        KEY_MIN_SENTINEL => RoutingKeyKind::MinSentinel,
        KEY_TOKEN => RoutingKeyKind::Token(reader.read_i64()?),
        KEY_MAX_SENTINEL => RoutingKeyKind::MaxSentinel,
        other => {
            return Err(Error::corruption_at(
                reader.position() - 1,
                format!("unknown routing key kind {}", other),
            ))
        }
    };
    Ok(RoutingKey::new(table, kind))
}

/// Append a full key set: `uvarint(count)` then each key.
pub fn put_routing_keys(keys: &RoutingKeys, out: &mut Vec<u8>) {
    put_uvarint(keys.len() as u64, out);
    for key in keys {
        put_routing_key(key, out);
    }
}

/// Encoded size of a full key set.
pub fn routing_keys_size(keys: &RoutingKeys) -> usize {
    uvarint_size(keys.len() as u64) + keys.iter().map(routing_key_size).sum::<usize>()
}

/// Read a full key set, rejecting unsorted or duplicated keys.
pub fn read_routing_keys(reader: &mut WireReader<'_>, limit: usize) -> Result<RoutingKeys> {
    let start = reader.position();
    let count = reader.read_count(limit)?;
    let mut keys = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        keys.push(read_routing_key(reader)?);
    }
    if !is_strictly_ascending(&keys) {
        return Err(Error::corruption_at(start, "routing keys not strictly ascending"));
    }
    Ok(RoutingKeys::from_sorted_unchecked(keys))
}
