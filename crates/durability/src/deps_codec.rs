//! Dependency graph codec
//!
//! # Layout
//!
//! ```text
//! keyDeps.keys        full set, or positions into a caller-supplied superset
//! keyDeps body        uvarint(txnIdCount) txnIds.. uvarint(assocCount) assoc..
//! rangeDeps           uvarint(rangeCount) ranges.. body
//! directKeyDeps       bool(subset of keyDeps.keys) key set body
//! covering            PartialDeps only: domain byte, then keys or ranges
//! ```
//!
//! Every `assoc` entry is one `keys_to_txn_ids` value as a varint, so the
//! parallel arrays decode without re-indexing.
//!
//! # Superset-relative top-level keys
//!
//! When the caller and the peer both know a superset of `keyDeps.keys` (the
//! transaction's own keys, say) the key set is written as positions into it.
//! At `WireVersion::V1` the positions are written unflagged and a key set
//! outside the superset is refused with `Error::SubsetViolation` before any
//! byte is written. At `WireVersion::V2` a flag byte precedes the set and the
//! encoder falls back to the full encoding on its own.

use crate::codec::{RangeCodec, TokenRangeCodec};
use crate::config::CodecConfig;
use crate::subset::{check_subset, decode_subset, encode_subset, subset_encoded_size};
use crate::version::WireVersion;
use crate::wire::{
    put_bool, put_routing_keys, put_txn_id, put_uvarint, read_routing_keys, read_txn_id,
    routing_keys_size, txn_id_size, uvarint_size, WireReader,
};
use std::fmt;
use std::sync::Arc;
use strand_core::deps::{Bipartite, Deps, KeyDeps, PartialDeps, RangeDeps};
use strand_core::error::{Error, Result};
use strand_core::key::RoutingKeys;
use strand_core::range::{Participants, Ranges};
use strand_core::sorted::{is_strictly_ascending, SortedList};
use tracing::{trace, warn};

/// Participants domain tags
const DOMAIN_KEYS: u8 = 0;
const DOMAIN_RANGES: u8 = 1;

/// Nullable markers
const ABSENT: u8 = 0;
const PRESENT: u8 = 1;

/// How the top-level key set goes on the wire
#[derive(Clone, Copy)]
enum KeySetMode<'a> {
    /// No superset: full encoding, no flag
    Full,
    /// Positions into `superset`, preceded by a `true` flag when `flagged`
    Relative {
        superset: &'a RoutingKeys,
        flagged: bool,
    },
    /// `false` flag then the full encoding
    FlaggedFull,
}

/// Encoder/decoder for [`Deps`] and [`PartialDeps`].
///
/// Cheap to clone and safe to share: the range codec sits behind an `Arc`.
#[derive(Clone)]
pub struct DepsCodec {
    range_codec: Arc<dyn RangeCodec>,
    config: CodecConfig,
}

impl Default for DepsCodec {
    fn default() -> Self {
        DepsCodec::new(Arc::new(TokenRangeCodec))
    }
}

impl fmt::Debug for DepsCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepsCodec")
            .field("range_codec", &self.range_codec.codec_id())
            .field("config", &self.config)
            .finish()
    }
}

impl DepsCodec {
    /// Codec writing ranges with `range_codec`
    pub fn new(range_codec: Arc<dyn RangeCodec>) -> Self {
        DepsCodec {
            range_codec,
            config: CodecConfig::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Range codec in use
    pub fn range_codec(&self) -> &dyn RangeCodec {
        self.range_codec.as_ref()
    }

    // ========================================================================
    // Deps
    // ========================================================================

    /// Append `deps` to `out`.
    pub fn encode(&self, deps: &Deps, version: WireVersion, out: &mut Vec<u8>) -> Result<()> {
        self.put_deps(deps, None, version, out)
    }

    /// Append `deps`, writing its key set relative to `superset`.
    ///
    /// # Errors
    ///
    /// At `V1`, `Error::SubsetViolation` if `deps.key_deps.keys()` is not a
    /// subset of `superset`; `out` is left untouched.
    pub fn encode_with_superset(
        &self,
        deps: &Deps,
        superset: &RoutingKeys,
        version: WireVersion,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        self.put_deps(deps, Some(superset), version, out)
    }

    /// Read a `Deps` written by [`encode`](Self::encode).
    pub fn decode(&self, reader: &mut WireReader<'_>, version: WireVersion) -> Result<Deps> {
        self.read_deps(reader, None, version)
    }

    /// Read a `Deps` written by [`encode_with_superset`](Self::encode_with_superset)
    /// against the same `superset`.
    pub fn decode_with_superset(
        &self,
        reader: &mut WireReader<'_>,
        superset: &RoutingKeys,
        version: WireVersion,
    ) -> Result<Deps> {
        self.read_deps(reader, Some(superset), version)
    }

    /// Exact size of [`encode`](Self::encode).
    pub fn encoded_size(&self, deps: &Deps, version: WireVersion) -> Result<usize> {
        self.deps_size(deps, None, version)
    }

    /// Exact size of [`encode_with_superset`](Self::encode_with_superset).
    pub fn encoded_size_with_superset(
        &self,
        deps: &Deps,
        superset: &RoutingKeys,
        version: WireVersion,
    ) -> Result<usize> {
        self.deps_size(deps, Some(superset), version)
    }

    /// Encode `deps` into a new buffer.
    pub fn encode_to_vec(&self, deps: &Deps, version: WireVersion) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_size(deps, version)?);
        self.encode(deps, version, &mut out)?;
        Ok(out)
    }

    /// Decode a buffer holding exactly one `Deps`.
    pub fn decode_from_slice(&self, bytes: &[u8], version: WireVersion) -> Result<Deps> {
        let mut reader = WireReader::new(bytes);
        let deps = self.decode(&mut reader, version)?;
        reader.expect_exhausted()?;
        Ok(deps)
    }

    // ========================================================================
    // PartialDeps
    // ========================================================================

    /// Append `partial`: the base encoding followed by its covering set.
    pub fn encode_partial(
        &self,
        partial: &PartialDeps,
        version: WireVersion,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        self.put_partial(partial, None, version, out)
    }

    /// Append `partial` with its key set relative to `superset`.
    pub fn encode_partial_with_superset(
        &self,
        partial: &PartialDeps,
        superset: &RoutingKeys,
        version: WireVersion,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        self.put_partial(partial, Some(superset), version, out)
    }

    /// Read a `PartialDeps` written by [`encode_partial`](Self::encode_partial).
    pub fn decode_partial(
        &self,
        reader: &mut WireReader<'_>,
        version: WireVersion,
    ) -> Result<PartialDeps> {
        self.read_partial(reader, None, version)
    }

    /// Read a `PartialDeps` written against `superset`.
    pub fn decode_partial_with_superset(
        &self,
        reader: &mut WireReader<'_>,
        superset: &RoutingKeys,
        version: WireVersion,
    ) -> Result<PartialDeps> {
        self.read_partial(reader, Some(superset), version)
    }

    /// Exact size of [`encode_partial`](Self::encode_partial).
    pub fn encoded_size_partial(&self, partial: &PartialDeps, version: WireVersion) -> Result<usize> {
        Ok(self.deps_size(partial.deps(), None, version)? + self.participants_size(partial.covering()))
    }

    /// Exact size of [`encode_partial_with_superset`](Self::encode_partial_with_superset).
    pub fn encoded_size_partial_with_superset(
        &self,
        partial: &PartialDeps,
        superset: &RoutingKeys,
        version: WireVersion,
    ) -> Result<usize> {
        Ok(self.deps_size(partial.deps(), Some(superset), version)?
            + self.participants_size(partial.covering()))
    }

    /// Encode `partial` into a new buffer.
    pub fn encode_partial_to_vec(&self, partial: &PartialDeps, version: WireVersion) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_size_partial(partial, version)?);
        self.encode_partial(partial, version, &mut out)?;
        Ok(out)
    }

    /// Decode a buffer holding exactly one `PartialDeps`.
    pub fn decode_partial_from_slice(&self, bytes: &[u8], version: WireVersion) -> Result<PartialDeps> {
        let mut reader = WireReader::new(bytes);
        let partial = self.decode_partial(&mut reader, version)?;
        reader.expect_exhausted()?;
        Ok(partial)
    }

    // ========================================================================
    // Nullable
    // ========================================================================

    /// Append an optional `Deps`: marker byte, then the encoding if present.
    ///
    /// `None` and `Some(&Deps::NONE)` encode differently.
    pub fn encode_nullable(
        &self,
        deps: Option<&Deps>,
        version: WireVersion,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        match deps {
            None => {
                self.config.check_version(version)?;
                out.push(ABSENT);
                Ok(())
            }
            Some(deps) => {
                let mark = out.len();
                out.push(PRESENT);
                let result = self.encode(deps, version, out);
                if result.is_err() {
                    out.truncate(mark);
                }
                result
            }
        }
    }

    /// Read an optional `Deps`.
    pub fn decode_nullable(
        &self,
        reader: &mut WireReader<'_>,
        version: WireVersion,
    ) -> Result<Option<Deps>> {
        self.config.check_version(version)?;
        if read_marker(reader)? {
            self.decode(reader, version).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Exact size of [`encode_nullable`](Self::encode_nullable).
    pub fn encoded_size_nullable(&self, deps: Option<&Deps>, version: WireVersion) -> Result<usize> {
        self.config.check_version(version)?;
        match deps {
            None => Ok(1),
            Some(deps) => Ok(1 + self.encoded_size(deps, version)?),
        }
    }

    /// Append an optional `PartialDeps`.
    pub fn encode_nullable_partial(
        &self,
        partial: Option<&PartialDeps>,
        version: WireVersion,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        match partial {
            None => {
                self.config.check_version(version)?;
                out.push(ABSENT);
                Ok(())
            }
            Some(partial) => {
                let mark = out.len();
                out.push(PRESENT);
                let result = self.encode_partial(partial, version, out);
                if result.is_err() {
                    out.truncate(mark);
                }
                result
            }
        }
    }

    /// Read an optional `PartialDeps`.
    pub fn decode_nullable_partial(
        &self,
        reader: &mut WireReader<'_>,
        version: WireVersion,
    ) -> Result<Option<PartialDeps>> {
        self.config.check_version(version)?;
        if read_marker(reader)? {
            self.decode_partial(reader, version).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Exact size of [`encode_nullable_partial`](Self::encode_nullable_partial).
    pub fn encoded_size_nullable_partial(
        &self,
        partial: Option<&PartialDeps>,
        version: WireVersion,
    ) -> Result<usize> {
        self.config.check_version(version)?;
        match partial {
            None => Ok(1),
            Some(partial) => Ok(1 + self.encoded_size_partial(partial, version)?),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn key_set_mode<'a>(
        &self,
        keys: &RoutingKeys,
        superset: Option<&'a RoutingKeys>,
        version: WireVersion,
    ) -> Result<KeySetMode<'a>> {
        self.config.check_version(version)?;
        let Some(superset) = superset else {
            return Ok(KeySetMode::Full);
        };
        let flagged = version.flags_top_level_keys();
        match check_subset(keys.as_slice(), superset.as_slice()) {
            Ok(()) => Ok(KeySetMode::Relative { superset, flagged }),
            Err(e) if flagged => {
                warn!(
                    keys = keys.len(),
                    superset = superset.len(),
                    error = %e,
                    "Key deps not a subset of declared superset, using full encoding"
                );
                Ok(KeySetMode::FlaggedFull)
            }
            Err(e) => Err(e),
        }
    }

    fn put_deps(
        &self,
        deps: &Deps,
        superset: Option<&RoutingKeys>,
        version: WireVersion,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        // decided before the first byte so a refusal leaves `out` untouched
        let mode = self.key_set_mode(deps.key_deps.keys(), superset, version)?;
        let start = out.len();

        match mode {
            KeySetMode::Full => put_routing_keys(deps.key_deps.keys(), out),
            KeySetMode::Relative { superset, flagged } => {
                if flagged {
                    put_bool(true, out);
                }
                encode_subset(deps.key_deps.keys().as_slice(), superset.as_slice(), out)?;
            }
            KeySetMode::FlaggedFull => {
                put_bool(false, out);
                put_routing_keys(deps.key_deps.keys(), out);
            }
        }
        put_body(&deps.key_deps, out);

        put_uvarint(deps.range_deps.range_count() as u64, out);
        for range in deps.range_deps.keys() {
            self.range_codec.encode(range, out);
        }
        put_body(&deps.range_deps, out);

        let direct_keys = deps.direct_key_deps.keys();
        let relative = direct_keys.is_subset_of(deps.key_deps.keys());
        put_bool(relative, out);
        if relative {
            encode_subset(direct_keys.as_slice(), deps.key_deps.keys().as_slice(), out)?;
        } else {
            put_routing_keys(direct_keys, out);
        }
        put_body(&deps.direct_key_deps, out);

        trace!(bytes = out.len() - start, %version, "Encoded deps");
        Ok(())
    }

    fn deps_size(
        &self,
        deps: &Deps,
        superset: Option<&RoutingKeys>,
        version: WireVersion,
    ) -> Result<usize> {
        let keys = deps.key_deps.keys();
        let mut size = match self.key_set_mode(keys, superset, version)? {
            KeySetMode::Full => routing_keys_size(keys),
            KeySetMode::Relative { superset, flagged } => {
                usize::from(flagged) + subset_encoded_size(keys.as_slice(), superset.as_slice())
            }
            KeySetMode::FlaggedFull => 1 + routing_keys_size(keys),
        };
        size += body_size(&deps.key_deps);

        size += uvarint_size(deps.range_deps.range_count() as u64);
        size += deps
            .range_deps
            .keys()
            .iter()
            .map(|r| self.range_codec.encoded_size(r))
            .sum::<usize>();
        size += body_size(&deps.range_deps);

        let direct_keys = deps.direct_key_deps.keys();
        size += 1;
        size += if direct_keys.is_subset_of(keys) {
            subset_encoded_size(direct_keys.as_slice(), keys.as_slice())
        } else {
            routing_keys_size(direct_keys)
        };
        size += body_size(&deps.direct_key_deps);
        Ok(size)
    }

    fn read_deps(
        &self,
        reader: &mut WireReader<'_>,
        superset: Option<&RoutingKeys>,
        version: WireVersion,
    ) -> Result<Deps> {
        self.config.check_version(version)?;
        let limit = self.config.max_collection_len;

        let keys = match superset {
            None => read_routing_keys(reader, limit)?,
            Some(superset) => {
                let relative = !version.flags_top_level_keys() || reader.read_bool()?;
                if relative {
                    read_relative_keys(reader, superset)?
                } else {
                    read_routing_keys(reader, limit)?
                }
            }
        };
        let key_deps: KeyDeps = self.read_body(reader, keys)?;

        let at = reader.position();
        let range_count = reader.read_count(limit)?;
        let mut ranges = Vec::with_capacity(range_count.min(reader.remaining()));
        for _ in 0..range_count {
            ranges.push(self.range_codec.decode(reader)?);
        }
        if !is_strictly_ascending(&ranges) {
            return Err(Error::corruption_at(at, "ranges not strictly ascending"));
        }
        let range_deps: RangeDeps = self.read_body(reader, Ranges::from_sorted_unchecked(ranges))?;

        let direct_keys = if reader.read_bool()? {
            read_relative_keys(reader, key_deps.keys())?
        } else {
            read_routing_keys(reader, limit)?
        };
        let direct_key_deps: KeyDeps = self.read_body(reader, direct_keys)?;

        Ok(Deps::new(key_deps, range_deps, direct_key_deps))
    }

    fn read_body<T>(&self, reader: &mut WireReader<'_>, keys: SortedList<T>) -> Result<Bipartite<T>> {
        let limit = self.config.max_collection_len;

        let at = reader.position();
        let txn_count = reader.read_count(limit)?;
        let mut txn_ids = Vec::with_capacity(txn_count.min(reader.remaining()));
        for _ in 0..txn_count {
            txn_ids.push(read_txn_id(reader)?);
        }
        if !is_strictly_ascending(&txn_ids) {
            return Err(Error::corruption_at(at, "txn ids not strictly ascending"));
        }

        let at = reader.position();
        let assoc_count = reader.read_count(limit)?;
        let mut assoc = Vec::with_capacity(assoc_count.min(reader.remaining()));
        for _ in 0..assoc_count {
            assoc.push(reader.read_uvarint32()?);
        }

        let graph = Bipartite::try_from_parts(keys, txn_ids, assoc)
            .map_err(|e| Error::corruption_at(at, e))?;
        for i in 0..graph.key_count() {
            let run: Vec<_> = graph.txn_ids_for_key(i).collect();
            if !is_strictly_ascending(&run) {
                return Err(Error::corruption_at(
                    at,
                    format!("txn run of key {} not strictly ascending", i),
                ));
            }
        }
        Ok(graph)
    }

    fn put_partial(
        &self,
        partial: &PartialDeps,
        superset: Option<&RoutingKeys>,
        version: WireVersion,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        self.put_deps(partial.deps(), superset, version, out)?;
        self.put_participants(partial.covering(), out);
        Ok(())
    }

    fn read_partial(
        &self,
        reader: &mut WireReader<'_>,
        superset: Option<&RoutingKeys>,
        version: WireVersion,
    ) -> Result<PartialDeps> {
        let deps = self.read_deps(reader, superset, version)?;
        let covering = self.read_participants(reader)?;
        Ok(PartialDeps::new(covering, deps))
    }

    /// Append a covering set: domain byte, then keys or ranges.
    pub fn put_participants(&self, participants: &Participants, out: &mut Vec<u8>) {
        match participants {
            Participants::Keys(keys) => {
                out.push(DOMAIN_KEYS);
                put_routing_keys(keys, out);
            }
            Participants::Ranges(ranges) => {
                out.push(DOMAIN_RANGES);
                put_uvarint(ranges.len() as u64, out);
                for range in ranges {
                    self.range_codec.encode(range, out);
                }
            }
        }
    }

    /// Exact size of [`put_participants`](Self::put_participants).
    pub fn participants_size(&self, participants: &Participants) -> usize {
        1 + match participants {
            Participants::Keys(keys) => routing_keys_size(keys),
            Participants::Ranges(ranges) => {
                uvarint_size(ranges.len() as u64)
                    + ranges
                        .iter()
                        .map(|r| self.range_codec.encoded_size(r))
                        .sum::<usize>()
            }
        }
    }

    /// Read a covering set.
    pub fn read_participants(&self, reader: &mut WireReader<'_>) -> Result<Participants> {
        let limit = self.config.max_collection_len;
        let at = reader.position();
        match reader.read_u8()? {
            DOMAIN_KEYS => Ok(Participants::Keys(read_routing_keys(reader, limit)?)),
            DOMAIN_RANGES => {
                let count = reader.read_count(limit)?;
                let mut ranges = Vec::with_capacity(count.min(reader.remaining()));
                for _ in 0..count {
                    ranges.push(self.range_codec.decode(reader)?);
                }
                if !is_strictly_ascending(&ranges) {
                    return Err(Error::corruption_at(at, "covering ranges not strictly ascending"));
                }
                Ok(Participants::Ranges(Ranges::from_sorted_unchecked(ranges)))
            }
            other => Err(Error::corruption_at(at, format!("unknown participants domain {}", other))),
        }
    }
}

fn put_body<T>(graph: &Bipartite<T>, out: &mut Vec<u8>) {
    put_uvarint(graph.txn_id_count() as u64, out);
    for txn_id in graph.txn_ids() {
        put_txn_id(txn_id, out);
    }
    put_uvarint(graph.keys_to_txn_ids_count() as u64, out);
    for i in 0..graph.keys_to_txn_ids_count() {
        put_uvarint(u64::from(graph.keys_to_txn_ids(i)), out);
    }
}

fn body_size<T>(graph: &Bipartite<T>) -> usize {
    uvarint_size(graph.txn_id_count() as u64)
        + graph.txn_ids().iter().map(txn_id_size).sum::<usize>()
        + uvarint_size(graph.keys_to_txn_ids_count() as u64)
        + (0..graph.keys_to_txn_ids_count())
            .map(|i| uvarint_size(u64::from(graph.keys_to_txn_ids(i))))
            .sum::<usize>()
}

fn read_relative_keys(reader: &mut WireReader<'_>, superset: &RoutingKeys) -> Result<RoutingKeys> {
    let keys = decode_subset(reader, superset.as_slice())?;
    Ok(RoutingKeys::from_sorted_unchecked(keys))
}

fn read_marker(reader: &mut WireReader<'_>) -> Result<bool> {
    let at = reader.position();
    match reader.read_u8()? {
        ABSENT => Ok(false),
        PRESENT => Ok(true),
        other => Err(Error::corruption_at(at, format!("invalid nullable marker {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SimpleRangeCodec;
    use strand_core::key::{RoutingKey, TableId};
    use strand_core::range::{Domain, TokenRange};
    use strand_core::types::TxnId;

    fn table() -> TableId {
        TableId::from_u128(0xA11CE)
    }

    fn key(token: i64) -> RoutingKey {
        RoutingKey::token(table(), token)
    }

    fn txn(hlc: u64) -> TxnId {
        TxnId::new(1, hlc, 0, 3)
    }

    fn range(start: i64, end: i64) -> TokenRange {
        TokenRange::create(key(start), key(end)).unwrap()
    }

    fn sample() -> Deps {
        let mut keys = KeyDeps::builder();
        keys.add(key(1), txn(10)).add(key(2), txn(10)).add(key(2), txn(20));
        let mut ranges = RangeDeps::builder();
        ranges.add(range(0, 50), txn(30)).add(range(60, 90), txn(10));
        let mut direct = KeyDeps::builder();
        direct.add(key(2), txn(20));
        Deps::new(keys.build(), ranges.build(), direct.build())
    }

    fn check(codec: &DepsCodec, deps: &Deps, version: WireVersion) {
        let bytes = codec.encode_to_vec(deps, version).unwrap();
        assert_eq!(bytes.len(), codec.encoded_size(deps, version).unwrap());
        assert_eq!(&codec.decode_from_slice(&bytes, version).unwrap(), deps);
    }

    #[test]
    fn test_round_trip_every_version() {
        let codec = DepsCodec::default();
        for version in WireVersion::ALL {
            check(&codec, &sample(), version);
            check(&codec, &Deps::NONE, version);
        }
    }

    #[test]
    fn test_round_trip_simple_range_codec() {
        let codec = DepsCodec::new(Arc::new(SimpleRangeCodec::new(table())));
        check(&codec, &sample(), WireVersion::CURRENT);
        let default_len = DepsCodec::default()
            .encoded_size(&sample(), WireVersion::CURRENT)
            .unwrap();
        let simple_len = codec.encoded_size(&sample(), WireVersion::CURRENT).unwrap();
        assert!(simple_len < default_len);
    }

    #[test]
    fn test_superset_relative_is_smaller() {
        let codec = DepsCodec::default();
        let superset = RoutingKeys::of(vec![key(1), key(2), key(3)]);
        for version in WireVersion::ALL {
            let mut out = Vec::new();
            codec
                .encode_with_superset(&sample(), &superset, version, &mut out)
                .unwrap();
            assert_eq!(
                out.len(),
                codec
                    .encoded_size_with_superset(&sample(), &superset, version)
                    .unwrap()
            );
            assert!(out.len() < codec.encoded_size(&sample(), version).unwrap());
            let mut reader = WireReader::new(&out);
            let back = codec
                .decode_with_superset(&mut reader, &superset, version)
                .unwrap();
            assert!(reader.is_exhausted());
            assert_eq!(back, sample());
        }
    }

    #[test]
    fn test_v1_refuses_non_subset_without_writing() {
        let codec = DepsCodec::default();
        let superset = RoutingKeys::of(vec![key(1)]);
        let mut out = vec![0xEE];
        let err = codec
            .encode_with_superset(&sample(), &superset, WireVersion::V1, &mut out)
            .unwrap_err();
        assert!(matches!(err, Error::SubsetViolation { missing: 1, .. }));
        assert_eq!(out, vec![0xEE]);
        assert!(codec
            .encoded_size_with_superset(&sample(), &superset, WireVersion::V1)
            .is_err());
    }

    #[test]
    fn test_v2_falls_back_to_full() {
        let codec = DepsCodec::default();
        let superset = RoutingKeys::of(vec![key(1)]);
        let mut out = Vec::new();
        codec
            .encode_with_superset(&sample(), &superset, WireVersion::V2, &mut out)
            .unwrap();
        assert_eq!(out[0], 0, "fallback flag");
        assert_eq!(
            out.len(),
            1 + codec.encoded_size(&sample(), WireVersion::V2).unwrap()
        );
        let back = codec
            .decode_with_superset(&mut WireReader::new(&out), &superset, WireVersion::V2)
            .unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_direct_keys_outside_key_deps() {
        let mut direct = KeyDeps::builder();
        direct.add(key(99), txn(5));
        let deps = Deps::new(sample().key_deps, RangeDeps::NONE, direct.build());
        check(&DepsCodec::default(), &deps, WireVersion::CURRENT);
    }

    #[test]
    fn test_partial_round_trip() {
        let codec = DepsCodec::default();
        for covering in [
            Participants::Keys(RoutingKeys::of(vec![key(1), key(2)])),
            Participants::Ranges(Ranges::of(vec![range(0, 100)])),
            Participants::empty(Domain::Range),
        ] {
            let partial = sample().slice(&covering);
            for version in WireVersion::ALL {
                let bytes = codec.encode_partial_to_vec(&partial, version).unwrap();
                assert_eq!(
                    bytes.len(),
                    codec.encoded_size_partial(&partial, version).unwrap()
                );
                assert_eq!(
                    codec.decode_partial_from_slice(&bytes, version).unwrap(),
                    partial
                );
            }
        }
    }

    #[test]
    fn test_partial_with_superset() {
        let codec = DepsCodec::default();
        let covering = Participants::Keys(RoutingKeys::of(vec![key(1), key(2)]));
        let partial = sample().slice(&covering);
        let superset = RoutingKeys::of(vec![key(1), key(2)]);
        let mut out = Vec::new();
        codec
            .encode_partial_with_superset(&partial, &superset, WireVersion::V2, &mut out)
            .unwrap();
        assert_eq!(
            out.len(),
            codec
                .encoded_size_partial_with_superset(&partial, &superset, WireVersion::V2)
                .unwrap()
        );
        let back = codec
            .decode_partial_with_superset(&mut WireReader::new(&out), &superset, WireVersion::V2)
            .unwrap();
        assert_eq!(back, partial);
    }

    #[test]
    fn test_nullable_distinguishes_none_from_empty() {
        let codec = DepsCodec::default();
        let version = WireVersion::CURRENT;

        let mut none = Vec::new();
        codec.encode_nullable(None, version, &mut none).unwrap();
        let mut empty = Vec::new();
        codec
            .encode_nullable(Some(&Deps::NONE), version, &mut empty)
            .unwrap();
        assert_eq!(none, vec![ABSENT]);
        assert_ne!(none, empty);
        assert_eq!(empty.len(), codec.encoded_size_nullable(Some(&Deps::NONE), version).unwrap());

        assert_eq!(codec.decode_nullable(&mut WireReader::new(&none), version).unwrap(), None);
        assert_eq!(
            codec.decode_nullable(&mut WireReader::new(&empty), version).unwrap(),
            Some(Deps::NONE)
        );
        assert!(codec.decode_nullable(&mut WireReader::new(&[7]), version).is_err());
    }

    #[test]
    fn test_nullable_partial() {
        let codec = DepsCodec::default();
        let version = WireVersion::CURRENT;
        let partial = sample().slice(&Participants::Ranges(Ranges::of(vec![range(0, 10)])));

        let mut out = Vec::new();
        codec.encode_nullable_partial(Some(&partial), version, &mut out).unwrap();
        codec.encode_nullable_partial(None, version, &mut out).unwrap();
        assert_eq!(
            out.len(),
            codec.encoded_size_nullable_partial(Some(&partial), version).unwrap()
                + codec.encoded_size_nullable_partial(None, version).unwrap()
        );
        let mut reader = WireReader::new(&out);
        assert_eq!(
            codec.decode_nullable_partial(&mut reader, version).unwrap(),
            Some(partial)
        );
        assert_eq!(codec.decode_nullable_partial(&mut reader, version).unwrap(), None);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_truncation_is_corruption_at_every_cut() {
        let codec = DepsCodec::default();
        let bytes = codec.encode_to_vec(&sample(), WireVersion::CURRENT).unwrap();
        for cut in 0..bytes.len() {
            let err = codec
                .decode_from_slice(&bytes[..cut], WireVersion::CURRENT)
                .unwrap_err();
            assert!(err.is_corruption(), "cut {}: {}", cut, err);
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let codec = DepsCodec::default();
        let mut bytes = codec.encode_to_vec(&sample(), WireVersion::CURRENT).unwrap();
        bytes.push(0);
        let err = codec
            .decode_from_slice(&bytes, WireVersion::CURRENT)
            .unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn test_unsorted_txn_ids_rejected() {
        let mut out = Vec::new();
        put_uvarint(0, &mut out); // no keys
        put_uvarint(2, &mut out);
        put_txn_id(&txn(2), &mut out);
        put_txn_id(&txn(1), &mut out);
        put_uvarint(0, &mut out);
        let err = DepsCodec::default()
            .decode(&mut WireReader::new(&out), WireVersion::V1)
            .unwrap_err();
        assert!(err.to_string().contains("txn ids not strictly ascending"));
    }

    #[test]
    fn test_bad_offsets_rejected() {
        let mut out = Vec::new();
        put_routing_keys(&RoutingKeys::of(vec![key(1)]), &mut out);
        put_uvarint(1, &mut out);
        put_txn_id(&txn(1), &mut out);
        // header claims the run ends at 5 but only 2 entries follow
        put_uvarint(2, &mut out);
        put_uvarint(5, &mut out);
        put_uvarint(0, &mut out);
        let err = DepsCodec::default()
            .decode(&mut WireReader::new(&out), WireVersion::V1)
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_declared_count_over_limit() {
        let codec = DepsCodec::default()
            .with_config(CodecConfig::for_testing().with_max_collection_len(4));
        let mut out = Vec::new();
        put_uvarint(5, &mut out);
        let err = codec
            .decode(&mut WireReader::new(&out), WireVersion::V2)
            .unwrap_err();
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn test_min_version_refuses_legacy() {
        let codec = DepsCodec::default()
            .with_config(CodecConfig::new().with_min_version(WireVersion::V2));
        let mut out = Vec::new();
        assert_eq!(
            codec.encode(&sample(), WireVersion::V1, &mut out),
            Err(Error::UnsupportedVersion(1))
        );
        assert!(out.is_empty());
        assert!(codec.encoded_size(&sample(), WireVersion::V1).is_err());
        assert!(codec.decode_from_slice(&[0], WireVersion::V1).is_err());
        assert!(codec.encode_nullable(None, WireVersion::V1, &mut out).is_err());
        check(&codec, &sample(), WireVersion::V2);
    }

    #[test]
    fn test_participants_bad_domain() {
        let err = DepsCodec::default()
            .read_participants(&mut WireReader::new(&[9]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown participants domain"));
    }
}
