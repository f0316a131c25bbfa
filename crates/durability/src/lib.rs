//! Wire layer for strand
//!
//! This crate handles everything that turns dependency graphs into bytes:
//!
//! - Wire primitives: LEB128 varints, booleans, big-endian tokens, txn ids, keys
//! - Wire versions (V1 unflagged superset keys, V2 flagged with fallback)
//! - Subset-relative encoding against a known superset
//! - Range codec abstraction (the host system's range layout)
//! - DepsCodec: Deps / PartialDeps / nullable encode, decode and exact sizing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec; // Range codec abstraction (token, simple)
pub mod config; // Codec configuration
pub mod deps_codec; // Deps / PartialDeps codec
pub mod subset; // Subset-relative encoding
pub mod version; // Wire versions
pub mod wire; // Varints, reader cursor, key and txn id encodings

// === Re-exports ===
pub use codec::{RangeCodec, SimpleRangeCodec, TokenRangeCodec};
pub use config::CodecConfig;
pub use deps_codec::DepsCodec;
pub use subset::{decode_subset, encode_subset, subset_encoded_size};
pub use version::WireVersion;
pub use wire::WireReader;
