//! Three keys, two transactions
//!
//! `A` depends on `{k1, k2}` and `B` on `{k2, k3}`. Every encoding path must
//! give back `k1 -> {A}`, `k2 -> {A, B}`, `k3 -> {B}`.

use strand_core::deps::{Deps, KeyDeps, RangeDeps};
use strand_core::error::Error;
use strand_core::key::{RoutingKey, RoutingKeys, TableId};
use strand_core::types::TxnId;
use strand_durability::{DepsCodec, WireReader, WireVersion};

struct Fixture {
    k1: RoutingKey,
    k2: RoutingKey,
    k3: RoutingKey,
    a: TxnId,
    b: TxnId,
    deps: Deps,
}

fn fixture() -> Fixture {
    let table = TableId::from_u128(42);
    let (k1, k2, k3) = (
        RoutingKey::token(table, 1),
        RoutingKey::token(table, 2),
        RoutingKey::token(table, 3),
    );
    let a = TxnId::new(1, 100, 0, 1);
    let b = TxnId::new(1, 200, 0, 2);
    let mut builder = KeyDeps::builder();
    builder.add_all(k1, [a]).add_all(k2, [a, b]).add_all(k3, [b]);
    let deps = Deps::new(builder.build(), RangeDeps::NONE, KeyDeps::NONE);
    Fixture {
        k1,
        k2,
        k3,
        a,
        b,
        deps,
    }
}

fn assert_associations(f: &Fixture, deps: &Deps) {
    assert_eq!(deps.key_deps.keys().as_slice(), &[f.k1, f.k2, f.k3]);
    assert_eq!(deps.key_deps.txn_ids_for(&f.k1), vec![f.a]);
    assert_eq!(deps.key_deps.txn_ids_for(&f.k2), vec![f.a, f.b]);
    assert_eq!(deps.key_deps.txn_ids_for(&f.k3), vec![f.b]);
    assert_eq!(deps.key_deps.keys_for_txn_id(&f.a), vec![&f.k1, &f.k2]);
    assert_eq!(deps.key_deps.keys_for_txn_id(&f.b), vec![&f.k2, &f.k3]);
}

#[test]
fn test_full_encoding() {
    let f = fixture();
    let codec = DepsCodec::default();
    for version in WireVersion::ALL {
        let bytes = codec.encode_to_vec(&f.deps, version).unwrap();
        let back = codec.decode_from_slice(&bytes, version).unwrap();
        assert_eq!(back, f.deps);
        assert_associations(&f, &back);
    }
}

#[test]
fn test_external_superset() {
    let f = fixture();
    let codec = DepsCodec::default();
    let superset = RoutingKeys::of(vec![f.k1, f.k2, f.k3]);
    for version in WireVersion::ALL {
        let mut out = Vec::new();
        codec
            .encode_with_superset(&f.deps, &superset, version, &mut out)
            .unwrap();
        // the whole key set collapses to an all-present bitmap
        let full = codec.encoded_size(&f.deps, version).unwrap();
        assert!(out.len() < full, "{} vs {}", out.len(), full);

        let mut reader = WireReader::new(&out);
        let back = codec
            .decode_with_superset(&mut reader, &superset, version)
            .unwrap();
        reader.expect_exhausted().unwrap();
        assert_associations(&f, &back);
    }
}

#[test]
fn test_superset_missing_a_key() {
    let f = fixture();
    let codec = DepsCodec::default();
    let superset = RoutingKeys::of(vec![f.k1, f.k2]);

    let mut out = Vec::new();
    let err = codec
        .encode_with_superset(&f.deps, &superset, WireVersion::V1, &mut out)
        .unwrap_err();
    assert_eq!(
        err,
        Error::SubsetViolation {
            subset_len: 3,
            superset_len: 2,
            missing: 1
        }
    );
    assert!(out.is_empty());

    codec
        .encode_with_superset(&f.deps, &superset, WireVersion::V2, &mut out)
        .unwrap();
    let back = codec
        .decode_with_superset(&mut WireReader::new(&out), &superset, WireVersion::V2)
        .unwrap();
    assert_associations(&f, &back);
}
