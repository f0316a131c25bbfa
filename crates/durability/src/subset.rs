//! Subset-relative encoding
//!
//! When both sides already know a superset `U`, a subset `S ⊆ U` is sent as
//! positions into `U` instead of as full elements:
//!
//! - `|U| < 64`: a single varint bitmap with bit `i` set when `U[i]` is
//!   *absent* from `S`. The full superset encodes as `0`.
//! - otherwise: `uvarint(|U| - |S|)`, then the positions of the present
//!   elements when `|S| < |U| / 2`, else the positions of the absent ones.
//!   The decoder derives which list follows from the count alone.

use crate::wire::{put_uvarint, uvarint_size, WireReader};
use strand_core::error::{Error, Result};
use strand_core::limits::SUBSET_BITMAP_THRESHOLD;
use strand_core::sorted::is_subset;

/// Append `subset` as positions into `superset`.
///
/// Both slices must be strictly ascending.
///
/// # Errors
///
/// `Error::SubsetViolation` if some element of `subset` is not in
/// `superset`. Nothing is written in that case.
pub fn encode_subset<T: Ord>(subset: &[T], superset: &[T], out: &mut Vec<u8>) -> Result<()> {
    check_subset(subset, superset)?;
    let n = superset.len();
    if n < SUBSET_BITMAP_THRESHOLD {
        put_uvarint(absent_bitmap(subset, superset), out);
        return Ok(());
    }
    let missing = n - subset.len();
    put_uvarint(missing as u64, out);
    let write_present = subset.len() < n / 2;
    for (i, present) in membership(subset, superset) {
        if present == write_present {
            put_uvarint(i as u64, out);
        }
    }
    Ok(())
}

/// Exact size of `encode_subset(subset, superset)`.
///
/// `subset` must be a subset of `superset`; elements outside it are ignored.
pub fn subset_encoded_size<T: Ord>(subset: &[T], superset: &[T]) -> usize {
    let n = superset.len();
    if n < SUBSET_BITMAP_THRESHOLD {
        return uvarint_size(absent_bitmap(subset, superset));
    }
    let write_present = subset.len() < n / 2;
    let positions: usize = membership(subset, superset)
        .filter(|&(_, present)| present == write_present)
        .map(|(i, _)| uvarint_size(i as u64))
        .sum();
    uvarint_size((n - subset.len()) as u64) + positions
}

/// Read a subset written by [`encode_subset`] against the same `superset`.
pub fn decode_subset<T: Clone>(reader: &mut WireReader<'_>, superset: &[T]) -> Result<Vec<T>> {
    let n = superset.len();
    let start = reader.position();
    if n < SUBSET_BITMAP_THRESHOLD {
        let bitmap = reader.read_uvarint()?;
        if n < 64 && bitmap >> n != 0 {
            return Err(Error::corruption_at(
                start,
                format!("subset bitmap {:#x} has bits beyond superset of {}", bitmap, n),
            ));
        }
        return Ok(superset
            .iter()
            .enumerate()
            .filter(|(i, _)| bitmap & (1u64 << i) == 0)
            .map(|(_, item)| item.clone())
            .collect());
    }

    let missing = reader.read_count(n).map_err(|_| {
        Error::corruption_at(start, format!("subset missing count exceeds superset of {}", n))
    })?;
    let present_len = n - missing;
    let read_present = present_len < n / 2;
    let listed = if read_present { present_len } else { missing };

    let mut positions = Vec::with_capacity(listed);
    for _ in 0..listed {
        let at = reader.position();
        let pos = reader.read_uvarint()?;
        if pos >= n as u64 {
            return Err(Error::corruption_at(
                at,
                format!("subset position {} out of range for superset of {}", pos, n),
            ));
        }
        if positions.last().is_some_and(|&prev| prev >= pos as usize) {
            return Err(Error::corruption_at(at, "subset positions not strictly increasing"));
        }
        positions.push(pos as usize);
    }

    if read_present {
        Ok(positions.into_iter().map(|i| superset[i].clone()).collect())
    } else {
        let mut absent = positions.into_iter().peekable();
        let mut out = Vec::with_capacity(present_len);
        for (i, item) in superset.iter().enumerate() {
            if absent.peek() == Some(&i) {
                absent.next();
            } else {
                out.push(item.clone());
            }
        }
        Ok(out)
    }
}

pub(crate) fn check_subset<T: Ord>(subset: &[T], superset: &[T]) -> Result<()> {
    if is_subset(subset, superset) {
        return Ok(());
    }
    let missing = subset
        .iter()
        .filter(|item| superset.binary_search(item).is_err())
        .count();
    Err(Error::SubsetViolation {
        subset_len: subset.len(),
        superset_len: superset.len(),
        missing,
    })
}

fn absent_bitmap<T: Ord>(subset: &[T], superset: &[T]) -> u64 {
    membership(subset, superset)
        .filter(|&(_, present)| !present)
        .fold(0u64, |bitmap, (i, _)| bitmap | (1u64 << i))
}

/// `(position, present)` for every element of `superset`.
fn membership<'a, T: Ord>(
    subset: &'a [T],
    superset: &'a [T],
) -> impl Iterator<Item = (usize, bool)> + 'a {
    let mut j = 0;
    superset.iter().enumerate().map(move |(i, item)| {
        while j < subset.len() && subset[j] < *item {
            j += 1;
        }
        let present = j < subset.len() && subset[j] == *item;
        if present {
            j += 1;
        }
        (i, present)
    })
}
