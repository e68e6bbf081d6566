// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! First-fit subnet carving.
//!
//! Ranges are compared as half-open address intervals `[network, broadcast + 1)`,
//! held in `u64` so that the end of `255.255.255.255/32` does not overflow.

use crate::errors::ReconcileError;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Half-open `[start, end)` bounds of `range`.
fn bounds(range: &Ipv4Net) -> (u64, u64) {
    let start = u64::from(u32::from(range.network()));
    (start, start + (1_u64 << (32 - range.prefix_len())))
}

/// Whether two ranges share at least one address.
#[must_use]
pub fn overlaps(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    let (a_start, a_end) = bounds(a);
    let (b_start, b_end) = bounds(b);
    a_start.max(b_start) < a_end.min(b_end)
}

/// First pair of overlapping ranges in `ranges`, if any.
#[must_use]
pub fn find_overlap(ranges: &[Ipv4Net]) -> Option<(Ipv4Net, Ipv4Net)> {
    let mut sorted: Vec<&Ipv4Net> = ranges.iter().collect();
    sorted.sort_by_key(|r| bounds(r));

    let mut widest: Option<&Ipv4Net> = None;
    for range in sorted {
        if let Some(prev) = widest {
            if overlaps(prev, range) {
                return Some((*prev, *range));
            }
            if bounds(range).1 > bounds(prev).1 {
                widest = Some(range);
            }
        } else {
            widest = Some(range);
        }
    }
    None
}

/// Carve the lowest free `/mask_bits` range out of `pool`.
///
/// Candidates are the aligned `/mask_bits` blocks of `pool` in ascending address
/// order; the first one overlapping none of `allocated` wins. The result depends
/// only on the arguments.
///
/// # Errors
///
/// - [`ReconcileError::InvalidConfig`] if `mask_bits` is shorter than the pool prefix
///   or longer than 32
/// - [`ReconcileError::PoolExhausted`] if every candidate is taken
///
/// # Example
///
/// ```
/// use clusterops::ipam::allocate;
///
/// let pool = "10.0.0.0/16".parse().unwrap();
/// let taken = ["10.0.0.0/24".parse().unwrap(), "10.0.2.0/24".parse().unwrap()];
/// assert_eq!(allocate(pool, &taken, 24).unwrap().to_string(), "10.0.1.0/24");
/// ```
pub fn allocate(
    pool: Ipv4Net,
    allocated: &[Ipv4Net],
    mask_bits: u8,
) -> Result<Ipv4Net, ReconcileError> {
    let pool = pool.trunc();
    if mask_bits < pool.prefix_len() || mask_bits > 32 {
        return Err(ReconcileError::InvalidConfig(format!(
            "mask bits /{mask_bits} do not fit pool {pool}"
        )));
    }

    let size = 1_u64 << (32 - mask_bits);
    let (pool_start, pool_end) = bounds(&pool);

    let mut taken: Vec<(u64, u64)> = allocated.iter().map(bounds).collect();
    taken.sort_unstable();

    let mut candidate = pool_start;
    while candidate + size <= pool_end {
        let end = candidate + size;
        match taken.iter().find(|(s, e)| candidate.max(*s) < end.min(*e)) {
            None => {
                let network = u32::try_from(candidate).map_err(|_| {
                    ReconcileError::ExecutionFailed(format!("candidate {candidate} out of range"))
                })?;
                return Ipv4Net::new(Ipv4Addr::from(network), mask_bits)
                    .map_err(|e| ReconcileError::InvalidConfig(e.to_string()));
            }
            // Jump to the first aligned block past the range in the way.
            Some((_, taken_end)) => candidate = taken_end.div_ceil(size) * size,
        }
    }

    Err(ReconcileError::PoolExhausted {
        pool: pool.to_string(),
        mask_bits,
    })
}

#[cfg(test)]
#[path = "allocate_tests.rs"]
mod allocate_tests;
