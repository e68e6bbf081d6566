// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `allocate.rs`

#[cfg(test)]
mod tests {
    use super::super::{allocate, find_overlap, overlaps};
    use crate::errors::ReconcileError;
    use ipnet::Ipv4Net;

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn test_first_free_block_between_allocations() {
        let taken = [net("10.0.0.0/24"), net("10.0.2.0/24")];
        assert_eq!(allocate(net("10.0.0.0/16"), &taken, 24).unwrap(), net("10.0.1.0/24"));
    }

    #[test]
    fn test_empty_pool_yields_base() {
        assert_eq!(allocate(net("10.0.0.0/8"), &[], 16).unwrap(), net("10.0.0.0/16"));
    }

    #[test]
    fn test_full_pool_is_exhausted() {
        let err = allocate(net("10.0.0.0/24"), &[net("10.0.0.0/24")], 24).unwrap_err();
        match err {
            ReconcileError::PoolExhausted { pool, mask_bits } => {
                assert_eq!(pool, "10.0.0.0/24");
                assert_eq!(mask_bits, 24);
            }
            other => panic!("expected PoolExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_larger_allocation_blocks_several_candidates() {
        // A /22 covers 10.0.0.0 - 10.0.3.255.
        let taken = [net("10.0.0.0/22")];
        assert_eq!(allocate(net("10.0.0.0/16"), &taken, 24).unwrap(), net("10.0.4.0/24"));
    }

    #[test]
    fn test_smaller_allocation_blocks_whole_candidate() {
        let taken = [net("10.0.0.128/25")];
        assert_eq!(allocate(net("10.0.0.0/16"), &taken, 24).unwrap(), net("10.0.1.0/24"));
    }

    #[test]
    fn test_unnormalized_pool_is_truncated() {
        assert_eq!(allocate(net("10.0.7.9/16"), &[], 24).unwrap(), net("10.0.0.0/24"));
    }

    #[test]
    fn test_allocations_outside_pool_are_ignored() {
        let taken = [net("192.168.0.0/16")];
        assert_eq!(allocate(net("10.0.0.0/16"), &taken, 24).unwrap(), net("10.0.0.0/24"));
    }

    #[test]
    fn test_invalid_mask_bits() {
        assert!(matches!(
            allocate(net("10.0.0.0/16"), &[], 8),
            Err(ReconcileError::InvalidConfig(_))
        ));
        assert!(matches!(
            allocate(net("10.0.0.0/16"), &[], 33),
            Err(ReconcileError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_top_of_address_space() {
        let pool = net("255.255.255.0/24");
        let taken = [net("255.255.255.0/25")];
        assert_eq!(allocate(pool, &taken, 25).unwrap(), net("255.255.255.128/25"));
        assert_eq!(allocate(pool, &taken, 32).unwrap(), net("255.255.255.128/32"));
    }

    #[test]
    fn test_deterministic_and_disjoint() {
        let pool = net("10.0.0.0/20");
        let mut taken = vec![net("10.0.3.0/24"), net("10.0.0.64/26")];

        for _ in 0..10 {
            let first = allocate(pool, &taken, 24).unwrap();
            let second = allocate(pool, &taken, 24).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.prefix_len(), 24);
            assert!(pool.contains(&first));
            assert!(taken.iter().all(|t| !overlaps(t, &first)));
            taken.push(first);
        }
        assert!(find_overlap(&taken).is_none());
    }

    #[test]
    fn test_overlap_is_half_open() {
        assert!(!overlaps(&net("10.0.0.0/24"), &net("10.0.1.0/24")));
        assert!(overlaps(&net("10.0.0.0/23"), &net("10.0.1.0/24")));
        assert!(overlaps(&net("10.0.1.7/32"), &net("10.0.1.0/24")));
    }

    #[test]
    fn test_find_overlap() {
        let disjoint = [net("10.0.2.0/24"), net("10.0.0.0/24"), net("10.0.1.0/24")];
        assert!(find_overlap(&disjoint).is_none());

        let nested = [net("10.0.5.0/24"), net("10.0.0.0/16"), net("10.1.0.0/16")];
        let (a, b) = find_overlap(&nested).unwrap();
        assert_eq!(a, net("10.0.0.0/16"));
        assert_eq!(b, net("10.0.5.0/24"));

        let duplicate = [net("10.0.0.0/24"), net("10.0.0.0/24")];
        assert!(find_overlap(&duplicate).is_some());
    }
}
