// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Partitioned Bloom filter.
//!
//! The bit array is split into `slices` equally sized slices and every
//! element sets exactly one bit per slice. A database row therefore shares
//! at most `slices` set bits with the filter of one query element, which is
//! what bounds the per-row sums of the matching protocol.

use std::f64::consts::LN_2;

use turboshake::TurboShake128;

use crate::bitarray::BitArray;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    bits: BitArray,
    slices: usize,
    bits_per_slice: usize,
    capacity: usize,
    count: usize,
}

impl BloomFilter {
    /// Filter sized for `capacity` elements at false positive rate `error_rate`.
    ///
    /// Uses `ceil(log2(1 / error_rate))` slices of
    /// `ceil(capacity · |ln error_rate| / (slices · ln²2))` bits each.
    pub fn new(capacity: usize, error_rate: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig("Bloom filter capacity must be positive".into()));
        }
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "Bloom filter error rate must be in (0, 1), got {error_rate}"
            )));
        }

        let slices = (1.0 / error_rate).log2().ceil().max(1.0) as usize;
        let bits_per_slice = ((capacity as f64 * error_rate.ln().abs()) / (slices as f64 * LN_2 * LN_2))
            .ceil()
            .max(1.0) as usize;

        Ok(Self {
            bits: BitArray::zeros(slices * bits_per_slice),
            slices,
            bits_per_slice,
            capacity,
            count: 0,
        })
    }

    /// Filter for false positive rate `2^exponent`, e.g. `-14`.
    pub fn with_exponent(capacity: usize, exponent: i32) -> Result<Self> {
        Self::new(capacity, 2f64.powi(exponent))
    }

    pub fn slices(&self) -> usize {
        self.slices
    }

    pub fn bits_per_slice(&self) -> usize {
        self.bits_per_slice
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Distinct elements added so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total filter length in bits.
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// One bit position per slice, slice `i` at offset `i · bits_per_slice`.
    fn positions(&self, element: &[u8]) -> Vec<usize> {
        let mut hasher = TurboShake128::default();
        hasher.absorb(element);
        hasher.finalize::<{ TurboShake128::DEFAULT_DOMAIN_SEPARATOR }>();

        let mut digest = vec![0u8; 8 * self.slices];
        hasher.squeeze(&mut digest);

        digest
            .chunks_exact(8)
            .enumerate()
            .map(|(slice, word)| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(word);
                let h = u64::from_be_bytes(buf) % self.bits_per_slice as u64;
                slice * self.bits_per_slice + h as usize
            })
            .collect()
    }

    /// Adds `element` and reports whether it was already present.
    ///
    /// Elements already present do not count against the capacity.
    pub fn add(&mut self, element: impl AsRef<[u8]>) -> Result<bool> {
        let positions = self.positions(element.as_ref());
        if positions.iter().all(|&pos| self.bits.get(pos)) {
            return Ok(true);
        }
        if self.count >= self.capacity {
            return Err(Error::BloomCapacityExceeded { capacity: self.capacity });
        }

        for pos in positions {
            self.bits.set(pos, true);
        }
        self.count += 1;
        Ok(false)
    }

    pub fn contains(&self, element: impl AsRef<[u8]>) -> bool {
        self.positions(element.as_ref()).into_iter().all(|pos| self.bits.get(pos))
    }

    pub fn bits(&self) -> &BitArray {
        &self.bits
    }

    pub fn into_bits(self) -> BitArray {
        self.bits
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use test_case::test_case;

    #[test_case(0.5, 1 ; "half")]
    #[test_case(0.01, 7 ; "one percent")]
    #[test_case(2f64.powi(-14), 14 ; "two to minus fourteen")]
    fn slice_count(error_rate: f64, expected: usize) {
        assert_eq!(BloomFilter::new(100, error_rate).unwrap().slices(), expected);
    }

    #[test]
    fn sizing_matches_formula() {
        let filter = BloomFilter::with_exponent(1000, -14).unwrap();
        let expected = (1000.0 * (2f64.powi(-14)).ln().abs() / (14.0 * LN_2 * LN_2)).ceil() as usize;

        assert_eq!(filter.bits_per_slice(), expected);
        assert_eq!(filter.bit_len(), 14 * expected);
    }

    #[test]
    fn one_bit_per_slice() {
        let mut filter = BloomFilter::with_exponent(10, -8).unwrap();
        filter.add("1100TA").unwrap();

        let bits = filter.bits();
        for slice in 0..filter.slices() {
            let start = slice * filter.bits_per_slice();
            let set = (start..start + filter.bits_per_slice()).filter(|&i| bits.get(i)).count();
            assert_eq!(set, 1, "slice {slice}");
        }
        assert_eq!(bits.count_ones(), filter.slices() as u64);
    }

    #[test]
    fn membership_and_duplicates() {
        let mut filter = BloomFilter::new(4, 0.001).unwrap();

        assert!(!filter.add("chr1123AG").unwrap());
        assert!(filter.add("chr1123AG").unwrap());
        assert_eq!(filter.len(), 1);

        assert!(filter.contains("chr1123AG"));
        assert!(!filter.contains("chr1124AG"));
    }

    #[test]
    fn capacity_is_enforced() {
        let mut filter = BloomFilter::new(2, 0.001).unwrap();
        filter.add("a").unwrap();
        filter.add("b").unwrap();

        assert_eq!(filter.add("c"), Err(Error::BloomCapacityExceeded { capacity: 2 }));
    }

    #[test]
    fn shared_element_overlaps_in_every_slice() {
        let mut row = BloomFilter::new(8, 0.01).unwrap();
        let mut query = BloomFilter::new(8, 0.01).unwrap();
        row.add("x").unwrap();
        row.add("y").unwrap();
        query.add("x").unwrap();

        assert!(row.bits().and_count(query.bits()) >= query.slices() as u64);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(BloomFilter::new(0, 0.1), Err(Error::InvalidConfig(_))));
        assert!(matches!(BloomFilter::new(10, 1.0), Err(Error::InvalidConfig(_))));
        assert!(matches!(BloomFilter::new(10, 0.0), Err(Error::InvalidConfig(_))));
    }
}
