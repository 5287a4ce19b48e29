// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use bitvec::prelude::*;

use crate::error::{Error, Result};

/// Fixed-length bit vector.
///
/// Bits are packed most significant first, so bit 0 is the top bit of the
/// first byte. Unused bits of the last byte are always zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BitArray {
    bits: BitVec<u8, Msb0>,
}

impl BitArray {
    fn from_bitvec(mut bits: BitVec<u8, Msb0>) -> Self {
        bits.set_uninitialized(false);
        Self { bits }
    }

    /// All-zero bit array of `len` bits.
    pub fn zeros(len: usize) -> Self {
        Self::from_bitvec(BitVec::repeat(false, len))
    }

    /// Rebuild a bit array from its packed bytes.
    ///
    /// `bytes` must hold exactly `ceil(len / 8)` bytes with zeroed padding.
    pub fn from_bytes(bytes: Vec<u8>, len: usize) -> Result<Self> {
        if bytes.len() != len.div_ceil(8) {
            return Err(Error::Decode(format!(
                "bit array of {} bits needs {} bytes, got {}",
                len,
                len.div_ceil(8),
                bytes.len()
            )));
        }

        let mut bits = BitVec::<u8, Msb0>::from_vec(bytes);
        if bits[len..].any() {
            return Err(Error::Decode("non-zero padding bits in bit array".into()));
        }
        bits.truncate(len);

        Ok(Self { bits })
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    /// # Panics
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    /// # Panics
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        self.bits.set(index, value);
    }

    pub fn count_ones(&self) -> u64 {
        self.bits.count_ones() as u64
    }

    /// Popcount of `self & other`, the plaintext match count of one row.
    pub fn and_count(&self, other: &BitArray) -> u64 {
        (self.bits.clone() & other.bits.as_bitslice()).count_ones() as u64
    }

    /// Indices of set bits in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }
}

impl FromIterator<bool> for BitArray {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self::from_bitvec(iter.into_iter().collect())
    }
}

/// Parses strings such as `"11010000"`.
impl FromStr for BitArray {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.chars()
            .map(|ch| match ch {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(Error::Decode(format!("invalid bit character {other:?}"))),
            })
            .collect()
    }
}

impl fmt::Display for BitArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter().by_vals() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parse_and_display() {
        let bits: BitArray = "1101000011".parse().unwrap();

        assert_eq!(bits.len(), 10);
        assert_eq!(bits.as_bytes(), &[0b1101_0000, 0b1100_0000]);
        assert_eq!(bits.to_string(), "1101000011");
    }

    #[test]
    fn set_and_get() {
        let mut bits = BitArray::zeros(12);
        bits.set(0, true);
        bits.set(11, true);
        bits.set(5, true);
        bits.set(5, false);

        assert!(bits.get(0));
        assert!(bits.get(11));
        assert!(!bits.get(5));
        assert_eq!(bits.count_ones(), 2);
        assert_eq!(bits.ones().collect::<Vec<_>>(), vec![0, 11]);
        assert_eq!(bits.as_bytes(), &[0b1000_0000, 0b0001_0000]);
    }

    #[test]
    fn and_count_matches_rows() {
        let query: BitArray = "10010000".parse().unwrap();
        let rows = ["11010000", "10010100", "00011010"];

        let counts: Vec<u64> = rows
            .iter()
            .map(|r| r.parse::<BitArray>().unwrap().and_count(&query))
            .collect();

        assert_eq!(counts, vec![2, 2, 1]);
    }

    #[test]
    fn from_bytes_validates_length_and_padding() {
        assert!(BitArray::from_bytes(vec![0xff], 8).is_ok());
        assert_eq!(BitArray::from_bytes(vec![0xf0], 4).unwrap().to_string(), "1111");
        assert!(BitArray::from_bytes(vec![0xf8], 4).is_err());
        assert!(BitArray::from_bytes(vec![0x00, 0x00], 8).is_err());
        assert!(BitArray::from_bytes(Vec::new(), 0).unwrap().is_empty());
    }

    #[test]
    fn from_bytes_round_trips_raw_slice() {
        let bits = BitArray::from_bytes(vec![0b1010_1010, 0b1100_0000], 10).unwrap();

        assert_eq!(bits.as_bytes(), &[0b1010_1010, 0b1100_0000]);
        assert_eq!(bits.ones().collect::<Vec<_>>(), vec![0, 2, 4, 6, 8, 9]);
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!("10x1".parse::<BitArray>().is_err());
    }

    #[test]
    #[should_panic]
    fn get_out_of_range_panics() {
        BitArray::zeros(3).get(3);
    }
}
