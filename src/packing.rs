// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Packing of bounded counters into Paillier plaintexts.
//!
//! One plaintext carries `k` fields of `bl` bits each, most significant
//! field first. Homomorphic addition of packed plaintexts adds the fields
//! position-wise, which stays correct only while no field exceeds
//! `2^bl - 1`: a larger sum carries into the neighbouring field.

use std::ops::Range;

use num_bigint_dig::BigUint;
use num_traits::{ToPrimitive, Zero};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::bitarray::BitArray;
use crate::ciphertext::Ciphertext;
use crate::crypto::Encrypt;
use crate::error::{Error, Result};
use crate::keypair::PublicKey;

/// Widest supported field, so that a field always fits a `u64` counter.
pub const MAX_FIELD_WIDTH: usize = 63;

/// Field width `bl` and field count `k` of a packed plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackingLayout {
    field_width: usize,
    slots: usize,
}

impl PackingLayout {
    /// Layout with `field_width`-bit fields for plaintexts under `public_key`.
    ///
    /// Uses `k = floor((bits(n) - 1) / bl)` fields, which keeps every packed
    /// value, and every sum of packed values with non-overflowing fields,
    /// below `2^(k·bl) ≤ n`.
    pub fn new(public_key: &PublicKey, field_width: usize) -> Result<Self> {
        Self::check_field_width(field_width)?;

        let slots = public_key.bit_length().saturating_sub(1) / field_width;
        Self::with_slots(field_width, slots)
    }

    /// Layout with an explicit field count.
    pub fn with_slots(field_width: usize, slots: usize) -> Result<Self> {
        Self::check_field_width(field_width)?;
        if slots == 0 {
            return Err(Error::InvalidLayout(format!(
                "no room for a single {field_width}-bit field"
            )));
        }

        Ok(Self { field_width, slots })
    }

    /// Smallest field width able to hold `max_accumulated`.
    pub fn field_width_for(max_accumulated: u64) -> usize {
        let bits = (u64::BITS - max_accumulated.leading_zeros()) as usize;
        bits.max(1)
    }

    fn check_field_width(field_width: usize) -> Result<()> {
        if field_width == 0 || field_width > MAX_FIELD_WIDTH {
            return Err(Error::InvalidLayout(format!(
                "field width must be in 1..={MAX_FIELD_WIDTH}, got {field_width}"
            )));
        }
        Ok(())
    }

    pub fn field_width(&self) -> usize {
        self.field_width
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Largest value a single field can hold.
    pub fn capacity(&self) -> u64 {
        (1u64 << self.field_width) - 1
    }

    /// Number of plaintexts needed for `rows` values.
    pub fn packs_for(&self, rows: usize) -> usize {
        rows.div_ceil(self.slots)
    }

    /// Folds runs of `k` values into plaintexts, `x = x·2^bl + v`.
    ///
    /// A short final run is padded with zero fields at the low end, so field
    /// `j` of every plaintext always holds value `j` of its run.
    pub fn pack(&self, values: &[u64]) -> Result<Vec<BigUint>> {
        let capacity = self.capacity();

        values
            .chunks(self.slots)
            .map(|run| {
                let mut x = BigUint::zero();
                for &v in run {
                    if v > capacity {
                        return Err(Error::PackingOverflow {
                            value: v.to_string(),
                            field_width: self.field_width,
                        });
                    }
                    x = (x << self.field_width) + BigUint::from(v);
                }
                let padding = (self.slots - run.len()) * self.field_width;
                Ok(x << padding)
            })
            .collect()
    }

    /// Splits a plaintext into its `k` fields, most significant first.
    ///
    /// A plaintext wider than `k·bl` bits carried out of the top field.
    pub fn unpack(&self, x: &BigUint) -> Result<Vec<u64>> {
        if x.bits() > self.slots * self.field_width {
            return Err(Error::PackingOverflow {
                value: x.to_string(),
                field_width: self.field_width,
            });
        }

        let mask = BigUint::from(self.capacity());
        (0..self.slots)
            .rev()
            .map(|j| {
                let field = (x >> (j * self.field_width)) & &mask;
                field.to_u64().ok_or_else(|| Error::PackingOverflow {
                    value: field.to_string(),
                    field_width: self.field_width,
                })
            })
            .collect()
    }

    /// Packs `values` and encrypts every plaintext, one ciphertext per run.
    pub fn pack_and_encrypt<E: Encrypt + ?Sized>(&self, values: &[u64], encryptor: &E) -> Result<Vec<Ciphertext>> {
        self.pack(values)?.iter().map(|x| encryptor.encrypt(x)).collect()
    }

    /// Packs and encrypts the bit columns `columns` of a row-major database.
    ///
    /// Column `i` is the vector of bit `i` across all `rows`. Columns are
    /// independent, so they are spread over `pool`; the result keeps the
    /// column order of `columns`.
    pub fn pack_and_encrypt_columns<E: Encrypt + Sync + ?Sized>(
        &self,
        rows: &[BitArray],
        columns: Range<usize>,
        encryptor: &E,
        pool: &ThreadPool,
    ) -> Result<Vec<Vec<Ciphertext>>> {
        pool.install(|| {
            columns
                .into_par_iter()
                .map(|col| {
                    let values: Vec<u64> = rows.iter().map(|row| u64::from(row.get(col))).collect();
                    self.pack_and_encrypt(&values, encryptor)
                })
                .collect()
        })
    }
}

/// Worker pool for packing, `threads == 0` uses every available core.
pub fn worker_pool(threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("phebloom-pack-{idx}"))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))
}
