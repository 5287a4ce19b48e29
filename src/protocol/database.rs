// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use num_bigint_dig::BigUint;
use num_traits::Zero;

use crate::bitarray::BitArray;
use crate::ciphertext::Ciphertext;
use crate::crypto::{Encrypt, HomomorphicAdd};
use crate::error::{Error, Result};
use crate::keypair::PublicKey;

/// Column-major encrypted database held by the server.
///
/// Column `i` holds one ciphertext per pack of bit `i` of every row. With a
/// duplication factor `d > 1`, `d - 1` copies of each column's first pack
/// are appended after the real packs.
#[derive(Debug, Clone)]
pub struct EncryptedDatabase {
    columns: Vec<Vec<Ciphertext>>,
    real_packs: Option<usize>,
    duplication: usize,
}

impl EncryptedDatabase {
    pub fn new(duplication: usize) -> Self {
        Self {
            columns: Vec::new(),
            real_packs: None,
            duplication: duplication.max(1),
        }
    }

    /// Number of columns, the Bloom filter length.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Ciphertexts per column, duplicated packs included.
    pub fn packs(&self) -> usize {
        self.real_packs.map_or(0, |p| p + self.duplication - 1)
    }

    pub fn columns(&self) -> &[Vec<Ciphertext>] {
        &self.columns
    }

    /// Appends one uploaded chunk of columns.
    ///
    /// Every ciphertext must lie in `[1, n²)` and every column must have the
    /// pack count of the first column ever received.
    pub fn append_chunk(&mut self, chunk: Vec<Vec<Ciphertext>>, public_key: &PublicKey) -> Result<()> {
        let n_squared = public_key.n_squared();

        for mut column in chunk {
            if column.is_empty() {
                return Err(Error::InvalidDatabase("empty column".into()));
            }
            let packs = *self.real_packs.get_or_insert(column.len());
            if column.len() != packs {
                return Err(Error::InvalidDatabase(format!(
                    "column {} has {} packs, expected {packs}",
                    self.columns.len(),
                    column.len()
                )));
            }
            if let Some(pos) = column.iter().position(|c| c.value().is_zero() || c.value() >= n_squared) {
                return Err(Error::InvalidDatabase(format!(
                    "ciphertext {pos} of column {} is out of range",
                    self.columns.len()
                )));
            }

            let first = column[0].clone();
            column.extend(std::iter::repeat_n(first, self.duplication - 1));
            self.columns.push(column);
        }
        Ok(())
    }

    /// Sums the columns selected by `query` position-wise.
    ///
    /// Entry `j` of the result encrypts the per-row match counts of pack `j`.
    pub fn match_and_aggregate(&self, query: &BitArray, public_key: &PublicKey) -> Result<Vec<Ciphertext>> {
        if query.len() != self.columns.len() {
            return Err(Error::QueryLengthMismatch {
                expected: self.columns.len(),
                actual: query.len(),
            });
        }

        let mut selected = query.ones().map(|i| &self.columns[i]);
        let mut results = selected.next().ok_or(Error::EmptySelection)?.clone();

        for column in selected {
            for (acc, c) in results.iter_mut().zip(column) {
                *acc = public_key.add(acc, c);
            }
        }
        Ok(results)
    }

    /// Fresh encryptions of zero, one per pack.
    pub fn zero_result(&self, public_key: &PublicKey) -> Result<Vec<Ciphertext>> {
        let zero = BigUint::zero();
        (0..self.packs()).map(|_| public_key.encrypt(&zero)).collect()
    }
}
