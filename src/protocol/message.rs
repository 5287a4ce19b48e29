// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload shapes of the protocol messages.
//!
//! | message      | direction | value                                   |
//! |--------------|-----------|-----------------------------------------|
//! | public key   | C → S     | map `{"n": BigInt, "g": BigInt}`        |
//! | chunk count  | C → S     | `Int`                                   |
//! | chunk        | C → S     | `Seq` of columns, each `Seq` of `BigInt` |
//! | query        | C → S     | `BitArray`                              |
//! | results      | S → C     | `Seq` of `BigInt`                       |
//! | report       | S → C     | map of `[Float, Int, Int]`              |

use std::collections::BTreeMap;

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::keypair::{KeyPairBuilder, PublicKey};
use crate::wire::Value;

pub fn public_key_to_value(public_key: &PublicKey) -> Value {
    let mut map = BTreeMap::new();
    map.insert("n".to_string(), Value::BigInt(public_key.n().clone()));
    map.insert("g".to_string(), Value::BigInt(public_key.g().clone()));
    Value::Map(map)
}

/// Moduli below the minimum key size are rejected like malformed keys.
pub fn public_key_from_value(value: Value) -> Result<PublicKey> {
    let mut map = value.into_map()?;
    let n = map.remove("n").ok_or(Error::InvalidPublicKey)?.into_big_int()?;
    let g = map.remove("g").ok_or(Error::InvalidPublicKey)?.into_big_int()?;
    if n.bits() < KeyPairBuilder::ABSOLUTE_MIN_BITS {
        return Err(Error::InvalidPublicKey);
    }
    PublicKey::new(n, g)
}

pub fn count_to_value(count: usize) -> Value {
    Value::Int(i64::try_from(count).unwrap_or(i64::MAX))
}

pub fn count_from_value(value: Value) -> Result<usize> {
    let count = value.into_int()?;
    usize::try_from(count).map_err(|_| Error::Decode(format!("negative count {count}")))
}

fn ciphertexts_to_value(ciphertexts: Vec<Ciphertext>) -> Value {
    Value::Seq(ciphertexts.into_iter().map(|c| Value::BigInt(c.into_value())).collect())
}

fn ciphertexts_from_value(value: Value) -> Result<Vec<Ciphertext>> {
    value
        .into_seq()?
        .into_iter()
        .map(|item| item.into_big_int().map(Ciphertext::new))
        .collect()
}

/// Consumes the chunk so its ciphertexts are not held twice.
pub fn columns_to_value(columns: Vec<Vec<Ciphertext>>) -> Value {
    Value::Seq(columns.into_iter().map(ciphertexts_to_value).collect())
}

pub fn columns_from_value(value: Value) -> Result<Vec<Vec<Ciphertext>>> {
    value.into_seq()?.into_iter().map(ciphertexts_from_value).collect()
}

pub fn results_to_value(results: Vec<Ciphertext>) -> Value {
    ciphertexts_to_value(results)
}

pub fn results_from_value(value: Value) -> Result<Vec<Ciphertext>> {
    ciphertexts_from_value(value)
}
