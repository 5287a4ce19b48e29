// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use num_bigint_dig::BigUint;

use crate::bitarray::BitArray;
use crate::error::{Error, Result};

/// Structured payload carried by one wire message.
///
/// `BigInt` and `BitArray` are the two extension types of the format; all
/// other variants are plain structural values.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Int(i64),
    Float(f64),
    Str(String),
    BigInt(BigUint),
    BitArray(BitArray),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::BigInt(_) => "big integer",
            Value::BitArray(_) => "bit array",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
        }
    }

    fn unexpected(self, expected: &'static str) -> Error {
        Error::UnexpectedMessage {
            expected,
            found: self.kind(),
        }
    }

    pub fn into_int(self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(v),
            other => Err(other.unexpected("int")),
        }
    }

    pub fn into_float(self) -> Result<f64> {
        match self {
            Value::Float(v) => Ok(v),
            other => Err(other.unexpected("float")),
        }
    }

    pub fn into_big_int(self) -> Result<BigUint> {
        match self {
            Value::BigInt(v) => Ok(v),
            other => Err(other.unexpected("big integer")),
        }
    }

    pub fn into_bit_array(self) -> Result<BitArray> {
        match self {
            Value::BitArray(v) => Ok(v),
            other => Err(other.unexpected("bit array")),
        }
    }

    pub fn into_seq(self) -> Result<Vec<Value>> {
        match self {
            Value::Seq(v) => Ok(v),
            other => Err(other.unexpected("sequence")),
        }
    }

    pub fn into_map(self) -> Result<BTreeMap<String, Value>> {
        match self {
            Value::Map(v) => Ok(v),
            other => Err(other.unexpected("map")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<BigUint> for Value {
    fn from(v: BigUint) -> Self {
        Value::BigInt(v)
    }
}

impl From<BitArray> for Value {
    fn from(v: BitArray) -> Self {
        Value::BitArray(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Seq(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}
