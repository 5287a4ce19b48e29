// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::ops::Deref;

use num_bigint_dig::BigUint;

/// A Paillier ciphertext, an element of `Z*_{n²}`.
///
/// Carries no reference to the key it was produced under; reduction modulo
/// `n²` happens in [`crate::HomomorphicAdd`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    value: BigUint,
}

impl Ciphertext {
    pub fn new(value: BigUint) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn into_value(self) -> BigUint {
        self.value
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.value.to_bytes_be()
    }
}

impl Deref for Ciphertext {
    type Target = BigUint;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl From<BigUint> for Ciphertext {
    fn from(value: BigUint) -> Self {
        Self { value }
    }
}

impl From<&[u8]> for Ciphertext {
    fn from(bytes: &[u8]) -> Self {
        Self {
            value: BigUint::from_bytes_be(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_roundtrip() {
        let val = BigUint::from(0xDEADBEEFu64);
        let c = Ciphertext::new(val.clone());

        let bytes = c.to_bytes();
        let c_restored = Ciphertext::from(bytes.as_slice());

        assert_eq!(c, c_restored);
        assert_eq!(c_restored.value(), &val);
    }
}
