// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use num_bigint_dig::{BigUint, ModInverse};
use num_traits::{CheckedSub, One, Zero};

use crate::error::{Error, Result};

/// L(x) = (x - 1) / n
///
/// For `x = c^λ mod n²` we always have `x ≡ 1 (mod n)`, so the division is
/// exact. An `x` of zero means the ciphertext was not a unit mod n².
#[inline]
pub fn l_function(x: &BigUint, n: &BigUint) -> Result<BigUint> {
    debug_assert!(!n.is_zero(), "n must be nonzero in L function");

    let x_minus_1 = x.checked_sub(&BigUint::one()).ok_or(Error::InvalidCiphertext)?;
    Ok(x_minus_1 / n)
}

/// Computes modular inverse a⁻¹ mod b.
pub fn mod_inverse(a: &BigUint, b: &BigUint) -> Result<BigUint> {
    let modinv = a
        .mod_inverse(b)
        .ok_or_else(|| Error::KeyGenerationFailed("Modular inverse failed".into()))?
        .to_biguint()
        .ok_or_else(|| Error::KeyGenerationFailed("Inverse resulted in negative value".into()))?;

    Ok(modinv)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn l_function_is_exact_division() {
        let n = BigUint::from(35u32);
        let x = BigUint::from(1u32 + 3 * 35);

        assert_eq!(l_function(&x, &n).unwrap(), BigUint::from(3u32));
    }

    #[test]
    fn l_function_rejects_zero() {
        let n = BigUint::from(35u32);
        assert_eq!(l_function(&BigUint::zero(), &n), Err(Error::InvalidCiphertext));
    }

    #[test]
    fn inverse_of_small_values() {
        let inv = mod_inverse(&BigUint::from(3u32), &BigUint::from(11u32)).unwrap();
        assert_eq!(inv, BigUint::from(4u32));

        assert!(mod_inverse(&BigUint::from(5u32), &BigUint::from(10u32)).is_err());
    }
}
