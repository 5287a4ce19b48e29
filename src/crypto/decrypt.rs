// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Decrypt, util};
use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::keypair::PrivateKey;
use crate::packing::PackingLayout;

use num_bigint_dig::BigUint;
use num_traits::Zero;

impl Decrypt for PrivateKey {
    fn decrypt(&self, ciphertext: &Ciphertext) -> Result<BigUint> {
        let n = self.public_key.n();
        let n_squared = self.public_key.n_squared();

        let c = ciphertext.value();
        if c.is_zero() || c >= n_squared {
            return Err(Error::InvalidCiphertext);
        }

        // m = L(c^λ mod n²) · μ mod n
        let c_to_lambda = c.modpow(&self.lambda, n_squared);
        let l_c = util::l_function(&c_to_lambda, n)?;

        Ok((l_c * &self.mu) % n)
    }
}

impl PrivateKey {
    /// Decrypts packed ciphertexts and splits each plaintext into counters.
    ///
    /// Every plaintext yields `layout.slots()` counters, most significant
    /// first. The concatenated counters are truncated to `max_count`, which
    /// drops the zero padding rows of the last pack. Decryption stops early
    /// once `max_count` counters are available.
    pub fn decrypt_and_unpack_many(
        &self,
        ciphertexts: &[Ciphertext],
        layout: &PackingLayout,
        max_count: usize,
    ) -> Result<Vec<u64>> {
        let mut counters = Vec::with_capacity(max_count.min(ciphertexts.len() * layout.slots()));

        for ciphertext in ciphertexts {
            if counters.len() >= max_count {
                break;
            }
            let plaintext = self.decrypt(ciphertext)?;
            counters.extend(layout.unpack(&plaintext)?);
        }

        counters.truncate(max_count);
        Ok(counters)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::crypto::Encrypt;
    use crate::keypair::KeyPair;
    use num_traits::One;

    fn create_test_keypair() -> KeyPair {
        KeyPair::generate_with_size(512).unwrap()
    }

    #[test]
    fn decrypt_roundtrip() {
        let keypair = create_test_keypair();
        let m = BigUint::from(0xC0FFEEu32);

        let ciphertext = keypair.public_key().encrypt(&m).unwrap();
        assert_eq!(keypair.private_key().decrypt(&ciphertext).unwrap(), m);
    }

    #[test]
    fn max_safe_plaintext() {
        let keypair = create_test_keypair();
        let max_safe = keypair.public_key().n() - BigUint::one();

        let ciphertext = keypair.public_key().encrypt(&max_safe).unwrap();
        assert_eq!(keypair.private_key().decrypt(&ciphertext).unwrap(), max_safe);
    }

    #[test]
    fn invalid_ciphertext() {
        let keypair = create_test_keypair();
        let priv_key = keypair.private_key();

        let too_large = Ciphertext::new(keypair.public_key().n_squared().clone());
        assert!(matches!(priv_key.decrypt(&too_large), Err(Error::InvalidCiphertext)));

        let zero = Ciphertext::new(BigUint::zero());
        assert!(matches!(priv_key.decrypt(&zero), Err(Error::InvalidCiphertext)));
    }

    #[test]
    fn decrypt_and_unpack_truncates_padding() {
        let keypair = create_test_keypair();
        let layout = PackingLayout::new(keypair.public_key(), 4).unwrap();

        let values: Vec<u64> = (0..(layout.slots() as u64 + 3)).map(|v| v % 16).collect();
        let ciphertexts = layout.pack_and_encrypt(&values, keypair.public_key()).unwrap();
        assert_eq!(ciphertexts.len(), 2);

        let counters = keypair
            .private_key()
            .decrypt_and_unpack_many(&ciphertexts, &layout, values.len())
            .unwrap();
        assert_eq!(counters, values);
    }

    #[test]
    fn decrypt_and_unpack_stops_at_max_count() {
        let keypair = create_test_keypair();
        let layout = PackingLayout::new(keypair.public_key(), 8).unwrap();

        let values = vec![7u64; layout.slots() * 2];
        let ciphertexts = layout.pack_and_encrypt(&values, keypair.public_key()).unwrap();

        let counters = keypair
            .private_key()
            .decrypt_and_unpack_many(&ciphertexts, &layout, 3)
            .unwrap();
        assert_eq!(counters, vec![7, 7, 7]);
    }

    #[test]
    fn carry_past_top_field_is_reported() {
        let keypair = create_test_keypair();
        let layout = PackingLayout::new(keypair.public_key(), 4).unwrap();

        // one past the largest representable packed value
        let overflowing = BigUint::one() << (layout.slots() * layout.field_width());
        let ciphertext = keypair.public_key().encrypt(&overflowing).unwrap();

        let result = keypair.private_key().decrypt_and_unpack_many(&[ciphertext], &layout, 1);
        assert!(matches!(result, Err(Error::PackingOverflow { .. })));
    }
}
