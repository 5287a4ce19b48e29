// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Encrypt, HomomorphicAdd};
use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::keypair::PublicKey;

use num_bigint_dig::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::rngs::OsRng;

impl PublicKey {
    /// Sample the blinding factor `r` uniformly from `Z*_n`.
    fn sample_unit(&self) -> BigUint {
        let mut rng = OsRng;
        loop {
            let r = rng.gen_biguint_range(&BigUint::one(), &self.n);
            if r.gcd(&self.n).is_one() {
                return r;
            }
        }
    }
}

impl Encrypt for PublicKey {
    fn encrypt(&self, m: &BigUint) -> Result<Ciphertext> {
        if m >= &self.n {
            return Err(Error::PlaintextTooLarge);
        }

        let r = self.sample_unit();

        // g = n + 1, so g^m mod n² = 1 + m·n
        let gm = (m * &self.n + BigUint::one()) % &self.n_squared;
        let rn = r.modpow(&self.n, &self.n_squared);
        let c = (gm * rn) % &self.n_squared;

        Ok(Ciphertext::new(c))
    }
}

impl HomomorphicAdd for PublicKey {
    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Ciphertext {
        Ciphertext::new((a.value() * b.value()) % &self.n_squared)
    }
}
