// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

mod util;

use crate::crypto::mod_inverse;
use crate::error::{Error, Result};

use num_bigint_dig::BigUint;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Public parameters of the Paillier cryptosystem.
///
/// The modulus is `n = pq` and the generator is fixed to `g = n + 1`, which
/// makes `g^m mod n²` collapse to `1 + mn`. `n²` is cached because every
/// encryption and homomorphic addition reduces modulo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) n: BigUint,
    pub(crate) n_squared: BigUint,
    pub(crate) g: BigUint,
    pub(crate) bit_length: usize,
}

impl PublicKey {
    /// Construct a public key from the transmitted pair `{n, g}`.
    ///
    /// Only the `g = n + 1` variant is accepted.
    pub fn new(n: BigUint, g: BigUint) -> Result<Self> {
        if n.is_zero() || n.is_one() {
            return Err(Error::InvalidPublicKey);
        }
        if g != &n + BigUint::one() {
            return Err(Error::InvalidPublicKey);
        }

        let n_squared = &n * &n;
        let bit_length = n.bits();

        Ok(Self { n, n_squared, g, bit_length })
    }

    /// Public key for modulus `n` with the standard generator `n + 1`.
    pub fn from_modulus(n: BigUint) -> Result<Self> {
        let g = &n + BigUint::one();
        Self::new(n, g)
    }

    /// Return the public modulus `n`.
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// Return `n²`, the ciphertext modulus.
    pub fn n_squared(&self) -> &BigUint {
        &self.n_squared
    }

    /// Return the generator `g`.
    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// Return the bit length of `n`.
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }
}

/// Secret key material.
///
/// Holds the factorization of `n` together with λ = lcm(p - 1, q - 1) and
/// μ = λ⁻¹ mod n. Sensitive fields are zeroized on drop.
#[allow(missing_debug_implementations)]
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(feature = "expose-secret", derive(Debug))]
pub struct PrivateKey {
    #[zeroize(skip)]
    pub(crate) public_key: PublicKey,
    pub(crate) p: BigUint,
    pub(crate) q: BigUint,
    pub(crate) lambda: BigUint,
    pub(crate) mu: BigUint,
}

impl PrivateKey {
    /// Construct a private key from its prime factors.
    ///
    /// Validates that the factors reconstruct the public modulus.
    pub fn new(public_key: PublicKey, p: BigUint, q: BigUint) -> Result<Self> {
        if p.is_zero() || q.is_zero() || p == q {
            return Err(Error::KeyGenerationFailed("Invalid prime factors".into()));
        }
        if &p * &q != *public_key.n() {
            return Err(Error::KeyGenerationFailed("Factors do not match modulus".into()));
        }

        let lambda = util::carmichael_lambda(&p, &q);
        let mu = mod_inverse(&lambda, public_key.n())?;

        Ok(Self { public_key, p, q, lambda, mu })
    }

    /// Return a reference to the associated public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

/// A complete key pair consisting of public and private components.
#[allow(missing_debug_implementations)]
#[derive(PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(feature = "expose-secret", derive(Debug))]
pub struct KeyPair {
    #[zeroize(skip)]
    public: PublicKey,
    secret: PrivateKey,
}

impl KeyPair {
    /// Generate a key pair with default parameters (1024-bit modulus).
    pub fn generate() -> Result<Self> {
        KeyPairBuilder::new().build()
    }

    /// Generate a key pair with a custom modulus size.
    pub fn generate_with_size(bit_length: usize) -> Result<Self> {
        KeyPairBuilder::new().bit_length(bit_length).build()
    }

    /// Return the public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Return the private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.secret
    }
}

/// Builder for generating key pairs with configurable parameters.
#[derive(Debug)]
pub struct KeyPairBuilder {
    bit_length: usize,
    max_attempts: usize,
}

impl KeyPairBuilder {
    /// Modulus size used by the matching protocol unless told otherwise.
    pub const DEFAULT_BITS: usize = 1024;

    /// Minimum recommended for production (NIST/ENISA standard)
    pub const MIN_SECURE_BITS: usize = 2048;

    /// Number of prime pairs sampled before giving up.
    pub const DEFAULT_MAX_ATTEMPTS: usize = 16;

    /// Absolute minimum enforced in production builds
    /// Can be bypassed with `allow-weak-keys` feature flag
    #[cfg(not(feature = "allow-weak-keys"))]
    pub const ABSOLUTE_MIN_BITS: usize = 512;

    #[cfg(feature = "allow-weak-keys")]
    pub const ABSOLUTE_MIN_BITS: usize = 128;

    /// Create a builder with default parameters.
    pub fn new() -> Self {
        Self {
            bit_length: Self::DEFAULT_BITS,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the desired modulus bit length.
    pub fn bit_length(mut self, bits: usize) -> Self {
        self.bit_length = bits;
        self
    }

    /// Set how many prime pairs may be sampled before failing.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Generate the key pair.
    pub fn build(self) -> Result<KeyPair> {
        if self.bit_length < Self::ABSOLUTE_MIN_BITS {
            return Err(Error::InvalidKeySize {
                min: Self::ABSOLUTE_MIN_BITS,
                actual: self.bit_length,
            });
        }

        if self.bit_length < Self::MIN_SECURE_BITS {
            tracing::warn!(
                bits = self.bit_length,
                recommended = Self::MIN_SECURE_BITS,
                "generating a Paillier key below the recommended size"
            );
        }

        let mut rng = OsRng;
        let p_bits = self.bit_length / 2;
        let q_bits = self.bit_length - p_bits;

        for attempt in 1..=self.max_attempts {
            let p = util::generate_prime(p_bits, &mut rng);
            let q = util::generate_prime(q_bits, &mut rng);

            if p == q {
                tracing::debug!(attempt, "sampled identical primes, retrying");
                continue;
            }

            let n = &p * &q;
            if n.bits() < self.bit_length || !util::is_valid_modulus(&n, &p, &q) {
                tracing::debug!(attempt, bits = n.bits(), "rejected modulus, retrying");
                continue;
            }

            let public = PublicKey::from_modulus(n)?;
            let secret = match PrivateKey::new(public.clone(), p, q) {
                Ok(secret) => secret,
                Err(err) => {
                    tracing::debug!(attempt, %err, "rejected private key, retrying");
                    continue;
                }
            };

            tracing::debug!(attempt, bits = public.bit_length(), "generated Paillier key pair");
            return Ok(KeyPair { public, secret });
        }

        Err(Error::KeyGenerationFailed(format!(
            "No valid {}-bit modulus after {} attempts",
            self.bit_length, self.max_attempts
        )))
    }
}

impl Default for KeyPairBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn keygen_consistency() {
        let keypair = KeyPair::generate_with_size(512).unwrap();
        let pub_key = keypair.public_key();
        let priv_key = keypair.private_key();

        assert_eq!(priv_key.public_key(), pub_key);
        assert_eq!(pub_key.g(), &(pub_key.n() + BigUint::one()));
        assert_eq!(pub_key.n_squared(), &(pub_key.n() * pub_key.n()));
        assert!(pub_key.bit_length() >= 512);
    }

    #[test]
    fn key_structure_validation() {
        let keypair = KeyPair::generate_with_size(512).unwrap();
        let priv_key = keypair.private_key();

        assert_eq!(&(&priv_key.p * &priv_key.q), priv_key.public_key().n());

        // λ·μ ≡ 1 (mod n)
        let n = priv_key.public_key().n();
        assert!(((&priv_key.lambda * &priv_key.mu) % n).is_one());
    }

    #[test]
    fn rejects_small_key() {
        let result = KeyPair::generate_with_size(64);
        assert!(matches!(result, Err(Error::InvalidKeySize { actual: 64, .. })));
    }

    #[test]
    fn zero_attempts_fail() {
        let result = KeyPairBuilder::new().bit_length(512).max_attempts(0).build();
        assert!(matches!(result, Err(Error::KeyGenerationFailed(_))));
    }

    #[test]
    fn public_key_requires_standard_generator() {
        let n = BigUint::from(143u32);

        assert!(PublicKey::new(n.clone(), BigUint::from(144u32)).is_ok());
        assert_eq!(PublicKey::new(n, BigUint::from(2u32)), Err(Error::InvalidPublicKey));
        assert_eq!(PublicKey::from_modulus(BigUint::one()), Err(Error::InvalidPublicKey));
    }

    #[test]
    fn private_key_rejects_wrong_factors() {
        let public = PublicKey::from_modulus(BigUint::from(143u32)).unwrap();

        let result = PrivateKey::new(public.clone(), BigUint::from(11u32), BigUint::from(17u32));
        assert!(matches!(result, Err(Error::KeyGenerationFailed(_))));

        assert!(PrivateKey::new(public, BigUint::from(11u32), BigUint::from(13u32)).is_ok());
    }
}
