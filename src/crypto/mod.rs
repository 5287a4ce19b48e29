// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

mod decrypt;
mod encrypt;
mod util;

pub(crate) use util::mod_inverse;

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::keypair::{KeyPair, PrivateKey, PublicKey};
use crate::packing::PackingLayout;

use num_bigint_dig::BigUint;

/// Encrypts a single plaintext integer.
pub trait Encrypt {
    /// Encrypt `m`, which must be strictly smaller than the public modulus `n`.
    ///
    /// Every call draws fresh randomness, so equal plaintexts produce
    /// different ciphertexts.
    fn encrypt(&self, m: &BigUint) -> Result<Ciphertext>;
}

/// Recovers the plaintext integer of a ciphertext.
pub trait Decrypt {
    fn decrypt(&self, ciphertext: &Ciphertext) -> Result<BigUint>;
}

/// Additive homomorphism: E(a) · E(b) mod n² = E(a + b mod n).
pub trait HomomorphicAdd {
    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Ciphertext;

    /// Homomorphic sum of all ciphertexts, `None` for an empty input.
    fn sum<'c, I>(&self, ciphertexts: I) -> Option<Ciphertext>
    where
        I: IntoIterator<Item = &'c Ciphertext>,
    {
        let mut iter = ciphertexts.into_iter();
        let first = iter.next()?.clone();
        Some(iter.fold(first, |acc, c| self.add(&acc, c)))
    }
}

/// Cryptosystem handle held by a protocol role.
///
/// The client owns a full key pair; the server only ever sees the public
/// key, so decryption through its handle fails with [`Error::NoPrivateKey`].
#[allow(missing_debug_implementations)]
#[derive(Clone)]
pub struct Paillier {
    public: PublicKey,
    private: Option<PrivateKey>,
}

impl Paillier {
    /// Handle for the key holder.
    pub fn from_keypair(keypair: &KeyPair) -> Self {
        Self {
            public: keypair.public_key().clone(),
            private: Some(keypair.private_key().clone()),
        }
    }

    /// Handle for a party that only knows the public key.
    pub fn from_public_key(public: PublicKey) -> Self {
        Self { public, private: None }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn private_key(&self) -> Result<&PrivateKey> {
        self.private.as_ref().ok_or(Error::NoPrivateKey)
    }

    pub fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    /// See [`PrivateKey::decrypt_and_unpack_many`].
    pub fn decrypt_and_unpack_many(
        &self,
        ciphertexts: &[Ciphertext],
        layout: &PackingLayout,
        max_count: usize,
    ) -> Result<Vec<u64>> {
        self.private_key()?.decrypt_and_unpack_many(ciphertexts, layout, max_count)
    }
}

impl Encrypt for Paillier {
    fn encrypt(&self, m: &BigUint) -> Result<Ciphertext> {
        self.public.encrypt(m)
    }
}

impl Decrypt for Paillier {
    fn decrypt(&self, ciphertext: &Ciphertext) -> Result<BigUint> {
        self.private_key()?.decrypt(ciphertext)
    }
}

impl HomomorphicAdd for Paillier {
    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Ciphertext {
        self.public.add(a, b)
    }
}
