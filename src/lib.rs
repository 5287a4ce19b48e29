// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # PHEBLOOM
//!
//! Private matching of genomic records with Paillier encryption and Bloom
//! filters. A client encodes patient records as Bloom filters, encrypts the
//! resulting bit matrix column by column and uploads it to an untrusted
//! server. For a plaintext query filter the server homomorphically sums the
//! selected columns and returns encrypted per-row match counts that only the
//! client can decrypt.
//!
//! Several counters share one Paillier plaintext ([`PackingLayout`]), so a
//! result for `n` rows costs `ceil(n / k)` ciphertexts.
//!
//! ## Security
//!
//! The server is assumed semi-honest. The query filter is sent in plaintext;
//! the database contents and the match counts stay encrypted. Private key
//! material is zeroized on drop via the `zeroize` crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use phebloom::{Decrypt, Encrypt, HomomorphicAdd, KeyPair, PackingLayout, Paillier};
//!
//! let keypair = KeyPair::generate_with_size(2048).expect("key generation failed");
//! let paillier = Paillier::from_keypair(&keypair);
//! let layout = PackingLayout::new(paillier.public_key(), 4).expect("invalid layout");
//!
//! let a = layout.pack_and_encrypt(&[1, 0, 1], &paillier).expect("encryption failed");
//! let b = layout.pack_and_encrypt(&[1, 1, 0], &paillier).expect("encryption failed");
//! let sum = paillier.add(&a[0], &b[0]);
//!
//! let counts = paillier.decrypt_and_unpack_many(&[sum], &layout, 3).expect("decryption failed");
//! assert_eq!(counts, vec![2, 1, 1]);
//! ```

#![warn(clippy::unwrap_used, clippy::expect_used)]

mod bitarray;
pub mod bloom;
mod ciphertext;
mod config;
mod crypto;
mod error;
mod keypair;
mod packing;
pub mod protocol;
pub mod record;
pub mod report;
pub mod wire;

pub use bitarray::BitArray;
pub use bloom::BloomFilter;
pub use ciphertext::Ciphertext;
pub use config::{ProtocolConfig, ProtocolConfigBuilder};
pub use crypto::{Decrypt, Encrypt, HomomorphicAdd, Paillier};
pub use error::{Error, Result};
pub use keypair::{KeyPair, KeyPairBuilder, PrivateKey, PublicKey};
pub use packing::{MAX_FIELD_WIDTH, PackingLayout, worker_pool};
pub use protocol::{Client, ClientState, ConnectOptions, EncryptedDatabase, Peer, Server, ServerState};
pub use report::{Measurement, Report};
