// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Errors that can occur during cryptographic operations and protocol sessions.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid key size: must be at least {min} bits, got {actual}")]
    InvalidKeySize { min: usize, actual: usize },

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Plaintext exceeds maximum allowed value")]
    PlaintextTooLarge,

    #[error("Ciphertext is invalid or corrupted")]
    InvalidCiphertext,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("No private key available for decryption")]
    NoPrivateKey,

    #[error("Could not connect to {addr} after {attempts} attempts")]
    Connection { addr: String, attempts: usize },

    #[error("Connection closed after {received} of {expected} framed bytes")]
    Framing { expected: usize, received: usize },

    #[error("Malformed payload: {0}")]
    Decode(String),

    #[error("Cannot encode payload: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Unexpected message: expected {expected}, found {found}")]
    UnexpectedMessage { expected: &'static str, found: &'static str },

    #[error("Operation `{operation}` not allowed in state {state}")]
    UnexpectedState { operation: &'static str, state: String },

    #[error("Packed counter overflow: value {value} does not fit in {field_width} bits")]
    PackingOverflow { value: String, field_width: usize },

    #[error("Invalid packing layout: {0}")]
    InvalidLayout(String),

    #[error("Query selects no database column")]
    EmptySelection,

    #[error("Query has {actual} bits, database has {expected} columns")]
    QueryLengthMismatch { expected: usize, actual: usize },

    #[error("Invalid database: {0}")]
    InvalidDatabase(String),

    #[error("Self-check failed for row {row}: secure result {secure}, plaintext result {plain}")]
    SelfCheckMismatch { row: usize, secure: u64, plain: u64 },

    #[error("Bloom filter is at capacity ({capacity} elements)")]
    BloomCapacityExceeded { capacity: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker pool error: {0}")]
    ThreadPool(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
