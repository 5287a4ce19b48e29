// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client and server roles of the matching protocol.
//!
//! Message order on one connection:
//!
//! 1. client → server: public key
//! 2. client → server: chunk count, then one message per chunk of columns
//! 3. per query: client → server query bit array, server → client results
//! 4. server → client: server report (not counted in the wire statistics)

mod client;
mod database;
pub mod message;
mod peer;
mod server;

pub use client::{Client, ClientState};
pub use database::EncryptedDatabase;
pub use peer::{ConnectOptions, Peer};
pub use server::{Server, ServerState};
