// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::io::{Read, Write};

use super::message;
use super::{EncryptedDatabase, Peer};
use crate::config::ProtocolConfig;
use crate::error::{Error, Result};
use crate::keypair::PublicKey;
use crate::report::{Report, Stopwatch};
use crate::wire::WireStats;

/// Progress of a [`Server`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Init,
    KeyReceived,
    DbReceiving { chunk: usize },
    Ready,
    Querying { index: usize },
    Done,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Untrusted party: stores the encrypted database and answers queries with
/// homomorphic sums it cannot decrypt.
#[derive(Debug)]
pub struct Server<S> {
    peer: Peer<S>,
    config: ProtocolConfig,
    state: ServerState,
    public_key: PublicKey,
    database: EncryptedDatabase,
    queries: usize,
    report: Report,
}

impl<S: Read + Write> Server<S> {
    /// Waits for the client's public key.
    pub fn accept_key(mut peer: Peer<S>, config: ProtocolConfig) -> Result<Self> {
        peer.reset_stats();

        let public_key = message::public_key_from_value(peer.recv()?)?;
        tracing::info!(bits = public_key.bit_length(), "received public key");

        if config.duplication() > 1 {
            tracing::warn!(factor = config.duplication(), "duplicating database rows");
        }
        let database = EncryptedDatabase::new(config.duplication());

        Ok(Self {
            peer,
            config,
            state: ServerState::KeyReceived,
            public_key,
            database,
            queries: 0,
            report: Report::new(),
        })
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn database(&self) -> &EncryptedDatabase {
        &self.database
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn stats(&self) -> &WireStats {
        self.peer.stats()
    }

    fn unexpected(&self, operation: &'static str) -> Error {
        Error::UnexpectedState {
            operation,
            state: self.state.to_string(),
        }
    }

    /// Receives the encrypted database chunk by chunk.
    pub fn receive_database(&mut self) -> Result<()> {
        if self.state != ServerState::KeyReceived {
            return Err(self.unexpected("receive_database"));
        }

        let chunks = message::count_from_value(self.peer.recv()?)?;
        if chunks == 0 {
            return Err(Error::InvalidDatabase("client announced no chunks".into()));
        }

        let watch = Stopwatch::start();
        for chunk in 0..chunks {
            self.state = ServerState::DbReceiving { chunk };
            let columns = message::columns_from_value(self.peer.recv()?)?;
            let received = columns.len();
            self.database.append_chunk(columns, &self.public_key)?;

            tracing::debug!(chunk = chunk + 1, chunks, columns = received, "received database chunk");
        }
        let elapsed = watch.stop(self.peer.stats().received_bytes);

        tracing::info!(
            columns = self.database.num_columns(),
            packs = self.database.packs(),
            seconds = elapsed.seconds,
            "database ready"
        );
        self.state = ServerState::Ready;
        Ok(())
    }

    /// Answers one query with the sum of the selected columns.
    ///
    /// A query selecting no column is answered with fresh encryptions of
    /// zero, so it decrypts to all-zero counts like any other query.
    pub fn serve_query(&mut self) -> Result<()> {
        if !matches!(self.state, ServerState::Ready | ServerState::Querying { .. }) {
            return Err(self.unexpected("serve_query"));
        }

        let index = self.queries;
        self.state = ServerState::Querying { index };
        let query = self.peer.recv()?.into_bit_array()?;

        let watch = Stopwatch::start();
        let results = match self.database.match_and_aggregate(&query, &self.public_key) {
            Ok(results) => results,
            Err(Error::EmptySelection) => {
                tracing::debug!(index, "query selects no column, answering with zeros");
                self.database.zero_result(&self.public_key)?
            }
            Err(e) => return Err(e),
        };
        self.report.record(format!("s_execute_{index}"), watch.stop(0));

        let watch = Stopwatch::start();
        let sent = self.peer.send(&message::results_to_value(results))?;
        self.report.record(format!("c_qry_download_{index}"), watch.stop(sent as u64));

        tracing::info!(index, selected = query.count_ones(), bytes = sent, "answered query");
        self.queries += 1;
        Ok(())
    }

    /// Serves `query_count` queries in order.
    pub fn run(&mut self, query_count: usize) -> Result<()> {
        for _ in 0..query_count {
            self.serve_query()?;
        }
        Ok(())
    }

    /// Sends the server measurements to the client, outside the wire counters.
    pub fn finish(&mut self) -> Result<()> {
        if !matches!(self.state, ServerState::Ready | ServerState::Querying { .. }) {
            return Err(self.unexpected("finish"));
        }

        self.peer.send_untracked(&self.report.to_value())?;
        self.state = ServerState::Done;

        tracing::info!(stats = %self.peer.stats(), "session finished");
        Ok(())
    }
}
