// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::io::{Read, Write};

use super::Peer;
use super::message;
use crate::bitarray::BitArray;
use crate::config::ProtocolConfig;
use crate::crypto::Paillier;
use crate::error::{Error, Result};
use crate::keypair::KeyPairBuilder;
use crate::packing::{self, PackingLayout};
use crate::report::{Measurement, Report, Stopwatch};
use crate::wire::{Value, WireStats};

/// Progress of a [`Client`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Init,
    KeyGen,
    KeyUploaded,
    DbBloomed,
    DbUploading { chunk: usize },
    DbUploaded,
    Querying { index: usize },
    Done,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Data owner: holds the key pair and the plaintext database, uploads the
/// encrypted database and decrypts query results.
#[allow(missing_debug_implementations)]
pub struct Client<S> {
    peer: Peer<S>,
    config: ProtocolConfig,
    state: ClientState,
    paillier: Option<Paillier>,
    layout: Option<PackingLayout>,
    database: Vec<BitArray>,
    packs: usize,
    queries: usize,
    report: Report,
}

impl<S: Read + Write> Client<S> {
    pub fn new(mut peer: Peer<S>, config: ProtocolConfig) -> Self {
        peer.reset_stats();

        Self {
            peer,
            config,
            state: ClientState::Init,
            paillier: None,
            layout: None,
            database: Vec::new(),
            packs: 0,
            queries: 0,
            report: Report::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn layout(&self) -> Option<&PackingLayout> {
        self.layout.as_ref()
    }

    /// Key material, available once setup has generated it.
    pub fn paillier(&self) -> Option<&Paillier> {
        self.paillier.as_ref()
    }

    /// Number of real database rows.
    pub fn rows(&self) -> usize {
        self.database.len()
    }

    /// Bloom filter length of the uploaded rows.
    pub fn filter_length(&self) -> usize {
        self.database.first().map_or(0, BitArray::len)
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Phases measured outside the session, e.g. Bloom filter construction.
    pub fn report_mut(&mut self) -> &mut Report {
        &mut self.report
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

    /// Generates a key pair, uploads the public key and the encrypted
    /// column-major database.
    pub fn setup(&mut self, database: Vec<BitArray>) -> Result<()> {
        if self.state != ClientState::Init {
            return Err(self.unexpected("setup"));
        }
        validate_rows(&database)?;

        self.state = ClientState::KeyGen;
        let watch = Stopwatch::start();
        let keypair = KeyPairBuilder::new().bit_length(self.config.key_bits()).build()?;
        self.report.record("c_key_generate", watch.stop(0));
        tracing::info!(bits = keypair.public_key().bit_length(), "generated key pair");

        let watch = Stopwatch::start();
        let sent = self.peer.send(&message::public_key_to_value(keypair.public_key()))?;
        self.report.record("c_key_upload", watch.stop(sent as u64));
        self.state = ClientState::KeyUploaded;

        let paillier = Paillier::from_keypair(&keypair);
        let layout = PackingLayout::new(paillier.public_key(), self.config.field_width())?;
        self.database = database;
        self.state = ClientState::DbBloomed;

        self.upload_database(&paillier, &layout)?;

        self.paillier = Some(paillier);
        self.layout = Some(layout);
        self.state = ClientState::DbUploaded;
        Ok(())
    }

    fn upload_database(&mut self, paillier: &Paillier, layout: &PackingLayout) -> Result<()> {
        let rows = self.database.len();
        let columns = self.filter_length();
        let chunk_size = match self.config.chunk_size() {
            0 => columns,
            size => size.min(columns),
        };
        let chunks = columns.div_ceil(chunk_size);
        self.packs = layout.packs_for(rows);

        tracing::info!(
            rows,
            columns,
            packs = self.packs,
            slots = layout.slots(),
            field_width = layout.field_width(),
            chunks,
            "uploading encrypted database"
        );

        let pool = packing::worker_pool(self.config.threads())?;
        self.peer.send(&message::count_to_value(chunks))?;

        for chunk in 0..chunks {
            self.state = ClientState::DbUploading { chunk };
            let range = chunk * chunk_size..((chunk + 1) * chunk_size).min(columns);

            let watch = Stopwatch::start();
            let encrypted = layout.pack_and_encrypt_columns(&self.database, range, paillier, &pool)?;
            self.report.accumulate("c_db_encrypt", watch.stop(0));

            let watch = Stopwatch::start();
            let sent = self.peer.send(&message::columns_to_value(encrypted))?;
            self.report.accumulate("c_db_upload", watch.stop(sent as u64));

            tracing::debug!(chunk = chunk + 1, chunks, bytes = sent, "sent database chunk");
        }
        Ok(())
    }

    /// Sends `query` and returns the match count of every row.
    ///
    /// The first [`Client::rows`] counts belong to the real rows; server-side
    /// duplicated packs add synthetic counts after them.
    pub fn query(&mut self, query: &BitArray) -> Result<Vec<u64>> {
        if !matches!(self.state, ClientState::DbUploaded | ClientState::Querying { .. }) {
            return Err(self.unexpected("query"));
        }
        let (Some(paillier), Some(layout)) = (self.paillier.as_ref(), self.layout) else {
            return Err(self.unexpected("query"));
        };

        if query.len() != self.filter_length() {
            return Err(Error::QueryLengthMismatch {
                expected: self.filter_length(),
                actual: query.len(),
            });
        }
        let selected = query.count_ones();
        if selected > layout.capacity() {
            return Err(Error::PackingOverflow {
                value: selected.to_string(),
                field_width: layout.field_width(),
            });
        }

        let index = self.queries;
        self.state = ClientState::Querying { index };
        tracing::info!(index, selected, "sending query");

        self.report.record(format!("c_qry_encrypt_{index}"), Measurement::default());
        let watch = Stopwatch::start();
        let sent = self.peer.send(&Value::BitArray(query.clone()))?;
        self.report.record(format!("c_qry_upload_{index}"), watch.stop(sent as u64));

        let results = message::results_from_value(self.peer.recv()?)?;
        if results.len() < self.packs {
            return Err(Error::Decode(format!(
                "expected at least {} result ciphertexts, got {}",
                self.packs,
                results.len()
            )));
        }

        let watch = Stopwatch::start();
        let rows = self.database.len();
        let (real, synthetic) = results.split_at(self.packs);
        let mut counts = paillier.decrypt_and_unpack_many(real, &layout, rows)?;
        for extra in synthetic {
            let extra = std::slice::from_ref(extra);
            counts.extend(paillier.decrypt_and_unpack_many(extra, &layout, rows.min(layout.slots()))?);
        }
        self.report.record(format!("c_qry_decrypt_{index}"), watch.stop(0));

        if self.config.self_check() {
            self_check(&self.database, query, &counts)?;
            tracing::info!(index, "validated secure result against plaintext");
        }

        self.queries += 1;
        Ok(counts)
    }

    /// Receives the server's measurements and merges them into the report.
    pub fn finish(&mut self) -> Result<&Report> {
        if !matches!(self.state, ClientState::DbUploaded | ClientState::Querying { .. }) {
            return Err(self.unexpected("finish"));
        }

        let server_report = Report::from_value(self.peer.recv()?)?;
        self.report.merge(server_report);
        self.state = ClientState::Done;

        tracing::info!(stats = %self.peer.stats(), "session finished");
        Ok(&self.report)
    }
}

fn validate_rows(database: &[BitArray]) -> Result<()> {
    let first = database
        .first()
        .ok_or_else(|| Error::InvalidDatabase("database has no rows".into()))?;
    if first.is_empty() {
        return Err(Error::InvalidDatabase("rows have no bits".into()));
    }
    if let Some(row) = database.iter().position(|r| r.len() != first.len()) {
        return Err(Error::InvalidDatabase(format!(
            "row {row} has {} bits, expected {}",
            database[row].len(),
            first.len()
        )));
    }
    Ok(())
}

/// Compares the secure counts of the real rows with `popcount(row & query)`.
fn self_check(database: &[BitArray], query: &BitArray, counts: &[u64]) -> Result<()> {
    for (row, (bits, &secure)) in database.iter().zip(counts).enumerate() {
        let plain = bits.and_count(query);
        if secure != plain {
            return Err(Error::SelfCheckMismatch { row, secure, plain });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::io::Cursor;

    fn rows(bits: &[&str]) -> Vec<BitArray> {
        bits.iter().map(|r| r.parse().unwrap()).collect()
    }

    #[test]
    fn row_validation() {
        assert!(matches!(validate_rows(&[]), Err(Error::InvalidDatabase(_))));
        assert!(matches!(validate_rows(&rows(&["101", "10"])), Err(Error::InvalidDatabase(_))));
        assert!(validate_rows(&rows(&["101", "011"])).is_ok());
    }

    #[test]
    fn self_check_reports_first_mismatch() {
        let db = rows(&["11010000", "10010100", "00011010"]);
        let query: BitArray = "10010000".parse().unwrap();

        assert!(self_check(&db, &query, &[2, 2, 1]).is_ok());
        assert_eq!(
            self_check(&db, &query, &[2, 3, 1]),
            Err(Error::SelfCheckMismatch { row: 1, secure: 3, plain: 2 })
        );
    }

    #[test]
    fn query_before_setup_is_rejected() {
        let mut client = Client::new(Peer::new(Cursor::new(Vec::new())), ProtocolConfig::default());
        let result = client.query(&BitArray::zeros(8));

        assert!(matches!(result, Err(Error::UnexpectedState { operation: "query", .. })));
        assert_eq!(client.state(), ClientState::Init);
    }
}
