// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

/// Message and byte counters of one connection.
///
/// Byte counts include the 4-byte frame header. The counters are reporting
/// only and never influence the protocol.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WireStats {
    pub sent_messages: u64,
    pub sent_bytes: u64,
    pub received_messages: u64,
    pub received_bytes: u64,
}

impl WireStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_sent(&mut self, bytes: usize) {
        self.sent_messages += 1;
        self.sent_bytes += bytes as u64;
    }

    pub fn record_received(&mut self, bytes: usize) {
        self.received_messages += 1;
        self.received_bytes += bytes as u64;
    }

    pub fn total_messages(&self) -> u64 {
        self.sent_messages + self.received_messages
    }

    pub fn total_bytes(&self) -> u64 {
        self.sent_bytes + self.received_bytes
    }
}

impl fmt::Display for WireStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MB: f64 = 1e6;
        write!(
            f,
            "sent {} messages ({:.2} MB), received {} messages ({:.2} MB), total {} messages ({:.2} MB)",
            self.sent_messages,
            self.sent_bytes as f64 / MB,
            self.received_messages,
            self.received_bytes as f64 / MB,
            self.total_messages(),
            self.total_bytes() as f64 / MB
        )
    }
}
