// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::wire::{self, Value, WireStats};

/// Retry behaviour of [`Peer::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub backoff: Duration,
    /// `None` keeps retrying until the server listens.
    pub max_attempts: Option<usize>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            backoff: Duration::from_millis(1500),
            max_attempts: None,
        }
    }
}

/// One end of a framed message connection.
#[derive(Debug)]
pub struct Peer<S = TcpStream> {
    stream: S,
    stats: WireStats,
}

impl<S: Read + Write> Peer<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            stats: WireStats::default(),
        }
    }

    /// Sends one message and returns its size on the wire.
    pub fn send(&mut self, value: &Value) -> Result<usize> {
        wire::write_frame(&mut self.stream, value, &mut self.stats)
    }

    /// Sends one message without counting it in [`Peer::stats`].
    pub fn send_untracked(&mut self, value: &Value) -> Result<usize> {
        wire::write_frame(&mut self.stream, value, &mut WireStats::default())
    }

    pub fn recv(&mut self) -> Result<Value> {
        wire::read_frame(&mut self.stream, &mut self.stats)
    }

    pub fn stats(&self) -> &WireStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl Peer<TcpStream> {
    /// Connects to `addr`, retrying refused connections every
    /// `options.backoff` until the attempt cap is reached.
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Display, options: ConnectOptions) -> Result<Self> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match TcpStream::connect(&addr) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    tracing::info!(%addr, attempts, "connected to server");
                    return Ok(Self::new(stream));
                }
                Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                    if options.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(Error::Connection {
                            addr: addr.to_string(),
                            attempts,
                        });
                    }
                    tracing::info!(%addr, "server not serving yet, retrying");
                    thread::sleep(options.backoff);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Binds `addr` and waits for exactly one client.
    pub fn listen(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self> {
        tracing::info!(%addr, "listening");
        let listener = TcpListener::bind(&addr)?;
        Self::accept(&listener)
    }

    /// Waits for one client on an already bound listener.
    pub fn accept(listener: &TcpListener) -> Result<Self> {
        let (stream, client) = listener.accept()?;
        stream.set_nodelay(true)?;
        tracing::info!(%client, "client connected");
        Ok(Self::new(stream))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn untracked_messages_are_not_counted() {
        let mut peer = Peer::new(std::io::Cursor::new(Vec::new()));
        let sent = peer.send(&Value::Int(1)).unwrap();
        peer.send_untracked(&Value::Int(2)).unwrap();

        assert_eq!(peer.stats().sent_messages, 1);
        assert_eq!(peer.stats().sent_bytes, sent as u64);

        let mut reader = Peer::new(std::io::Cursor::new(peer.into_inner().into_inner()));
        assert_eq!(reader.recv().unwrap(), Value::Int(1));
        assert_eq!(reader.recv().unwrap(), Value::Int(2));
        assert_eq!(reader.stats().received_messages, 2);
    }

    #[test]
    fn connect_gives_up_after_cap() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let options = ConnectOptions {
            backoff: Duration::from_millis(10),
            max_attempts: Some(2),
        };
        let result = Peer::connect(addr, options);

        assert!(matches!(result, Err(Error::Connection { attempts: 2, .. })));
    }

    #[test]
    fn connect_retries_until_server_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let delay = Duration::from_millis(200);
        let server = thread::spawn(move || {
            thread::sleep(delay);
            let listener = TcpListener::bind(addr).unwrap();
            let mut peer = Peer::accept(&listener).unwrap();
            peer.send(&Value::Int(42)).unwrap();
        });

        let options = ConnectOptions {
            backoff: Duration::from_millis(20),
            max_attempts: Some(200),
        };
        let started = std::time::Instant::now();
        let mut client = Peer::connect(addr, options).unwrap();

        // the first attempts happen before the listener exists
        assert!(started.elapsed() >= delay);
        assert_eq!(client.recv().unwrap(), Value::Int(42));
        server.join().unwrap();
    }

    #[test]
    fn loopback_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let mut peer = Peer::accept(&listener).unwrap();
            let msg = peer.recv().unwrap();
            peer.send(&msg).unwrap();
        });

        let mut client = Peer::connect(addr, ConnectOptions::default()).unwrap();
        client.send(&Value::Str("ping".into())).unwrap();
        assert_eq!(client.recv().unwrap(), Value::Str("ping".into()));

        server.join().unwrap();
    }
}
