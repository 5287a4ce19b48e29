// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! phebloom-server: untrusted side of the matching protocol
//!
//! Accepts one client, stores its encrypted database and answers the
//! announced number of queries.

use clap::Parser;
use eyre::{Context, Result};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use phebloom::{Peer, ProtocolConfig, Server};

#[derive(Parser)]
#[command(name = "phebloom-server")]
#[command(about = "PHEBLOOM server: answers encrypted Bloom filter matching queries")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1")]
    address: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8123)]
    port: u16,

    /// Expected number of query repetitions
    #[arg(long, default_value_t = 3)]
    qrycnt: usize,

    /// Duplicate rows by this factor
    #[arg(long, default_value_t = 1)]
    blowup: usize,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ProtocolConfig::builder()
        .duplication(args.blowup)
        .build()
        .wrap_err("Invalid protocol parameters")?;

    let peer = Peer::listen(format!("{}:{}", args.address, args.port))?;
    let mut server = Server::accept_key(peer, config).wrap_err("Key exchange failed")?;

    server.receive_database().wrap_err("Receiving the database failed")?;
    server.run(args.qrycnt).wrap_err("Serving queries failed")?;
    server.finish()?;

    info!("{}", server.stats());
    Ok(())
}
