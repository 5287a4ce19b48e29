// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! phebloom-client: data owner side of the matching protocol
//!
//! Blooms the patient VCF files, uploads them encrypted and runs the query
//! repetitions against a running `phebloom-server`.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::{Context, Result};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use phebloom::record::{self, VcfReader};
use phebloom::report::{self, Stopwatch};
use phebloom::{BitArray, BloomFilter, Client, ConnectOptions, Peer, ProtocolConfig};

#[derive(Parser)]
#[command(name = "phebloom-client")]
#[command(about = "PHEBLOOM client: encrypted Bloom filter matching of genomic records")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1")]
    address: String,

    /// Server port
    #[arg(short, long, default_value_t = 8123)]
    port: u16,

    /// Number of patients to load
    #[arg(short = 'n', default_value_t = 1)]
    rows: usize,

    /// Number of variants per patient, the Bloom filter capacity
    #[arg(short = 'm', default_value_t = 10000)]
    capacity: usize,

    /// False positive probability exponent, the rate is 2^q
    #[arg(short = 'q', default_value_t = -14, allow_hyphen_values = true)]
    exponent: i32,

    /// Packing workers [default: all cores]
    #[arg(long)]
    cpus: Option<usize>,

    /// Number of the current run, used in the report file name
    #[arg(short = 'r', long, default_value_t = 0)]
    run: usize,

    /// Row duplication factor the server applies
    #[arg(long, default_value_t = 1)]
    blowup: usize,

    /// Number of query repetitions
    #[arg(long, default_value_t = 3)]
    qrycnt: usize,

    /// Directory with one VCF file per patient
    #[arg(long, default_value = "data/vcf_database")]
    db: PathBuf,

    /// VCF file with the query variants
    #[arg(long, default_value = "data/vcf_query/multi_query.vcf")]
    qry: PathBuf,

    /// Columns per upload message [default: 0, whole database]
    #[arg(long, default_value_t = 0)]
    chunksize: usize,

    /// Validate every result against the plaintext computation
    #[arg(long)]
    control: bool,

    /// Paillier modulus size in bits
    #[arg(long, default_value_t = 1024)]
    key_bits: usize,

    /// Maximum number of distinct query variants
    #[arg(long, default_value_t = 4)]
    max_query_elements: usize,

    /// Give up after this many refused connection attempts
    #[arg(long)]
    connect_attempts: Option<usize>,

    /// Write the benchmark report file
    #[arg(long)]
    report: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn bloom_file(path: &Path, capacity: usize, exponent: i32, max_lines: usize) -> Result<BloomFilter> {
    let filter = BloomFilter::with_exponent(capacity, exponent)?;
    let reader = VcfReader::open(path)?;
    record::bloom_variants(reader, filter, max_lines).with_context(|| format!("Failed to read {}", path.display()))
}

fn bloom_database(args: &Args) -> Result<(Vec<BitArray>, usize)> {
    let files = record::list_vcf_files(&args.db)
        .with_context(|| format!("Failed to list patient files in {}", args.db.display()))?;

    let mut rows = Vec::new();
    let mut slices = 0;
    for path in files.iter().take(args.rows) {
        info!("Reading patient file {}", path.display());
        let filter = bloom_file(path, args.capacity, args.exponent, args.capacity)?;
        slices = filter.slices();
        rows.push(filter.into_bits());
    }

    if rows.is_empty() {
        return Err(eyre::eyre!("No patient files found in {}", args.db.display()));
    }
    if rows.len() < args.rows {
        warn!("Only {} of {} requested patients available", rows.len(), args.rows);
    }
    Ok((rows, slices))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cpus = match args.cpus {
        Some(cpus) => cpus,
        None => std::thread::available_parallelism().map_or(1, |n| n.get()),
    };
    info!("Using {} CPUs", cpus);
    if !args.control {
        warn!("Eval mode, results are not checked for correctness");
    }

    let watch = Stopwatch::start();
    let (rows, slices) = bloom_database(&args)?;
    let blooming = watch.stop(0);
    info!(
        "Bloomed {} patients into {}-bit filters with {} slices",
        rows.len(),
        rows[0].len(),
        slices
    );

    let config = ProtocolConfig::builder()
        .key_bits(args.key_bits)
        .num_slices(slices)
        .max_query_elements(args.max_query_elements)
        .chunk_size(args.chunksize)
        .duplication(args.blowup)
        .threads(cpus)
        .self_check(args.control && args.blowup == 1)
        .build()
        .wrap_err("Invalid protocol parameters")?;
    if args.control && args.blowup > 1 {
        warn!("--control only validates results with --blowup 1");
    }

    let options = ConnectOptions {
        max_attempts: args.connect_attempts,
        ..ConnectOptions::default()
    };
    let peer = Peer::connect(format!("{}:{}", args.address, args.port), options)?;
    let mut client = Client::new(peer, config);
    client.report_mut().record("c_db_blooming", blooming);

    let watch = Stopwatch::start();
    client.setup(rows).wrap_err("Setup failed")?;
    info!("Setup total time: {:.4} s", watch.stop(0).seconds);

    for i in 0..args.qrycnt {
        let watch = Stopwatch::start();
        let query = bloom_file(&args.qry, args.capacity, args.exponent, usize::MAX)?;
        client
            .report_mut()
            .record(format!("c_qry_blooming_{i}"), watch.stop(0));

        let watch = Stopwatch::start();
        let counts = client
            .query(query.bits())
            .wrap_err_with(|| format!("Query {i} failed"))?;
        info!("Query {}: {:.4} s", i, watch.stop(0).seconds);
        info!("Match counts: {:?}", &counts[..client.rows()]);
    }

    let report = client.finish()?.clone();
    if args.report {
        let name = report::report_file_name(args.capacity, client.rows(), args.blowup, args.exponent, cpus, args.run);
        let file = File::create(&name).with_context(|| format!("Failed to create report {name}"))?;
        report.write_csv(&mut BufWriter::new(file), args.qrycnt)?;
        info!("Wrote report {}", name);
    }

    info!("{}", client.stats());
    Ok(())
}
