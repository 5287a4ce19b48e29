// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-phase timings and traffic of a session.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::wire::Value;

/// Duration, traffic and peak memory of one protocol phase.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub seconds: f64,
    pub bytes: u64,
    /// Peak resident set size in kilobytes when the phase ended.
    pub peak_memory_kb: u64,
}

impl Measurement {
    /// Adds time and bytes, keeps the latest memory reading.
    pub fn accumulate(&mut self, other: Measurement) {
        self.seconds += other.seconds;
        self.bytes += other.bytes;
        self.peak_memory_kb = other.peak_memory_kb;
    }

    fn to_value(self) -> Value {
        Value::Seq(vec![
            Value::Float(self.seconds),
            Value::Int(i64::try_from(self.bytes).unwrap_or(i64::MAX)),
            Value::Int(i64::try_from(self.peak_memory_kb).unwrap_or(i64::MAX)),
        ])
    }

    fn from_value(value: Value) -> Result<Self> {
        let fields = value.into_seq()?;
        let [seconds, bytes, memory]: [Value; 3] = fields
            .try_into()
            .map_err(|v: Vec<Value>| Error::Decode(format!("measurement has {} fields, expected 3", v.len())))?;

        Ok(Self {
            seconds: seconds.into_float()?,
            bytes: u64::try_from(bytes.into_int()?).map_err(|e| Error::Decode(e.to_string()))?,
            peak_memory_kb: u64::try_from(memory.into_int()?).map_err(|e| Error::Decode(e.to_string()))?,
        })
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.seconds, self.bytes, self.peak_memory_kb)
    }
}

/// Times a phase from construction to [`Stopwatch::stop`].
#[derive(Debug)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self { started: Instant::now() }
    }

    pub fn stop(self, bytes: u64) -> Measurement {
        Measurement {
            seconds: self.started.elapsed().as_secs_f64(),
            bytes,
            peak_memory_kb: peak_memory_kb(),
        }
    }
}

/// Peak resident set size of this process, `0` where it cannot be read.
#[cfg(target_os = "linux")]
pub fn peak_memory_kb() -> u64 {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| {
            status
                .lines()
                .find_map(|line| line.strip_prefix("VmHWM:"))
                .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse().ok())
        })
        .unwrap_or(0)
}

#[cfg(not(target_os = "linux"))]
pub fn peak_memory_kb() -> u64 {
    0
}

/// Named measurements, keyed like `c_db_upload` or `s_execute_0`.
///
/// `c_` keys are recorded by the client, `s_` keys and `c_qry_download_*` by
/// the server, which sends its half after the last query.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Report {
    entries: BTreeMap<String, Measurement>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: impl Into<String>, measurement: Measurement) {
        self.entries.insert(key.into(), measurement);
    }

    /// Adds `measurement` onto the entry for `key`.
    pub fn accumulate(&mut self, key: impl Into<String>, measurement: Measurement) {
        self.entries.entry(key.into()).or_default().accumulate(measurement);
    }

    pub fn get(&self, key: &str) -> Option<&Measurement> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes over every entry of `other`, replacing equal keys.
    pub fn merge(&mut self, other: Report) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Measurement)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_value(&self) -> Value {
        Value::Map(self.entries.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let entries = value
            .into_map()?
            .into_iter()
            .map(|(k, v)| Ok((k, Measurement::from_value(v)?)))
            .collect::<Result<_>>()?;
        Ok(Self { entries })
    }

    /// Writes the benchmark lines `key,seconds,bytes,memory`.
    ///
    /// Setup phases come first, then the per-query phases of each of the
    /// `queries` queries. Missing phases are written as zeros.
    pub fn write_csv<W: Write>(&self, writer: &mut W, queries: usize) -> Result<()> {
        const SETUP: [&str; 3] = ["c_db_blooming", "c_db_encrypt", "c_db_upload"];
        const PER_QUERY: [&str; 6] = [
            "c_qry_blooming",
            "c_qry_encrypt",
            "c_qry_upload",
            "s_execute",
            "c_qry_download",
            "c_qry_decrypt",
        ];

        for key in SETUP {
            writeln!(writer, "{key},{}", self.get(key).copied().unwrap_or_default())?;
        }
        for i in 0..queries {
            for key in PER_QUERY {
                let key = format!("{key}_{i}");
                writeln!(writer, "{key},{}", self.get(&key).copied().unwrap_or_default())?;
            }
        }
        Ok(())
    }
}

/// Report file name encoding the run parameters.
///
/// `capacity` is `m`, `rows` is `n`, `exponent` is the false positive
/// exponent `q`, `cpus` the worker count and `run` the run number.
pub fn report_file_name(capacity: usize, rows: usize, duplication: usize, exponent: i32, cpus: usize, run: usize) -> String {
    if duplication > 1 {
        format!("III_m{capacity}_n{rows}_b{duplication}_q{exponent}_Cc{cpus}_Cs4.r{run}")
    } else {
        format!("III_m{capacity}_n{rows}_q{exponent}_Cc{cpus}_Cs4.r{run}")
    }
}
