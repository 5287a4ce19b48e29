// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Variant records read from tab-separated VCF files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::bloom::BloomFilter;
use crate::error::{Error, Result};

/// One genomic variant, identified by chromosome, position and alleles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variant {
    pub chromosome: String,
    pub position: String,
    pub reference: String,
    pub alternate: String,
}

impl Variant {
    /// Parses a data line; columns are `CHROM POS ID REF ALT ...`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim_end().split('\t');
        let chromosome = fields.next()?;
        let position = fields.next()?;
        let _id = fields.next()?;
        let reference = fields.next()?;
        let alternate = fields.next()?;

        Some(Self {
            chromosome: chromosome.to_owned(),
            position: position.to_owned(),
            reference: reference.to_owned(),
            alternate: alternate.to_owned(),
        })
    }

    /// Bloom filter element of this variant.
    pub fn key(&self) -> String {
        format!("{}{}{}{}", self.chromosome, self.position, self.reference, self.alternate)
    }
}

/// Iterator over the variants of a VCF stream.
///
/// Header lines (`#`) and lines with fewer than five columns are skipped.
#[derive(Debug)]
pub struct VcfReader<R> {
    reader: R,
    line: String,
    line_no: usize,
}

impl<R: BufRead> VcfReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }

    /// Lines consumed so far, headers included.
    pub fn lines_read(&self) -> usize {
        self.line_no
    }
}

impl VcfReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| Error::Io(format!("{}: {e}", path.as_ref().display())))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for VcfReader<R> {
    type Item = Result<Variant>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => self.line_no += 1,
                Err(e) => return Some(Err(e.into())),
            }

            if self.line.starts_with('#') || self.line.trim().is_empty() {
                continue;
            }
            match Variant::parse(&self.line) {
                Some(variant) => return Some(Ok(variant)),
                None => tracing::debug!(line = self.line_no, "skipping malformed VCF line"),
            }
        }
    }
}

/// Bloom filter of the first variants of one VCF stream.
///
/// At most `max_lines` lines are consumed, headers included, and at most
/// `filter.capacity()` distinct variants are added.
pub fn bloom_variants<R: BufRead>(
    mut reader: VcfReader<R>,
    mut filter: BloomFilter,
    max_lines: usize,
) -> Result<BloomFilter> {
    while reader.lines_read() < max_lines {
        let Some(variant) = reader.next() else { break };
        match filter.add(variant?.key()) {
            Ok(_) => {}
            Err(Error::BloomCapacityExceeded { capacity }) => {
                tracing::debug!(capacity, "Bloom filter full, ignoring remaining variants");
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(filter)
}

/// VCF files of `dir`, in natural order (`p2.vcf` before `p10.vcf`).
pub fn list_vcf_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::Io(format!("{}: {e}", dir.display())))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(files)
}

/// Compares strings treating embedded digit runs as numbers.
fn natural_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let (mut a, mut b) = (a, b);
    loop {
        match (a.chars().next(), b.chars().next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let da = a.len() - a.trim_start_matches(|c: char| c.is_ascii_digit()).len();
                let db = b.len() - b.trim_start_matches(|c: char| c.is_ascii_digit()).len();
                let (na, nb) = (a[..da].trim_start_matches('0'), b[..db].trim_start_matches('0'));

                let ord = na.len().cmp(&nb.len()).then_with(|| na.cmp(nb));
                if ord != Ordering::Equal {
                    return ord;
                }
                a = &a[da..];
                b = &b[db..];
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a = &a[x.len_utf8()..];
                b = &b[y.len_utf8()..];
            }
        }
    }
}
