// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::error::{Error, Result};
use crate::keypair::KeyPairBuilder;
use crate::packing::{MAX_FIELD_WIDTH, PackingLayout};

/// Validated parameters of one matching session.
///
/// Build it with [`ProtocolConfigBuilder`]; the builder derives the packed
/// field width from the query bound unless one is given explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    key_bits: usize,
    num_slices: usize,
    max_query_elements: usize,
    field_width: usize,
    chunk_size: usize,
    duplication: usize,
    threads: usize,
    self_check: bool,
}

impl ProtocolConfig {
    pub fn builder() -> ProtocolConfigBuilder {
        ProtocolConfigBuilder::new()
    }

    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    pub fn num_slices(&self) -> usize {
        self.num_slices
    }

    pub fn max_query_elements(&self) -> usize {
        self.max_query_elements
    }

    /// Bits reserved per packed counter.
    pub fn field_width(&self) -> usize {
        self.field_width
    }

    /// Columns per upload message, `0` sends the database in one message.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn duplication(&self) -> usize {
        self.duplication
    }

    /// Packing workers, `0` uses every available core.
    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn self_check(&self) -> bool {
        self.self_check
    }

    /// Largest per-row sum a query may produce under this configuration.
    pub fn max_accumulated(&self) -> u64 {
        (self.max_query_elements as u64).saturating_mul(self.num_slices as u64)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        let max_accumulated =
            (ProtocolConfigBuilder::DEFAULT_MAX_QUERY_ELEMENTS * ProtocolConfigBuilder::DEFAULT_SLICES) as u64;

        Self {
            key_bits: KeyPairBuilder::DEFAULT_BITS,
            num_slices: ProtocolConfigBuilder::DEFAULT_SLICES,
            max_query_elements: ProtocolConfigBuilder::DEFAULT_MAX_QUERY_ELEMENTS,
            field_width: PackingLayout::field_width_for(max_accumulated),
            chunk_size: 0,
            duplication: 1,
            threads: 0,
            self_check: false,
        }
    }
}

/// Builder for [`ProtocolConfig`].
#[derive(Debug)]
pub struct ProtocolConfigBuilder {
    key_bits: usize,
    num_slices: usize,
    max_query_elements: usize,
    field_width: Option<usize>,
    chunk_size: usize,
    duplication: usize,
    threads: usize,
    self_check: bool,
}

impl ProtocolConfigBuilder {
    /// Slices of a Bloom filter with false positive rate `2^-14`.
    pub const DEFAULT_SLICES: usize = 14;

    /// Distinct elements a query filter is built from.
    pub const DEFAULT_MAX_QUERY_ELEMENTS: usize = 4;

    pub fn new() -> Self {
        Self {
            key_bits: KeyPairBuilder::DEFAULT_BITS,
            num_slices: Self::DEFAULT_SLICES,
            max_query_elements: Self::DEFAULT_MAX_QUERY_ELEMENTS,
            field_width: None,
            chunk_size: 0,
            duplication: 1,
            threads: 0,
            self_check: false,
        }
    }

    pub fn key_bits(mut self, bits: usize) -> Self {
        self.key_bits = bits;
        self
    }

    pub fn num_slices(mut self, slices: usize) -> Self {
        self.num_slices = slices;
        self
    }

    pub fn max_query_elements(mut self, elements: usize) -> Self {
        self.max_query_elements = elements;
        self
    }

    /// Overrides the derived field width.
    pub fn field_width(mut self, bits: usize) -> Self {
        self.field_width = Some(bits);
        self
    }

    pub fn chunk_size(mut self, columns: usize) -> Self {
        self.chunk_size = columns;
        self
    }

    pub fn duplication(mut self, factor: usize) -> Self {
        self.duplication = factor;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn self_check(mut self, enabled: bool) -> Self {
        self.self_check = enabled;
        self
    }

    pub fn build(self) -> Result<ProtocolConfig> {
        if self.key_bits < KeyPairBuilder::ABSOLUTE_MIN_BITS {
            return Err(Error::InvalidKeySize {
                min: KeyPairBuilder::ABSOLUTE_MIN_BITS,
                actual: self.key_bits,
            });
        }
        if self.num_slices == 0 {
            return Err(Error::InvalidConfig("Bloom filter needs at least one slice".into()));
        }
        if self.max_query_elements == 0 {
            return Err(Error::InvalidConfig("queries need at least one element".into()));
        }
        if self.duplication == 0 {
            return Err(Error::InvalidConfig("duplication factor must be at least 1".into()));
        }

        let max_accumulated = (self.max_query_elements as u64).saturating_mul(self.num_slices as u64);
        let required = PackingLayout::field_width_for(max_accumulated);
        let field_width = match self.field_width {
            None => required,
            Some(bits) if bits < required => {
                return Err(Error::InvalidConfig(format!(
                    "field width {bits} cannot hold sums up to {max_accumulated}, need {required} bits"
                )));
            }
            Some(bits) => bits,
        };

        if field_width > MAX_FIELD_WIDTH || field_width >= self.key_bits {
            return Err(Error::InvalidConfig(format!(
                "field width {field_width} does not fit a {}-bit key",
                self.key_bits
            )));
        }

        Ok(ProtocolConfig {
            key_bits: self.key_bits,
            num_slices: self.num_slices,
            max_query_elements: self.max_query_elements,
            field_width,
            chunk_size: self.chunk_size,
            duplication: self.duplication,
            threads: self.threads,
            self_check: self.self_check,
        })
    }
}

impl Default for ProtocolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use test_case::test_case;

    #[test]
    fn defaults_match_builder() {
        assert_eq!(ProtocolConfig::builder().build().unwrap(), ProtocolConfig::default());
    }

    #[test]
    fn default_field_width_holds_four_queries() {
        let config = ProtocolConfig::default();

        assert_eq!(config.max_accumulated(), 56);
        assert_eq!(config.field_width(), 6);
    }

    #[test_case(1, 1, 1 ; "single bit")]
    #[test_case(4, 4, 5 ; "sixteen needs five bits")]
    #[test_case(1, 3, 2 ; "three")]
    fn derives_field_width(slices: usize, elements: usize, expected: usize) {
        let config = ProtocolConfig::builder()
            .num_slices(slices)
            .max_query_elements(elements)
            .build()
            .unwrap();

        assert_eq!(config.field_width(), expected);
    }

    #[test]
    fn explicit_field_width_must_cover_bound() {
        let result = ProtocolConfig::builder()
            .num_slices(4)
            .max_query_elements(4)
            .field_width(4)
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        let config = ProtocolConfig::builder().num_slices(1).max_query_elements(3).field_width(4).build().unwrap();
        assert_eq!(config.field_width(), 4);
    }

    #[test]
    fn rejects_degenerate_values() {
        assert!(matches!(ProtocolConfig::builder().duplication(0).build(), Err(Error::InvalidConfig(_))));
        assert!(matches!(ProtocolConfig::builder().num_slices(0).build(), Err(Error::InvalidConfig(_))));
        assert!(matches!(
            ProtocolConfig::builder().key_bits(64).build(),
            Err(Error::InvalidKeySize { actual: 64, .. })
        ));
        assert!(matches!(
            ProtocolConfig::builder().field_width(64).build(),
            Err(Error::InvalidConfig(_))
        ));
    }
}
