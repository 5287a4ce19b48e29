// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tagged binary encoding of [`Value`].
//!
//! Every value is one tag byte followed by its body. All integers are
//! big-endian; lengths and counts are `u32`.
//!
//! ```text
//! 0x00 nil
//! 0x01 int        i64
//! 0x02 float      f64 bits
//! 0x03 string     u32 len, UTF-8 bytes
//! 0x10 big int    u32 len, minimal magnitude bytes (zero has none)
//! 0x11 bit array  u32 bit count, ceil(bits / 8) packed bytes
//! 0x20 sequence   u32 count, values
//! 0x21 map        u32 count, (string body, value) pairs
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use num_bigint_dig::BigUint;
use num_traits::Zero;

use super::Value;
use crate::bitarray::BitArray;
use crate::error::{Error, Result};

mod tag {
    pub const NIL: u8 = 0x00;
    pub const INT: u8 = 0x01;
    pub const FLOAT: u8 = 0x02;
    pub const STR: u8 = 0x03;
    pub const BIG_INT: u8 = 0x10;
    pub const BIT_ARRAY: u8 = 0x11;
    pub const SEQ: u8 = 0x20;
    pub const MAP: u8 = 0x21;
}

/// Nesting limit for sequences and maps.
pub const MAX_DEPTH: usize = 64;

/// Encodes `value` into a fresh buffer.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_into(value, &mut out)?;
    Ok(out)
}

/// Appends the encoding of `value` to `out`.
pub fn encode_into(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Nil => out.push(tag::NIL),
        Value::Int(v) => {
            out.push(tag::INT);
            out.write_i64::<BigEndian>(*v)?;
        }
        Value::Float(v) => {
            out.push(tag::FLOAT);
            out.write_f64::<BigEndian>(*v)?;
        }
        Value::Str(s) => {
            out.push(tag::STR);
            write_str(s, out)?;
        }
        Value::BigInt(v) => {
            out.push(tag::BIG_INT);
            let bytes = if v.is_zero() { Vec::new() } else { v.to_bytes_be() };
            write_len(bytes.len(), out)?;
            out.extend_from_slice(&bytes);
        }
        Value::BitArray(bits) => {
            out.push(tag::BIT_ARRAY);
            write_len(bits.len(), out)?;
            out.extend_from_slice(bits.as_bytes());
        }
        Value::Seq(items) => {
            out.push(tag::SEQ);
            write_len(items.len(), out)?;
            for item in items {
                encode_into(item, out)?;
            }
        }
        Value::Map(map) => {
            out.push(tag::MAP);
            write_len(map.len(), out)?;
            for (key, item) in map {
                write_str(key, out)?;
                encode_into(item, out)?;
            }
        }
    }
    Ok(())
}

fn write_len(len: usize, out: &mut Vec<u8>) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| Error::Encode(format!("length {len} exceeds u32")))?;
    out.write_u32::<BigEndian>(len)?;
    Ok(())
}

fn write_str(s: &str, out: &mut Vec<u8>) -> Result<()> {
    write_len(s.len(), out)?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Decodes exactly one value spanning all of `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let mut decoder = Decoder { input: bytes, depth: 0 };
    let value = decoder.read_value()?;

    if !decoder.input.is_empty() {
        return Err(Error::Decode(format!("{} trailing bytes after value", decoder.input.len())));
    }
    Ok(value)
}

struct Decoder<'a> {
    input: &'a [u8],
    depth: usize,
}

impl<'a> Decoder<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.input.len() < n {
            return Err(Error::Decode(format!(
                "truncated payload: need {} bytes, {} left",
                n,
                self.input.len()
            )));
        }
        let (head, tail) = self.input.split_at(n);
        self.input = tail;
        Ok(head)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_len(&mut self) -> Result<usize> {
        Ok(BigEndian::read_u32(self.take(4)?) as usize)
    }

    fn read_str(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Decode(format!("invalid UTF-8 string: {e}")))
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::Decode(format!("nesting deeper than {MAX_DEPTH}")));
        }
        Ok(())
    }

    fn read_value(&mut self) -> Result<Value> {
        match self.read_u8()? {
            tag::NIL => Ok(Value::Nil),
            tag::INT => Ok(Value::Int(BigEndian::read_i64(self.take(8)?))),
            tag::FLOAT => Ok(Value::Float(BigEndian::read_f64(self.take(8)?))),
            tag::STR => Ok(Value::Str(self.read_str()?)),
            tag::BIG_INT => {
                let len = self.read_len()?;
                Ok(Value::BigInt(BigUint::from_bytes_be(self.take(len)?)))
            }
            tag::BIT_ARRAY => {
                let bit_len = self.read_len()?;
                let bytes = self.take(bit_len.div_ceil(8))?;
                Ok(Value::BitArray(BitArray::from_bytes(bytes.to_vec(), bit_len)?))
            }
            tag::SEQ => {
                self.enter()?;
                let count = self.read_len()?;
                // every value occupies at least one byte
                let mut items = Vec::with_capacity(count.min(self.input.len()));
                for _ in 0..count {
                    items.push(self.read_value()?);
                }
                self.depth -= 1;
                Ok(Value::Seq(items))
            }
            tag::MAP => {
                self.enter()?;
                let count = self.read_len()?;
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let key = self.read_str()?;
                    let item = self.read_value()?;
                    match map.entry(key) {
                        Entry::Vacant(slot) => {
                            slot.insert(item);
                        }
                        Entry::Occupied(slot) => {
                            return Err(Error::Decode(format!("duplicate map key {:?}", slot.key())));
                        }
                    }
                }
                self.depth -= 1;
                Ok(Value::Map(map))
            }
            other => Err(Error::Decode(format!("unknown tag 0x{other:02x}"))),
        }
    }
}
