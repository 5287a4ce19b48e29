// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Length-prefixed framing: `[u32 BE payload length][payload]`.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::{Value, WireStats, codec};
use crate::error::{Error, Result};

/// Size of the length prefix in bytes.
pub const HEADER_LEN: usize = 4;

/// Writes `value` as one frame and returns the number of bytes put on the wire.
///
/// [`Value::Nil`] is sent as an empty frame.
pub fn write_frame<W: Write>(writer: &mut W, value: &Value, stats: &mut WireStats) -> Result<usize> {
    let payload = match value {
        Value::Nil => Vec::new(),
        other => codec::encode(other)?,
    };
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::Encode(format!("frame of {} bytes exceeds u32", payload.len())))?;

    writer.write_u32::<BigEndian>(len)?;
    writer.write_all(&payload)?;
    writer.flush()?;

    let written = HEADER_LEN + payload.len();
    stats.record_sent(written);
    Ok(written)
}

/// Reads one frame, looping over partial reads until the declared length is
/// consumed.
pub fn read_frame<R: Read>(reader: &mut R, stats: &mut WireStats) -> Result<Value> {
    let mut header = [0u8; HEADER_LEN];
    read_exact_or_framing(reader, &mut header)?;
    let len = (&header[..]).read_u32::<BigEndian>()? as usize;

    let mut payload = Vec::new();
    let received = reader.by_ref().take(len as u64).read_to_end(&mut payload)?;
    if received < len {
        return Err(Error::Framing { expected: len, received });
    }

    stats.record_received(HEADER_LEN + len);

    if payload.is_empty() {
        return Ok(Value::Nil);
    }
    codec::decode(&payload)
}

fn read_exact_or_framing<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::Framing {
                    expected: buf.len(),
                    received: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
