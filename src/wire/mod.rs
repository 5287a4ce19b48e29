// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-describing binary messages over a byte stream.

pub mod codec;
pub mod frame;
mod stats;
mod value;

pub use codec::{decode, encode};
pub use frame::{read_frame, write_frame};
pub use stats::WireStats;
pub use value::Value;
