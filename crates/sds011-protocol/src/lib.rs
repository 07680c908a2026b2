//! SDS011 Serial Protocol
//!
//! This crate decodes the byte stream sent by an SDS011 laser dust sensor
//! and encodes the command frames that control it.
//!
//! # Protocol Overview
//!
//! Every frame starts with `0xAA` and ends with `0xAB`. The second byte
//! identifies the frame:
//!
//! - **Commands** (host → sensor, 19 bytes): `0xB4`
//! - **Measurement reports** (sensor → host, 10 bytes): `0xC0`
//! - **Acknowledgements** (sensor → host, 10 bytes): `0xC5`
//!
//! Multi-byte fields are little-endian and every frame carries an additive
//! checksum over its data bytes.
//!
//! # Example
//!
//! ```rust
//! use sds011_protocol::{encode, Command, DecodedEvent, FrameDecoder};
//!
//! // Build a command
//! let frame = encode(Command::SetReportingPeriod, Some(1)).unwrap();
//! assert_eq!(frame.len(), 19);
//!
//! // Decode sensor output byte by byte
//! let mut decoder = FrameDecoder::new();
//! let received = [0xAA, 0xC0, 0x4B, 0x00, 0x78, 0x00, 0xC6, 0xE1, 0x6A, 0xAB];
//! let mut events = Vec::new();
//! decoder.feed_all(&received, |event| events.push(event));
//! assert!(matches!(events[0], DecodedEvent::MeasurementReport { .. }));
//! ```

mod commands;
mod constants;
mod error;
mod frame;
mod responses;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use responses::*;
pub use types::*;
