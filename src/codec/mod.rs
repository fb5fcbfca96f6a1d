//! Packet framing: length-prefixed header, optional security control block,
//! CRC-16/checksum integrity footer.

pub mod crc;
pub mod frame;

pub use frame::{decode, encode, ControlByte, DecodedFrame};
