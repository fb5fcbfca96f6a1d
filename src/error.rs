//! Crate-wide error taxonomy.
//!
//! Variant groups mirror the failure kinds that are actually surfaced to a
//! caller: frame and security errors that the Bus loop recovers from locally
//! (drop-and-retry, reset-security-and-rehandshake) are logged at the
//! recovery site rather than propagated — see `bus::Bus::process_reply`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OsdpError {
    // -- Transport --
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport is not open")]
    NotOpen,

    #[error("timed out waiting for transport read")]
    ReadTimeout,

    #[error("connection closed")]
    ConnectionClosed,

    // -- Frame / codec --
    #[error("frame shorter than minimum header length")]
    ShortFrame,

    #[error("bad start-of-message byte: 0x{got:02X}")]
    BadSom { got: u8 },

    #[error("packet length mismatch: header said {expected}, got {actual}")]
    LengthMismatch { expected: u16, actual: u16 },

    #[error("bad CRC: expected 0x{expected:04X}, calculated 0x{calculated:04X}")]
    BadCrc { expected: u16, calculated: u16 },

    #[error("bad checksum: expected 0x{expected:02X}, calculated 0x{calculated:02X}")]
    BadChecksum { expected: u8, calculated: u8 },

    #[error("reply address 0x{got:02X} does not match issuing command address 0x{expected:02X}")]
    AddressMismatch { expected: u8, got: u8 },

    // -- Secure channel --
    #[error("client cryptogram did not match expected value")]
    BadClientCryptogram,

    #[error("PD rejected the server cryptogram")]
    CryptogramRejected,

    #[error("MAC mismatch on secure reply")]
    MacMismatch,

    #[error("secure channel is not established")]
    SecureChannelNotEstablished,

    // -- Request lifecycle --
    #[error("request timed out waiting for a matching reply")]
    RequestTimeout,

    #[error("no device configured at address {address}")]
    UnknownDevice { address: u8 },

    #[error("no bus with id {0:?}")]
    BusNotFound(crate::control_panel::BusId),

    #[error("PD returned Nak: {0:?}")]
    Nak(crate::reply::NakErrorCode),
}

pub type Result<T> = std::result::Result<T, OsdpError>;
