//! Byte-exact OSDP frame encode/decode.
//!
//! Frame layout (all multi-byte fields little-endian):
//! `SOM | address | length(2) | control | [SCB] | type | payload | [MAC(4)] | CRC(2)|checksum(1)`
//!
//! The writer populates length BEFORE computing the integrity footer; the
//! reverse order would corrupt the length field undetectably.

use bytes::BytesMut;

use crate::codec::crc::{checksum, crc16};
use crate::constants::{ADDRESS_MASK, MAC_SIZE, REPLY_ADDRESS_BIT, SOM};
use crate::error::OsdpError;

/// Control byte bit layout: sequence in bits 0-1, use_crc bit 2, has_scb bit 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlByte {
    pub sequence: u8,
    pub use_crc: bool,
    pub has_scb: bool,
}

impl ControlByte {
    pub fn to_byte(self) -> u8 {
        (self.sequence & 0x03) | ((self.use_crc as u8) << 2) | ((self.has_scb as u8) << 3)
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            sequence: byte & 0x03,
            use_crc: byte & 0x04 != 0,
            has_scb: byte & 0x08 != 0,
        }
    }
}

/// A decoded, integrity-checked packet. The security control block, MAC and
/// message type byte are exposed raw; `reply`/`command` layers interpret them.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub address: u8,
    pub is_reply: bool,
    pub control: ControlByte,
    pub scb: Option<Vec<u8>>,
    pub type_code: u8,
    pub payload: Vec<u8>,
    pub mac: Option<[u8; MAC_SIZE]>,
    /// The full packet bytes, used by the secure channel to recompute MACs
    /// over the exact on-the-wire message.
    pub raw: Vec<u8>,
    /// Start offset of `type_code` within `raw` (header size + SCB length).
    pub message_offset: usize,
}

/// Assembles a complete framed packet (without the leading driver byte).
///
/// `scb` is the security control block bytes (if any), `type_code` the
/// command/reply code, `body` the (possibly already-encrypted) payload, and
/// `mac` the 4-byte running MAC, present only within a secure session.
#[allow(clippy::too_many_arguments)]
pub fn encode(
    address: u8,
    is_reply: bool,
    control: ControlByte,
    scb: Option<&[u8]>,
    type_code: u8,
    body: &[u8],
    mac: Option<[u8; MAC_SIZE]>,
) -> Vec<u8> {
    let footer_size = if control.use_crc { 2 } else { 1 };
    let mac_size = if mac.is_some() { MAC_SIZE } else { 0 };
    let scb_len = scb.map_or(0, |s| s.len());

    let total_len = 1 + 1 + 2 + 1 + scb_len + 1 + body.len() + mac_size + footer_size;

    let mut packet = BytesMut::with_capacity(total_len);
    packet.extend_from_slice(&[SOM]);
    packet.extend_from_slice(&[if is_reply {
        (address & ADDRESS_MASK) | REPLY_ADDRESS_BIT
    } else {
        address & ADDRESS_MASK
    }]);
    packet.extend_from_slice(&(total_len as u16).to_le_bytes());
    packet.extend_from_slice(&[control.to_byte()]);
    if let Some(scb) = scb {
        packet.extend_from_slice(scb);
    }
    packet.extend_from_slice(&[type_code]);
    packet.extend_from_slice(body);
    if let Some(mac) = mac {
        packet.extend_from_slice(&mac);
    }

    if control.use_crc {
        let crc = crc16(&packet);
        packet.extend_from_slice(&crc.to_le_bytes());
    } else {
        let cs = checksum(&packet);
        packet.extend_from_slice(&[cs]);
    }

    packet.to_vec()
}

/// Parses and integrity-checks a complete packet (without the driver byte).
///
/// `has_scb`/`scb_len` and whether the message is within a secure session
/// (hence carries a trailing MAC) must be known from the Device's current
/// control-byte/session state before the packet can be fully decoded, since
/// the wire format alone does not self-describe the MAC's presence.
pub fn decode(bytes: &[u8], expect_mac: bool) -> Result<DecodedFrame, OsdpError> {
    if bytes.len() < 6 {
        return Err(OsdpError::ShortFrame);
    }
    if bytes[0] != SOM {
        return Err(OsdpError::BadSom { got: bytes[0] });
    }

    let address_byte = bytes[1];
    let is_reply = address_byte & REPLY_ADDRESS_BIT != 0;
    let address = address_byte & ADDRESS_MASK;

    let declared_len = u16::from_le_bytes([bytes[2], bytes[3]]);
    if declared_len as usize != bytes.len() {
        return Err(OsdpError::LengthMismatch {
            expected: declared_len,
            actual: bytes.len() as u16,
        });
    }

    let control = ControlByte::from_byte(bytes[4]);
    let footer_size = if control.use_crc { 2 } else { 1 };
    let mac_size = if expect_mac { MAC_SIZE } else { 0 };

    if bytes.len() < 5 + footer_size + mac_size + 1 {
        return Err(OsdpError::ShortFrame);
    }

    let body_end = bytes.len() - footer_size - mac_size;

    if control.use_crc {
        let expected = u16::from_le_bytes([bytes[body_end + mac_size], bytes[body_end + mac_size + 1]]);
        let calculated = crc16(&bytes[..body_end + mac_size]);
        if expected != calculated {
            return Err(OsdpError::BadCrc { expected, calculated });
        }
    } else {
        let expected = bytes[body_end + mac_size];
        let calculated = checksum(&bytes[..body_end + mac_size]);
        if expected != calculated {
            return Err(OsdpError::BadChecksum { expected, calculated });
        }
    }

    let mut offset = 5;
    let scb = if control.has_scb {
        let scb_len = bytes[offset] as usize;
        if offset + scb_len > body_end {
            return Err(OsdpError::ShortFrame);
        }
        let scb_bytes = bytes[offset..offset + scb_len].to_vec();
        offset += scb_len;
        Some(scb_bytes)
    } else {
        None
    };

    if offset >= body_end {
        return Err(OsdpError::ShortFrame);
    }
    let type_code = bytes[offset];
    let message_offset = offset;
    offset += 1;

    let payload = bytes[offset..body_end].to_vec();

    let mac = if expect_mac {
        let mut m = [0u8; MAC_SIZE];
        m.copy_from_slice(&bytes[body_end..body_end + MAC_SIZE]);
        Some(m)
    } else {
        None
    };

    Ok(DecodedFrame {
        address,
        is_reply,
        control,
        scb,
        type_code,
        payload,
        mac,
        raw: bytes.to_vec(),
        message_offset,
    })
}
