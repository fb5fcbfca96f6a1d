//! Transport abstraction: a byte-stream send/receive surface with a baud-rate
//! hint, owned by exactly one Bus. Three-phase framed reads (scan-for-SOM,
//! read header, read remainder) live here so a hung line never blocks a
//! bounded buffer; each phase has its own timeout.

mod mock;
mod serial;
mod tcp;

pub use mock::MockTransport;
pub use serial::SerialTransport;
pub use tcp::{TcpClientTransport, TcpListenerTransport};

use async_trait::async_trait;
use std::time::Duration;

use crate::constants::{READ_PHASE_TIMEOUT_MS, SOM};
use crate::error::OsdpError;

#[async_trait]
pub trait Transport: Send {
    fn is_open(&self) -> bool;
    async fn open(&mut self) -> Result<(), OsdpError>;
    async fn close(&mut self) -> Result<(), OsdpError>;
    /// Baud rate hint, used only for idle-line timing (§4.5). TCP transports
    /// report a nominal value since there is no physical line to key.
    fn baud_rate(&self) -> u32;
    async fn write(&mut self, bytes: &[u8]) -> Result<(), OsdpError>;
    /// Reads up to `max_size` bytes. An empty result means timeout/closed.
    async fn read(&mut self, max_size: usize) -> Result<Vec<u8>, OsdpError>;
}

/// Reads one complete framed packet using the three-phase protocol from
/// §4.1: scan for SOM byte-by-byte (discarding noise), read the fixed header,
/// then read the remainder as dictated by the length field. Each phase has
/// its own bounded timeout so a silent or noisy line can't stall forever.
pub async fn read_framed_packet(transport: &mut dyn Transport) -> Result<Vec<u8>, OsdpError> {
    let phase_timeout = Duration::from_millis(READ_PHASE_TIMEOUT_MS);

    let mut packet = Vec::with_capacity(32);

    // Phase (a): scan for SOM.
    loop {
        let byte = tokio::time::timeout(phase_timeout, transport.read(1))
            .await
            .map_err(|_| OsdpError::ReadTimeout)??;
        if byte.is_empty() {
            return Err(OsdpError::ReadTimeout);
        }
        if byte[0] == SOM {
            packet.push(SOM);
            break;
        }
    }

    // Phase (b): read up through the length field and control byte (4 more
    // bytes: address, length-lo, length-hi, control).
    while packet.len() < 5 {
        let remaining = 5 - packet.len();
        let chunk = tokio::time::timeout(phase_timeout, transport.read(remaining))
            .await
            .map_err(|_| OsdpError::ReadTimeout)??;
        if chunk.is_empty() {
            return Err(OsdpError::ReadTimeout);
        }
        packet.extend_from_slice(&chunk);
    }

    let declared_len = u16::from_le_bytes([packet[2], packet[3]]) as usize;
    if declared_len < packet.len() {
        return Err(OsdpError::LengthMismatch {
            expected: declared_len as u16,
            actual: packet.len() as u16,
        });
    }

    // Phase (c): read the remainder per the declared length.
    while packet.len() < declared_len {
        let remaining = declared_len - packet.len();
        let chunk = tokio::time::timeout(phase_timeout, transport.read(remaining))
            .await
            .map_err(|_| OsdpError::ReadTimeout)??;
        if chunk.is_empty() {
            return Err(OsdpError::ReadTimeout);
        }
        packet.extend_from_slice(&chunk);
    }

    Ok(packet)
}
