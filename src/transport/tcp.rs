//! OSDP-over-TCP transports: a client dialing out to a PD's TCP listener,
//! and a listener for the reverse case where the PD dials the CP. Baud rate
//! has no physical meaning here; a nominal value is reported for the
//! idle-line-delay calculation in §4.5.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::OsdpError;
use crate::transport::Transport;

/// Nominal baud used for OSDP-over-TCP idle-line timing; there is no
/// physical line to key, but the Bus loop still wants a sane inter-poll gap.
const NOMINAL_TCP_BAUD: u32 = 9600;

pub struct TcpClientTransport {
    addr: String,
    stream: Option<TcpStream>,
}

impl TcpClientTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
        }
    }
}

#[async_trait]
impl Transport for TcpClientTransport {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn open(&mut self) -> Result<(), OsdpError> {
        self.stream = Some(TcpStream::connect(&self.addr).await?);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), OsdpError> {
        self.stream = None;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        NOMINAL_TCP_BAUD
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), OsdpError> {
        let stream = self.stream.as_mut().ok_or(OsdpError::NotOpen)?;
        stream.write_all(bytes).await?;
        Ok(())
    }

    async fn read(&mut self, max_size: usize) -> Result<Vec<u8>, OsdpError> {
        let stream = self.stream.as_mut().ok_or(OsdpError::NotOpen)?;
        let mut buf = vec![0u8; max_size];
        let n = stream.read(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// Accepts a single inbound connection and exposes it as a `Transport`.
/// Arbitrating multiple simultaneous inbound connections on one Bus is out
/// of scope; a second `accept` after `open` simply replaces the first peer.
pub struct TcpListenerTransport {
    bind_addr: String,
    listener: Option<TcpListener>,
    stream: Option<TcpStream>,
}

impl TcpListenerTransport {
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            listener: None,
            stream: None,
        }
    }
}

#[async_trait]
impl Transport for TcpListenerTransport {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn open(&mut self) -> Result<(), OsdpError> {
        if self.listener.is_none() {
            self.listener = Some(TcpListener::bind(&self.bind_addr).await?);
        }
        let listener = self.listener.as_ref().expect("listener just set");
        let (stream, _peer) = listener.accept().await?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), OsdpError> {
        self.stream = None;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        NOMINAL_TCP_BAUD
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), OsdpError> {
        let stream = self.stream.as_mut().ok_or(OsdpError::NotOpen)?;
        stream.write_all(bytes).await?;
        Ok(())
    }

    async fn read(&mut self, max_size: usize) -> Result<Vec<u8>, OsdpError> {
        let stream = self.stream.as_mut().ok_or(OsdpError::NotOpen)?;
        let mut buf = vec![0u8; max_size];
        let n = stream.read(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }
}
