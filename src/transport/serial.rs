//! RS-485/RS-232 serial transport. Baud rate and read timeout follow the
//! standard OSDP profile; unlike the polling engine's own per-phase timeout,
//! this is the OS-level read timeout on the underlying port.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;

use crate::error::OsdpError;
use crate::transport::Transport;

pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    timeout: Duration,
    port: Option<tokio_serial::SerialStream>,
}

impl SerialTransport {
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            timeout: Duration::from_secs(2),
            port: None,
        }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn open(&mut self) -> Result<(), OsdpError> {
        let port = tokio_serial::new(&self.port_name, self.baud_rate)
            .timeout(self.timeout)
            .open_native_async()
            .map_err(|e| OsdpError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        self.port = Some(port);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), OsdpError> {
        self.port = None;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), OsdpError> {
        let port = self.port.as_mut().ok_or(OsdpError::NotOpen)?;
        port.write_all(bytes).await?;
        port.flush().await?;
        Ok(())
    }

    async fn read(&mut self, max_size: usize) -> Result<Vec<u8>, OsdpError> {
        let port = self.port.as_mut().ok_or(OsdpError::NotOpen)?;
        let mut buf = vec![0u8; max_size];
        let n = port.read(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }
}
