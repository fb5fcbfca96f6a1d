//! An in-memory scripted transport for Bus-loop and end-to-end scenario
//! tests: callers queue the bytes a PD would have sent, then inspect what
//! the Bus wrote. Grounded on the teacher's mock serial port, simplified to
//! this crate's explicit read/write `Transport` surface instead of
//! `AsyncRead`/`AsyncWrite` polling.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::OsdpError;
use crate::transport::Transport;

#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    open: bool,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                open: true,
                rx: VecDeque::new(),
                tx: Vec::new(),
            })),
        }
    }

    /// Queues bytes to be returned by subsequent `read` calls, as if a PD
    /// had sent them.
    pub fn queue_rx(&self, bytes: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.rx.extend(bytes.iter().copied());
    }

    /// Returns (and clears) everything written so far, for assertion against
    /// an expected on-the-wire packet.
    pub fn take_tx(&self) -> Vec<u8> {
        let mut inner = self.inner.lock().unwrap();
        std::mem::take(&mut inner.tx)
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn is_open(&self) -> bool {
        self.inner.lock().unwrap().open
    }

    async fn open(&mut self) -> Result<(), OsdpError> {
        self.inner.lock().unwrap().open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), OsdpError> {
        self.inner.lock().unwrap().open = false;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        9600
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), OsdpError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.open {
            return Err(OsdpError::NotOpen);
        }
        inner.tx.extend_from_slice(bytes);
        Ok(())
    }

    async fn read(&mut self, max_size: usize) -> Result<Vec<u8>, OsdpError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.open {
            return Err(OsdpError::NotOpen);
        }
        let take = max_size.min(inner.rx.len());
        let out: Vec<u8> = inner.rx.drain(..take).collect();
        Ok(out)
    }
}
