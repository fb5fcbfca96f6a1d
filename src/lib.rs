//! # osdp-rs — Open Supervised Device Protocol, control-panel side
//!
//! A control-panel (master) implementation of OSDP v2: a Bus polling engine
//! polls one or more Peripheral Devices (PDs) over a half-duplex serial or
//! TCP-tunnelled link, issuing access-control commands and retrieving
//! status/card/keypad events, with an optional per-device Secure Channel
//! Session (AES-128 MAC + encryption).
//!
//! ## Layering
//!
//! - [`codec`] — byte-exact frame encode/decode, CRC-16/checksum footers.
//! - [`secure_channel`] — AES-128 key derivation, CBC-MAC chain, payload
//!   encryption, and the handshake state machine.
//! - [`device`] — per-PD session: sequence discipline, pending command
//!   queue, liveness, Secure Channel ownership.
//! - [`command`] / [`reply`] — the tagged command/reply model.
//! - [`bus`] — the polling loop tying one Transport to a set of Devices.
//! - [`control_panel`] — the multi-Bus façade with a synchronous
//!   request/reply API and typed event callbacks.
//! - [`transport`] — the Transport trait and its serial/TCP/mock
//!   implementations.
//!
//! ## Usage
//!
//! ```no_run
//! # async fn demo() -> Result<(), osdp_rs::error::OsdpError> {
//! use osdp_rs::control_panel::ControlPanel;
//! use osdp_rs::transport::SerialTransport;
//!
//! let cp = ControlPanel::new();
//! let bus_id = cp.start_connection(Box::new(SerialTransport::new("/dev/ttyUSB0", 9600))).await;
//! cp.add_device(bus_id, 0x7F, false, false).await;
//! let id = cp.id_report(bus_id, 0x7F).await?;
//! println!("serial number: {}", id.serial_number);
//! cp.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod codec;
pub mod command;
pub mod config;
pub mod constants;
pub mod control_panel;
pub mod device;
pub mod error;
pub mod logging;
pub mod reply;
pub mod secure_channel;
pub mod transport;
pub mod util;

pub use crate::error::OsdpError;
pub use crate::logging::{init_logger, log_info};
