//! The Bus polling engine: owns one Transport and a set of Devices, and runs
//! the single logical loop described in spec §4.5 — pick the next command
//! per device, send it, read the reply, validate it, route it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};

use crate::codec;
use crate::command::Command;
use crate::constants::{DRIVER_BYTE, POLL_TICK_MS};
use crate::control_panel::BusId;
use crate::device::Device;
use crate::error::OsdpError;
use crate::logging::{log_debug, log_warn};
use crate::reply::{Reply, ReplyType};
use crate::transport::{read_framed_packet, Transport};
use crate::util::LogThrottle;

/// Keyed by address in a `BTreeMap` rather than a `HashMap` so a Bus's
/// per-tick device snapshot always walks devices in ascending address
/// order — deterministic polling order, not an artifact of hash iteration.
pub type DeviceTable = Arc<Mutex<BTreeMap<u8, Device>>>;

/// A running Bus: the device table and shutdown flag are shared with the
/// spawned polling task, so the Control Panel façade can mutate the table
/// and close the bus from outside the loop.
pub struct Bus {
    pub id: BusId,
    devices: DeviceTable,
    shutdown: Arc<AtomicBool>,
}

impl Bus {
    pub fn new(id: BusId) -> Self {
        Self {
            id,
            devices: Arc::new(Mutex::new(BTreeMap::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn devices(&self) -> DeviceTable {
        self.devices.clone()
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn close(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub async fn add_device(&self, address: u8, use_crc: bool, use_scs: bool) {
        let mut devices = self.devices.lock().await;
        devices.insert(address, Device::new(address, use_crc, use_scs));
    }

    /// Adds a device provisioned with a caller-supplied Secure Channel Base
    /// Key, rather than the well-known default (spec §9: `KeySet`'s SCBK
    /// must be a parameter, never hard-coded — the same applies here).
    pub async fn add_device_with_scbk(&self, address: u8, use_crc: bool, use_scs: bool, scbk: [u8; 16]) {
        let mut devices = self.devices.lock().await;
        devices.insert(address, Device::with_scbk(address, use_crc, use_scs, scbk));
    }

    pub async fn remove_device(&self, address: u8) {
        let mut devices = self.devices.lock().await;
        devices.remove(&address);
    }

    pub async fn is_online(&self, address: u8) -> bool {
        let devices = self.devices.lock().await;
        devices.get(&address).map(|d| d.is_online()).unwrap_or(false)
    }

    pub async fn send_command(&self, command: Command) {
        let devices = self.devices.lock().await;
        match devices.get(&command.address()) {
            Some(device) => device.enqueue(command),
            None => log_warn(&format!("device not found at address {}", command.address())),
        }
    }
}

/// Idle-line delay: enough inter-character gap for a half-duplex RS-485 PD
/// to release the line after replying.
fn idle_line_delay(baud_rate: u32) -> Duration {
    let ms = (1000.0 / baud_rate as f64) * 16.0 * 100.0;
    Duration::from_millis(ms.round() as u64)
}

/// The polling loop body, spawned as an independent task by
/// `ControlPanel::start_connection`. Runs until `shutdown` is set.
pub async fn run_polling_loop(
    mut transport: Box<dyn Transport>,
    devices: DeviceTable,
    shutdown: Arc<AtomicBool>,
    reply_tx: mpsc::UnboundedSender<Reply>,
) {
    let mut last_send = Instant::now() - Duration::from_secs(3600);
    // Caps how many frame-drop lines a noisy line can emit per second; a PD
    // stuck retransmitting garbage shouldn't flood the log at tick frequency.
    let mut drop_throttle = LogThrottle::new(1_000, 5);

    while !shutdown.load(Ordering::SeqCst) {
        if !transport.is_open() {
            if let Err(e) = transport.open().await {
                log_warn(&format!("error opening transport: {e}"));
            }
        }

        let elapsed = last_send.elapsed();
        let tick = Duration::from_millis(POLL_TICK_MS);
        if elapsed < tick {
            tokio::time::sleep(tick - elapsed).await;
        }

        let addresses: Vec<u8> = {
            let table = devices.lock().await;
            table.keys().copied().collect()
        };
        if addresses.is_empty() {
            last_send = Instant::now();
            continue;
        }

        for address in addresses {
            let command = {
                let mut table = devices.lock().await;
                match table.get_mut(&address) {
                    Some(device) => device.next_command(),
                    None => continue,
                }
            };

            let baud = transport.baud_rate();
            last_send = Instant::now();

            let result = send_command_and_receive_reply(&mut transport, &devices, address, &command).await;
            match result {
                Ok(Some(reply)) => {
                    let mut table = devices.lock().await;
                    if let Some(device) = table.get_mut(&address) {
                        process_reply(&reply, device);
                    }
                    let _ = reply_tx.send(reply);
                }
                Ok(None) => {}
                Err(e) => {
                    if drop_throttle.allow() {
                        log_debug(&format!("error on device {address}: {e}"));
                    }
                    let _ = transport.close().await;
                    continue;
                }
            }

            tokio::time::sleep(idle_line_delay(baud)).await;
        }
    }

    let _ = transport.close().await;
}

async fn send_command_and_receive_reply(
    transport: &mut Box<dyn Transport>,
    devices: &DeviceTable,
    address: u8,
    command: &Command,
) -> Result<Option<Reply>, OsdpError> {
    let mut packet = vec![DRIVER_BYTE];
    let expect_mac = {
        let mut table = devices.lock().await;
        let device = table.get_mut(&address).ok_or(OsdpError::UnknownDevice { address })?;
        packet.extend(command.encode(device));
        device.is_security_established()
    };

    log_debug(&format!("tx: {}", hex(&packet)));
    transport.write(&packet).await?;

    let raw = read_framed_packet(transport.as_mut()).await?;
    log_debug(&format!("rx: {}", hex(&raw)));

    let frame = codec::decode(&raw, expect_mac)?;

    let mut table = devices.lock().await;
    let device = table.get_mut(&address).ok_or(OsdpError::UnknownDevice { address })?;

    let mut reply = Reply::from_frame(&frame, command);
    if reply.address != command.address() {
        return Ok(None);
    }
    if frame.scb.as_ref().and_then(|s| s.get(1)).copied()
        == Some(crate::constants::SECURITY_BLOCK_TYPE_REPLY_WITH_DATA_SECURITY)
    {
        reply.decrypt_payload(device);
    }

    Ok(Some(reply))
}

/// Implements spec §4.5's `process_reply` rules 1-6; rule 7 (forwarding to
/// the Control Panel's listener) is the caller's job via `reply_tx`.
pub fn process_reply(reply: &Reply, device: &mut Device) {
    if !reply.is_valid_reply() {
        return;
    }

    if reply.is_secure_message {
        let mac = device.generate_mac(&reply.message_for_mac_generation, false);
        if !reply.is_valid_mac(mac) {
            device.reset_security();
            return;
        }
    }

    if reply.reply_type != ReplyType::Busy {
        device.on_valid_reply();
    }

    if reply.reply_type == ReplyType::Nak {
        if let Ok(nak) = crate::reply::Nak::parse(&reply.payload) {
            if nak.error_code.resets_security() {
                device.reset_security();
            }
        }
    }

    if reply.reply_type == ReplyType::CrypticData && reply.payload.len() >= 32 {
        let client_random: [u8; 8] = reply.payload[8..16].try_into().unwrap();
        let client_cryptogram: [u8; 16] = reply.payload[16..32].try_into().unwrap();
        if let Err(e) = device.initialize_secure_channel(client_random, client_cryptogram) {
            log_debug(&format!("secure channel initialize failed: {e}"));
        }
    } else if reply.reply_type == ReplyType::InitialRMac
        && reply.cryptogram_accepted()
        && reply.payload.len() >= 16
    {
        let r_mac0: [u8; 16] = reply.payload[..16].try_into().unwrap();
        device.establish_secure_channel(r_mac0);
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}
