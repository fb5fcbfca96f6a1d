//! Plain configuration structs with the spec's literal defaults (§4.5, §5,
//! §6). No persisted state: a `ControlPanel` is pure runtime, so these exist
//! only to make the timing/behavior constants overridable at construction
//! rather than hard-wired, following the teacher's plain
//! struct-plus-`Default` idiom for its own serial-port configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SCBK, LIVENESS_WINDOW_MS, POLL_TICK_MS,
    READ_PHASE_TIMEOUT_MS,
};

/// Per-device configuration supplied to `ControlPanel::add_device`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub address: u8,
    pub use_crc: bool,
    pub use_scs: bool,
    /// Secure Channel Base Key; defaults to the well-known 0x30..0x3F key
    /// used before a device has been provisioned with its own via `KeySet`.
    #[serde(default = "default_scbk")]
    pub scbk: [u8; 16],
}

fn default_scbk() -> [u8; 16] {
    DEFAULT_SCBK
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: 0,
            use_crc: false,
            use_scs: false,
            scbk: DEFAULT_SCBK,
        }
    }
}

/// Which concrete `Transport` a Bus should be built over. Plain data: the
/// core never reads this itself (it takes a `Box<dyn Transport>` at
/// `start_connection`), but an embedding application commonly wants to
/// carry the choice alongside the rest of a Bus's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransportConfig {
    Serial { port: String, baud_rate: u32 },
    TcpClient { addr: String },
    TcpListener { bind_addr: String },
}

/// Per-Bus configuration: transport selection, the default per-device
/// `use_crc`/`use_scs` a caller can start from when adding devices, and the
/// spec-literal timing constants (§4.5/§5) appropriate for an RS-485 line at
/// typical OSDP baud rates; a caller tuning for an unusually slow or noisy
/// link can override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    pub transport: TransportConfig,
    pub default_use_crc: bool,
    pub default_use_scs: bool,
    pub poll_tick_ms: u64,
    pub read_phase_timeout_ms: u64,
    pub liveness_window_ms: u64,
}

impl BusConfig {
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            ..Self::default_with_transport()
        }
    }

    fn default_with_transport() -> Self {
        Self {
            transport: TransportConfig::Serial {
                port: String::new(),
                baud_rate: 9600,
            },
            default_use_crc: false,
            default_use_scs: false,
            poll_tick_ms: POLL_TICK_MS,
            read_phase_timeout_ms: READ_PHASE_TIMEOUT_MS,
            liveness_window_ms: LIVENESS_WINDOW_MS,
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::default_with_transport()
    }
}

/// Control-panel-wide configuration: currently just the synchronous request
/// timeout (§4.6), since Bus- and Device-level settings live in
/// [`BusConfig`]/[`DeviceConfig`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OsdpConfig {
    pub request_timeout_ms: u64,
}

impl Default for OsdpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_config_defaults_to_well_known_scbk() {
        let config = DeviceConfig::default();
        assert_eq!(config.scbk, DEFAULT_SCBK);
        assert!(!config.use_crc);
        assert!(!config.use_scs);
    }

    #[test]
    fn bus_config_defaults_match_spec_constants() {
        let config = BusConfig::default();
        assert_eq!(config.poll_tick_ms, POLL_TICK_MS);
        assert_eq!(config.liveness_window_ms, LIVENESS_WINDOW_MS);
    }

    #[test]
    fn osdp_config_round_trips_through_json() {
        let config = OsdpConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: OsdpConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.request_timeout_ms, config.request_timeout_ms);
    }
}
