//! OSDP protocol constants: frame markers, command/reply codes, security
//! control block bytes, and the CRC/checksum parameters from the wire spec.

/// Start-of-message byte, fixed for every OSDP frame.
pub const SOM: u8 = 0x53;

/// Leading byte prepended to every outbound packet to key half-duplex
/// RS-485 line transceivers. Never part of the framed/CRC'd packet itself.
pub const DRIVER_BYTE: u8 = 0xFF;

/// High bit set on a PD address when echoed back in a reply.
pub const REPLY_ADDRESS_BIT: u8 = 0x80;
pub const ADDRESS_MASK: u8 = 0x7F;

// ---------------------------------------------------------------------------
// Command codes (CP -> PD)
// ---------------------------------------------------------------------------

pub const CMD_POLL: u8 = 0x60;
pub const CMD_ID_REPORT: u8 = 0x61;
pub const CMD_DEVICE_CAPABILITIES: u8 = 0x62;
pub const CMD_LOCAL_STATUS_REPORT: u8 = 0x64;
pub const CMD_INPUT_STATUS_REPORT: u8 = 0x65;
pub const CMD_OUTPUT_STATUS_REPORT: u8 = 0x66;
pub const CMD_READER_STATUS_REPORT: u8 = 0x67;
pub const CMD_OUTPUT_CONTROL: u8 = 0x68;
pub const CMD_READER_LED_CONTROL: u8 = 0x69;
pub const CMD_READER_BUZZER_CONTROL: u8 = 0x6A;
pub const CMD_READER_TEXT_OUTPUT: u8 = 0x6B;
pub const CMD_SET_DATE_TIME: u8 = 0x6D;
pub const CMD_KEY_SET: u8 = 0x75;
pub const CMD_SECURITY_INITIALIZATION_REQUEST: u8 = 0x76;
pub const CMD_SERVER_CRYPTOGRAM: u8 = 0x77;
pub const CMD_MANUFACTURER_SPECIFIC: u8 = 0x80;

// ---------------------------------------------------------------------------
// Reply codes (PD -> CP)
// ---------------------------------------------------------------------------

pub const REPLY_ACK: u8 = 0x40;
pub const REPLY_NAK: u8 = 0x41;
pub const REPLY_PD_ID_REPORT: u8 = 0x45;
pub const REPLY_PD_CAPABILITIES: u8 = 0x46;
pub const REPLY_LOCAL_STATUS: u8 = 0x48;
pub const REPLY_INPUT_STATUS: u8 = 0x49;
pub const REPLY_OUTPUT_STATUS: u8 = 0x4A;
pub const REPLY_READER_STATUS: u8 = 0x4B;
pub const REPLY_RAW_READER_DATA: u8 = 0x50;
pub const REPLY_FORMATTED_READER_DATA: u8 = 0x51;
pub const REPLY_KEYPAD_DATA: u8 = 0x53;
pub const REPLY_COMMS_CONFIG: u8 = 0x54;
pub const REPLY_BIOMETRIC_DATA: u8 = 0x57;
pub const REPLY_BIOMETRIC_MATCH_RESULT: u8 = 0x58;
pub const REPLY_CRYPTIC_DATA: u8 = 0x76;
pub const REPLY_INITIAL_RMAC: u8 = 0x78;
pub const REPLY_BUSY: u8 = 0x79;
pub const REPLY_MANUFACTURER_SPECIFIC: u8 = 0x90;

// ---------------------------------------------------------------------------
// Security Control Block bytes
// ---------------------------------------------------------------------------

/// SCB for a command that carries no data payload.
pub const SCB_NO_DATA: [u8; 2] = [0x02, 0x15];
/// SCB for a command that carries a data payload (clear or encrypted).
pub const SCB_WITH_DATA: [u8; 2] = [0x02, 0x17];
/// SCB on a reply carrying no data.
pub const SCB_REPLY_NO_DATA: [u8; 2] = [0x02, 0x16];
/// SCB on a reply carrying data.
pub const SCB_REPLY_WITH_DATA: [u8; 2] = [0x02, 0x18];
/// SCB for `SecurityInitializationRequestCommand`.
pub const SCB_SEC_INIT: [u8; 3] = [0x03, 0x11, 0x00];
/// SCB for `ServerCryptogramCommand`.
pub const SCB_SERVER_CRYPT: [u8; 3] = [0x03, 0x13, 0x00];

/// Security block type byte identifying an encrypted-payload reply.
pub const SECURITY_BLOCK_TYPE_REPLY_WITH_DATA_SECURITY: u8 = 0x18;

// ---------------------------------------------------------------------------
// Secure Channel
// ---------------------------------------------------------------------------

/// Default Secure Channel Base Key, used when a Device is added without an
/// explicit key: the sixteen bytes 0x30..0x3F.
pub const DEFAULT_SCBK: [u8; 16] = [
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F,
];

pub const AES_BLOCK_SIZE: usize = 16;
pub const MAC_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// Checksum / CRC
// ---------------------------------------------------------------------------

/// CRC-16/X.25 polynomial.
pub const CRC_POLY: u16 = 0x1021;
/// CRC-16/X.25 initial value used by OSDP (not the usual 0xFFFF).
pub const CRC_INIT: u16 = 0x1D0F;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Bus polling tick period.
pub const POLL_TICK_MS: u64 = 100;
/// Default timeout for a synchronous Control Panel request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// Window after which a Device without a valid reply is considered offline.
pub const LIVENESS_WINDOW_MS: u64 = 5_000;
/// Recommended per-phase transport read timeout.
pub const READ_PHASE_TIMEOUT_MS: u64 = 2_000;
