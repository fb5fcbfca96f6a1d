//! Reply model: classifying a decoded frame by its message-type byte and
//! extracting typed payloads. Byte-offset arithmetic mirrors `_reply.py`
//! directly rather than going through a parser-combinator, since the layout
//! is fixed-width/length-prefixed rather than grammar-shaped.

use crate::codec::DecodedFrame;
use crate::command::Command;
use crate::constants::*;
use crate::device::Device;
use crate::error::OsdpError;

/// The reply-code table from spec §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyType {
    Ack,
    Nak,
    PdIdReport,
    PdCapabilitiesReport,
    LocalStatusReport,
    InputStatusReport,
    OutputStatusReport,
    ReaderStatusReport,
    RawReaderData,
    FormattedReaderData,
    KeypadData,
    PdCommunicationsConfigurationReport,
    BiometricData,
    BiometricMatchResult,
    CrypticData,
    InitialRMac,
    Busy,
    ManufacturerSpecific,
    /// A reply code this crate doesn't recognize; carried through instead of
    /// being rejected, so an unexpected-but-harmless PD reply doesn't sour
    /// the whole decode.
    Unknown(u8),
}

impl ReplyType {
    pub fn from_code(code: u8) -> Self {
        match code {
            REPLY_ACK => ReplyType::Ack,
            REPLY_NAK => ReplyType::Nak,
            REPLY_PD_ID_REPORT => ReplyType::PdIdReport,
            REPLY_PD_CAPABILITIES => ReplyType::PdCapabilitiesReport,
            REPLY_LOCAL_STATUS => ReplyType::LocalStatusReport,
            REPLY_INPUT_STATUS => ReplyType::InputStatusReport,
            REPLY_OUTPUT_STATUS => ReplyType::OutputStatusReport,
            REPLY_READER_STATUS => ReplyType::ReaderStatusReport,
            REPLY_RAW_READER_DATA => ReplyType::RawReaderData,
            REPLY_FORMATTED_READER_DATA => ReplyType::FormattedReaderData,
            REPLY_KEYPAD_DATA => ReplyType::KeypadData,
            REPLY_COMMS_CONFIG => ReplyType::PdCommunicationsConfigurationReport,
            REPLY_BIOMETRIC_DATA => ReplyType::BiometricData,
            REPLY_BIOMETRIC_MATCH_RESULT => ReplyType::BiometricMatchResult,
            REPLY_CRYPTIC_DATA => ReplyType::CrypticData,
            REPLY_INITIAL_RMAC => ReplyType::InitialRMac,
            REPLY_BUSY => ReplyType::Busy,
            REPLY_MANUFACTURER_SPECIFIC => ReplyType::ManufacturerSpecific,
            other => ReplyType::Unknown(other),
        }
    }
}

/// OSDP Nak error codes (spec §9: the source's duplicated
/// `DoesNotSupportSecurityBlock` disjunct is corrected to include
/// `CommunicationSecurityNotMet`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NakErrorCode {
    NoError,
    BadChecksumOrCrc,
    InvalidCommandLength,
    UnknownCommandCode,
    UnexpectedSequenceNumber,
    DoesNotSupportSecurityBlock,
    CommunicationSecurityNotMet,
    BioTypeNotSupported,
    BioFormatNotSupported,
    UnableToProcessCommand,
    Generic,
    Other(u8),
}

impl NakErrorCode {
    fn from_byte(b: u8) -> Self {
        match b {
            0x0 => NakErrorCode::NoError,
            0x1 => NakErrorCode::BadChecksumOrCrc,
            0x2 => NakErrorCode::InvalidCommandLength,
            0x3 => NakErrorCode::UnknownCommandCode,
            0x4 => NakErrorCode::UnexpectedSequenceNumber,
            0x5 => NakErrorCode::DoesNotSupportSecurityBlock,
            0x6 => NakErrorCode::CommunicationSecurityNotMet,
            0x7 => NakErrorCode::BioTypeNotSupported,
            0x8 => NakErrorCode::BioFormatNotSupported,
            0x9 => NakErrorCode::UnableToProcessCommand,
            0xFF => NakErrorCode::Generic,
            other => NakErrorCode::Other(other),
        }
    }

    /// True for the two Nak reasons that mean "give up on security for this
    /// device and re-handshake" per spec §4.5 rule 4.
    pub fn resets_security(self) -> bool {
        matches!(
            self,
            NakErrorCode::DoesNotSupportSecurityBlock | NakErrorCode::CommunicationSecurityNotMet
        )
    }
}

#[derive(Debug, Clone)]
pub struct Nak {
    pub error_code: NakErrorCode,
    pub extra_data: Vec<u8>,
}

impl Nak {
    pub fn parse(data: &[u8]) -> Result<Self, OsdpError> {
        if data.is_empty() {
            return Err(OsdpError::ShortFrame);
        }
        Ok(Nak {
            error_code: NakErrorCode::from_byte(data[0]),
            extra_data: data[1..].to_vec(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DeviceIdentification {
    pub vendor_code: [u8; 3],
    pub model_number: u8,
    pub version: u8,
    pub serial_number: u32,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub firmware_build: u8,
}

impl DeviceIdentification {
    pub fn parse(data: &[u8]) -> Result<Self, OsdpError> {
        if data.len() != 12 {
            return Err(OsdpError::ShortFrame);
        }
        Ok(DeviceIdentification {
            vendor_code: [data[0], data[1], data[2]],
            model_number: data[3],
            version: data[4],
            serial_number: u32::from_le_bytes([data[5], data[6], data[7], data[8]]),
            firmware_major: data[9],
            firmware_minor: data[10],
            firmware_build: data[11],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityFunction {
    Unknown = 0,
    ContactStatusMonitoring = 1,
    OutputControl = 2,
    CardDataFormat = 3,
    ReaderLedControl = 4,
    ReaderAudibleOutput = 5,
    ReaderTextOutput = 6,
    TimeKeeping = 7,
    CheckCharacterSupport = 8,
    CommunicationSecurity = 9,
    ReceiveBufferSize = 10,
    LargestCombinedMessageSize = 11,
    SmartCardSupport = 12,
    Readers = 13,
    Biometrics = 14,
}

impl CapabilityFunction {
    fn from_byte(b: u8) -> Self {
        match b {
            1 => Self::ContactStatusMonitoring,
            2 => Self::OutputControl,
            3 => Self::CardDataFormat,
            4 => Self::ReaderLedControl,
            5 => Self::ReaderAudibleOutput,
            6 => Self::ReaderTextOutput,
            7 => Self::TimeKeeping,
            8 => Self::CheckCharacterSupport,
            9 => Self::CommunicationSecurity,
            10 => Self::ReceiveBufferSize,
            11 => Self::LargestCombinedMessageSize,
            12 => Self::SmartCardSupport,
            13 => Self::Readers,
            14 => Self::Biometrics,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeviceCapability {
    pub function: CapabilityFunction,
    pub compliance: u8,
    pub number_of: u8,
}

#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    pub capabilities: Vec<DeviceCapability>,
}

impl DeviceCapabilities {
    pub fn parse(data: &[u8]) -> Result<Self, OsdpError> {
        if data.len() % 3 != 0 {
            return Err(OsdpError::ShortFrame);
        }
        let capabilities = data
            .chunks(3)
            .map(|chunk| DeviceCapability {
                function: CapabilityFunction::from_byte(chunk[0]),
                compliance: chunk[1],
                number_of: chunk[2],
            })
            .collect();
        Ok(DeviceCapabilities { capabilities })
    }
}

#[derive(Debug, Clone)]
pub struct LocalStatus {
    pub tamper: bool,
    pub power_failure: bool,
}

impl LocalStatus {
    pub fn parse(data: &[u8]) -> Result<Self, OsdpError> {
        if data.len() < 2 {
            return Err(OsdpError::ShortFrame);
        }
        Ok(LocalStatus {
            tamper: data[0] != 0,
            power_failure: data[1] != 0,
        })
    }
}

#[derive(Debug, Clone)]
pub struct InputStatus {
    pub statuses: Vec<bool>,
}

impl InputStatus {
    pub fn parse(data: &[u8]) -> Self {
        InputStatus {
            statuses: data.iter().map(|&b| b != 0).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputStatus {
    pub statuses: Vec<bool>,
}

impl OutputStatus {
    pub fn parse(data: &[u8]) -> Self {
        OutputStatus {
            statuses: data.iter().map(|&b| b != 0).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderTamperStatus {
    Normal,
    NotConnected,
    Tamper,
    Other(u8),
}

#[derive(Debug, Clone)]
pub struct ReaderStatus {
    pub statuses: Vec<ReaderTamperStatus>,
}

impl ReaderStatus {
    pub fn parse(data: &[u8]) -> Self {
        ReaderStatus {
            statuses: data
                .iter()
                .map(|&b| match b {
                    0x00 => ReaderTamperStatus::Normal,
                    0x01 => ReaderTamperStatus::NotConnected,
                    0x02 => ReaderTamperStatus::Tamper,
                    other => ReaderTamperStatus::Other(other),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCode {
    NotSpecified,
    Wiegand,
    Other(u8),
}

#[derive(Debug, Clone)]
pub struct RawCardData {
    pub reader_number: u8,
    pub format_code: FormatCode,
    pub bit_count: u16,
    pub data: Vec<u8>,
}

impl RawCardData {
    pub fn parse(data: &[u8]) -> Result<Self, OsdpError> {
        if data.len() < 4 {
            return Err(OsdpError::ShortFrame);
        }
        let format_code = match data[1] {
            0x0 => FormatCode::NotSpecified,
            0x1 => FormatCode::Wiegand,
            other => FormatCode::Other(other),
        };
        Ok(RawCardData {
            reader_number: data[0],
            format_code,
            bit_count: u16::from_le_bytes([data[2], data[3]]),
            data: data[4..].to_vec(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct KeypadData {
    pub reader_number: u8,
    pub bit_count: u16,
    pub data: Vec<u8>,
}

impl KeypadData {
    pub fn parse(data: &[u8]) -> Result<Self, OsdpError> {
        if data.len() < 2 {
            return Err(OsdpError::ShortFrame);
        }
        Ok(KeypadData {
            reader_number: data[0],
            bit_count: data[1] as u16,
            data: data[2..].to_vec(),
        })
    }
}

/// A classified, integrity-checked reply, with the issuing command kept
/// alongside it for address matching and reply-registry lookups.
#[derive(Debug, Clone)]
pub struct Reply {
    pub address: u8,
    pub sequence: u8,
    pub reply_type: ReplyType,
    pub payload: Vec<u8>,
    pub mac: Option<[u8; MAC_SIZE]>,
    pub is_data_correct: bool,
    pub is_secure_message: bool,
    /// The bytes the MAC is computed over: the full packet up to (but
    /// excluding) the MAC and footer.
    pub message_for_mac_generation: Vec<u8>,
    pub issuing_command_address: u8,
    /// Security control block bytes after the length/type header (empty if
    /// no SCB was present). For `InitialRMac` the first byte is the server
    /// cryptogram acceptance flag.
    pub secure_block_data: Vec<u8>,
}

impl Reply {
    /// Classifies a decoded frame against the command that elicited it.
    /// `decrypted_payload`, if the secure block type indicates Data
    /// Security, replaces `frame.payload` in the returned `Reply`.
    pub fn from_frame(frame: &DecodedFrame, issuing_command: &Command) -> Self {
        let security_block_type = frame
            .scb
            .as_ref()
            .and_then(|scb| scb.get(1))
            .copied()
            .unwrap_or(0);
        let is_secure_message = matches!(
            security_block_type,
            0x15 | 0x16 | 0x17 | 0x18 // no/with-data security, command/reply
        );

        let footer_size = if frame.control.use_crc { 2 } else { 1 };
        let mac_len = if is_secure_message { MAC_SIZE } else { 0 };
        let message_for_mac_generation =
            frame.raw[..frame.raw.len() - footer_size - mac_len].to_vec();
        let secure_block_data = frame
            .scb
            .as_ref()
            .map(|scb| scb[2.min(scb.len())..].to_vec())
            .unwrap_or_default();

        Reply {
            address: frame.address,
            sequence: frame.control.sequence,
            reply_type: ReplyType::from_code(frame.type_code),
            payload: frame.payload.clone(),
            mac: frame.mac,
            is_data_correct: true, // codec::decode already rejected bad integrity
            is_secure_message,
            message_for_mac_generation,
            issuing_command_address: issuing_command.address(),
            secure_block_data,
        }
    }

    pub fn is_valid_reply(&self) -> bool {
        self.is_data_correct && self.address == self.issuing_command_address
    }

    pub fn is_valid_mac(&self, mac: [u8; 16]) -> bool {
        match self.mac {
            Some(m) => m == mac[..MAC_SIZE],
            None => false,
        }
    }

    /// Decrypts `payload` in place using `device`'s Secure Channel, for
    /// replies whose security block type indicates Data Security.
    pub fn decrypt_payload(&mut self, device: &Device) {
        self.payload = device.secure_channel().decrypt_data(&self.payload);
    }

    /// For an `InitialRMac` reply, whether the PD accepted the server
    /// cryptogram (the first byte of the secure block data).
    pub fn cryptogram_accepted(&self) -> bool {
        self.secure_block_data.first().map(|&b| b != 0).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn classifies_ack_reply() {
        let bytes = [0x53u8, 0xFF, 0x07, 0x00, 0x02, 0x40, 0x65];
        let frame = codec::decode(&bytes, false).unwrap();
        let command = Command::OutputControlCmd {
            address: 0x7F,
            controls: vec![],
        };
        let reply = Reply::from_frame(&frame, &command);
        assert_eq!(reply.reply_type, ReplyType::Ack);
        assert!(reply.is_valid_reply());
    }

    #[test]
    fn device_identification_rejects_wrong_length() {
        assert!(DeviceIdentification::parse(&[0u8; 11]).is_err());
    }

    #[test]
    fn device_identification_parses_s1_vector() {
        // S1: RX 53 FF 13 00 03 45 A4 D9 A4 03 FF 33 00 01 70 03 00 02 87
        // header(5) + type(1) = offset 6 for payload start (no SCB here).
        let data = [
            0xA4, 0xD9, 0xA4, 0x03, 0xFF, 0x33, 0x00, 0x01, 0x70, 0x03, 0x00, 0x02,
        ];
        let id = DeviceIdentification::parse(&data).unwrap();
        assert_eq!(id.serial_number, 1879113779);
    }

    #[test]
    fn nak_resets_security_for_the_two_security_reasons() {
        assert!(NakErrorCode::DoesNotSupportSecurityBlock.resets_security());
        assert!(NakErrorCode::CommunicationSecurityNotMet.resets_security());
        assert!(!NakErrorCode::InvalidCommandLength.resets_security());
    }
}
