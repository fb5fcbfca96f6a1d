//! Command model: one tagged variant per OSDP command, each carrying its own
//! address and clear-text payload. `Command::encode` assembles the full wire
//! frame, delegating to the Device's control byte and Secure Channel for the
//! secure-session case.

use chrono::{Datelike, Timelike};

use crate::codec;
use crate::constants::*;
use crate::device::Device;
use crate::reply::ReplyType;

/// Output relay control action, per OSDP `OutputControlCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputControlCode {
    Nop = 0x00,
    PermanentOffAbortTimed = 0x01,
    PermanentOnAbortTimed = 0x02,
    PermanentOffAllowTimed = 0x03,
    PermanentOnAllowTimed = 0x04,
    TemporaryOnResumePermanent = 0x05,
    TemporaryOffResumePermanent = 0x06,
}

#[derive(Debug, Clone, Copy)]
pub struct OutputControl {
    pub output_number: u8,
    pub control_code: OutputControlCode,
    pub timer: u16,
}

impl OutputControl {
    fn encode(&self) -> [u8; 4] {
        let t = self.timer.to_le_bytes();
        [self.output_number, self.control_code as u8, t[0], t[1]]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporaryReaderControlCode {
    Nop = 0x00,
    CancelTemporaryDisplayPermanent = 0x01,
    SetTemporaryAndStartTimer = 0x02,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermanentReaderControlCode {
    Nop = 0x00,
    SetPermanentState = 0x02,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Black = 0,
    Red = 1,
    Green = 2,
    Amber = 3,
    Blue = 4,
}

#[derive(Debug, Clone, Copy)]
pub struct ReaderLedControl {
    pub reader_number: u8,
    pub led_number: u8,
    pub temporary_mode: TemporaryReaderControlCode,
    pub temporary_on_time: u8,
    pub temporary_off_time: u8,
    pub temporary_on_color: LedColor,
    pub temporary_off_color: LedColor,
    pub temporary_timer: u16,
    pub permanent_mode: PermanentReaderControlCode,
    pub permanent_on_time: u8,
    pub permanent_off_time: u8,
    pub permanent_on_color: LedColor,
    pub permanent_off_color: LedColor,
}

impl ReaderLedControl {
    fn encode(&self) -> [u8; 14] {
        let t = self.temporary_timer.to_le_bytes();
        [
            self.reader_number,
            self.led_number,
            self.temporary_mode as u8,
            self.temporary_on_time,
            self.temporary_off_time,
            self.temporary_on_color as u8,
            self.temporary_off_color as u8,
            t[0],
            t[1],
            self.permanent_mode as u8,
            self.permanent_on_time,
            self.permanent_off_time,
            self.permanent_on_color as u8,
            self.permanent_off_color as u8,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneCode {
    NoTone = 0,
    Off = 1,
    DefaultTone = 2,
    Tbd = 3,
}

#[derive(Debug, Clone, Copy)]
pub struct ReaderBuzzerControl {
    pub reader_number: u8,
    pub tone_code: ToneCode,
    pub on_time: u8,
    pub off_time: u8,
    pub count: u8,
}

impl ReaderBuzzerControl {
    fn encode(&self) -> [u8; 5] {
        [
            self.reader_number,
            self.tone_code as u8,
            self.on_time,
            self.off_time,
            self.count,
        ]
    }
}

/// Text command codes. The original source duplicates 0x02 between
/// `PermanentTextWithWrap` and `TempTextNoWrap`; per spec these are resolved
/// to PermanentTextWithWrap=0x02, TempTextNoWrap=0x03, TempTextWithWrap=0x04.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCommand {
    PermanentTextNoWrap = 0x01,
    PermanentTextWithWrap = 0x02,
    TempTextNoWrap = 0x03,
    TempTextWithWrap = 0x04,
}

#[derive(Debug, Clone)]
pub struct ReaderTextOutput {
    pub reader_number: u8,
    pub text_command: TextCommand,
    pub temp_text_time: u8,
    pub row: u8,
    pub column: u8,
    pub text: String,
}

impl ReaderTextOutput {
    fn encode(&self) -> Vec<u8> {
        let mut out = vec![
            self.reader_number,
            self.text_command as u8,
            self.temp_text_time,
            self.row,
            self.column,
            self.text.len() as u8,
        ];
        out.extend_from_slice(self.text.as_bytes());
        out
    }
}

/// One OSDP command, addressed to a single PD.
#[derive(Debug, Clone)]
pub enum Command {
    Poll { address: u8 },
    IdReport { address: u8 },
    DeviceCapabilities { address: u8 },
    LocalStatusReport { address: u8 },
    InputStatusReport { address: u8 },
    OutputStatusReport { address: u8 },
    ReaderStatusReport { address: u8 },
    OutputControlCmd { address: u8, controls: Vec<OutputControl> },
    ReaderLedControlCmd { address: u8, controls: Vec<ReaderLedControl> },
    ReaderBuzzerControlCmd { address: u8, control: ReaderBuzzerControl },
    ReaderTextOutputCmd { address: u8, output: ReaderTextOutput },
    SetDateTime { address: u8, timestamp: chrono::NaiveDateTime },
    KeySet { address: u8, scbk: [u8; 16] },
    SecurityInitializationRequest { address: u8, server_random: [u8; 8] },
    ServerCryptogram { address: u8, server_cryptogram: [u8; 16] },
    ManufacturerSpecific { address: u8, data: Vec<u8> },
}

impl Command {
    pub fn address(&self) -> u8 {
        match self {
            Command::Poll { address }
            | Command::IdReport { address }
            | Command::DeviceCapabilities { address }
            | Command::LocalStatusReport { address }
            | Command::InputStatusReport { address }
            | Command::OutputStatusReport { address }
            | Command::ReaderStatusReport { address }
            | Command::OutputControlCmd { address, .. }
            | Command::ReaderLedControlCmd { address, .. }
            | Command::ReaderBuzzerControlCmd { address, .. }
            | Command::ReaderTextOutputCmd { address, .. }
            | Command::SetDateTime { address, .. }
            | Command::KeySet { address, .. }
            | Command::SecurityInitializationRequest { address, .. }
            | Command::ServerCryptogram { address, .. }
            | Command::ManufacturerSpecific { address, .. } => *address,
        }
    }

    fn command_code(&self) -> u8 {
        match self {
            Command::Poll { .. } => CMD_POLL,
            Command::IdReport { .. } => CMD_ID_REPORT,
            Command::DeviceCapabilities { .. } => CMD_DEVICE_CAPABILITIES,
            Command::LocalStatusReport { .. } => CMD_LOCAL_STATUS_REPORT,
            Command::InputStatusReport { .. } => CMD_INPUT_STATUS_REPORT,
            Command::OutputStatusReport { .. } => CMD_OUTPUT_STATUS_REPORT,
            Command::ReaderStatusReport { .. } => CMD_READER_STATUS_REPORT,
            Command::OutputControlCmd { .. } => CMD_OUTPUT_CONTROL,
            Command::ReaderLedControlCmd { .. } => CMD_READER_LED_CONTROL,
            Command::ReaderBuzzerControlCmd { .. } => CMD_READER_BUZZER_CONTROL,
            Command::ReaderTextOutputCmd { .. } => CMD_READER_TEXT_OUTPUT,
            Command::SetDateTime { .. } => CMD_SET_DATE_TIME,
            Command::KeySet { .. } => CMD_KEY_SET,
            Command::SecurityInitializationRequest { .. } => CMD_SECURITY_INITIALIZATION_REQUEST,
            Command::ServerCryptogram { .. } => CMD_SERVER_CRYPTOGRAM,
            Command::ManufacturerSpecific { .. } => CMD_MANUFACTURER_SPECIFIC,
        }
    }

    /// Reply types that can satisfy a synchronous request for this command.
    /// `Nak` is always an acceptable (error) terminal reply regardless of
    /// this list, per the Control Panel's reply-matching predicate (§4.6).
    /// Needed so an unrelated keep-alive POLL or handshake reply landing on
    /// the same address doesn't wrongly resolve an outstanding request.
    pub fn expected_reply_types(&self) -> &'static [ReplyType] {
        match self {
            Command::Poll { .. } => &[ReplyType::Ack],
            Command::IdReport { .. } => &[ReplyType::PdIdReport],
            Command::DeviceCapabilities { .. } => &[ReplyType::PdCapabilitiesReport],
            Command::LocalStatusReport { .. } => &[ReplyType::LocalStatusReport],
            Command::InputStatusReport { .. } => &[ReplyType::InputStatusReport],
            Command::OutputStatusReport { .. } => &[ReplyType::OutputStatusReport],
            Command::ReaderStatusReport { .. } => &[ReplyType::ReaderStatusReport],
            Command::OutputControlCmd { .. } => &[ReplyType::Ack, ReplyType::OutputStatusReport],
            Command::ReaderLedControlCmd { .. } => &[ReplyType::Ack],
            Command::ReaderBuzzerControlCmd { .. } => &[ReplyType::Ack],
            Command::ReaderTextOutputCmd { .. } => &[ReplyType::Ack],
            Command::SetDateTime { .. } => &[ReplyType::Ack],
            Command::KeySet { .. } => &[ReplyType::Ack],
            Command::SecurityInitializationRequest { .. } => &[ReplyType::CrypticData],
            Command::ServerCryptogram { .. } => &[ReplyType::InitialRMac],
            Command::ManufacturerSpecific { .. } => {
                &[ReplyType::ManufacturerSpecific, ReplyType::Ack]
            }
        }
    }

    /// SCB bytes for this command when the device carries a Security
    /// Control Block at all (has_scb is a Device-level decision; the three
    /// handshake steps always use their fixed SCB regardless).
    fn security_control_block(&self) -> &'static [u8] {
        match self {
            Command::SecurityInitializationRequest { .. } => &SCB_SEC_INIT,
            Command::ServerCryptogram { .. } => &SCB_SERVER_CRYPT,
            Command::Poll { .. }
            | Command::LocalStatusReport { .. }
            | Command::InputStatusReport { .. }
            | Command::OutputStatusReport { .. }
            | Command::ReaderStatusReport { .. } => &SCB_NO_DATA,
            _ => &SCB_WITH_DATA,
        }
    }

    /// Clear-text payload bytes, before any secure-session encryption.
    fn data(&self) -> Vec<u8> {
        match self {
            Command::Poll { .. }
            | Command::LocalStatusReport { .. }
            | Command::InputStatusReport { .. }
            | Command::OutputStatusReport { .. }
            | Command::ReaderStatusReport { .. } => Vec::new(),
            Command::IdReport { .. } | Command::DeviceCapabilities { .. } => vec![0x00],
            Command::OutputControlCmd { controls, .. } => {
                controls.iter().flat_map(|c| c.encode()).collect()
            }
            Command::ReaderLedControlCmd { controls, .. } => {
                controls.iter().flat_map(|c| c.encode()).collect()
            }
            Command::ReaderBuzzerControlCmd { control, .. } => control.encode().to_vec(),
            Command::ReaderTextOutputCmd { output, .. } => output.encode(),
            Command::SetDateTime { timestamp, .. } => {
                let year = (timestamp.year() as u16).to_le_bytes();
                vec![
                    year[0],
                    year[1],
                    timestamp.month() as u8,
                    timestamp.day() as u8,
                    timestamp.hour() as u8,
                    timestamp.minute() as u8,
                    timestamp.second() as u8,
                ]
            }
            Command::KeySet { scbk, .. } => {
                let mut out = vec![0x01u8, 0x10u8];
                out.extend_from_slice(scbk);
                out
            }
            Command::SecurityInitializationRequest { server_random, .. } => server_random.to_vec(),
            Command::ServerCryptogram {
                server_cryptogram, ..
            } => server_cryptogram.to_vec(),
            Command::ManufacturerSpecific { data, .. } => data.clone(),
        }
    }

    /// Assembles the full wire frame for this command against `device`'s
    /// current control byte and Secure Channel state, driving sequence and
    /// encryption exactly as `build_command` does in the reference source.
    ///
    /// When the session is established the MAC must cover the packet with
    /// its length field already set to the FINAL length (including the MAC
    /// and footer bytes not yet appended) — see spec §4.1's ordering note —
    /// so this path builds the prefix once, MACs it, then appends MAC and
    /// footer rather than delegating to `codec::encode`.
    pub fn encode(&self, device: &mut Device) -> Vec<u8> {
        let control = device.control_byte();
        let scb = if device.message_control.has_scb {
            Some(self.security_control_block())
        } else {
            None
        };

        if device.is_security_established() {
            let plain = self.data();
            let encrypted = device.secure_channel_mut().encrypt_data(&plain);

            let footer_size = if control.use_crc { 2 } else { 1 };
            let scb_len = scb.map_or(0, |s| s.len());
            let total_len =
                1 + 1 + 2 + 1 + scb_len + 1 + encrypted.len() + MAC_SIZE + footer_size;

            let mut prefix = Vec::with_capacity(total_len);
            prefix.push(SOM);
            prefix.push(self.address() & ADDRESS_MASK);
            prefix.extend_from_slice(&(total_len as u16).to_le_bytes());
            prefix.push(control.to_byte());
            if let Some(scb) = scb {
                prefix.extend_from_slice(scb);
            }
            prefix.push(self.command_code());
            prefix.extend_from_slice(&encrypted);

            let full_mac = device.generate_mac(&prefix, true);

            let mut packet = prefix;
            packet.extend_from_slice(&full_mac[..MAC_SIZE]);
            if control.use_crc {
                let crc = codec::crc::crc16(&packet);
                packet.extend_from_slice(&crc.to_le_bytes());
            } else {
                let cs = codec::crc::checksum(&packet);
                packet.push(cs);
            }
            packet
        } else {
            codec::encode(
                self.address(),
                false,
                control,
                scb,
                self.command_code(),
                &self.data(),
                None,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;

    #[test]
    fn poll_command_without_security_matches_spec_vector() {
        let mut device = Device::new(0x7F, false, false);
        device.message_control.sequence = 1;
        let command = Command::Poll { address: 0x7F };
        let bytes = command.encode(&mut device);
        assert_eq!(bytes, vec![0x53, 0x7F, 0x07, 0x00, 0x01, 0x60, 0xC6]);
    }

    #[test]
    fn id_report_at_sequence_zero_matches_spec_vector() {
        let mut device = Device::new(0x7F, false, false);
        let command = Command::IdReport { address: 0x7F };
        let bytes = command.encode(&mut device);
        assert_eq!(
            bytes,
            vec![0x53, 0x7F, 0x08, 0x00, 0x00, 0x61, 0x00, 0xC5]
        );
    }

    #[test]
    fn key_set_carries_caller_supplied_scbk_not_a_hard_coded_one() {
        let device = Device::new(0x01, false, true);
        let scbk = [0xAAu8; 16];
        let command = Command::KeySet {
            address: 0x01,
            scbk,
        };
        assert_eq!(&command.data()[2..], &scbk);
    }
}
