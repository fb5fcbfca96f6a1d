//! End-to-end scenarios S1-S6: bit-exact TX vectors and scripted PD replies,
//! exercised through the real `Command`/`Device`/codec/`Reply` pipeline
//! rather than hand-parsed byte offsets, so a regression anywhere in that
//! chain shows up here.

use osdp_rs::codec;
use osdp_rs::command::{Command, OutputControlCode, ReaderLedControl, LedColor};
use osdp_rs::command::{PermanentReaderControlCode, TemporaryReaderControlCode};
use osdp_rs::device::Device;
use osdp_rs::error::OsdpError;
use osdp_rs::reply::{DeviceIdentification, KeypadData, RawCardData, Reply, ReplyType};

fn sample_led_control() -> ReaderLedControl {
    ReaderLedControl {
        reader_number: 0,
        led_number: 0,
        temporary_mode: TemporaryReaderControlCode::SetTemporaryAndStartTimer,
        temporary_on_time: 2,
        temporary_off_time: 1,
        temporary_on_color: LedColor::Green,
        temporary_off_color: LedColor::Black,
        temporary_timer: 10,
        permanent_mode: PermanentReaderControlCode::Nop,
        permanent_on_time: 0,
        permanent_off_time: 0,
        permanent_on_color: LedColor::Black,
        permanent_off_color: LedColor::Black,
    }
}

#[test]
fn s1_id_report_round_trip() {
    let mut device = Device::new(0x7F, false, false);
    let command = Command::IdReport { address: 0x7F };
    let tx = command.encode(&mut device);
    assert_eq!(
        tx,
        hex("537F0800006100C5")
    );

    let rx = hex("53FF13000345A4D9A403FF3300017003000287");
    let frame = codec::decode(&rx, false).unwrap();
    let reply = Reply::from_frame(&frame, &command);
    assert_eq!(reply.reply_type, ReplyType::PdIdReport);
    assert!(reply.is_valid_reply());

    let id = DeviceIdentification::parse(&reply.payload).unwrap();
    assert_eq!(id.serial_number, 1_879_113_779);
}

#[test]
fn s2_ack_after_led_control() {
    let mut device = Device::new(0x7F, false, false);
    device.message_control.sequence = 2;
    let command = Command::ReaderLedControlCmd {
        address: 0x7F,
        controls: vec![sample_led_control()],
    };
    let tx = command.encode(&mut device);
    assert_eq!(tx, hex("537F15000269000002020102000A0000000000009D"));

    let rx = hex("53FF0700024065");
    let frame = codec::decode(&rx, false).unwrap();
    let reply = Reply::from_frame(&frame, &command);
    assert_eq!(reply.reply_type, ReplyType::Ack);
    assert!(reply.payload.is_empty());
    assert!(reply.is_valid_reply());
}

#[test]
fn s3_keypad_data() {
    let command = Command::Poll { address: 0x7F };
    let rx = hex("53FF0D000253FF04313233347F");
    let frame = codec::decode(&rx, false).unwrap();
    let reply = Reply::from_frame(&frame, &command);
    assert_eq!(reply.reply_type, ReplyType::KeypadData);

    let keypad = KeypadData::parse(&reply.payload).unwrap();
    assert_eq!(keypad.data, vec![0x31, 0x32, 0x33, 0x34]);
}

#[test]
fn s4_raw_card_data_over_crc() {
    let command = Command::Poll { address: 0x7F };
    let rx = hex("53FF10000550FF011A00CD22C71600C9");
    let frame = codec::decode(&rx, false).unwrap();
    let reply = Reply::from_frame(&frame, &command);
    assert_eq!(reply.reply_type, ReplyType::RawReaderData);

    let card = RawCardData::parse(&reply.payload).unwrap();
    assert_eq!(card.data, vec![0xCD, 0x22, 0xC7, 0x16]);
    assert_eq!(card.bit_count, 26);
}

#[test]
fn s5_set_date_time() {
    use chrono::NaiveDate;

    let mut device = Device::new(0x7F, true, false);
    device.message_control.sequence = 1;
    let timestamp = NaiveDate::from_ymd_opt(2019, 11, 29)
        .unwrap()
        .and_hms_opt(16, 17, 18)
        .unwrap();
    let command = Command::SetDateTime {
        address: 0x7F,
        timestamp,
    };
    let tx = command.encode(&mut device);
    assert_eq!(tx, hex("537F0F00056DE3070B1D101112DEFA"));
}

#[test]
fn s6_bad_crc_is_rejected_and_does_not_advance_sequence() {
    let mut device = Device::new(0x7F, false, false);
    device.message_control.sequence = 2;
    let command = Command::ReaderLedControlCmd {
        address: 0x7F,
        controls: vec![sample_led_control()],
    };

    // S2's RX with the trailing checksum byte corrupted.
    let mut rx = hex("53FF0700024065");
    *rx.last_mut().unwrap() ^= 0xFF;

    let result = codec::decode(&rx, false);
    assert!(matches!(result, Err(OsdpError::BadChecksum { .. })));
    assert_eq!(device.message_control.sequence, 2, "bad frame must not mutate device state");

    // Un-corrupted, it decodes and classifies fine (sanity check the flip
    // actually mattered).
    let mut good = rx.clone();
    *good.last_mut().unwrap() ^= 0xFF;
    let frame = codec::decode(&good, false).unwrap();
    let reply = Reply::from_frame(&frame, &command);
    assert_eq!(reply.reply_type, ReplyType::Ack);
}

#[test]
fn output_control_code_values_match_osdp_table() {
    assert_eq!(OutputControlCode::Nop as u8, 0x00);
    assert_eq!(OutputControlCode::PermanentOnAbortTimed as u8, 0x02);
}

/// Parses a contiguous hex string (whitespace allowed) into bytes.
fn hex(s: &str) -> Vec<u8> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    (0..cleaned.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&cleaned[i..i + 2], 16).unwrap())
        .collect()
}
