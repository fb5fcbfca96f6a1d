//! Property-based coverage for frame encode/decode across the address,
//! sequence, use_crc and body dimensions, plus targeted corruption checks.
//! The fixed byte vectors live as unit tests next to the codec; this
//! exercises the same code over the wider input space `proptest` covers.

use osdp_rs::codec::frame::{decode, encode, ControlByte};
use proptest::prelude::*;

fn arb_control() -> impl Strategy<Value = ControlByte> {
    (0u8..4, any::<bool>()).prop_map(|(sequence, use_crc)| ControlByte {
        sequence,
        use_crc,
        has_scb: false,
    })
}

proptest! {
    #[test]
    fn round_trips_for_any_address_sequence_crc_and_body(
        address in 0u8..0x7F,
        control in arb_control(),
        type_code in any::<u8>(),
        body in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let packet = encode(address, false, control, None, type_code, &body, None);
        let frame = decode(&packet, false).unwrap();

        prop_assert_eq!(frame.address, address);
        prop_assert!(!frame.is_reply);
        prop_assert_eq!(frame.control, control);
        prop_assert_eq!(frame.type_code, type_code);
        prop_assert_eq!(frame.payload, body);
    }

    #[test]
    fn reply_address_bit_round_trips(address in 0u8..0x7F, control in arb_control()) {
        let packet = encode(address, true, control, None, 0x40, &[], None);
        let frame = decode(&packet, false).unwrap();
        prop_assert_eq!(frame.address, address);
        prop_assert!(frame.is_reply);
    }

    #[test]
    fn flipping_any_footer_byte_is_detected(
        control in arb_control(),
        body in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let packet = encode(0x01, false, control, None, 0x60, &body, None);
        let mut corrupted = packet.clone();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;
        prop_assert!(decode(&corrupted, false).is_err());
    }
}
