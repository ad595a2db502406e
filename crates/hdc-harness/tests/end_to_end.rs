//! End-to-end scenarios wiring a real `HostRouter` and `DeviceRouter`
//! together, plus wire-level packetizer scenarios exercising multi-packet
//! framing and reading-frame-error recovery on the exact byte sequences a
//! byte-stream transport would see.

use hdc_core::Feature;
use hdc_harness::{Pair, TEST_TIMEOUT};
use hdc_proto::{
    ids::{reserved_command, reserved_property, MessageType},
    packetizer::{packetize, Packetizer},
};

#[test]
fn echo_round_trips_through_real_routers() {
    let pair = Pair::new(|_device| {}).expect("harness pair connects");

    let reply = pair
        .host
        .send_request_and_get_reply(&[MessageType::ECHO, 1, 2, 3], TEST_TIMEOUT)
        .expect("echo reply arrives");

    assert_eq!(reply, vec![MessageType::ECHO, 1, 2, 3]);
}

#[test]
fn get_property_value_reads_core_log_event_threshold() {
    let pair = Pair::new(|device| {
        device.add_feature(Feature::new(0x00, "Core")).expect("core feature registers");
    })
    .expect("harness pair connects");

    let reply = pair
        .host
        .send_request_and_get_reply(
            &[MessageType::COMMAND, 0x00, reserved_command::GET_PROPERTY_VALUE, reserved_property::LOG_EVENT_THRESHOLD],
            TEST_TIMEOUT,
        )
        .expect("get-property reply arrives");

    // Default LogEventThreshold is WARNING (30), and GetPropertyValue succeeds
    // (ExceptionID 0x00) carrying the UINT8 value.
    assert_eq!(reply, vec![MessageType::COMMAND, 0x00, reserved_command::GET_PROPERTY_VALUE, 0x00, 30]);
}

#[test]
fn command_to_unregistered_feature_reports_unknown_feature() {
    let pair = Pair::new(|_device| {}).expect("harness pair connects");

    let reply = pair
        .host
        .send_request_and_get_reply(&[MessageType::COMMAND, 0x42, reserved_command::GET_PROPERTY_VALUE], TEST_TIMEOUT)
        .expect("exception reply arrives");

    assert_eq!(reply, vec![MessageType::COMMAND, 0x42, reserved_command::GET_PROPERTY_VALUE, 0xF1]);
}

#[test]
fn custom_command_dispatches_to_registered_callable() {
    use hdc_core::CommandDescriptor;
    use hdc_proto::dtype::{DataType, Value};

    let pair = Pair::new(|device| {
        let mut feature = Feature::new(0x01, "Motor");
        feature
            .register_command(CommandDescriptor::new(0x01, "SetSpeed", vec![DataType::Uint32], vec![]))
            .expect("command descriptor registers");
        device.add_feature(feature).expect("feature registers");
        device
            .register_command(0x01, 0x01, |args| {
                let [Value::Uint32(speed)] = args.as_slice() else {
                    panic!("handler invoked with unexpected argument shape");
                };
                assert_eq!(*speed, 100);
                Ok(vec![])
            })
            .expect("command handler registers");
    })
    .expect("harness pair connects");

    let mut request = vec![MessageType::COMMAND, 0x01, 0x01];
    request.extend(100u32.to_le_bytes());
    let reply = pair.host.send_request_and_get_reply(&request, TEST_TIMEOUT).expect("command reply arrives");

    assert_eq!(reply, vec![MessageType::COMMAND, 0x01, 0x01, 0x00]);
}

proptest::proptest! {
    /// A command that echoes its single UINT32 argument back as its single
    /// UINT32 return value round-trips through a real connected host/device
    /// `Pair` for any speed, not just a fixed literal.
    #[test]
    fn arbitrary_set_speed_round_trips_through_a_connected_pair(speed: u32) {
        use hdc_core::CommandDescriptor;
        use hdc_proto::dtype::{DataType, Value};

        let pair = Pair::new(|device| {
            let mut feature = Feature::new(0x01, "Motor");
            feature
                .register_command(CommandDescriptor::new(0x01, "SetSpeed", vec![DataType::Uint32], vec![DataType::Uint32]))
                .expect("command descriptor registers");
            device.add_feature(feature).expect("feature registers");
            device
                .register_command(0x01, 0x01, |args| {
                    let [Value::Uint32(speed)] = args.as_slice() else {
                        panic!("handler invoked with unexpected argument shape");
                    };
                    Ok(vec![Value::Uint32(*speed)])
                })
                .expect("command handler registers");
        })
        .expect("harness pair connects");

        let mut request = vec![MessageType::COMMAND, 0x01, 0x01];
        request.extend(speed.to_le_bytes());
        let reply = pair.host.send_request_and_get_reply(&request, TEST_TIMEOUT).expect("command reply arrives");

        let mut expected = vec![MessageType::COMMAND, 0x01, 0x01, 0x00];
        expected.extend(speed.to_le_bytes());
        proptest::prop_assert_eq!(reply, expected);
    }
}

#[test]
fn packetizer_reassembles_a_400_byte_message_across_two_packets() {
    let message: Vec<u8> = (0..400u32).map(|b| b as u8).collect();
    let packets = packetize(&message);
    assert_eq!(packets.len(), 2, "400 bytes should split into a 255-byte and a 145-byte packet");

    let mut packetizer = Packetizer::new();
    for packet in &packets {
        packetizer.feed(packet);
    }
    packetizer.feed(&[]);

    assert_eq!(packetizer.drain_messages(), vec![message]);
    assert_eq!(packetizer.reading_frame_error_count(), 0);
}

#[test]
fn packetizer_reassembles_a_255_byte_message_with_trailing_empty_packet() {
    let message = vec![0xAB; 255];
    let packets = packetize(&message);
    assert_eq!(packets.len(), 2, "an exact 255-byte multiple needs a trailing empty packet");

    let mut packetizer = Packetizer::new();
    for packet in &packets {
        packetizer.feed(packet);
    }
    packetizer.feed(&[]);

    assert_eq!(packetizer.drain_messages(), vec![message]);
}

#[test]
fn packetizer_recovers_from_five_bogus_bytes_before_a_valid_message() {
    let message: Vec<u8> = (0..32u32).map(|b| b as u8).collect();
    let mut wire = vec![0u8; 5];
    for packet in packetize(&message) {
        wire.extend(packet);
    }

    let mut packetizer = Packetizer::new();
    packetizer.feed(&wire);
    packetizer.feed(&[]);

    assert_eq!(packetizer.drain_messages(), vec![message]);
    assert_eq!(packetizer.reading_frame_error_count(), 5);
}
