//! Round-trip tests across the packet model and the codec.
//!
//! Every command kind is encoded with a fixed timestamp and decoded back;
//! the decoded fields must match the constructed packet exactly.

use serde_json::{json, Map, Value};
use skaben_proto::{
    decode, decode_message, encode_at, CommandBody, CommandKind, Packet, TransportMessage,
    WireMessage,
};

const TS: u64 = 1000;
const UID: &str = "00ff00ff00ff";
const TASK_ID: &str = "51048";

fn sample_data() -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("test".to_string(), json!("value"));
    data.insert("list".to_string(), json!(["1", 0, true]));
    data.insert("bool".to_string(), json!(false));
    data.insert("dict".to_string(), json!({"test": "value"}));
    data
}

fn all_kinds() -> Vec<Packet> {
    vec![
        Packet::ping("lock").unwrap(),
        Packet::pong("lock").unwrap().with_device_id(UID),
        Packet::wait("lock", 10).unwrap().with_device_id(UID),
        Packet::ack("term", TASK_ID).unwrap().with_device_id(UID),
        Packet::nack("term", TASK_ID).unwrap().with_device_id(UID),
        Packet::cup("term", TASK_ID, sample_data()).unwrap(),
        Packet::sup("term", sample_data()).unwrap().with_device_id(UID),
        Packet::info("dumb", sample_data()).unwrap(),
    ]
}

#[test]
fn test_roundtrip_all_kinds() {
    for packet in all_kinds() {
        let message = encode_at(&packet, TS).unwrap();
        let decoded = decode(&message.topic, &message.payload)
            .unwrap_or_else(|err| panic!("{} failed to decode: {err}", packet.kind()));

        assert_eq!(decoded.command, packet.kind());
        assert_eq!(decoded.device_class, packet.device_class());
        assert_eq!(decoded.device_id.as_deref(), packet.device_id());
        assert_eq!(decoded.timestamp, TS);
        assert_eq!(&decoded.body, packet.body());
    }
}

#[test]
fn test_roundtrip_through_rebuilt_packet() {
    // decode -> to_packet -> encode reproduces the original bytes
    for packet in all_kinds() {
        let message = encode_at(&packet, TS).unwrap();
        let rebuilt = decode(&message.topic, &message.payload)
            .unwrap()
            .to_packet()
            .unwrap();
        let reencoded = encode_at(&rebuilt, TS).unwrap();
        assert_eq!(reencoded, message);
    }
}

#[test]
fn test_topic_segment_count() {
    let broadcast = encode_at(&Packet::ping("lock").unwrap(), TS).unwrap();
    assert_eq!(broadcast.topic.split('/').count(), 1);

    let unicast = encode_at(&Packet::ping("lock").unwrap().with_device_id(UID), TS).unwrap();
    assert_eq!(unicast.topic.split('/').count(), 2);
    assert_eq!(unicast.topic, format!("lock/{UID}"));
}

#[test]
fn test_ping_wire_bytes() {
    let message = encode_at(&Packet::ping("lock").unwrap(), TS).unwrap();
    assert_eq!(message.topic, "lock");
    assert_eq!(message.payload, b"PING/{\"ts\":1000}");
}

#[test]
fn test_ack_wire_bytes() {
    let packet = Packet::ack("term", TASK_ID).unwrap().with_device_id(UID);
    let message = encode_at(&packet, TS).unwrap();
    assert_eq!(message.topic, "term/00ff00ff00ff");
    assert_eq!(message.payload, b"ACK/{\"ts\":1000,\"task_id\":\"51048\"}");
}

#[test]
fn test_ask_channel_reply_derivation() {
    // a responder listening on "lockask" derives its channel from the asker
    let decoded = decode("lockask", b"PING/{\"ts\":1000}").unwrap();
    assert_eq!(decoded.device_class, "lock");
    assert_eq!(decoded.command, CommandKind::Ping);
}

#[test]
fn test_data_with_separator_in_values() {
    // '/' inside JSON strings must survive the first-separator-only split
    let mut data = Map::new();
    data.insert("path".to_string(), json!("lock/inner/device"));
    data.insert("url".to_string(), json!("http://10.0.0.1/api"));
    let packet = Packet::cup("term", TASK_ID, data.clone()).unwrap();

    let message = encode_at(&packet, TS).unwrap();
    let decoded = decode(&message.topic, &message.payload).unwrap();
    match &decoded.body {
        CommandBody::Cup { data: decoded_data, .. } => assert_eq!(decoded_data, &data),
        other => panic!("expected CUP body, got {other:?}"),
    }
}

#[test]
fn test_sup_with_task_id_roundtrip() {
    let packet = Packet::from_body(
        "term",
        CommandBody::Sup {
            task_id: Some(TASK_ID.to_string()),
            data: sample_data(),
        },
    )
    .unwrap()
    .with_device_id(UID);

    let message = encode_at(&packet, TS).unwrap();
    let decoded = decode(&message.topic, &message.payload).unwrap();
    assert_eq!(decoded.body.task_id(), Some(TASK_ID));
    assert_eq!(&decoded.body, packet.body());
}

#[test]
fn test_decode_through_transport_seam() {
    // stand-in for the message struct an MQTT client hands to its callback
    struct FakeMqttMessage {
        topic: String,
        payload: Vec<u8>,
    }

    impl TransportMessage for FakeMqttMessage {
        fn topic(&self) -> &str {
            &self.topic
        }

        fn payload(&self) -> &[u8] {
            &self.payload
        }
    }

    let wire = encode_at(&Packet::wait("lock", 10).unwrap().with_device_id(UID), TS).unwrap();
    let message = FakeMqttMessage {
        topic: wire.topic.clone(),
        payload: wire.payload.clone(),
    };

    let decoded = decode_message(&message).unwrap();
    assert_eq!(decoded.command, CommandKind::Wait);
    assert_eq!(decoded.body.timeout_secs(), Some(10));
}

#[test]
fn test_wire_message_is_its_own_transport() {
    let wire: WireMessage = encode_at(&Packet::pong("term").unwrap(), TS).unwrap();
    let decoded = decode_message(&wire).unwrap();
    assert_eq!(decoded.command, CommandKind::Pong);
}

#[test]
fn test_decode_same_bytes_twice() {
    let message = encode_at(&Packet::info("dumb", sample_data()).unwrap(), TS).unwrap();
    let first = decode(&message.topic, &message.payload).unwrap();
    let second = decode(&message.topic, &message.payload).unwrap();
    assert_eq!(first, second);
}
