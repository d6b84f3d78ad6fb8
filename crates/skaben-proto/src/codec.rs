//! Packet encoding and decoding.
//!
//! This module turns a [`Packet`] into a transport-ready `(topic, bytes)`
//! pair and parses received pairs back into validated packets.
//!
//! ## Wire Format
//!
//! | Part    | Shape                                                   |
//! |---------|---------------------------------------------------------|
//! | topic   | `device_class` or `device_class "/" device_id`          |
//! | payload | UTF-8 text: `COMMAND_TOKEN "/" JSON_OBJECT`             |
//!
//! The JSON object always carries `ts` (integer seconds) plus the fields the
//! command kind allows: `task_id` (string), `timeout` (integer seconds), and
//! `data` (object, always nested under that key). Keys appear in the fixed
//! order `ts`, `task_id`, `timeout`, `data`; absent optionals are omitted.
//!
//! The payload is split on the FIRST `/` only. JSON string values may
//! legitimately contain `/`, so splitting on every occurrence would corrupt
//! the body.

use serde::Serialize;
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::packets::{CommandBody, CommandKind, Packet, PacketFields};
use crate::topic;

/// A transport-ready message: topic plus raw payload bytes.
///
/// This is the full surface a pub/sub client needs for publishing; the codec
/// does not depend on any particular client library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    /// MQTT-style topic string.
    pub topic: String,
    /// UTF-8 payload bytes.
    pub payload: Vec<u8>,
}

/// Anything exposing a received message's topic and payload.
///
/// Matches the shape of the message structs pub/sub client libraries hand to
/// subscription callbacks.
pub trait TransportMessage {
    /// Topic the message arrived on.
    fn topic(&self) -> &str;
    /// Raw payload bytes.
    fn payload(&self) -> &[u8];
}

impl TransportMessage for WireMessage {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// The validated result of decoding one received message.
///
/// Content-equivalent to the packet the sender constructed, with the
/// timestamp resolved and the `ask` suffix stripped from the device class.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket {
    /// Broadcast group the message belongs to.
    pub device_class: String,
    /// Unicast address, absent for broadcasts.
    pub device_id: Option<String>,
    /// Decoded command kind.
    pub command: CommandKind,
    /// Timestamp in seconds, as carried on the wire.
    pub timestamp: u64,
    /// Per-kind field record.
    pub body: CommandBody,
}

impl DecodedPacket {
    /// Rebuild a [`Packet`] from the decoded fields, e.g. to re-encode or
    /// feed back through the model validator.
    pub fn to_packet(&self) -> Result<Packet, ValidationError> {
        let mut packet = Packet::from_body(self.device_class.clone(), self.body.clone())?
            .with_timestamp(self.timestamp);
        if let Some(ref id) = self.device_id {
            packet = packet.with_device_id(id.clone());
        }
        Ok(packet)
    }
}

/// JSON body as written to the wire. Declaration order here is the wire key
/// order.
#[derive(Serialize)]
struct WireBody<'a> {
    ts: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Map<String, Value>>,
}

/// Encode a packet, resolving the timestamp.
///
/// The packet's own timestamp wins; a packet without one is stamped with the
/// current wall clock. Use [`encode_at`] for a deterministic override.
pub fn encode(packet: &Packet) -> Result<WireMessage, EncodeError> {
    match packet.timestamp() {
        Some(ts) => encode_at(packet, ts),
        None => encode_at(packet, unix_now()),
    }
}

/// Encode a packet with an explicit timestamp.
///
/// Identical packet and timestamp produce identical bytes, so retries and
/// tests can re-encode without drift.
pub fn encode_at(packet: &Packet, timestamp: u64) -> Result<WireMessage, EncodeError> {
    let topic = topic::join_segments([packet.device_class(), packet.device_id().unwrap_or("")]);
    let body = WireBody {
        ts: timestamp,
        task_id: packet.body().task_id(),
        timeout: packet.body().timeout_secs(),
        data: packet.body().data(),
    };
    let json = serde_json::to_string(&body)?;
    let mut payload = String::with_capacity(packet.kind().token().len() + 1 + json.len());
    payload.push_str(packet.kind().token());
    payload.push(topic::SEPARATOR);
    payload.push_str(&json);
    Ok(WireMessage {
        topic,
        payload: payload.into_bytes(),
    })
}

/// Decode a received `(topic, payload)` pair into a validated packet.
///
/// All-or-nothing: any malformed part fails the whole message, and the same
/// registry rules applied at construction reject inconsistent field sets.
pub fn decode(topic: &str, payload: &[u8]) -> Result<DecodedPacket, DecodeError> {
    let (device_class, device_id) = topic::split_topic(topic)?;

    let text = std::str::from_utf8(payload)?;
    // first '/' only: the JSON body may contain the separator in values
    let (token, body_text) = text
        .split_once(topic::SEPARATOR)
        .ok_or(DecodeError::MissingSeparator)?;
    let kind =
        CommandKind::from_token(token).ok_or_else(|| DecodeError::UnknownCommand(token.to_string()))?;

    let body_json: Value = serde_json::from_str(body_text)?;
    let object = match body_json {
        Value::Object(object) => object,
        _ => return Err(DecodeError::NotAnObject),
    };

    let timestamp = match object.get("ts") {
        Some(ts) => ts.as_u64().ok_or(DecodeError::BadFieldType {
            field: "ts",
            expected: "non-negative integer",
        })?,
        None => return Err(DecodeError::MissingField("ts")),
    };
    let task_id = match object.get("task_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(task_id)) => Some(task_id.clone()),
        Some(_) => {
            return Err(DecodeError::BadFieldType {
                field: "task_id",
                expected: "string",
            })
        }
    };
    let timeout = match object.get("timeout") {
        None | Some(Value::Null) => None,
        Some(timeout) => Some(timeout.clone()),
    };
    let data = match object.get("data") {
        None | Some(Value::Null) => None,
        Some(Value::Object(data)) => Some(data.clone()),
        Some(_) => {
            return Err(DecodeError::BadFieldType {
                field: "data",
                expected: "object",
            })
        }
    };

    // same validation path the sending side goes through
    let fields = PacketFields {
        timestamp: Some(timestamp),
        task_id,
        timeout,
        data,
    };
    let packet = Packet::new(kind, device_class, fields)?;

    log::trace!("decoded {} packet from topic <{}>", kind, topic);

    Ok(DecodedPacket {
        device_class: packet.device_class().to_string(),
        device_id,
        command: kind,
        timestamp,
        body: packet.body().clone(),
    })
}

/// Decode from any transport message type.
pub fn decode_message<M: TransportMessage>(message: &M) -> Result<DecodedPacket, DecodeError> {
    decode(message.topic(), message.payload())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
