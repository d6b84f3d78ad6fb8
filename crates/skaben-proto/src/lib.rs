//! SKABEN Device-Control Protocol Codec
//!
//! This crate provides types and utilities for the SKABEN device-control
//! protocol carried over an MQTT-style publish/subscribe transport. Typed
//! command packets are serialized into `(topic, payload-bytes)` pairs for
//! publishing, and received pairs are parsed back into validated, typed
//! commands.
//!
//! # Protocol Overview
//!
//! Every message is addressed to a device class (broadcast) or to one device
//! within it (unicast), and carries one of a closed set of commands:
//!
//! - **PING** / **PONG**: heartbeat and its response
//! - **WAIT**: suppress the next PONG for a number of seconds
//! - **ACK** / **NACK**: confirm an operation by `task_id`
//! - **CUP**: config update, server → device
//! - **SUP**: state update, device → server
//! - **INFO**: general-purpose payload
//!
//! On the wire:
//!
//! - **Topic**: `device_class` or `device_class/device_id`
//! - **Payload**: UTF-8 text `COMMAND_TOKEN "/" JSON_OBJECT`, e.g.
//!   `ACK/{"ts":1000,"task_id":"51048"}`
//!
//! The codec is stateless: encode and decode are pure functions of their
//! inputs (plus a wall-clock read when a packet carries no timestamp), safe
//! to call concurrently without locking. Retry policy and the
//! PONG-suppression state machine belong to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use skaben_proto::{decode, encode_at, Packet};
//!
//! // Build and encode a packet
//! let packet = Packet::ack("term", "51048")?.with_device_id("00ff00ff00ff");
//! let message = encode_at(&packet, 1000)?;
//!
//! // Parse a received message
//! let decoded = decode(&message.topic, &message.payload)?;
//! ```

mod codec;
mod error;
mod packets;
mod topic;

pub use codec::*;
pub use error::*;
pub use packets::*;
pub use topic::*;
