//! Packet model: command taxonomy, field rules, and validated construction.
//!
//! Every message on the wire carries one of a closed set of command kinds.
//! Which fields a packet carries is fully determined by its kind, so the
//! model is a tagged variant ([`CommandBody`]) rather than a loose bag of
//! optionals: once a [`Packet`] exists, its field set is valid.
//!
//! The per-kind rules live in a single registry table ([`CommandKind::rules`])
//! shared by the construction path and the decoder, so both sides of the
//! wire reject the same malformed field sets.

use serde_json::{Map, Value};
use std::fmt;

use crate::error::ValidationError;
use crate::topic;

/// Command kinds understood by the protocol.
///
/// The set is closed; a token outside this registry is a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Heartbeat, broadcast to a device class.
    Ping,
    /// Response to a PING, carrying the PING timestamp.
    Pong,
    /// Confirm the operation referenced by `task_id` succeeded.
    Ack,
    /// Confirm the operation referenced by `task_id` failed.
    Nack,
    /// Tell a device to suppress its next PONG for a number of seconds.
    Wait,
    /// Client UPdate: server pushes config to a device.
    Cup,
    /// Server UPdate: device pushes state to the server.
    Sup,
    /// General-purpose payload packet.
    Info,
}

impl CommandKind {
    /// Every kind, in registry order.
    pub const ALL: [CommandKind; 8] = [
        CommandKind::Ping,
        CommandKind::Pong,
        CommandKind::Ack,
        CommandKind::Nack,
        CommandKind::Wait,
        CommandKind::Cup,
        CommandKind::Sup,
        CommandKind::Info,
    ];

    /// Get the exact token used on the wire.
    pub fn token(&self) -> &'static str {
        match self {
            CommandKind::Ping => "PING",
            CommandKind::Pong => "PONG",
            CommandKind::Ack => "ACK",
            CommandKind::Nack => "NACK",
            CommandKind::Wait => "WAIT",
            CommandKind::Cup => "CUP",
            CommandKind::Sup => "SUP",
            CommandKind::Info => "INFO",
        }
    }

    /// Parse a wire token. Tokens are case-sensitive.
    pub fn from_token(s: &str) -> Option<CommandKind> {
        match s {
            "PING" => Some(CommandKind::Ping),
            "PONG" => Some(CommandKind::Pong),
            "ACK" => Some(CommandKind::Ack),
            "NACK" => Some(CommandKind::Nack),
            "WAIT" => Some(CommandKind::Wait),
            "CUP" => Some(CommandKind::Cup),
            "SUP" => Some(CommandKind::Sup),
            "INFO" => Some(CommandKind::Info),
            _ => None,
        }
    }

    /// Field-presence rules for this kind.
    pub fn rules(&self) -> FieldRules {
        use Presence::*;
        match self {
            CommandKind::Ping | CommandKind::Pong => FieldRules {
                task_id: Forbidden,
                timeout: Forbidden,
                data: Forbidden,
            },
            CommandKind::Ack | CommandKind::Nack => FieldRules {
                task_id: Required,
                timeout: Forbidden,
                data: Forbidden,
            },
            CommandKind::Wait => FieldRules {
                task_id: Forbidden,
                timeout: Required,
                data: Forbidden,
            },
            CommandKind::Cup => FieldRules {
                task_id: Required,
                timeout: Forbidden,
                data: Required,
            },
            CommandKind::Sup | CommandKind::Info => FieldRules {
                task_id: Optional,
                timeout: Forbidden,
                data: Required,
            },
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Whether a field may, must, or must not appear for a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Field must be supplied.
    Required,
    /// Field may be supplied.
    Optional,
    /// Field must not be supplied.
    Forbidden,
}

/// Per-kind field rules.
///
/// One table drives both packet construction and decoding, so a field set
/// rejected on send is rejected on receive too.
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    /// Rule for the `task_id` correlation field.
    pub task_id: Presence,
    /// Rule for the WAIT `timeout` field.
    pub timeout: Presence,
    /// Rule for the command-specific `data` body.
    pub data: Presence,
}

/// Loose field set, prior to validation against the registry.
///
/// This is what callers hand to [`Packet::new`] and what the decoder
/// extracts from a payload body before the rules for the decoded kind are
/// applied. `timeout` stays a raw JSON value here so the rounding coercion
/// happens in one place.
#[derive(Debug, Clone, Default)]
pub struct PacketFields {
    /// Timestamp in seconds, if the caller already resolved one.
    pub timestamp: Option<u64>,
    /// Correlation id linking a confirmation to its operation.
    pub task_id: Option<String>,
    /// WAIT timeout, as supplied (integer, float, or numeric string).
    pub timeout: Option<Value>,
    /// Command-specific body fields.
    pub data: Option<Map<String, Value>>,
}

/// Per-kind field record. Only the fields valid for the kind exist on the
/// variant, so a constructed body cannot violate the registry rules.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandBody {
    /// Heartbeat; no fields beyond the timestamp.
    Ping,
    /// Heartbeat response; no fields beyond the timestamp.
    Pong,
    /// PONG suppression order.
    Wait {
        /// Seconds the receiver must hold its next PONG.
        timeout_secs: u64,
    },
    /// Success confirmation.
    Ack {
        /// Correlation id of the confirmed operation.
        task_id: String,
    },
    /// Failure confirmation.
    Nack {
        /// Correlation id of the failed operation.
        task_id: String,
    },
    /// Config update pushed to a device.
    Cup {
        /// Correlation id the device must ACK/NACK with.
        task_id: String,
        /// Config fields.
        data: Map<String, Value>,
    },
    /// State update pushed to the server.
    Sup {
        /// Optional correlation id.
        task_id: Option<String>,
        /// State fields.
        data: Map<String, Value>,
    },
    /// General payload.
    Info {
        /// Optional correlation id.
        task_id: Option<String>,
        /// Payload fields.
        data: Map<String, Value>,
    },
}

impl CommandBody {
    /// The command kind this body belongs to.
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandBody::Ping => CommandKind::Ping,
            CommandBody::Pong => CommandKind::Pong,
            CommandBody::Wait { .. } => CommandKind::Wait,
            CommandBody::Ack { .. } => CommandKind::Ack,
            CommandBody::Nack { .. } => CommandKind::Nack,
            CommandBody::Cup { .. } => CommandKind::Cup,
            CommandBody::Sup { .. } => CommandKind::Sup,
            CommandBody::Info { .. } => CommandKind::Info,
        }
    }

    /// Correlation id, for the kinds that carry one.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            CommandBody::Ack { task_id } | CommandBody::Nack { task_id } => Some(task_id),
            CommandBody::Cup { task_id, .. } => Some(task_id),
            CommandBody::Sup { task_id, .. } | CommandBody::Info { task_id, .. } => {
                task_id.as_deref()
            }
            _ => None,
        }
    }

    /// WAIT timeout in seconds, if this is a WAIT body.
    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            CommandBody::Wait { timeout_secs } => Some(*timeout_secs),
            _ => None,
        }
    }

    /// Command-specific data, for the payload-bearing kinds.
    pub fn data(&self) -> Option<&Map<String, Value>> {
        match self {
            CommandBody::Cup { data, .. }
            | CommandBody::Sup { data, .. }
            | CommandBody::Info { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// A single SKABEN protocol message, validated at construction.
///
/// A packet addresses either a whole device class (broadcast, no device id)
/// or one device within it (unicast). Fields are private; every live packet
/// went through the registry rules or the typed constructors, so the encoder
/// never sees a partial field set.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    device_class: String,
    device_id: Option<String>,
    timestamp: Option<u64>,
    body: CommandBody,
}

impl Packet {
    /// Build a packet from a loose field set, validated against the registry
    /// rules for `kind`.
    ///
    /// This is the path the decoder funnels through; callers with fields
    /// already in hand usually prefer the typed constructors below.
    pub fn new(
        kind: CommandKind,
        device_class: impl Into<String>,
        fields: PacketFields,
    ) -> Result<Packet, ValidationError> {
        let device_class = device_class.into();
        validate_device_class(&device_class)?;

        let rules = kind.rules();
        let task_id = check_presence(kind, "task_id", rules.task_id, fields.task_id)?;
        let timeout = check_presence(kind, "timeout", rules.timeout, fields.timeout)?
            .map(|v| coerce_timeout(&v))
            .transpose()?;
        let data = check_presence(kind, "data", rules.data, fields.data)?;

        let body = match kind {
            CommandKind::Ping => CommandBody::Ping,
            CommandKind::Pong => CommandBody::Pong,
            CommandKind::Wait => CommandBody::Wait {
                timeout_secs: require(kind, "timeout", timeout)?,
            },
            CommandKind::Ack => CommandBody::Ack {
                task_id: require(kind, "task_id", task_id)?,
            },
            CommandKind::Nack => CommandBody::Nack {
                task_id: require(kind, "task_id", task_id)?,
            },
            CommandKind::Cup => CommandBody::Cup {
                task_id: require(kind, "task_id", task_id)?,
                data: require(kind, "data", data)?,
            },
            CommandKind::Sup => CommandBody::Sup {
                task_id,
                data: require(kind, "data", data)?,
            },
            CommandKind::Info => CommandBody::Info {
                task_id,
                data: require(kind, "data", data)?,
            },
        };

        Ok(Packet {
            device_class,
            device_id: None,
            timestamp: fields.timestamp,
            body,
        })
    }

    /// Build a packet from an already-typed body.
    pub fn from_body(
        device_class: impl Into<String>,
        body: CommandBody,
    ) -> Result<Packet, ValidationError> {
        let device_class = device_class.into();
        validate_device_class(&device_class)?;
        Ok(Packet {
            device_class,
            device_id: None,
            timestamp: None,
            body,
        })
    }

    /// Heartbeat broadcast for a device class.
    pub fn ping(device_class: impl Into<String>) -> Result<Packet, ValidationError> {
        Self::from_body(device_class, CommandBody::Ping)
    }

    /// Heartbeat response.
    pub fn pong(device_class: impl Into<String>) -> Result<Packet, ValidationError> {
        Self::from_body(device_class, CommandBody::Pong)
    }

    /// PONG suppression order for `timeout_secs` seconds.
    pub fn wait(
        device_class: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Packet, ValidationError> {
        Self::from_body(device_class, CommandBody::Wait { timeout_secs })
    }

    /// Success confirmation for the operation `task_id`.
    pub fn ack(
        device_class: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Result<Packet, ValidationError> {
        Self::from_body(
            device_class,
            CommandBody::Ack {
                task_id: task_id.into(),
            },
        )
    }

    /// Failure confirmation for the operation `task_id`.
    pub fn nack(
        device_class: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Result<Packet, ValidationError> {
        Self::from_body(
            device_class,
            CommandBody::Nack {
                task_id: task_id.into(),
            },
        )
    }

    /// Config update carrying `data`, to be confirmed with `task_id`.
    pub fn cup(
        device_class: impl Into<String>,
        task_id: impl Into<String>,
        data: Map<String, Value>,
    ) -> Result<Packet, ValidationError> {
        Self::from_body(
            device_class,
            CommandBody::Cup {
                task_id: task_id.into(),
                data,
            },
        )
    }

    /// State update carrying `data`.
    pub fn sup(
        device_class: impl Into<String>,
        data: Map<String, Value>,
    ) -> Result<Packet, ValidationError> {
        Self::from_body(device_class, CommandBody::Sup { task_id: None, data })
    }

    /// General payload packet carrying `data`.
    pub fn info(
        device_class: impl Into<String>,
        data: Map<String, Value>,
    ) -> Result<Packet, ValidationError> {
        Self::from_body(device_class, CommandBody::Info { task_id: None, data })
    }

    /// Address the packet to one device within its class (unicast).
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Packet {
        self.device_id = Some(device_id.into());
        self
    }

    /// Pin the packet's timestamp, overriding clock resolution at encode
    /// time.
    pub fn with_timestamp(mut self, timestamp: u64) -> Packet {
        self.timestamp = Some(timestamp);
        self
    }

    /// Broadcast group this packet belongs to.
    pub fn device_class(&self) -> &str {
        &self.device_class
    }

    /// Unicast address within the class, if any.
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Pinned timestamp in seconds, if any.
    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp
    }

    /// The command kind.
    pub fn kind(&self) -> CommandKind {
        self.body.kind()
    }

    /// The per-kind field record.
    pub fn body(&self) -> &CommandBody {
        &self.body
    }
}

fn validate_device_class(device_class: &str) -> Result<(), ValidationError> {
    if device_class.is_empty() {
        return Err(ValidationError::EmptyDeviceClass);
    }
    if device_class.contains(topic::SEPARATOR) {
        return Err(ValidationError::DeviceClassSeparator(
            device_class.to_string(),
        ));
    }
    Ok(())
}

fn check_presence<T>(
    kind: CommandKind,
    field: &'static str,
    presence: Presence,
    value: Option<T>,
) -> Result<Option<T>, ValidationError> {
    match (presence, &value) {
        (Presence::Required, None) => Err(ValidationError::MissingField {
            kind: kind.token(),
            field,
        }),
        (Presence::Forbidden, Some(_)) => Err(ValidationError::ForbiddenField {
            kind: kind.token(),
            field,
        }),
        _ => Ok(value),
    }
}

fn require<T>(
    kind: CommandKind,
    field: &'static str,
    value: Option<T>,
) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField {
        kind: kind.token(),
        field,
    })
}

/// Coerce a timeout value to whole seconds. Floats are rounded, numeric
/// strings parsed; anything else fails.
fn coerce_timeout(value: &Value) -> Result<u64, ValidationError> {
    match value {
        Value::Number(n) => {
            if let Some(secs) = n.as_u64() {
                Ok(secs)
            } else if let Some(f) = n.as_f64() {
                let rounded = f.round();
                if rounded >= 0.0 && rounded <= u64::MAX as f64 {
                    Ok(rounded as u64)
                } else {
                    Err(ValidationError::BadTimeout(value.to_string()))
                }
            } else {
                Err(ValidationError::BadTimeout(value.to_string()))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| ValidationError::BadTimeout(s.clone())),
        other => Err(ValidationError::BadTimeout(other.to_string())),
    }
}
