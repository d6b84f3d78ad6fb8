//! Error types for the SKABEN protocol.

use thiserror::Error;

/// Errors raised when a packet is built with a field set that violates the
/// rules for its command kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Device class is empty.
    #[error("device class must not be empty")]
    EmptyDeviceClass,

    /// Device class contains the topic separator.
    #[error("device class must not contain '/': {0}")]
    DeviceClassSeparator(String),

    /// A field the kind requires was not supplied.
    #[error("{kind} requires field <{field}>")]
    MissingField {
        /// Wire token of the command kind.
        kind: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field the kind does not carry was supplied.
    #[error("{kind} does not accept field <{field}>")]
    ForbiddenField {
        /// Wire token of the command kind.
        kind: &'static str,
        /// Name of the unexpected field.
        field: &'static str,
    },

    /// Timeout value could not be coerced to whole seconds.
    #[error("bad timeout value: {0}")]
    BadTimeout(String),
}

/// Errors raised while serializing a packet to its wire form.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The packet failed registry validation.
    #[error("invalid packet: {0}")]
    Invalid(#[from] ValidationError),

    /// The JSON body could not be serialized.
    #[error("cannot serialize payload body: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while parsing a received message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Topic has no device class segment.
    #[error("topic has no device class")]
    EmptyDeviceClass,

    /// Payload bytes are not valid UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Payload has no `/` between command token and JSON body.
    #[error("payload has no command/body separator")]
    MissingSeparator,

    /// Command token is not in the registry.
    #[error("unknown command token: {0}")]
    UnknownCommand(String),

    /// JSON body failed to parse.
    #[error("cannot parse payload body: {0}")]
    BadJson(#[from] serde_json::Error),

    /// JSON body parsed, but is not an object.
    #[error("payload body is not a JSON object")]
    NotAnObject,

    /// A field every payload must carry is missing.
    #[error("missing field <{0}> in payload body")]
    MissingField(&'static str),

    /// A known field holds a value of the wrong type.
    #[error("field <{field}> has wrong type: expected {expected}")]
    BadFieldType {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the expected type.
        expected: &'static str,
    },

    /// Decoded field set failed the registry rules for its kind.
    #[error("invalid field set for decoded packet: {0}")]
    Invalid(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ValidationError::MissingField {
            kind: "WAIT",
            field: "timeout",
        };
        assert!(err.to_string().contains("WAIT"));
        assert!(err.to_string().contains("timeout"));

        let err = DecodeError::UnknownCommand("BOGUS".to_string());
        assert!(err.to_string().contains("BOGUS"));
    }
}
