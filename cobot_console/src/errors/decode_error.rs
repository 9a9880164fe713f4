use serde::{Deserialize, Serialize};

/// Why an inbound message was refused by [`MessageCodec`](crate::MessageCodec).
///
/// A decode error is fatal to that one message only; the connection keeps
/// delivering whatever arrives after it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("message is not valid JSON: {0}")]
    NotJson(String),

    #[error("message envelope is not a JSON object")]
    NotARecord,

    #[error("message has no `type` discriminator")]
    MissingType,

    #[error("unrecognized message type `{0}`")]
    UnrecognizedType(String),

    /// A required field is absent or `null`.
    #[error("`{message_type}` message is missing required field `{field}`")]
    MissingField { message_type: String, field: String },

    /// A required field is present but has the wrong shape.
    #[error("`{message_type}` message has invalid field `{field}`: {reason}")]
    InvalidField {
        message_type: String,
        field: String,
        reason: String,
    },
}

impl DecodeError {
    pub(crate) fn missing(message_type: &str, field: &str) -> Self {
        DecodeError::MissingField {
            message_type: message_type.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(message_type: &str, field: &str, reason: impl ToString) -> Self {
        DecodeError::InvalidField {
            message_type: message_type.to_string(),
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
