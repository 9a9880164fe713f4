use serde::{Deserialize, Serialize};

use super::DecodeError;

/// An inbound event names a command this session never issued.
///
/// Reported and surfaced, never fatal: the lifecycle keeps processing the
/// events that follow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolInconsistency {
    #[error("{event} references unknown command id {id}")]
    UnknownCommand { id: u32, event: String },
}

impl ProtocolInconsistency {
    pub fn id(&self) -> u32 {
        match self {
            ProtocolInconsistency::UnknownCommand { id, .. } => *id,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebugSessionError {
    #[error("inspection point on line {line} is outside the script (1..={script_lines})")]
    LineOutOfRange { line: u32, script_lines: usize },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("address cannot be empty")]
    EmptyAddress,
    #[error("port number must be greater than 0")]
    ZeroPort,
    #[error("inbound channel capacity must be greater than 0")]
    ZeroCapacity,
    #[error("invalid value for {variable}: {value}")]
    InvalidEnv { variable: String, value: String },
    #[error("could not resolve {0}")]
    Unresolvable(String),
}

/// Umbrella error for the session-level operations.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Inconsistency(#[from] ProtocolInconsistency),
    #[error(transparent)]
    DebugSession(#[from] DebugSessionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
