use serde::{Deserialize, Serialize};

use crate::lifecycle::Command;

/// Text sent by the stop button.
pub const STOP_PROGRAM: &str = "STOP_PROGRAM";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandMessage {
    pub id: u32,
    pub command: String,
}

impl From<&Command> for CommandMessage {
    fn from(command: &Command) -> Self {
        Self {
            id: command.id(),
            command: command.text().to_string(),
        }
    }
}

/// Halts whatever program the robot is running.
///
/// The id is not a command id; it only distinguishes stop requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StopCommand {
    pub id: u64,
    pub message: String,
}

impl StopCommand {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            message: STOP_PROGRAM.to_string(),
        }
    }
}

/// Asks the proxy to rewind execution back to (and including) command `id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UndoRequest {
    pub id: u32,
}
