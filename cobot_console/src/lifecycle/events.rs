use serde::{Deserialize, Serialize};

use super::{Command, CommandState};
use crate::protocol::AckStatus;
use crate::ProtocolInconsistency;

/// Inbound protocol events that move a command through its states.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Ack {
        id: u32,
        status: AckStatus,
        message: String,
    },
    Finished {
        id: u32,
    },
    /// A confirmed undo. Rewinds `id` and every later command.
    Undo {
        id: u32,
    },
}

impl LifecycleEvent {
    pub fn id(&self) -> u32 {
        match self {
            LifecycleEvent::Ack { id, .. }
            | LifecycleEvent::Finished { id }
            | LifecycleEvent::Undo { id } => *id,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Ack { .. } => "Ack_response",
            LifecycleEvent::Finished { .. } => "Command_finished",
            LifecycleEvent::Undo { .. } => "Undo_response",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub id: u32,
    pub from: CommandState,
    pub to: CommandState,
}

/// Broadcast to lifecycle subscribers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    Entered(Command),
    Transition(Transition),
    Feedback { id: u32, message: String },
    Inconsistency(ProtocolInconsistency),
}
