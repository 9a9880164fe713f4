use serde::{Deserialize, Serialize};

use crate::protocol::AckStatus;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandState {
    /// Sent, no verdict yet.
    Entered,
    Accepted,
    Rejected,
    Finished,
    Undone,
}

impl CommandState {
    /// `Rejected` and `Undone` accept no further transitions.
    pub fn is_absorbing(&self) -> bool {
        matches!(self, CommandState::Rejected | CommandState::Undone)
    }

    /// Next state after an acknowledgement, or `None` if the ack does not apply.
    pub fn on_ack(&self, status: AckStatus) -> Option<CommandState> {
        match (self, status) {
            (CommandState::Entered, AckStatus::Ok) => Some(CommandState::Accepted),
            (CommandState::Entered, AckStatus::Error) => Some(CommandState::Rejected),
            _ => None,
        }
    }

    pub fn on_finished(&self) -> Option<CommandState> {
        match self {
            CommandState::Accepted => Some(CommandState::Finished),
            _ => None,
        }
    }

    pub fn on_undo(&self) -> Option<CommandState> {
        match self {
            CommandState::Entered | CommandState::Accepted | CommandState::Finished => {
                Some(CommandState::Undone)
            }
            CommandState::Rejected | CommandState::Undone => None,
        }
    }
}

impl std::fmt::Display for CommandState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommandState::Entered => "entered",
            CommandState::Accepted => "accepted",
            CommandState::Rejected => "rejected",
            CommandState::Finished => "finished",
            CommandState::Undone => "undone",
        };
        f.write_str(name)
    }
}

/// One submitted command line and everything the proxy said about it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Command {
    id: u32,
    text: String,
    state: CommandState,
    response: Option<String>,
    feedback: Vec<String>,
}

impl Command {
    pub(crate) fn new(id: u32, text: String) -> Self {
        Self {
            id,
            text,
            state: CommandState::Entered,
            response: None,
            feedback: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// The command exactly as submitted.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// The ack message, verbatim. For a rejected command this is the reason.
    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn feedback(&self) -> &[String] {
        &self.feedback
    }

    pub(crate) fn set_state(&mut self, state: CommandState) {
        self.state = state;
    }

    pub(crate) fn set_response(&mut self, response: String) {
        self.response = Some(response);
    }

    pub(crate) fn push_feedback(&mut self, message: String) {
        self.feedback.push(message);
    }
}
