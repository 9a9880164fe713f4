use serde::{Deserialize, Serialize};

use super::ReportedVariable;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Ok,
    Error,
}

/// The proxy's verdict on a submitted command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AckResponse {
    pub id: u32,
    pub status: AckStatus,
    pub command: String,
    /// Controller output, verbatim. For rejected commands this is the reason,
    /// usually of the form `error: ...`.
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub id: u32,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandFinished {
    pub id: u32,
    pub command: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoStatus {
    Success,
    Failure,
}

/// Answer to an `Undo` request. On success the robot has rewound every
/// command from `id` onwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UndoResponse {
    pub id: u32,
    pub status: UndoStatus,
}

/// Variable values captured when the robot passed an inspection point.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReportState {
    /// Id of the inspection point that emitted this report.
    pub id: u32,
    /// Capture time as stamped by the proxy.
    pub timestamp: u64,
    pub variables: Vec<ReportedVariable>,
}

impl ReportState {
    pub fn variable(&self, name: &str) -> Option<&ReportedVariable> {
        self.variables.iter().find(|variable| variable.name == name)
    }
}
