mod inbound;
mod outbound;
mod robot_state;
mod value;

pub use inbound::*;
pub use outbound::*;
pub use robot_state::*;
pub use value::*;

use serde::{Deserialize, Serialize};

/// Every `type` tag the proxy protocol knows, in both directions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    #[serde(rename = "Ack_response")]
    AckResponse,
    #[serde(rename = "Feedback")]
    Feedback,
    #[serde(rename = "Robot_state")]
    RobotState,
    #[serde(rename = "Report_state")]
    ReportState,
    #[serde(rename = "Command_finished")]
    CommandFinished,
    #[serde(rename = "Undo_response")]
    UndoResponse,

    #[serde(rename = "Command")]
    Command,
    #[serde(rename = "Debug")]
    Debug,
    #[serde(rename = "StopCommand")]
    StopCommand,
    #[serde(rename = "Undo")]
    Undo,
}

impl MessageType {
    pub fn tag(&self) -> &'static str {
        match self {
            MessageType::AckResponse => "Ack_response",
            MessageType::Feedback => "Feedback",
            MessageType::RobotState => "Robot_state",
            MessageType::ReportState => "Report_state",
            MessageType::CommandFinished => "Command_finished",
            MessageType::UndoResponse => "Undo_response",
            MessageType::Command => "Command",
            MessageType::Debug => "Debug",
            MessageType::StopCommand => "StopCommand",
            MessageType::Undo => "Undo",
        }
    }

    /// Looks up an inbound (proxy → console) tag.
    pub fn inbound_from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Ack_response" => Some(MessageType::AckResponse),
            "Feedback" => Some(MessageType::Feedback),
            "Robot_state" => Some(MessageType::RobotState),
            "Report_state" => Some(MessageType::ReportState),
            "Command_finished" => Some(MessageType::CommandFinished),
            "Undo_response" => Some(MessageType::UndoResponse),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Messages the proxy sends to the console.
///
/// The set is closed: anything else on the wire is a
/// [`DecodeError`](crate::DecodeError), never a partially filled variant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum InboundMessage {
    AckResponse(AckResponse),
    Feedback(Feedback),
    RobotState(RobotState),
    ReportState(ReportState),
    CommandFinished(CommandFinished),
    UndoResponse(UndoResponse),
}

impl InboundMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            InboundMessage::AckResponse(_) => MessageType::AckResponse,
            InboundMessage::Feedback(_) => MessageType::Feedback,
            InboundMessage::RobotState(_) => MessageType::RobotState,
            InboundMessage::ReportState(_) => MessageType::ReportState,
            InboundMessage::CommandFinished(_) => MessageType::CommandFinished,
            InboundMessage::UndoResponse(_) => MessageType::UndoResponse,
        }
    }

    /// The command id this message refers to, for the variants that carry one.
    ///
    /// `Report_state` ids name an inspection point, not a command, so they are
    /// not returned here.
    pub fn command_id(&self) -> Option<u32> {
        match self {
            InboundMessage::AckResponse(ack) => Some(ack.id),
            InboundMessage::Feedback(feedback) => Some(feedback.id),
            InboundMessage::CommandFinished(finished) => Some(finished.id),
            InboundMessage::UndoResponse(undo) => Some(undo.id),
            InboundMessage::RobotState(_) | InboundMessage::ReportState(_) => None,
        }
    }
}

/// Messages the console sends to the proxy.
///
/// Serializes to the `{ "type": ..., "data": { ... } }` envelope.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum OutboundMessage {
    Command(CommandMessage),
    Debug(crate::debug::DebugSessionRequest),
    StopCommand(StopCommand),
    Undo(UndoRequest),
}

impl OutboundMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            OutboundMessage::Command(_) => MessageType::Command,
            OutboundMessage::Debug(_) => MessageType::Debug,
            OutboundMessage::StopCommand(_) => MessageType::StopCommand,
            OutboundMessage::Undo(_) => MessageType::Undo,
        }
    }
}
