//! Translation between proxy wire text and the typed protocol messages.
//!
//! Decoding is total and fail-fast: every required field of the declared
//! variant is checked, `null` counts as absent, and the first problem found is
//! returned as a [`DecodeError`]. Nothing is defaulted.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::protocol::*;
use crate::{DecodeError, TcpState, DIGITAL_OUTPUT_COUNT};

#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCodec;

impl MessageCodec {
    /// Decodes one inbound message.
    pub fn decode(raw: &str) -> Result<InboundMessage, DecodeError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| DecodeError::NotJson(e.to_string()))?;
        let Value::Object(envelope) = value else {
            return Err(DecodeError::NotARecord);
        };

        let tag = match envelope.get("type") {
            None | Some(Value::Null) => return Err(DecodeError::MissingType),
            Some(Value::String(tag)) => tag.as_str(),
            Some(other) => return Err(DecodeError::UnrecognizedType(other.to_string())),
        };
        let message_type = MessageType::inbound_from_tag(tag)
            .ok_or_else(|| DecodeError::UnrecognizedType(tag.to_string()))?;

        let envelope = Fields::root(message_type, &envelope);
        match message_type {
            MessageType::AckResponse => decode_ack(&envelope.record("data")?),
            MessageType::Feedback => decode_feedback(&envelope.record("data")?),
            MessageType::RobotState => decode_robot_state(&envelope.record("data")?),
            MessageType::ReportState => decode_report_state(&envelope),
            MessageType::CommandFinished => decode_command_finished(&envelope.record("data")?),
            MessageType::UndoResponse => decode_undo_response(&envelope.record("data")?),
            _ => Err(DecodeError::UnrecognizedType(tag.to_string())),
        }
    }

    /// Decodes a binary frame holding UTF-8 JSON.
    pub fn decode_bytes(raw: &[u8]) -> Result<InboundMessage, DecodeError> {
        let text = std::str::from_utf8(raw).map_err(|e| DecodeError::NotJson(e.to_string()))?;
        Self::decode(text)
    }

    pub fn encode(message: &OutboundMessage) -> String {
        // Outbound payloads are plain structs with string keys, serializing them cannot fail.
        serde_json::to_string(message).unwrap_or_default()
    }

    /// Encodes a message the way the proxy puts it on the wire.
    pub fn encode_inbound(message: &InboundMessage) -> String {
        let tag = message.message_type().tag();
        let envelope = match message {
            InboundMessage::AckResponse(ack) => json!({
                "type": tag,
                "data": {
                    "id": ack.id,
                    "status": match ack.status {
                        AckStatus::Ok => "Ok",
                        AckStatus::Error => "Error",
                    },
                    "command": ack.command,
                    "message": ack.message,
                }
            }),
            InboundMessage::Feedback(feedback) => json!({
                "type": tag,
                "data": { "id": feedback.id, "message": feedback.message }
            }),
            InboundMessage::CommandFinished(finished) => json!({
                "type": tag,
                "data": { "id": finished.id, "command": finished.command }
            }),
            InboundMessage::UndoResponse(undo) => json!({
                "type": tag,
                "data": {
                    "id": undo.id,
                    "status": match undo.status {
                        UndoStatus::Success => "Success",
                        UndoStatus::Failure => "Failure",
                    },
                }
            }),
            InboundMessage::RobotState(state) => {
                let mut data = Map::new();
                data.insert("safety_status".into(), enum_name(&state.safety_status));
                data.insert("runtime_state".into(), enum_name(&state.runtime_state));
                data.insert("robot_mode".into(), enum_name(&state.robot_mode));
                data.insert("joints".into(), json!(state.joints));
                data.insert(
                    "tcp".into(),
                    json!({
                        "pose": state.tcp.pose,
                        "speed": state.tcp.speed,
                        "force": state.tcp.force,
                    }),
                );
                data.insert("payload".into(), json!(state.payload));
                for (index, on) in state.digital_out.iter().enumerate() {
                    data.insert(format!("digital_out_{}", index), Value::Bool(*on));
                }
                json!({ "type": tag, "data": data })
            }
            InboundMessage::ReportState(report) => {
                let variables: Vec<Value> = report
                    .variables
                    .iter()
                    .map(|variable| {
                        json!({
                            "name": variable.name,
                            "type": enum_name(&variable.kind),
                            "value": value_to_json(&variable.value),
                            "global": variable.global,
                        })
                    })
                    .collect();
                json!({
                    "type": tag,
                    "data": variables,
                    "id": report.id,
                    "timestamp": report.timestamp,
                })
            }
        };
        envelope.to_string()
    }

    /// Decodes a console → proxy message. The simulated proxy reads its
    /// requests through this.
    pub fn decode_outbound(raw: &str) -> Result<OutboundMessage, DecodeError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| DecodeError::NotJson(e.to_string()))?;
        let Some(envelope) = value.as_object() else {
            return Err(DecodeError::NotARecord);
        };
        let tag = match envelope.get("type") {
            None | Some(Value::Null) => return Err(DecodeError::MissingType),
            Some(Value::String(tag)) => tag.clone(),
            Some(other) => return Err(DecodeError::UnrecognizedType(other.to_string())),
        };
        if !matches!(tag.as_str(), "Command" | "Debug" | "StopCommand" | "Undo") {
            return Err(DecodeError::UnrecognizedType(tag));
        }
        if matches!(envelope.get("data"), None | Some(Value::Null)) {
            return Err(DecodeError::missing(&tag, "data"));
        }
        OutboundMessage::deserialize(&value).map_err(|e| DecodeError::invalid(&tag, "data", e))
    }
}

fn enum_name<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn value_to_json(value: &VariableValue) -> Value {
    match value {
        VariableValue::Boolean(on) => Value::Bool(*on),
        VariableValue::Integer(number) => json!(number),
        VariableValue::Float(number) => json!(number),
        VariableValue::String(text) => Value::String(text.clone()),
        VariableValue::List(items) => Value::Array(items.iter().map(value_to_json).collect()),
    }
}

/// Field access on one JSON object of a message, reporting failures with the
/// dotted path of the offending field.
struct Fields<'a> {
    message_type: MessageType,
    path: String,
    record: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn root(message_type: MessageType, record: &'a Map<String, Value>) -> Self {
        Self {
            message_type,
            path: String::new(),
            record,
        }
    }

    fn path_of(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.path, field)
        }
    }

    fn value(&self, field: &str) -> Result<&'a Value, DecodeError> {
        match self.record.get(field) {
            None | Some(Value::Null) => Err(DecodeError::missing(
                self.message_type.tag(),
                &self.path_of(field),
            )),
            Some(value) => Ok(value),
        }
    }

    fn get<T: DeserializeOwned>(&self, field: &str) -> Result<T, DecodeError> {
        let value = self.value(field)?;
        T::deserialize(value)
            .map_err(|e| DecodeError::invalid(self.message_type.tag(), &self.path_of(field), e))
    }

    fn record(&self, field: &str) -> Result<Fields<'a>, DecodeError> {
        match self.value(field)? {
            Value::Object(record) => Ok(Fields {
                message_type: self.message_type,
                path: self.path_of(field),
                record,
            }),
            _ => Err(DecodeError::invalid(
                self.message_type.tag(),
                &self.path_of(field),
                "expected an object",
            )),
        }
    }

    fn list(&self, field: &str) -> Result<&'a Vec<Value>, DecodeError> {
        match self.value(field)? {
            Value::Array(items) => Ok(items),
            _ => Err(DecodeError::invalid(
                self.message_type.tag(),
                &self.path_of(field),
                "expected a list",
            )),
        }
    }
}

fn decode_ack(data: &Fields) -> Result<InboundMessage, DecodeError> {
    Ok(InboundMessage::AckResponse(AckResponse {
        id: data.get("id")?,
        status: data.get("status")?,
        command: data.get("command")?,
        message: data.get("message")?,
    }))
}

fn decode_feedback(data: &Fields) -> Result<InboundMessage, DecodeError> {
    Ok(InboundMessage::Feedback(Feedback {
        id: data.get("id")?,
        message: data.get("message")?,
    }))
}

fn decode_command_finished(data: &Fields) -> Result<InboundMessage, DecodeError> {
    Ok(InboundMessage::CommandFinished(CommandFinished {
        id: data.get("id")?,
        command: data.get("command")?,
    }))
}

fn decode_undo_response(data: &Fields) -> Result<InboundMessage, DecodeError> {
    Ok(InboundMessage::UndoResponse(UndoResponse {
        id: data.get("id")?,
        status: data.get("status")?,
    }))
}

fn decode_robot_state(data: &Fields) -> Result<InboundMessage, DecodeError> {
    let tcp = data.record("tcp")?;
    let mut digital_out = [false; DIGITAL_OUTPUT_COUNT];
    for (index, slot) in digital_out.iter_mut().enumerate() {
        *slot = data.get(&format!("digital_out_{}", index))?;
    }

    Ok(InboundMessage::RobotState(RobotState {
        safety_status: data.get("safety_status")?,
        runtime_state: data.get("runtime_state")?,
        robot_mode: data.get("robot_mode")?,
        joints: data.get("joints")?,
        tcp: TcpState {
            pose: tcp.get("pose")?,
            speed: tcp.get("speed")?,
            force: tcp.get("force")?,
        },
        payload: data.get("payload")?,
        digital_out,
    }))
}

fn decode_report_state(envelope: &Fields) -> Result<InboundMessage, DecodeError> {
    let id = envelope.get("id")?;
    let timestamp = envelope.get("timestamp")?;

    let entries = envelope.list("data")?;
    let mut variables = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let path = format!("data[{}]", index);
        let Value::Object(record) = entry else {
            return Err(DecodeError::invalid(
                envelope.message_type.tag(),
                &path,
                "expected an object",
            ));
        };
        let fields = Fields {
            message_type: envelope.message_type,
            path,
            record,
        };
        let global = match record.get("global") {
            None | Some(Value::Null) => false,
            Some(_) => fields.get("global")?,
        };
        let variable = ReportedVariable {
            name: fields.get("name")?,
            kind: fields.get("type")?,
            value: fields.get("value")?,
            global,
        };
        variables.push(variable.settle());
    }

    Ok(InboundMessage::ReportState(ReportState {
        id,
        timestamp,
        variables,
    }))
}
