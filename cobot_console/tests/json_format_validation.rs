/// Checks that outbound messages serialize to the proxy's wire shapes and
/// that every inbound variant decodes from what the proxy sends.
use cobot_console::debug::DebugSessionBuilder;
use cobot_console::lifecycle::CommandLifecycle;
use cobot_console::protocol::*;
use cobot_console::{DecodeError, MessageCodec, TcpState, WatchVariable};
use serde_json::{json, Value};

fn robot_state_fixture() -> Value {
    json!({
        "type": "Robot_state",
        "data": {
            "safety_status": "normal_mode",
            "runtime_state": "playing",
            "robot_mode": "running",
            "joints": [0.0, -1.57, 1.57, -1.57, -1.57, 0.0],
            "tcp": {
                "pose": [0.1, 0.2, 0.3, 0.0, 3.14, 0.0],
                "speed": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                "force": [1.0, 2.0, 3.0, 0.0, 0.0, 0.0]
            },
            "payload": 1.5,
            "digital_out_0": true,
            "digital_out_1": false,
            "digital_out_2": false,
            "digital_out_3": false,
            "digital_out_4": false,
            "digital_out_5": false,
            "digital_out_6": false,
            "digital_out_7": true
        }
    })
}

#[test]
fn test_command_json_format() {
    let mut lifecycle = CommandLifecycle::new();
    let command = lifecycle.submit("movej([0, 0, 0, 0, 0, 0])").unwrap();
    let json = MessageCodec::encode(&OutboundMessage::Command(CommandMessage::from(&command)));

    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["type"], "Command");
    assert_eq!(value["data"]["id"], 0);
    assert_eq!(value["data"]["command"], "movej([0, 0, 0, 0, 0, 0])");
    assert_eq!(value.as_object().unwrap().len(), 2, "Unexpected envelope keys in {}", json);
}

#[test]
fn test_debug_json_format() {
    let script = vec!["a = 1".to_string(), "movej(q)".to_string(), "b = 2".to_string()];
    let request = DebugSessionBuilder::new(script)
        .breakpoint(2)
        .extra_variable(2, WatchVariable::new("q", "q"))
        .global_variables([WatchVariable::new("pose", "get_actual_tcp_pose()")])
        .build()
        .unwrap();
    let json = MessageCodec::encode(&OutboundMessage::Debug(request));
    let value: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["type"], "Debug");
    let data = &value["data"];
    assert_eq!(data["script"].as_array().unwrap().len(), 3);

    let point = &data["inspectionPoints"][0];
    assert_eq!(point["id"], 1);
    assert_eq!(point["lineNumber"], 2);
    assert_eq!(point["command"], "movej(q)");
    assert_eq!(point["additionalVariablesToRead"][0]["name"], "q");
    assert_eq!(point["additionalVariablesToRead"][0]["readCommand"], "q");
    assert!(point.get("line_number").is_none(), "Incorrect field name 'line_number' found");
    assert!(point.get("source_text").is_none(), "Incorrect field name 'source_text' found");

    assert_eq!(data["globalVariables"][0]["readCommand"], "get_actual_tcp_pose()");
    assert!(data.get("global_variables").is_none(), "Incorrect field name 'global_variables' found");
}

#[test]
fn test_stop_and_undo_json_format() {
    let stop = MessageCodec::encode(&OutboundMessage::StopCommand(StopCommand::new(1_700_000_000_000)));
    let value: Value = serde_json::from_str(&stop).unwrap();
    assert_eq!(value["type"], "StopCommand");
    assert_eq!(value["data"]["id"], 1_700_000_000_000u64);
    assert_eq!(value["data"]["message"], "STOP_PROGRAM");

    let undo = MessageCodec::encode(&OutboundMessage::Undo(UndoRequest { id: 4 }));
    assert_eq!(undo, r#"{"type":"Undo","data":{"id":4}}"#);
}

#[test]
fn test_outbound_messages_decode_back_to_their_values() {
    let script = vec!["a = 1".to_string(), "movej(q)".to_string()];
    let debug = DebugSessionBuilder::new(script)
        .breakpoint(1)
        .breakpoint(2)
        .extra_variable(2, WatchVariable::new("q", "q"))
        .global_variables([WatchVariable::new("joints", "get_actual_joint_positions()")])
        .build()
        .unwrap();

    let messages = vec![
        OutboundMessage::Command(CommandMessage {
            id: 3,
            command: "set_digital_out(1, True)".to_string(),
        }),
        OutboundMessage::Debug(debug),
        OutboundMessage::StopCommand(StopCommand::new(1_700_000_000_000)),
        OutboundMessage::Undo(UndoRequest { id: 2 }),
    ];

    for message in messages {
        let json = MessageCodec::encode(&message);
        assert_eq!(
            MessageCodec::decode_outbound(&json),
            Ok(message),
            "Did not decode back from {}",
            json
        );
    }
}

#[test]
fn test_decode_ack_and_command_messages() {
    let ack = MessageCodec::decode(
        r#"{"type": "Ack_response", "data": {"id": 2, "status": "Error", "command": "foo()", "message": "error: foo is not defined"}}"#,
    )
    .unwrap();
    assert_eq!(
        ack,
        InboundMessage::AckResponse(AckResponse {
            id: 2,
            status: AckStatus::Error,
            command: "foo()".to_string(),
            message: "error: foo is not defined".to_string(),
        })
    );
    assert_eq!(ack.command_id(), Some(2));

    let feedback = MessageCodec::decode(r#"{"type": "Feedback", "data": {"id": 2, "message": "hello"}}"#).unwrap();
    assert_eq!(feedback.message_type(), MessageType::Feedback);

    let undo = MessageCodec::decode(r#"{"type": "Undo_response", "data": {"id": 0, "status": "Success"}}"#).unwrap();
    assert_eq!(
        undo,
        InboundMessage::UndoResponse(UndoResponse { id: 0, status: UndoStatus::Success })
    );
}

#[test]
fn test_decode_robot_state() {
    let message = MessageCodec::decode(&robot_state_fixture().to_string()).unwrap();
    let InboundMessage::RobotState(state) = message else {
        panic!("expected Robot_state, got {:?}", message);
    };

    assert_eq!(state.safety_status, SafetyStatus::NormalMode);
    assert_eq!(state.runtime_state, RuntimeState::Playing);
    assert_eq!(state.robot_mode, RobotMode::Running);
    assert_eq!(state.joints[1], -1.57);
    assert_eq!(state.tcp.force[2], 3.0);
    assert_eq!(state.payload, 1.5);
    assert_eq!(state.digital_out, [true, false, false, false, false, false, false, true]);
}

#[test]
fn test_inbound_envelopes_decode_back_to_their_values() {
    let messages = vec![
        InboundMessage::AckResponse(AckResponse {
            id: 1,
            status: AckStatus::Ok,
            command: "sleep(1)".to_string(),
            message: "ack: sleep(1)".to_string(),
        }),
        InboundMessage::Feedback(Feedback { id: 1, message: "tick".to_string() }),
        InboundMessage::RobotState(RobotState {
            safety_status: SafetyStatus::ProtectiveStop,
            runtime_state: RuntimeState::Paused,
            robot_mode: RobotMode::NoController,
            joints: [0.5; 6],
            tcp: TcpState::default(),
            payload: 0.0,
            digital_out: [false, true, false, true, false, true, false, true],
        }),
        InboundMessage::ReportState(ReportState {
            id: 3,
            timestamp: 1_700_000_000,
            variables: vec![ReportedVariable {
                name: "joints".to_string(),
                kind: VariableKind::List,
                value: VariableValue::List(vec![VariableValue::Float(0.5), VariableValue::Float(1.5)]),
                global: true,
            }],
        }),
        InboundMessage::CommandFinished(CommandFinished { id: 1, command: "sleep(1)".to_string() }),
        InboundMessage::UndoResponse(UndoResponse { id: 1, status: UndoStatus::Failure }),
    ];

    for message in messages {
        let wire = MessageCodec::encode_inbound(&message);
        assert_eq!(MessageCodec::decode(&wire), Ok(message), "wire: {}", wire);
    }
}

#[test]
fn test_every_required_robot_state_field_is_enforced() {
    let fixture = robot_state_fixture();
    let fields: Vec<String> = fixture["data"].as_object().unwrap().keys().cloned().collect();

    for field in fields {
        for replacement in [None, Some(Value::Null)] {
            let mut broken = fixture.clone();
            let data = broken["data"].as_object_mut().unwrap();
            match &replacement {
                None => {
                    data.remove(&field);
                }
                Some(null) => {
                    data.insert(field.clone(), null.clone());
                }
            }

            assert_eq!(
                MessageCodec::decode(&broken.to_string()),
                Err(DecodeError::MissingField {
                    message_type: "Robot_state".to_string(),
                    field: format!("data.{}", field),
                }),
                "field {} ({:?}) was not enforced",
                field,
                replacement
            );
        }
    }

    let mut no_force = fixture.clone();
    no_force["data"]["tcp"].as_object_mut().unwrap().remove("force");
    assert_eq!(
        MessageCodec::decode(&no_force.to_string()),
        Err(DecodeError::MissingField {
            message_type: "Robot_state".to_string(),
            field: "data.tcp.force".to_string(),
        })
    );
}

#[test]
fn test_required_fields_of_small_messages() {
    let cases = [
        (r#"{"type": "Ack_response", "data": {"status": "Ok", "command": "x", "message": "ack: x"}}"#, "Ack_response", "data.id"),
        (r#"{"type": "Ack_response", "data": {"id": 1, "command": "x", "message": "ack: x"}}"#, "Ack_response", "data.status"),
        (r#"{"type": "Ack_response", "data": {"id": 1, "status": "Ok", "message": "ack: x"}}"#, "Ack_response", "data.command"),
        (r#"{"type": "Ack_response", "data": {"id": 1, "status": "Ok", "command": "x"}}"#, "Ack_response", "data.message"),
        (r#"{"type": "Feedback", "data": {"message": "m"}}"#, "Feedback", "data.id"),
        (r#"{"type": "Command_finished", "data": {"id": 1}}"#, "Command_finished", "data.command"),
        (r#"{"type": "Undo_response", "data": {"id": 1, "status": null}}"#, "Undo_response", "data.status"),
        (r#"{"type": "Feedback"}"#, "Feedback", "data"),
        (r#"{"type": "Report_state", "data": [], "timestamp": 1}"#, "Report_state", "id"),
        (r#"{"type": "Report_state", "data": [], "id": 1}"#, "Report_state", "timestamp"),
        (r#"{"type": "Report_state", "data": [{"name": "i", "type": "Integer"}], "id": 1, "timestamp": 1}"#, "Report_state", "data[0].value"),
    ];

    for (raw, message_type, field) in cases {
        assert_eq!(
            MessageCodec::decode(raw),
            Err(DecodeError::MissingField {
                message_type: message_type.to_string(),
                field: field.to_string(),
            }),
            "{}",
            raw
        );
    }
}

#[test]
fn test_wrong_joint_count_is_invalid() {
    let mut fixture = robot_state_fixture();
    fixture["data"]["joints"] = json!([0.0, 0.0, 0.0, 0.0, 0.0]);
    assert!(matches!(
        MessageCodec::decode(&fixture.to_string()),
        Err(DecodeError::InvalidField { field, .. }) if field == "data.joints"
    ));
}

#[test]
fn test_report_state_values_are_reparsed_once() {
    let raw = json!({
        "type": "Report_state",
        "id": 2,
        "timestamp": 1_700_000_123,
        "data": [
            {"name": "joints", "type": "String", "value": "[0.0, -1.5, 1.5, 0, 0, 0]", "global": true},
            {"name": "counter", "type": "String", "value": "3.5"},
            {"name": "flag", "type": "String", "value": "true"},
            {"name": "label", "type": "String", "value": "p[0.1, 0.2"},
            {"name": "raw_list", "type": "Pose", "value": [0.1, 0.2, 0.3, 0.0, 0.0, 0.0]},
            {"name": "count", "type": "Integer", "value": 7}
        ]
    });
    let InboundMessage::ReportState(report) = MessageCodec::decode(&raw.to_string()).unwrap() else {
        panic!("expected Report_state");
    };

    assert_eq!(report.id, 2);
    assert_eq!(report.timestamp, 1_700_000_123);

    let joints = report.variable("joints").unwrap();
    assert_eq!(joints.kind, VariableKind::List);
    assert_eq!(joints.value.as_list().map(<[VariableValue]>::len), Some(6));
    assert!(joints.global);

    let counter = report.variable("counter").unwrap();
    assert_eq!(counter.value, VariableValue::Float(3.5));
    assert_eq!(counter.kind, VariableKind::Float);

    assert_eq!(report.variable("flag").unwrap().value, VariableValue::Boolean(true));
    assert_eq!(report.variable("flag").unwrap().kind, VariableKind::Boolean);

    let label = report.variable("label").unwrap();
    assert_eq!(label.value, VariableValue::String("p[0.1, 0.2".to_string()));
    assert_eq!(label.kind, VariableKind::String);
    assert!(!label.global);

    // Structured values keep their declared kind.
    assert_eq!(report.variable("raw_list").unwrap().kind, VariableKind::Pose);
    assert_eq!(report.variable("count").unwrap().kind, VariableKind::Integer);
    assert_eq!(report.variable("count").unwrap().value, VariableValue::Integer(7));
}

#[test]
fn test_object_values_are_rejected() {
    let raw = r#"{"type": "Report_state", "id": 1, "timestamp": 1, "data": [{"name": "x", "type": "String", "value": {"a": 1}}]}"#;
    assert!(matches!(
        MessageCodec::decode(raw),
        Err(DecodeError::InvalidField { field, .. }) if field == "data[0].value"
    ));
}
