use cobot_console::protocol::{RobotMode, RobotState, RuntimeState, SafetyStatus, VariableValue};
use cobot_console::{TcpState, DIGITAL_OUTPUT_COUNT, JOINT_COUNT};

/// The simulated arm. Joints creep while a program is running so the
/// telemetry stream is not static.
#[derive(Clone, Debug)]
pub struct SimRobot {
    joints: [f64; JOINT_COUNT],
    pose: [f64; JOINT_COUNT],
    payload: f64,
    digital_out: [bool; DIGITAL_OUTPUT_COUNT],
    running: bool,
}

impl Default for SimRobot {
    fn default() -> Self {
        Self {
            // Elbow up, wrist down: a comfortable mid-workspace configuration.
            joints: [0.0, -1.57, 1.57, -1.57, -1.57, 0.0],
            pose: [0.3, -0.1, 0.4, 0.0, 3.14, 0.0],
            payload: 0.0,
            digital_out: [false; DIGITAL_OUTPUT_COUNT],
            running: false,
        }
    }
}

impl SimRobot {
    pub fn snapshot(&self) -> RobotState {
        RobotState {
            safety_status: SafetyStatus::NormalMode,
            runtime_state: if self.running {
                RuntimeState::Playing
            } else {
                RuntimeState::Stopped
            },
            robot_mode: RobotMode::Running,
            joints: self.joints,
            tcp: TcpState {
                pose: self.pose,
                ..TcpState::default()
            },
            payload: self.payload,
            digital_out: self.digital_out,
        }
    }

    pub fn tick(&mut self) {
        if self.running {
            self.joints[0] += 0.01;
        }
    }

    /// Applies the side effects the simulator understands:
    /// `set_digital_out(n, True)` and `set_payload(kg)`.
    pub fn execute(&mut self, command: &str) {
        self.running = true;
        let command = command.trim();

        if let Some(args) = call_args(command, "set_digital_out") {
            let mut parts = args.split(',').map(str::trim);
            if let (Some(Ok(index)), Some(level)) = (parts.next().map(str::parse::<usize>), parts.next()) {
                if let Some(slot) = self.digital_out.get_mut(index) {
                    *slot = level.eq_ignore_ascii_case("true");
                }
            }
        } else if let Some(args) = call_args(command, "set_payload") {
            if let Ok(payload) = args.trim().parse() {
                self.payload = payload;
            }
        }
    }

    pub fn halt(&mut self) {
        self.running = false;
    }

    /// What the controller would answer for a watch expression, as text.
    ///
    /// Structured values are rendered as JSON literals so the console
    /// re-reads them; anything unknown reads as `"0"`.
    pub fn read(&self, expression: &str) -> VariableValue {
        let text = match expression.trim() {
            "get_actual_joint_positions()" => list_literal(&self.joints),
            "get_actual_tcp_pose()" => list_literal(&self.pose),
            "get_actual_joint_speeds()" | "get_tcp_force()" => list_literal(&[0.0; JOINT_COUNT]),
            "get_target_payload()" => format!("{:?}", self.payload),
            other => match call_args(other, "get_digital_out")
                .and_then(|args| args.trim().parse::<usize>().ok())
                .and_then(|index| self.digital_out.get(index))
            {
                Some(on) => on.to_string(),
                None => "0".to_string(),
            },
        };
        VariableValue::String(text)
    }
}

fn call_args<'a>(command: &'a str, function: &str) -> Option<&'a str> {
    command
        .strip_prefix(function)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn list_literal(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|value| format!("{:?}", value)).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digital_outputs_follow_commands() {
        let mut robot = SimRobot::default();
        robot.execute("set_digital_out(3, True)");
        assert!(robot.snapshot().digital_out[3]);
        assert_eq!(robot.read("get_digital_out(3)"), VariableValue::String("true".to_string()));

        robot.execute("set_digital_out(3,False)");
        assert!(!robot.snapshot().digital_out[3]);
    }

    #[test]
    fn joints_read_as_list_literal() {
        let robot = SimRobot::default();
        let VariableValue::String(text) = robot.read("get_actual_joint_positions()") else {
            panic!("expected text");
        };
        assert_eq!(text, "[0.0, -1.57, 1.57, -1.57, -1.57, 0.0]");
        assert!(matches!(
            VariableValue::reinterpret(text),
            VariableValue::List(items) if items.len() == 6
        ));
    }

    #[test]
    fn joints_move_only_while_running() {
        let mut robot = SimRobot::default();
        robot.tick();
        assert_eq!(robot.snapshot().joints[0], 0.0);
        robot.execute("movej(q)");
        robot.tick();
        assert!(robot.snapshot().joints[0] > 0.0);
        robot.halt();
        assert_eq!(robot.snapshot().runtime_state, RuntimeState::Stopped);
    }
}
