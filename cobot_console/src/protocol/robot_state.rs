use int_enum::IntEnum;
use serde::{Deserialize, Serialize};

use crate::{TcpState, Vector6, DIGITAL_OUTPUT_COUNT};

/// Periodic telemetry snapshot streamed by the proxy.
///
/// The console does not interpret it; it is handed to telemetry subscribers as is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RobotState {
    pub safety_status: SafetyStatus,
    pub runtime_state: RuntimeState,
    pub robot_mode: RobotMode,
    pub joints: Vector6,
    pub tcp: TcpState,
    pub payload: f64,
    /// `digital_out_0` through `digital_out_7` on the wire.
    pub digital_out: [bool; DIGITAL_OUTPUT_COUNT],
}

/// Controller safety mode. Travels as its snake_case name; the numeric
/// code is the controller's own.
#[repr(u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
#[serde(rename_all = "snake_case")]
pub enum SafetyStatus {
    NormalMode = 1,
    ReducedMode = 2,
    ProtectiveStop = 3,
    RecoveryMode = 4,
    SafeguardStop = 5,
    SystemEmergencyStop = 6,
    RobotEmergencyStop = 7,
    Violation = 8,
    Fault = 9,
    ValidateJointId = 10,
    UndefinedSafetyMode = 11,
    AutomaticModeSafeguardStop = 12,
    SystemThreePositionEnablingStop = 13,
}

impl SafetyStatus {
    /// True for every mode in which the arm is halted by the safety system.
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            SafetyStatus::ProtectiveStop
                | SafetyStatus::SafeguardStop
                | SafetyStatus::SystemEmergencyStop
                | SafetyStatus::RobotEmergencyStop
                | SafetyStatus::Violation
                | SafetyStatus::Fault
                | SafetyStatus::AutomaticModeSafeguardStop
                | SafetyStatus::SystemThreePositionEnablingStop
        )
    }
}

#[repr(u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeState {
    Stopping = 0,
    Stopped = 1,
    Playing = 2,
    Pausing = 3,
    Paused = 4,
    Resuming = 5,
}

#[repr(i8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
#[serde(rename_all = "snake_case")]
pub enum RobotMode {
    NoController = -1,
    Disconnected = 0,
    ConfirmSafety = 1,
    Booting = 2,
    PowerOff = 3,
    PowerOn = 4,
    Idle = 5,
    Backdrive = 6,
    Running = 7,
    UpdatingFirmware = 8,
}
