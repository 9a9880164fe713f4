use serde::{Deserialize, Serialize};

pub mod protocol;
pub mod codec;
pub mod errors;
pub use errors::*;

pub mod lifecycle;
pub mod debug;
pub mod dispatcher;
pub mod drivers;

#[cfg(feature = "driver")]
mod console;
#[cfg(feature = "driver")]
pub use console::*;

pub use codec::MessageCodec;

/// Number of joints on the arm. Every joint-space vector on the wire has this length.
pub const JOINT_COUNT: usize = 6;

/// Number of digital outputs reported in `Robot_state`.
pub const DIGITAL_OUTPUT_COUNT: usize = 8;

/// A six-component vector as the controller reports it: joint angles in
/// radians, or `[x, y, z, rx, ry, rz]` for tool-center-point quantities.
pub type Vector6 = [f64; JOINT_COUNT];

/// Tool center point state reported in `Robot_state`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TcpState {
    pub pose: Vector6,
    pub speed: Vector6,
    pub force: Vector6,
}

impl Default for TcpState {
    fn default() -> Self {
        Self {
            pose: [0.0; JOINT_COUNT],
            speed: [0.0; JOINT_COUNT],
            force: [0.0; JOINT_COUNT],
        }
    }
}

/// A variable the robot should read and report back while debugging.
///
/// `read_expression` is evaluated on the controller (e.g. `get_actual_tcp_pose()`),
/// and the result is reported under `name`. The wire calls it `readCommand`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchVariable {
    pub name: String,
    #[serde(rename = "readCommand")]
    pub read_expression: String,
}

impl WatchVariable {
    pub fn new(name: impl Into<String>, read_expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            read_expression: read_expression.into(),
        }
    }
}
