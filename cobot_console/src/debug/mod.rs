mod builder;
mod inspection_points;

pub use builder::*;
pub use inspection_points::*;

use serde::{Deserialize, Serialize};

use crate::WatchVariable;

/// A line of the script where the robot pauses to report variables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InspectionPoint {
    /// 1-based, dense, ascending with the line number.
    pub id: u32,
    #[serde(rename = "lineNumber")]
    pub line_number: u32,
    /// The script line as it read when the session was built.
    #[serde(rename = "command")]
    pub source_text: String,
    #[serde(rename = "additionalVariablesToRead")]
    pub extra_variables: Vec<WatchVariable>,
}

/// Body of a `Debug` message: the whole script plus where and what to inspect.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DebugSessionRequest {
    pub script: Vec<String>,
    #[serde(rename = "inspectionPoints")]
    pub inspection_points: Vec<InspectionPoint>,
    #[serde(rename = "globalVariables")]
    pub global_variables: Vec<WatchVariable>,
}

impl DebugSessionRequest {
    pub fn point(&self, id: u32) -> Option<&InspectionPoint> {
        self.inspection_points.iter().find(|point| point.id == id)
    }

    pub fn point_at_line(&self, line: u32) -> Option<&InspectionPoint> {
        self.inspection_points
            .iter()
            .find(|point| point.line_number == line)
    }
}
