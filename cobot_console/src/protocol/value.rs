//! Values carried by `Report_state`.
//!
//! The controller often reports structured values as text (`"[0.1, 0.2]"`,
//! `"true"`, `"3.5"`). The codec re-reads those strings once, at decode time,
//! through [`VariableValue::reinterpret`]. Only JSON literals are re-read: a
//! script-style `"True"` stays a string. This is inherently ambiguous: a
//! variable whose real value is the string `"[1,2]"` is indistinguishable
//! from the list `[1, 2]` and decodes as the list. Nothing downstream tries
//! again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a reported variable.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Pose,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum VariableValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<VariableValue>),
}

impl VariableValue {
    /// Interprets a string payload that may hold a JSON literal.
    ///
    /// Falls back to the plain string when the text does not parse, or parses
    /// to something that is not a valid value (`null`, an object).
    pub fn reinterpret(raw: String) -> VariableValue {
        match serde_json::from_str::<VariableValue>(&raw) {
            Ok(value) => value,
            Err(_) => VariableValue::String(raw),
        }
    }

    /// Kind inferred from the value itself. Numbers report as `Float`.
    pub fn kind(&self) -> VariableKind {
        match self {
            VariableValue::Boolean(_) => VariableKind::Boolean,
            VariableValue::Integer(_) | VariableValue::Float(_) => VariableKind::Float,
            VariableValue::String(_) => VariableKind::String,
            VariableValue::List(_) => VariableKind::List,
        }
    }

    pub fn as_list(&self) -> Option<&[VariableValue]> {
        match self {
            VariableValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Boolean(true) => f.write_str("True"),
            VariableValue::Boolean(false) => f.write_str("False"),
            VariableValue::Integer(value) => write!(f, "{}", value),
            VariableValue::Float(value) => write!(f, "{}", value),
            VariableValue::String(value) => f.write_str(value),
            VariableValue::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

/// One `{name, type, value}` entry of a `Report_state` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReportedVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub value: VariableValue,
    /// Set for robot-wide variables (joints, pose, I/O), clear for script variables.
    #[serde(default)]
    pub global: bool,
}

impl ReportedVariable {
    /// Applies the string re-read. Values that arrived structured keep their
    /// declared kind; re-read strings take the kind of what they turned into.
    pub(crate) fn settle(mut self) -> Self {
        if let VariableValue::String(raw) = self.value {
            self.value = VariableValue::reinterpret(raw);
            self.kind = self.value.kind();
        }
        self
    }
}
