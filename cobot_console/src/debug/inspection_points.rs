use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::DebugSessionBuilder;
use crate::WatchVariable;

/// Robot-wide values every debug session can report, in display order.
pub const DEFAULT_GLOBAL_VARIABLES: [(&str, &str); 13] = [
    ("joints", "get_actual_joint_positions()"),
    ("pose", "get_actual_tcp_pose()"),
    ("speed", "get_actual_joint_speeds()"),
    ("force", "get_tcp_force()"),
    ("payload", "get_target_payload()"),
    ("digital_out0", "get_digital_out(0)"),
    ("digital_out1", "get_digital_out(1)"),
    ("digital_out2", "get_digital_out(2)"),
    ("digital_out3", "get_digital_out(3)"),
    ("digital_out4", "get_digital_out(4)"),
    ("digital_out5", "get_digital_out(5)"),
    ("digital_out6", "get_digital_out(6)"),
    ("digital_out7", "get_digital_out(7)"),
];

pub fn default_global_variables() -> Vec<WatchVariable> {
    DEFAULT_GLOBAL_VARIABLES
        .iter()
        .map(|(name, read)| WatchVariable::new(*name, *read))
        .collect()
}

/// Editor identity of a breakpoint. Survives the breakpoint moving lines.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecorationId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Added(DecorationId),
    /// Every breakpoint that sat on the line, in id order.
    Removed(Vec<DecorationId>),
}

/// Breakpoints and watch selections as the script editor holds them.
///
/// Breakpoints are tracked by decoration so they can follow edits; only when
/// a session is built are they keyed by line. Two decorations that end up on
/// the same line become one inspection point, carrying the variables of the
/// most recently created decoration.
#[derive(Debug, Clone, Default)]
pub struct InspectionPointSet {
    next_decoration: u64,
    lines: BTreeMap<DecorationId, u32>,
    variables: HashMap<DecorationId, Vec<WatchVariable>>,
    deselected_globals: BTreeSet<String>,
}

impl InspectionPointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, line: u32) -> Toggle {
        let existing: Vec<DecorationId> = self
            .lines
            .iter()
            .filter(|(_, at)| **at == line)
            .map(|(&id, _)| id)
            .collect();

        if existing.is_empty() {
            let id = DecorationId(self.next_decoration);
            self.next_decoration += 1;
            self.lines.insert(id, line);
            return Toggle::Added(id);
        }

        for id in &existing {
            self.lines.remove(id);
            self.variables.remove(id);
        }
        Toggle::Removed(existing)
    }

    /// Follows an editor edit. Returns `false` for an unknown decoration.
    pub fn move_decoration(&mut self, decoration: DecorationId, line: u32) -> bool {
        match self.lines.get_mut(&decoration) {
            Some(at) => {
                *at = line;
                true
            }
            None => false,
        }
    }

    pub fn decoration_at(&self, line: u32) -> Option<DecorationId> {
        self.lines
            .iter()
            .find(|(_, at)| **at == line)
            .map(|(&id, _)| id)
    }

    /// Lines holding a breakpoint, ascending, without duplicates.
    pub fn lines(&self) -> Vec<u32> {
        let lines: BTreeSet<u32> = self.lines.values().copied().collect();
        lines.into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds a watch to a breakpoint. Returns `false` for an unknown decoration.
    pub fn add_variable(&mut self, decoration: DecorationId, variable: WatchVariable) -> bool {
        if !self.lines.contains_key(&decoration) {
            return false;
        }
        self.variables.entry(decoration).or_default().push(variable);
        true
    }

    pub fn remove_variable(&mut self, decoration: DecorationId, index: usize) -> Option<WatchVariable> {
        let variables = self.variables.get_mut(&decoration)?;
        if index < variables.len() {
            Some(variables.remove(index))
        } else {
            None
        }
    }

    pub fn variables(&self, decoration: DecorationId) -> &[WatchVariable] {
        self.variables
            .get(&decoration)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Re-selects a default global. Returns `false` if `name` is not one.
    pub fn select_global(&mut self, name: &str) -> bool {
        if !is_default_global(name) {
            return false;
        }
        self.deselected_globals.remove(name);
        true
    }

    pub fn deselect_global(&mut self, name: &str) -> bool {
        if !is_default_global(name) {
            return false;
        }
        self.deselected_globals.insert(name.to_string());
        true
    }

    pub fn selected_globals(&self) -> Vec<WatchVariable> {
        default_global_variables()
            .into_iter()
            .filter(|variable| !self.deselected_globals.contains(&variable.name))
            .collect()
    }

    pub fn to_builder(&self, script: Vec<String>) -> DebugSessionBuilder {
        let mut by_line: HashMap<u32, &[WatchVariable]> = HashMap::new();
        let mut builder = DebugSessionBuilder::new(script).global_variables(self.selected_globals());

        // BTreeMap order: later decorations overwrite earlier ones on a shared line.
        for (decoration, &line) in &self.lines {
            builder = builder.breakpoint(line);
            by_line.insert(line, self.variables(*decoration));
        }
        for (line, variables) in by_line {
            for variable in variables {
                builder = builder.extra_variable(line, variable.clone());
            }
        }
        builder
    }
}

fn is_default_global(name: &str) -> bool {
    DEFAULT_GLOBAL_VARIABLES.iter().any(|(known, _)| *known == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Vec<String> {
        (1..=6).map(|n| format!("step_{}()", n)).collect()
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut set = InspectionPointSet::new();
        let Toggle::Added(id) = set.toggle(3) else {
            panic!("expected a new breakpoint");
        };
        set.add_variable(id, WatchVariable::new("i", "i"));
        assert_eq!(set.lines(), vec![3]);

        assert_eq!(set.toggle(3), Toggle::Removed(vec![id]));
        assert!(set.is_empty());
        assert!(set.variables(id).is_empty());
    }

    #[test]
    fn moved_decorations_collapse_by_line() {
        let mut set = InspectionPointSet::new();
        let Toggle::Added(first) = set.toggle(2) else { panic!() };
        let Toggle::Added(second) = set.toggle(4) else { panic!() };
        set.add_variable(first, WatchVariable::new("a", "a"));
        set.add_variable(second, WatchVariable::new("b", "b"));

        assert!(set.move_decoration(second, 2));
        assert_eq!(set.lines(), vec![2]);

        let request = set.to_builder(script()).build().unwrap();
        assert_eq!(request.inspection_points.len(), 1);
        assert_eq!(request.inspection_points[0].extra_variables, vec![WatchVariable::new("b", "b")]);
    }

    #[test]
    fn variables_keep_order_and_duplicates() {
        let mut set = InspectionPointSet::new();
        let Toggle::Added(id) = set.toggle(1) else { panic!() };
        set.add_variable(id, WatchVariable::new("x", "x"));
        set.add_variable(id, WatchVariable::new("y", "y"));
        set.add_variable(id, WatchVariable::new("x", "x"));

        assert_eq!(set.remove_variable(id, 1), Some(WatchVariable::new("y", "y")));
        assert_eq!(set.remove_variable(id, 7), None);
        assert_eq!(
            set.variables(id),
            [WatchVariable::new("x", "x"), WatchVariable::new("x", "x")]
        );
    }

    #[test]
    fn unknown_decoration_is_refused() {
        let mut set = InspectionPointSet::new();
        assert!(!set.add_variable(DecorationId(42), WatchVariable::new("x", "x")));
        assert!(!set.move_decoration(DecorationId(42), 1));
    }

    #[test]
    fn globals_keep_default_order() {
        let mut set = InspectionPointSet::new();
        assert_eq!(set.selected_globals().len(), 13);

        assert!(set.deselect_global("pose"));
        assert!(set.deselect_global("joints"));
        assert!(!set.deselect_global("no_such_thing"));
        assert!(set.select_global("joints"));

        let names: Vec<String> = set.selected_globals().into_iter().map(|v| v.name).collect();
        assert_eq!(&names[..3], ["joints", "speed", "force"]);
        assert!(!names.contains(&"pose".to_string()));
    }
}
