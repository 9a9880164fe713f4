use std::collections::{BTreeSet, HashMap};

use super::{DebugSessionRequest, InspectionPoint};
use crate::{DebugSessionError, WatchVariable};

/// Materializes breakpoints into a [`DebugSessionRequest`].
///
/// Breakpoints are keyed by line, so toggling the same line twice or adding
/// it from two places yields one point. Points come out sorted by line and
/// numbered from 1 in that order.
///
/// ```rust
/// use cobot_console::debug::DebugSessionBuilder;
/// use cobot_console::WatchVariable;
///
/// let script = vec!["a = 1".to_string(), "b = a + 1".to_string(), "movej(q)".to_string()];
/// let request = DebugSessionBuilder::new(script)
///     .breakpoint(3)
///     .breakpoint(1)
///     .extra_variable(3, WatchVariable::new("b", "b"))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.inspection_points[0].line_number, 1);
/// assert_eq!(request.inspection_points[1].id, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DebugSessionBuilder {
    script: Vec<String>,
    breakpoints: BTreeSet<u32>,
    extra_variables: HashMap<u32, Vec<WatchVariable>>,
    global_variables: Vec<WatchVariable>,
}

impl DebugSessionBuilder {
    pub fn new(script: Vec<String>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn breakpoint(mut self, line: u32) -> Self {
        self.breakpoints.insert(line);
        self
    }

    /// Watches `variable` at the point on `line`. Does not create a breakpoint.
    pub fn extra_variable(mut self, line: u32, variable: WatchVariable) -> Self {
        self.extra_variables.entry(line).or_default().push(variable);
        self
    }

    pub fn global_variables(mut self, variables: impl IntoIterator<Item = WatchVariable>) -> Self {
        self.global_variables = variables.into_iter().collect();
        self
    }

    pub fn build(self) -> Result<DebugSessionRequest, DebugSessionError> {
        build_from(
            self.script,
            self.breakpoints,
            &self.extra_variables,
            &self.global_variables,
        )
    }
}

/// Builds a debug request from a script, the lines holding breakpoints and
/// the watch lists.
///
/// `extra_variables_by_line` entries for lines without a breakpoint are
/// ignored. Zero breakpoints is a valid session.
///
/// # Errors
///
/// [`DebugSessionError::LineOutOfRange`] if a breakpoint is on line 0 or past
/// the end of the script.
pub fn build_from(
    script: Vec<String>,
    breakpoints: impl IntoIterator<Item = u32>,
    extra_variables_by_line: &HashMap<u32, Vec<WatchVariable>>,
    global_variables: &[WatchVariable],
) -> Result<DebugSessionRequest, DebugSessionError> {
    let lines: BTreeSet<u32> = breakpoints.into_iter().collect();

    let mut inspection_points = Vec::with_capacity(lines.len());
    for (index, line) in lines.into_iter().enumerate() {
        let source_text = line
            .checked_sub(1)
            .and_then(|offset| script.get(offset as usize))
            .ok_or(DebugSessionError::LineOutOfRange {
                line,
                script_lines: script.len(),
            })?;

        inspection_points.push(InspectionPoint {
            id: index as u32 + 1,
            line_number: line,
            source_text: source_text.clone(),
            extra_variables: extra_variables_by_line
                .get(&line)
                .cloned()
                .unwrap_or_default(),
        });
    }

    Ok(DebugSessionRequest {
        script,
        inspection_points,
        global_variables: global_variables.to_vec(),
    })
}
