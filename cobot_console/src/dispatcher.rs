use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::lifecycle::{CommandEvent, CommandLifecycle, LifecycleEvent};
use crate::protocol::*;
use crate::ProtocolInconsistency;

const TELEMETRY_CAPACITY: usize = 256;

/// Robot-side data that is not about a particular command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    RobotState(RobotState),
    ReportState(ReportState),
    /// The proxy refused to rewind to command `id`; no state changed.
    UndoFailed { id: u32 },
}

/// Every `Report_state` received this session, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct TelemetryLog {
    reports: Vec<ReportState>,
}

impl TelemetryLog {
    pub fn push(&mut self, report: ReportState) {
        self.reports.push(report);
    }

    pub fn all(&self) -> &[ReportState] {
        &self.reports
    }

    /// Reports emitted by any of the given inspection points.
    pub fn for_points(&self, points: &HashSet<u32>) -> Vec<&ReportState> {
        self.reports
            .iter()
            .filter(|report| points.contains(&report.id))
            .collect()
    }

    pub fn latest(&self, point: u32) -> Option<&ReportState> {
        self.reports.iter().rev().find(|report| report.id == point)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn clear(&mut self) {
        self.reports.clear();
    }
}

/// Routes decoded inbound messages to the command lifecycle and the
/// telemetry subscribers.
#[derive(Debug)]
pub struct Dispatcher {
    lifecycle: CommandLifecycle,
    telemetry: broadcast::Sender<TelemetryEvent>,
    reports: TelemetryLog,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(CommandLifecycle::new())
    }
}

impl Dispatcher {
    pub fn new(lifecycle: CommandLifecycle) -> Self {
        let (telemetry, _) = broadcast::channel(TELEMETRY_CAPACITY);
        Self {
            lifecycle,
            telemetry,
            reports: TelemetryLog::default(),
        }
    }

    pub fn dispatch(&mut self, message: InboundMessage) -> Result<(), ProtocolInconsistency> {
        match message {
            InboundMessage::AckResponse(ack) => {
                self.lifecycle.apply(LifecycleEvent::Ack {
                    id: ack.id,
                    status: ack.status,
                    message: ack.message,
                })?;
            }
            InboundMessage::CommandFinished(finished) => {
                self.lifecycle
                    .apply(LifecycleEvent::Finished { id: finished.id })?;
            }
            InboundMessage::UndoResponse(UndoResponse { id, status: UndoStatus::Success }) => {
                self.lifecycle.apply(LifecycleEvent::Undo { id })?;
            }
            InboundMessage::UndoResponse(UndoResponse { id, status: UndoStatus::Failure }) => {
                warn!(id, "proxy failed to undo command");
                let _ = self.telemetry.send(TelemetryEvent::UndoFailed { id });
            }
            InboundMessage::Feedback(feedback) => {
                self.lifecycle.record_feedback(feedback.id, feedback.message)?;
            }
            InboundMessage::RobotState(state) => {
                let _ = self.telemetry.send(TelemetryEvent::RobotState(state));
            }
            InboundMessage::ReportState(report) => {
                debug!(point = report.id, variables = report.variables.len(), "report state");
                self.reports.push(report.clone());
                let _ = self.telemetry.send(TelemetryEvent::ReportState(report));
            }
        }
        Ok(())
    }

    /// Drains `inbound` in order until every sender is gone.
    pub async fn run(dispatcher: Arc<Mutex<Dispatcher>>, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            // Inconsistencies are already logged and broadcast by the lifecycle.
            let _ = dispatcher.lock().await.dispatch(message);
        }
        info!("inbound channel closed, dispatcher stopping");
    }

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.telemetry.subscribe()
    }

    pub fn subscribe_commands(&self) -> broadcast::Receiver<CommandEvent> {
        self.lifecycle.subscribe()
    }

    pub fn lifecycle(&self) -> &CommandLifecycle {
        &self.lifecycle
    }

    pub fn lifecycle_mut(&mut self) -> &mut CommandLifecycle {
        &mut self.lifecycle
    }

    pub fn reports(&self) -> &TelemetryLog {
        &self.reports
    }

    pub fn reports_mut(&mut self) -> &mut TelemetryLog {
        &mut self.reports
    }
}
