use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::debug::{DebugSessionRequest, InspectionPointSet};
use crate::dispatcher::{Dispatcher, TelemetryEvent};
use crate::drivers::{ConnectionConfig, ConnectionEvent, ConnectionManager, ConnectionState};
use crate::lifecycle::{Command, CommandEvent};
use crate::protocol::*;
use crate::{ConsoleError, ProtocolInconsistency};

/// One console session: a connection to the proxy, the command history and
/// the telemetry streams, wired together.
///
/// ```rust,ignore
/// let console = Console::connect(ConnectionConfig::from_env()?)?;
/// let mut commands = console.subscribe_commands().await;
///
/// if let Some(command) = console.submit("movej(get_inverse_kin(p))").await {
///     println!("sent #{}", command.id());
/// }
/// while let Ok(event) = commands.recv().await {
///     println!("{:?}", event);
/// }
/// ```
pub struct Console {
    connection: ConnectionManager,
    dispatcher: Arc<Mutex<Dispatcher>>,
    dispatch_task: JoinHandle<()>,
}

impl Console {
    /// Validates `config`, starts connecting and spawns the dispatch task.
    /// Must be called from within a tokio runtime.
    pub fn connect(config: ConnectionConfig) -> Result<Self, ConsoleError> {
        config.validate()?;
        info!("console session for {}", config.url());

        let (connection, inbound) = ConnectionManager::new(config);
        let dispatcher = Arc::new(Mutex::new(Dispatcher::default()));
        let dispatch_task = tokio::spawn(Dispatcher::run(dispatcher.clone(), inbound));
        connection.start();

        Ok(Self {
            connection,
            dispatcher,
            dispatch_task,
        })
    }

    /// Records and sends a command. Blank input is ignored.
    ///
    /// The command is recorded even if the link is down at that moment; it
    /// then stays `Entered`.
    pub async fn submit(&self, text: &str) -> Option<Command> {
        let command = self.dispatcher.lock().await.lifecycle_mut().submit(text)?;
        self.connection
            .send(&OutboundMessage::Command(CommandMessage::from(&command)));
        Some(command)
    }

    /// Builds a debug session from the editor's breakpoints and sends it.
    pub fn debug(&self, points: &InspectionPointSet, script: Vec<String>) -> Result<DebugSessionRequest, ConsoleError> {
        let request = points.to_builder(script).build()?;
        self.connection
            .send(&OutboundMessage::Debug(request.clone()));
        Ok(request)
    }

    /// Halts the running program. Returns whether the request went out.
    pub fn stop(&self) -> bool {
        let id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        self.connection
            .send(&OutboundMessage::StopCommand(StopCommand::new(id)))
    }

    /// Asks the proxy to rewind to command `id`. The history changes only
    /// once the proxy confirms.
    pub async fn undo(&self, id: u32) -> Result<bool, ConsoleError> {
        if self.dispatcher.lock().await.lifecycle().get(id).is_none() {
            return Err(ProtocolInconsistency::UnknownCommand {
                id,
                event: "Undo".to_string(),
            }
            .into());
        }
        Ok(self.connection.send(&OutboundMessage::Undo(UndoRequest { id })))
    }

    pub async fn history(&self) -> Vec<Command> {
        self.dispatcher.lock().await.lifecycle().history().to_vec()
    }

    pub async fn reports(&self) -> Vec<ReportState> {
        self.dispatcher.lock().await.reports().all().to_vec()
    }

    pub async fn subscribe_commands(&self) -> broadcast::Receiver<CommandEvent> {
        self.dispatcher.lock().await.subscribe_commands()
    }

    pub async fn subscribe_telemetry(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.dispatcher.lock().await.subscribe_telemetry()
    }

    pub fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Skips a pending reconnect delay.
    pub fn reconnect(&self) {
        self.connection.start();
    }

    pub fn shutdown(&self) {
        self.connection.stop();
        self.dispatch_task.abort();
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.shutdown();
    }
}
