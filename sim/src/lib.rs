// Simulated cobot proxy: speaks the console's websocket protocol and answers
// like the proxy in front of a real controller would.

mod robot;

pub use robot::SimRobot;

use std::collections::HashSet;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cobot_console::debug::DebugSessionRequest;
use cobot_console::protocol::*;
use cobot_console::MessageCodec;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

pub const PORT_ENV: &str = "COBOT_SIM_PORT";

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub port: u16,
    /// Period of the `Robot_state` stream. Zero disables it.
    pub robot_state_interval_ms: u64,
    /// Close every connection right after the websocket handshake.
    pub drop_after_handshake: bool,
    /// Wait between acknowledging a command and reporting it finished.
    pub finish_delay_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            port: 8767,
            robot_state_interval_ms: 500,
            drop_after_handshake: false,
            finish_delay_ms: 50,
        }
    }
}

/// A simulator running in the background of the current runtime.
pub struct SimHandle {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl SimHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Websocket handshakes completed so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Binds `127.0.0.1:<config.port>` (0 picks a free port) and serves in a
/// spawned task.
pub async fn spawn(config: SimConfig) -> std::io::Result<SimHandle> {
    let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
    let addr = listener.local_addr()?;
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&connections);
    let task = tokio::spawn(async move { serve(listener, config, counter).await });

    Ok(SimHandle {
        addr,
        connections,
        task,
    })
}

/// Accepts clients forever, one task per client. All clients drive the same
/// simulated robot.
pub async fn serve(listener: TcpListener, config: SimConfig, connections: Arc<AtomicUsize>) {
    let robot = Arc::new(Mutex::new(SimRobot::default()));

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("failed to accept connection: {}", e);
                continue;
            }
        };

        let robot = Arc::clone(&robot);
        let config = config.clone();
        let connections = Arc::clone(&connections);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, config, robot, connections).await {
                warn!("error handling client {}: {}", peer, e);
            }
        });
    }
}

/// Per-connection protocol state.
struct Session {
    robot: Arc<Mutex<SimRobot>>,
    outbound: mpsc::UnboundedSender<String>,
    commands: HashSet<u32>,
    last_command: Option<u32>,
    finish_delay: Duration,
}

async fn handle_client(
    socket: TcpStream,
    config: SimConfig,
    robot: Arc<Mutex<SimRobot>>,
    connections: Arc<AtomicUsize>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut ws = accept_async(socket).await?;
    connections.fetch_add(1, Ordering::SeqCst);

    if config.drop_after_handshake {
        debug!("dropping client after handshake");
        ws.close(None).await?;
        return Ok(());
    }

    let (mut sink, mut frames) = ws.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let ticker = (config.robot_state_interval_ms > 0).then(|| {
        let robot = Arc::clone(&robot);
        let outbound = outbound.clone();
        let period = Duration::from_millis(config.robot_state_interval_ms);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let state = {
                    let mut robot = robot.lock().await;
                    robot.tick();
                    robot.snapshot()
                };
                let message = MessageCodec::encode_inbound(&InboundMessage::RobotState(state));
                if outbound.send(message).is_err() {
                    break;
                }
            }
        })
    });

    let mut session = Session {
        robot,
        outbound,
        commands: HashSet::new(),
        last_command: None,
        finish_delay: Duration::from_millis(config.finish_delay_ms),
    };

    while let Some(frame) = frames.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Message::Close(_) => break,
            _ => continue,
        };

        match MessageCodec::decode_outbound(&text) {
            Ok(request) => session.respond(request).await,
            Err(e) => warn!("ignoring request: {}", e),
        }
    }

    info!("client disconnected");
    if let Some(ticker) = ticker {
        ticker.abort();
    }
    drop(session);
    let _ = writer.await;
    Ok(())
}

impl Session {
    async fn respond(&mut self, request: OutboundMessage) {
        match request {
            OutboundMessage::Command(command) => self.on_command(command).await,
            OutboundMessage::Debug(debug) => self.on_debug(debug).await,
            OutboundMessage::StopCommand(stop) => {
                self.robot.lock().await.halt();
                info!(stop_id = stop.id, "program stopped");
                if let Some(id) = self.last_command {
                    self.send(InboundMessage::Feedback(Feedback {
                        id,
                        message: "Program stopped".to_string(),
                    }));
                }
            }
            OutboundMessage::Undo(undo) => {
                let status = if self.commands.contains(&undo.id) {
                    self.commands.retain(|id| *id < undo.id);
                    UndoStatus::Success
                } else {
                    UndoStatus::Failure
                };
                self.send(InboundMessage::UndoResponse(UndoResponse { id: undo.id, status }));
            }
        }
    }

    async fn on_command(&mut self, command: CommandMessage) {
        let lowered = command.command.to_lowercase();
        if lowered.contains("error") || lowered.contains("exception") {
            self.send(InboundMessage::AckResponse(AckResponse {
                id: command.id,
                status: AckStatus::Error,
                message: format!("error: could not execute {}", command.command),
                command: command.command,
            }));
            return;
        }

        self.robot.lock().await.execute(&command.command);
        self.commands.insert(command.id);
        self.last_command = Some(command.id);
        self.send(InboundMessage::AckResponse(AckResponse {
            id: command.id,
            status: AckStatus::Ok,
            message: format!("ack: {}", command.command),
            command: command.command.clone(),
        }));

        let finished = MessageCodec::encode_inbound(&InboundMessage::CommandFinished(CommandFinished {
            id: command.id,
            command: command.command,
        }));
        let outbound = self.outbound.clone();
        let delay = self.finish_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = outbound.send(finished);
        });
    }

    async fn on_debug(&mut self, request: DebugSessionRequest) {
        info!(points = request.inspection_points.len(), "debug session started");
        let robot = self.robot.lock().await.clone();

        for point in &request.inspection_points {
            let globals = request.global_variables.iter().map(|variable| (variable, true));
            let extras = point.extra_variables.iter().map(|variable| (variable, false));
            let variables = globals
                .chain(extras)
                .map(|(variable, global)| ReportedVariable {
                    name: variable.name.clone(),
                    kind: VariableKind::String,
                    value: robot.read(&variable.read_expression),
                    global,
                })
                .collect();

            self.send(InboundMessage::ReportState(ReportState {
                id: point.id,
                timestamp: now_millis(),
                variables,
            }));
        }
    }

    fn send(&self, message: InboundMessage) {
        let _ = self.outbound.send(MessageCodec::encode_inbound(&message));
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
