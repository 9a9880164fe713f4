use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{ConnectionConfig, ConnectionEvent, ConnectionState};
use crate::protocol::{InboundMessage, OutboundMessage};
use crate::{DecodeError, MessageCodec};

const EVENT_CAPACITY: usize = 64;

type ProxyStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// State shared between the manager handle and its supervising task.
struct Shared {
    state: watch::Sender<ConnectionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    events: broadcast::Sender<ConnectionEvent>,
    inbound: mpsc::Sender<InboundMessage>,
    restart: Notify,
    pending_reconnects: AtomicUsize,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }
}

enum PumpExit {
    Lost,
    InboundClosed,
}

/// Keeps one websocket link to the proxy alive.
///
/// A single supervising task connects, pumps frames until the link drops,
/// waits the configured delay and tries again, forever. Because the wait
/// happens inside that one task there is never more than one reconnection
/// pending. Decoded inbound messages go to the receiver returned by
/// [`ConnectionManager::new`] in arrival order.
pub struct ConnectionManager {
    config: ConnectionConfig,
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> (Self, mpsc::Receiver<InboundMessage>) {
        let (inbound, inbound_rx) = mpsc::channel(config.inbound_capacity.max(1));
        let (state, _) = watch::channel(ConnectionState::Closed);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let shared = Arc::new(Shared {
            state,
            outbound: Mutex::new(None),
            events,
            inbound,
            restart: Notify::new(),
            pending_reconnects: AtomicUsize::new(0),
        });

        let manager = Self {
            config,
            shared,
            supervisor: Mutex::new(None),
        };
        (manager, inbound_rx)
    }

    /// Opens the connection.
    ///
    /// The first call spawns the supervising task. Calling it again while a
    /// reconnection is pending cancels the wait and reconnects immediately;
    /// otherwise it does nothing. Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut supervisor = lock(&self.supervisor);
        match supervisor.as_ref() {
            Some(handle) if !handle.is_finished() => {
                if self.shared.pending_reconnects.load(Ordering::SeqCst) > 0 {
                    info!("reconnect requested, skipping delay");
                    self.shared.restart.notify_waiters();
                }
            }
            _ => {
                let task = supervise(self.config.clone(), self.shared.clone());
                *supervisor = Some(tokio::spawn(task));
            }
        }
    }

    /// Shuts the link down for good. No further reconnects are attempted.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.supervisor).take() {
            handle.abort();
        }
        lock(&self.shared.outbound).take();
        self.shared.pending_reconnects.store(0, Ordering::SeqCst);
        if self.shared.state.send_replace(ConnectionState::Closed) != ConnectionState::Closed {
            self.shared.emit(ConnectionEvent::Disconnected);
        }
        info!("connection manager stopped");
    }

    /// Encodes and transmits `message` if the link is open.
    ///
    /// Returns `false` and drops the message otherwise. Nothing is queued for
    /// a later connection.
    pub fn send(&self, message: &OutboundMessage) -> bool {
        let state = self.state();
        if state != ConnectionState::Open {
            debug!(message_type = %message.message_type(), ?state, "dropping outbound message");
            return false;
        }

        let text = MessageCodec::encode(message);
        match lock(&self.shared.outbound).as_ref() {
            Some(outbound) => outbound.send(text).is_ok(),
            None => false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Follows state changes as they happen.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Number of reconnection attempts currently waiting out their delay: 0 or 1.
    pub fn pending_reconnects(&self) -> usize {
        self.shared.pending_reconnects.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.supervisor).take() {
            handle.abort();
        }
    }
}

async fn supervise(config: ConnectionConfig, shared: Arc<Shared>) {
    let url = config.url();
    let delay = config.reconnect_delay();

    loop {
        shared.set_state(ConnectionState::Connecting);
        shared.emit(ConnectionEvent::Connecting);
        info!("connecting to {}", url);

        let exit = match connect_async(url.as_str()).await {
            Ok((stream, _)) => pump(stream, &shared).await,
            Err(e) => {
                warn!("connection to {} failed: {}", url, e);
                PumpExit::Lost
            }
        };

        lock(&shared.outbound).take();
        shared.set_state(ConnectionState::Closed);
        shared.emit(ConnectionEvent::Disconnected);

        if let PumpExit::InboundClosed = exit {
            info!("inbound receiver dropped, not reconnecting");
            return;
        }

        // Registered before the pending count is raised: `start` only wakes
        // waiters, so a restart landing after the delay leaves nothing behind.
        let restart = shared.restart.notified();
        tokio::pin!(restart);
        restart.as_mut().enable();

        shared.pending_reconnects.store(1, Ordering::SeqCst);
        shared.emit(ConnectionEvent::ReconnectScheduled {
            delay_ms: config.reconnect_delay_ms,
        });
        info!("disconnected, reconnecting in {} ms", config.reconnect_delay_ms);

        tokio::select! {
            _ = sleep(delay) => {}
            _ = &mut restart => {}
        }
        shared.pending_reconnects.store(0, Ordering::SeqCst);
    }
}

async fn pump(stream: ProxyStream, shared: &Shared) -> PumpExit {
    let (mut sink, mut frames) = stream.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    *lock(&shared.outbound) = Some(outbound);
    shared.set_state(ConnectionState::Open);
    shared.emit(ConnectionEvent::Connected);
    info!("connected");

    loop {
        tokio::select! {
            frame = frames.next() => {
                let decoded = match frame {
                    Some(Ok(Message::Text(text))) => MessageCodec::decode(&text),
                    Some(Ok(Message::Binary(bytes))) => MessageCodec::decode_bytes(&bytes),
                    Some(Ok(Message::Close(_))) | None => return PumpExit::Lost,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("websocket error: {}", e);
                        return PumpExit::Lost;
                    }
                };
                if !deliver(decoded, shared).await {
                    return PumpExit::InboundClosed;
                }
            }
            Some(text) = outbound_rx.recv() => {
                debug!("sending {}", text);
                if let Err(e) = sink.send(Message::Text(text)).await {
                    warn!("failed to send frame: {}", e);
                    return PumpExit::Lost;
                }
            }
        }
    }
}

/// Forwards a decoded message. Undecodable frames are logged and dropped.
/// Returns `false` once nobody is listening.
async fn deliver(decoded: Result<InboundMessage, DecodeError>, shared: &Shared) -> bool {
    match decoded {
        Ok(message) => {
            debug!(message_type = %message.message_type(), "received");
            shared.inbound.send(message).await.is_ok()
        }
        Err(error) => {
            warn!(%error, "dropping undecodable frame");
            true
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
