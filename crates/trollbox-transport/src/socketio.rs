//! Socket.IO client transport over WebSocket, using `tokio-tungstenite`.
//!
//! One background task owns the socket. It reads frames, answers pings,
//! sends keep-alive pings, writes outbound events, and dispatches inbound
//! events to listeners one at a time. When the connection drops it
//! reconnects according to the configured [`ReconnectPolicy`](crate::ReconnectPolicy).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use trollbox_protocol::{codec, EnginePacket, OpenInfo, SocketPacket};

use crate::{EventTransport, Listener, Listeners, TransportConfig, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A Socket.IO [`EventTransport`] speaking Engine.IO revision 3 over a
/// WebSocket.
///
/// Construction does no I/O. [`open`](EventTransport::open) performs the
/// first connection and starts the background task; listeners registered
/// before that see every inbound event. After [`close`](EventTransport::close)
/// the transport can be opened again.
pub struct SocketIoTransport {
    config: TransportConfig,
    listeners: Arc<Listeners>,
    connected: Arc<AtomicBool>,
    /// Sender into the running background task; `None` while closed.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    /// Serializes `open` and `close`.
    running: tokio::sync::Mutex<Option<Running>>,
}

/// Handles to the background task of one `open`.
struct Running {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SocketIoTransport {
    /// Creates a transport for `config`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidAddress`] if the server address
    /// cannot produce a WebSocket URL or an `Origin` header.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        config.websocket_url()?;
        config.origin()?;

        Ok(Self {
            config,
            listeners: Arc::new(Listeners::new()),
            connected: Arc::new(AtomicBool::new(false)),
            outbound: Mutex::new(None),
            running: tokio::sync::Mutex::new(None),
        })
    }

    /// The configuration this transport connects with.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Whether a connection is live right now.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl EventTransport for SocketIoTransport {
    fn on(&self, event: &str, listener: Listener) {
        self.listeners.register(event, listener);
    }

    fn emit(&self, event: &str, args: Vec<Value>) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = outbound.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        tx.send(codec::encode_event(event, args))
            .map_err(|_| TransportError::ConnectionClosed("transport task stopped".into()))
    }

    async fn open(&self) -> Result<(), TransportError> {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return Err(TransportError::AlreadyOpen);
        }

        let (ws, info) = connect(&self.config).await?;
        tracing::info!(server = %self.config.server, sid = %info.sid, "connected to chat server");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        *self.outbound.lock().unwrap_or_else(PoisonError::into_inner) = Some(outbound_tx);
        self.connected.store(true, Ordering::SeqCst);

        let worker = Worker {
            config: self.config.clone(),
            listeners: Arc::clone(&self.listeners),
            connected: Arc::clone(&self.connected),
            outbound: outbound_rx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(worker.run(ws, info));
        *running = Some(Running { shutdown, task });
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        let running = self.running.lock().await.take();
        if let Some(Running { shutdown, task }) = running {
            shutdown.send_replace(true);
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "transport task ended abnormally");
            }
        }
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for SocketIoTransport {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut() {
            running.shutdown.send_replace(true);
        }
    }
}

// ---------------------------------------------------------------------------
// Connecting
// ---------------------------------------------------------------------------

/// Builds the WebSocket upgrade request with the configured headers.
///
/// `Connection` belongs to the upgrade itself and is left as `Upgrade`.
fn build_request(config: &TransportConfig) -> Result<Request, TransportError> {
    let url = config.websocket_url()?;
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::InvalidAddress(e.to_string()))?;

    let headers = request.headers_mut();
    for (name, value) in config.handshake_headers()? {
        if name.eq_ignore_ascii_case("connection") {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidAddress(format!("header {name}: {e}")))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|e| TransportError::InvalidAddress(format!("header {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(request)
}

/// Opens a WebSocket and waits for the Engine.IO open packet, all within
/// the configured handshake timeout.
async fn connect(config: &TransportConfig) -> Result<(WsStream, OpenInfo), TransportError> {
    let limit = config.handshake_timeout;
    match tokio::time::timeout(limit, handshake(config)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Handshake(format!(
            "no open packet within {limit:?}"
        ))),
    }
}

async fn handshake(config: &TransportConfig) -> Result<(WsStream, OpenInfo), TransportError> {
    let request = build_request(config)?;
    let (mut ws, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| {
            TransportError::ConnectFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e,
            ))
        })?;

    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return match codec::decode(text.as_str()) {
                    Ok(EnginePacket::Open(info)) => Ok((ws, info)),
                    Ok(other) => Err(TransportError::Handshake(format!(
                        "expected open packet, got {other:?}"
                    ))),
                    Err(e) => Err(TransportError::Handshake(e.to_string())),
                };
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::ConnectionClosed(
                    "closed before handshake".into(),
                ));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(receive_failed(e)),
        }
    }
}

fn send_failed(e: tokio_tungstenite::tungstenite::Error) -> TransportError {
    TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
}

fn receive_failed(e: tokio_tungstenite::tungstenite::Error) -> TransportError {
    TransportError::ReceiveFailed(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        e,
    ))
}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

/// Why a single connection ended.
enum Exit {
    /// The server closed the session.
    Closed,
    /// The transport was closed or dropped locally.
    Shutdown,
}

/// What to do after handling one inbound frame.
enum FrameOutcome {
    Continue,
    Reply(String),
    Closed,
}

struct Worker {
    config: TransportConfig,
    listeners: Arc<Listeners>,
    connected: Arc<AtomicBool>,
    outbound: mpsc::UnboundedReceiver<String>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self, ws: WsStream, info: OpenInfo) {
        let mut session = Some((ws, info));
        let mut attempt: u32 = 0;

        loop {
            if let Some((ws, info)) = session.take() {
                self.connected.store(true, Ordering::SeqCst);
                let outcome = drive(
                    ws,
                    &info,
                    &self.listeners,
                    &mut self.outbound,
                    &mut self.shutdown,
                )
                .await;
                self.connected.store(false, Ordering::SeqCst);
                discard_pending(&mut self.outbound);

                match outcome {
                    Ok(Exit::Shutdown) => {
                        tracing::info!("transport closed");
                        return;
                    }
                    Ok(Exit::Closed) => tracing::info!("connection closed by server"),
                    Err(e) => tracing::warn!(error = %e, "connection lost"),
                }
            }

            if !self.config.reconnect.enabled || *self.shutdown.borrow() {
                return;
            }
            if let Some(max) = self.config.reconnect.max_attempts {
                if attempt >= max {
                    tracing::warn!(attempts = attempt, "giving up reconnecting");
                    return;
                }
            }

            let delay = self.config.reconnect.delay_for(attempt);
            attempt += 1;
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.changed() => return,
            }

            let result = tokio::select! {
                result = connect(&self.config) => result,
                _ = self.shutdown.changed() => return,
            };
            match result {
                Ok(next) => {
                    tracing::info!(attempt, sid = %next.1.sid, "reconnected");
                    attempt = 0;
                    // Anything emitted while the flag was going down belongs
                    // to the lost connection.
                    discard_pending(&mut self.outbound);
                    session = Some(next);
                }
                Err(e) => tracing::warn!(error = %e, attempt, "reconnect failed"),
            }
        }
    }
}

/// Drops frames queued for a connection that no longer exists.
fn discard_pending(outbound: &mut mpsc::UnboundedReceiver<String>) -> usize {
    let mut dropped = 0;
    while outbound.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        tracing::debug!(dropped, "discarded frames queued for a lost connection");
    }
    dropped
}

/// Runs one connection until it closes, fails, or the transport shuts down.
///
/// The server is considered gone when nothing arrives for its ping interval
/// plus its ping timeout.
async fn drive(
    ws: WsStream,
    info: &OpenInfo,
    listeners: &Listeners,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Exit, TransportError> {
    let (mut sink, mut stream) = ws.split();

    // `interval` fires immediately on its first tick; the first ping is due
    // one full interval after the handshake.
    let period = Duration::from_millis(info.ping_interval.max(1));
    let mut ping = tokio::time::interval_at(Instant::now() + period, period);

    let silence = Duration::from_millis(info.ping_interval.saturating_add(info.ping_timeout).max(1));
    let mut deadline = Instant::now() + silence;

    loop {
        tokio::select! {
            frame = stream.next() => {
                deadline = Instant::now() + silence;
                match frame {
                    Some(Ok(Message::Text(text))) => match handle_frame(listeners, text.as_str()) {
                        FrameOutcome::Continue => {}
                        FrameOutcome::Reply(reply) => {
                            sink.send(Message::Text(reply.into())).await.map_err(send_failed)?;
                        }
                        FrameOutcome::Closed => return Ok(Exit::Closed),
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(Exit::Closed),
                    Some(Ok(_)) => {} // binary/ping/pong frames carry nothing for us
                    Some(Err(e)) => return Err(receive_failed(e)),
                }
            }
            Some(frame) = outbound.recv() => {
                sink.send(Message::Text(frame.into())).await.map_err(send_failed)?;
            }
            _ = ping.tick() => {
                sink.send(Message::Text("2".into())).await.map_err(send_failed)?;
            }
            _ = tokio::time::sleep_until(deadline) => {
                return Err(TransportError::PingTimeout(silence));
            }
            _ = shutdown.changed() => {
                // Best effort: tell the server we are leaving, then close.
                let _ = sink.send(Message::Text("1".into())).await;
                let _ = sink.close().await;
                return Ok(Exit::Shutdown);
            }
        }
    }
}

/// Interprets one inbound text frame.
fn handle_frame(listeners: &Listeners, text: &str) -> FrameOutcome {
    match codec::decode(text) {
        Ok(EnginePacket::Message(SocketPacket::Event { name, args, .. })) => {
            listeners.dispatch(&name, &args);
            FrameOutcome::Continue
        }
        Ok(EnginePacket::Ping(probe)) => match codec::encode(&EnginePacket::Pong(probe)) {
            Ok(reply) => FrameOutcome::Reply(reply),
            Err(_) => FrameOutcome::Continue,
        },
        Ok(EnginePacket::Pong(_)) => {
            tracing::trace!("pong");
            FrameOutcome::Continue
        }
        Ok(EnginePacket::Close) | Ok(EnginePacket::Message(SocketPacket::Disconnect)) => {
            FrameOutcome::Closed
        }
        Ok(EnginePacket::Message(SocketPacket::Connect)) => {
            tracing::debug!("namespace connected");
            FrameOutcome::Continue
        }
        Ok(EnginePacket::Message(SocketPacket::Error(message))) => {
            tracing::warn!(%message, "server reported an error");
            FrameOutcome::Continue
        }
        Ok(other) => {
            tracing::debug!(packet = ?other, "ignoring packet");
            FrameOutcome::Continue
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to decode frame");
            FrameOutcome::Continue
        }
    }
}
