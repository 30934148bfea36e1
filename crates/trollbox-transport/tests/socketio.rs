//! Integration tests for the Socket.IO transport.
//!
//! These tests spin up a real WebSocket server that plays the part of a
//! Socket.IO 2.x chat server: it answers the upgrade, sends the Engine.IO
//! open packet, and then exchanges text frames with the client.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderMap;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use trollbox_transport::{
    EventTransport, ReconnectPolicy, SocketIoTransport, TransportConfig, TransportError,
};

const OPEN: &str =
    r#"0{"sid":"test-sid","upgrades":[],"pingInterval":25000,"pingTimeout":5000}"#;

type ServerWs = WebSocketStream<TcpStream>;

// =========================================================================
// Helpers
// =========================================================================

/// Binds a listener on a random port and returns it with its `http://` URL.
async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().expect("should have local addr");
    (listener, format!("http://{addr}"))
}

/// Accepts one WebSocket client, records the upgrade request, and sends the
/// Engine.IO open packet followed by the namespace connect packet.
async fn accept(listener: &TcpListener) -> (ServerWs, String, HeaderMap) {
    let (stream, _) = listener.accept().await.expect("should accept");
    let (tx, rx) = oneshot::channel();
    let mut ws = tokio_tungstenite::accept_hdr_async(
        stream,
        move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = tx.send((req.uri().to_string(), req.headers().clone()));
            Ok(resp)
        },
    )
    .await
    .expect("upgrade should succeed");

    let (path, headers) = rx.await.expect("callback should run");
    ws.send(Message::Text(OPEN.into())).await.unwrap();
    ws.send(Message::Text("40".into())).await.unwrap();
    (ws, path, headers)
}

/// Accepts one WebSocket client, sends `open` and the namespace connect,
/// and nothing else.
async fn accept_with(listener: &TcpListener, open: &str) -> ServerWs {
    let mut ws = accept_silent(listener).await;
    ws.send(Message::Text(open.into())).await.unwrap();
    ws.send(Message::Text("40".into())).await.unwrap();
    ws
}

/// Completes the WebSocket upgrade but never speaks Engine.IO.
async fn accept_silent(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.expect("should accept");
    tokio_tungstenite::accept_async(stream)
        .await
        .expect("upgrade should succeed")
}

fn fast_reconnect() -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(10),
        randomization_factor: 0.0,
        ..ReconnectPolicy::default()
    }
}

async fn next_text(ws: &mut ServerWs) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame should arrive in time")
            .expect("stream should be open")
            .expect("frame should be valid");
        if let Message::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

fn config(server: &str) -> TransportConfig {
    TransportConfig::new(server).with_reconnect(ReconnectPolicy::disabled())
}

/// Registers a listener that forwards each event's arguments to a channel.
fn forward(
    transport: &SocketIoTransport,
    event: &str,
) -> mpsc::UnboundedReceiver<Vec<Value>> {
    let (tx, rx) = mpsc::unbounded_channel();
    transport.on(
        event,
        std::sync::Arc::new(move |args: &[Value]| {
            let _ = tx.send(args.to_vec());
        }),
    );
    rx
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Vec<Value>>) -> Vec<Value> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event should arrive in time")
        .expect("channel should be open")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_handshake_uses_engine_io_path_and_headers() {
    let (listener, server) = bind().await;
    let transport = SocketIoTransport::new(config(&server)).unwrap();

    let server_task = tokio::spawn(async move {
        let (ws, path, headers) = accept(&listener).await;
        (ws, path, headers)
    });

    transport.open().await.expect("open should succeed");
    assert!(transport.is_connected());

    let (_ws, path, headers) = server_task.await.unwrap();
    assert_eq!(path, "/socket.io/?EIO=3&transport=websocket");
    assert_eq!(headers["accept-encoding"], "identity");
    assert_eq!(headers["accept-language"], "*");
    assert_eq!(headers["cookie"], "");
    assert_eq!(headers["origin"], "http://127.0.0.1");
    assert_eq!(
        headers["user-agent"],
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/83.0.4103.61 Safari/537.36"
    );
}

#[tokio::test]
async fn test_inbound_event_reaches_listener() {
    let (listener, server) = bind().await;
    let transport = SocketIoTransport::new(config(&server)).unwrap();
    let mut messages = forward(&transport, "message");

    let server_task = tokio::spawn(async move {
        let (mut ws, _, _) = accept(&listener).await;
        let frame = r#"42["message",{"msg":"hi","date":1000,"nick":"bob","color":"","style":"","home":"h"}]"#;
        ws.send(Message::Text(frame.into())).await.unwrap();
        ws
    });

    transport.open().await.unwrap();
    let args = recv(&mut messages).await;
    assert_eq!(args.len(), 1);
    assert_eq!(args[0]["msg"], "hi");
    assert_eq!(args[0]["date"], 1000);

    let _ws = server_task.await.unwrap();
}

#[tokio::test]
async fn test_emit_reaches_server_as_event_frame() {
    let (listener, server) = bind().await;
    let transport = SocketIoTransport::new(config(&server)).unwrap();

    let (ready_tx, ready_rx) = oneshot::channel();
    let server_task = tokio::spawn(async move {
        let (mut ws, _, _) = accept(&listener).await;
        let _ = ready_tx.send(());
        next_text(&mut ws).await
    });

    transport.open().await.unwrap();
    ready_rx.await.unwrap();
    transport
        .emit("user joined", vec![json!("bob"), json!("red"), json!(""), json!("h")])
        .unwrap();

    let frame = server_task.await.unwrap();
    assert_eq!(frame, r#"42["user joined","bob","red","","h"]"#);
}

#[tokio::test]
async fn test_server_ping_is_answered_with_pong() {
    let (listener, server) = bind().await;
    let transport = SocketIoTransport::new(config(&server)).unwrap();

    let server_task = tokio::spawn(async move {
        let (mut ws, _, _) = accept(&listener).await;
        ws.send(Message::Text("2probe".into())).await.unwrap();
        next_text(&mut ws).await
    });

    transport.open().await.unwrap();
    assert_eq!(server_task.await.unwrap(), "3probe");
}

#[tokio::test]
async fn test_close_sends_engine_close_and_stops_emits() {
    let (listener, server) = bind().await;
    let transport = SocketIoTransport::new(config(&server)).unwrap();

    let server_task = tokio::spawn(async move {
        let (mut ws, _, _) = accept(&listener).await;
        next_text(&mut ws).await
    });

    transport.open().await.unwrap();
    transport.close().await.unwrap();

    assert_eq!(server_task.await.unwrap(), "1");
    assert!(!transport.is_connected());
    assert!(matches!(
        transport.emit("message", vec![json!("late")]),
        Err(TransportError::NotConnected)
    ));
}

#[tokio::test]
async fn test_open_twice_is_error() {
    let (listener, server) = bind().await;
    let transport = SocketIoTransport::new(config(&server)).unwrap();

    let server_task = tokio::spawn(async move { accept(&listener).await.0 });

    transport.open().await.unwrap();
    assert!(matches!(
        transport.open().await,
        Err(TransportError::AlreadyOpen)
    ));
    let _ws = server_task.await.unwrap();
}

#[tokio::test]
async fn test_open_fails_when_nothing_listens() {
    let (listener, server) = bind().await;
    drop(listener);

    let transport = SocketIoTransport::new(config(&server)).unwrap();
    assert!(matches!(
        transport.open().await,
        Err(TransportError::ConnectFailed(_))
    ));
    assert!(!transport.is_connected());
}

#[tokio::test]
async fn test_reconnects_after_server_closes() {
    let (listener, server) = bind().await;
    let transport =
        SocketIoTransport::new(TransportConfig::new(&server).with_reconnect(fast_reconnect()))
            .unwrap();
    let mut left = forward(&transport, "user left");

    let server_task = tokio::spawn(async move {
        let (mut first, _, _) = accept(&listener).await;
        first.send(Message::Close(None)).await.unwrap();

        let (mut second, _, _) = accept(&listener).await;
        let frame = r#"42["user left",{"nick":"bob"}]"#;
        second.send(Message::Text(frame.into())).await.unwrap();
        second
    });

    transport.open().await.unwrap();
    let args = recv(&mut left).await;
    assert_eq!(args[0]["nick"], "bob");

    let _second = server_task.await.unwrap();
    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_open_times_out_when_server_never_sends_open_packet() {
    let (listener, server) = bind().await;
    let transport = SocketIoTransport::new(
        config(&server).with_handshake_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let server_task = tokio::spawn(async move { accept_silent(&listener).await });

    let result = tokio::time::timeout(Duration::from_secs(5), transport.open())
        .await
        .expect("open should give up on its own");
    assert!(matches!(result, Err(TransportError::Handshake(_))));
    assert!(!transport.is_connected());

    let _ws = server_task.await.unwrap();
}

#[tokio::test]
async fn test_close_interrupts_stalled_reconnect() {
    let (listener, server) = bind().await;
    let transport =
        SocketIoTransport::new(TransportConfig::new(&server).with_reconnect(fast_reconnect()))
            .unwrap();

    let (stalled_tx, stalled_rx) = oneshot::channel();
    let server_task = tokio::spawn(async move {
        let (mut first, _, _) = accept(&listener).await;
        first.send(Message::Close(None)).await.unwrap();

        // The reconnect upgrades but never gets an open packet.
        let second = accept_silent(&listener).await;
        let _ = stalled_tx.send(());
        (first, second)
    });

    transport.open().await.unwrap();
    stalled_rx.await.expect("client should try to reconnect");

    tokio::time::timeout(Duration::from_secs(3), transport.close())
        .await
        .expect("close should not wait for the reconnect handshake")
        .unwrap();
    assert!(!transport.is_connected());

    let _sockets = server_task.await.unwrap();
}

#[tokio::test]
async fn test_silent_server_is_detected_and_replaced() {
    let (listener, server) = bind().await;
    let transport =
        SocketIoTransport::new(TransportConfig::new(&server).with_reconnect(fast_reconnect()))
            .unwrap();
    let mut left = forward(&transport, "user left");

    let server_task = tokio::spawn(async move {
        // Short heartbeat, and this server never answers a ping.
        let open = r#"0{"sid":"quiet","upgrades":[],"pingInterval":50,"pingTimeout":50}"#;
        let first = accept_with(&listener, open).await;

        let mut second = accept_with(&listener, OPEN).await;
        let frame = r#"42["user left",{"nick":"ghost"}]"#;
        second.send(Message::Text(frame.into())).await.unwrap();
        (first, second)
    });

    transport.open().await.unwrap();
    let args = recv(&mut left).await;
    assert_eq!(args[0]["nick"], "ghost");

    let _sockets = server_task.await.unwrap();
    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_reopen_after_close() {
    let (listener, server) = bind().await;
    let transport = SocketIoTransport::new(config(&server)).unwrap();

    let server_task = tokio::spawn(async move {
        let (mut first, _, _) = accept(&listener).await;
        let goodbye = next_text(&mut first).await;

        let (mut second, _, _) = accept(&listener).await;
        let frame = next_text(&mut second).await;
        (goodbye, frame)
    });

    transport.open().await.unwrap();
    transport.close().await.unwrap();

    transport.open().await.expect("a closed transport should reopen");
    assert!(transport.is_connected());
    transport.emit("message", vec![json!("again")]).unwrap();

    let (goodbye, frame) = server_task.await.unwrap();
    assert_eq!(goodbye, "1");
    assert_eq!(frame, r#"42["message","again"]"#);
    transport.close().await.unwrap();
}
