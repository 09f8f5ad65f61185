use std::net::SocketAddr;
use std::time::Duration;

use battleship_bridge::{Bridge, ConnectionRegistry, RelayConfig, RelayEvent, ShutdownHandle};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Browser = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct Running {
    addr: SocketAddr,
    registry: ConnectionRegistry,
    shutdown: ShutdownHandle,
    task: JoinHandle<anyhow::Result<()>>,
}

async fn start_bridge(config: RelayConfig) -> Running {
    let bridge = Bridge::new(config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = bridge.registry();
    let shutdown = bridge.shutdown_handle();
    let task = tokio::spawn(async move { bridge.serve(listener).await });
    Running {
        addr,
        registry,
        shutdown,
        task,
    }
}

async fn upstream() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

async fn open_browser(addr: SocketAddr) -> Browser {
    let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws
}

/// Next relay event, or `None` once the bridge closed the socket.
async fn next_event(ws: &mut Browser) -> Option<RelayEvent> {
    loop {
        let msg = timeout(WAIT, ws.next()).await.expect("bridge went quiet");
        match msg {
            Some(Ok(Message::Text(text))) => return Some(serde_json::from_str(&text).unwrap()),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => {}
        }
    }
}

async fn send_client_message(ws: &mut Browser, payload: serde_json::Value) {
    let text = json!({"event": "client-message", "data": payload}).to_string();
    ws.send(Message::Text(text)).await.unwrap();
}

async fn wait_for_empty(registry: &ConnectionRegistry) {
    timeout(WAIT, async {
        while !registry.is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection never left the registry");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connected_then_forwarding() {
    let (server, upstream_addr) = upstream().await;
    let bridge = start_bridge(RelayConfig::with_upstream(upstream_addr)).await;
    let mut browser = open_browser(bridge.addr).await;

    let (game_side, _) = timeout(WAIT, server.accept()).await.unwrap().unwrap();
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::connected()));

    let payload = json!({"cmd": "LOGIN", "payload": {"username": "alice", "password": "pw"}});
    send_client_message(&mut browser, payload.clone()).await;

    let mut lines = BufReader::new(game_side).lines();
    let line = timeout(WAIT, lines.next_line()).await.unwrap().unwrap().unwrap();
    let forwarded: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(forwarded, payload);
    assert_eq!(bridge.registry.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_message_before_link_is_up_is_delivered() {
    let (server, upstream_addr) = upstream().await;
    let bridge = start_bridge(RelayConfig::with_upstream(upstream_addr)).await;
    let mut browser = open_browser(bridge.addr).await;

    // Sent straight after the handshake, before the bridge reports the link.
    let login = json!({"cmd": "LOGIN", "payload": {"username": "alice"}});
    send_client_message(&mut browser, login.clone()).await;
    let chat = json!({"cmd": "CHAT", "payload": {"message": "hi"}});
    send_client_message(&mut browser, chat.clone()).await;

    let (game_side, _) = timeout(WAIT, server.accept()).await.unwrap().unwrap();
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::connected()));

    let mut lines = BufReader::new(game_side).lines();
    for expected in [login, chat] {
        let line = timeout(WAIT, lines.next_line()).await.unwrap().unwrap().unwrap();
        let forwarded: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(forwarded, expected);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_split_frames_are_reassembled() {
    let (server, upstream_addr) = upstream().await;
    let bridge = start_bridge(RelayConfig::with_upstream(upstream_addr)).await;
    let mut browser = open_browser(bridge.addr).await;
    let (mut game_side, _) = server.accept().await.unwrap();
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::connected()));

    game_side.write_all(b"{\"cmd\":\"TURN_CH").await.unwrap();
    game_side.flush().await.unwrap();
    sleep(Duration::from_millis(50)).await;
    game_side
        .write_all(b"ANGE\",\"payload\":{\"your_turn\":1}}\nnot json\n{\"cmd\":\"GAME_READY\",\"payload\":{}}\n")
        .await
        .unwrap();

    assert_eq!(
        next_event(&mut browser).await,
        Some(RelayEvent::ServerMessage(
            json!({"cmd": "TURN_CHANGE", "payload": {"your_turn": 1}})
        ))
    );
    // The malformed line in between is dropped without closing the link.
    assert_eq!(
        next_event(&mut browser).await,
        Some(RelayEvent::ServerMessage(json!({"cmd": "GAME_READY", "payload": {}})))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upstream_close_notifies_once() {
    let (server, upstream_addr) = upstream().await;
    let bridge = start_bridge(RelayConfig::with_upstream(upstream_addr)).await;
    let mut browser = open_browser(bridge.addr).await;
    let (game_side, _) = server.accept().await.unwrap();
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::connected()));

    drop(game_side);
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::disconnected()));
    assert_eq!(next_event(&mut browser).await, None);
    wait_for_empty(&bridge.registry).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_upstream() {
    let (server, upstream_addr) = upstream().await;
    drop(server);
    let bridge = start_bridge(RelayConfig::with_upstream(upstream_addr)).await;
    let mut browser = open_browser(bridge.addr).await;

    match next_event(&mut browser).await {
        Some(RelayEvent::ServerError { error }) => assert!(error.contains("unreachable")),
        other => panic!("expected server-error, got {:?}", other),
    }
    assert_eq!(next_event(&mut browser).await, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_browser_disconnect_closes_upstream() {
    let (server, upstream_addr) = upstream().await;
    let bridge = start_bridge(RelayConfig::with_upstream(upstream_addr)).await;
    let mut browser = open_browser(bridge.addr).await;
    let (mut game_side, _) = server.accept().await.unwrap();
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::connected()));

    browser.close(None).await.unwrap();
    let mut buf = [0u8; 16];
    let n = timeout(WAIT, game_side.read(&mut buf)).await.unwrap().unwrap();
    assert_eq!(n, 0);
    wait_for_empty(&bridge.registry).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_browser_message_is_refused() {
    let (server, upstream_addr) = upstream().await;
    let bridge = start_bridge(RelayConfig::with_upstream(upstream_addr)).await;
    let mut browser = open_browser(bridge.addr).await;
    let (_game_side, _) = server.accept().await.unwrap();
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::connected()));

    browser
        .send(Message::Text("{\"event\":\"bogus\"}".to_string()))
        .await
        .unwrap();
    assert!(matches!(
        next_event(&mut browser).await,
        Some(RelayEvent::Error { .. })
    ));
    assert_eq!(bridge.registry.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_idle_upstream_times_out() {
    let (server, upstream_addr) = upstream().await;
    let config = RelayConfig {
        idle_timeout: Duration::from_millis(200),
        ..RelayConfig::with_upstream(upstream_addr)
    };
    let bridge = start_bridge(config).await;
    let mut browser = open_browser(bridge.addr).await;
    let (_game_side, _) = server.accept().await.unwrap();
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::connected()));

    match next_event(&mut browser).await {
        Some(RelayEvent::ServerError { error }) => assert!(error.contains("idle")),
        other => panic!("expected server-error, got {:?}", other),
    }
    wait_for_empty(&bridge.registry).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_oversized_upstream_frame_ends_link() {
    let (server, upstream_addr) = upstream().await;
    let config = RelayConfig {
        max_frame_len: 64,
        ..RelayConfig::with_upstream(upstream_addr)
    };
    let bridge = start_bridge(config).await;
    let mut browser = open_browser(bridge.addr).await;
    let (mut game_side, _) = server.accept().await.unwrap();
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::connected()));

    game_side.write_all(&[b'x'; 256]).await.unwrap();
    assert!(matches!(
        next_event(&mut browser).await,
        Some(RelayEvent::ServerError { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pending_write_overflow() {
    let (server, upstream_addr) = upstream().await;
    let config = RelayConfig {
        max_pending_write: 64,
        ..RelayConfig::with_upstream(upstream_addr)
    };
    let bridge = start_bridge(config).await;
    let mut browser = open_browser(bridge.addr).await;
    let (_game_side, _) = server.accept().await.unwrap();
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::connected()));

    let chat = "x".repeat(256);
    send_client_message(&mut browser, json!({"cmd": "CHAT", "payload": {"message": chat}})).await;
    match next_event(&mut browser).await {
        Some(RelayEvent::ServerError { error }) => assert!(error.contains("limit 64")),
        other => panic!("expected server-error, got {:?}", other),
    }
    wait_for_empty(&bridge.registry).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_closes_connections() {
    let (server, upstream_addr) = upstream().await;
    let bridge = start_bridge(RelayConfig::with_upstream(upstream_addr)).await;
    let mut browser = open_browser(bridge.addr).await;
    let (_game_side, _) = server.accept().await.unwrap();
    assert_eq!(next_event(&mut browser).await, Some(RelayEvent::connected()));

    bridge.shutdown.trigger();
    match next_event(&mut browser).await {
        Some(RelayEvent::ServerError { error }) => assert!(error.contains("shutting down")),
        other => panic!("expected server-error, got {:?}", other),
    }
    timeout(WAIT, bridge.task).await.unwrap().unwrap().unwrap();
    assert!(bridge.registry.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connections_are_independent() {
    let (server, upstream_addr) = upstream().await;
    let bridge = start_bridge(RelayConfig::with_upstream(upstream_addr)).await;

    let mut first = open_browser(bridge.addr).await;
    let (first_game, _) = server.accept().await.unwrap();
    assert_eq!(next_event(&mut first).await, Some(RelayEvent::connected()));
    let mut second = open_browser(bridge.addr).await;
    let (mut second_game, _) = server.accept().await.unwrap();
    assert_eq!(next_event(&mut second).await, Some(RelayEvent::connected()));
    assert_eq!(bridge.registry.len(), 2);

    drop(first_game);
    assert_eq!(next_event(&mut first).await, Some(RelayEvent::disconnected()));

    second_game
        .write_all(b"{\"cmd\":\"LOGOUT_SUCCESS\",\"payload\":{}}\n")
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut second).await,
        Some(RelayEvent::ServerMessage(json!({"cmd": "LOGOUT_SUCCESS", "payload": {}})))
    );
}
