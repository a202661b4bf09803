//! End-to-end startup and shutdown over real sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::UdpSocket;
use tokio_tungstenite::tungstenite::Message;

use strategy_server::lifecycle::{
    DispatchError, ShutdownOrchestrator, ShutdownOutcome, StartupError, Transport,
};
use strategy_server::store::StoreError;
use strategy_server::strategies::counter::COUNTER_KEY;
use strategy_server::strategies::ConnectionKind;

mod common;

const DEADLINE: Duration = Duration::from_millis(5000);

#[tokio::test]
async fn test_echo_udp_on_default_port() {
    let config = common::memory_config(28480);
    let (registry, started) = common::start(&config, "echo", ConnectionKind::Udp).await;
    let started = started.expect("startup failed");

    let udp_addr: SocketAddr = "127.0.0.1:28481".parse().unwrap();
    assert_eq!(started.http, "127.0.0.1:28480".parse::<SocketAddr>().unwrap());
    assert_eq!(started.transport, Transport::Udp { address: udp_addr });
    {
        let registry = registry.lock().await;
        assert!(registry.ws().is_none());
        assert_eq!(registry.udp().map(|u| u.local_addr()), Some(udp_addr));
    }

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(b"ping", udp_addr).await.unwrap();
    let mut buf = [0u8; 64];
    let (n, from) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .expect("no echo within 2s")
        .unwrap();
    assert_eq!(&buf[..n], b"ping");
    assert_eq!(from, udp_addr);

    let orchestrator = ShutdownOrchestrator::new(Arc::clone(&registry), DEADLINE);
    let outcome = orchestrator.on_termination_signal().await;
    assert!(matches!(outcome, Some(ShutdownOutcome::Graceful)));

    // Both ports are free again.
    UdpSocket::bind(udp_addr).await.expect("udp port still held");
    tokio::net::TcpListener::bind(started.http)
        .await
        .expect("http port still held");
}

#[tokio::test]
async fn test_counter_websocket_counts_in_store() {
    let config = common::memory_config(0);
    let (registry, started) = common::start(&config, "counter", ConnectionKind::WebSocket).await;
    let started = started.expect("startup failed");
    assert_eq!(
        started.transport,
        Transport::WebSocket {
            path: "/counter".into()
        }
    );
    assert!(registry.lock().await.udp().is_none());

    let mut ws = common::connect_ws(started.http, "/counter").await;
    assert_eq!(common::round_trip(&mut ws, "a").await, "1");
    assert_eq!(common::round_trip(&mut ws, "b").await, "2");
    assert_eq!(common::round_trip(&mut ws, "c").await, "3");

    let store = registry.lock().await.store().cloned().unwrap();
    assert_eq!(store.get(COUNTER_KEY).await.unwrap().as_deref(), Some("3"));

    let orchestrator = ShutdownOrchestrator::new(Arc::clone(&registry), DEADLINE);
    assert!(matches!(
        orchestrator.on_termination_signal().await,
        Some(ShutdownOutcome::Graceful)
    ));

    // Open sessions are told the server is going away.
    let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("no close frame within 2s");
    assert!(!matches!(frame, Some(Ok(Message::Text(_)))));

    // The store was flushed and closed.
    assert!(matches!(store.get(COUNTER_KEY).await, Err(StoreError::Closed)));
}

#[tokio::test]
async fn test_echo_websocket_serves_static_files() {
    let root = common::temp_dir("static");
    std::fs::create_dir_all(root.join("echo")).unwrap();
    std::fs::write(root.join("echo").join("index.html"), "<h1>echo</h1>").unwrap();

    let mut config = common::memory_config(0);
    config.static_root = root.clone();
    let (registry, started) = common::start(&config, "echo", ConnectionKind::WebSocket).await;
    let started = started.expect("startup failed");

    let body = reqwest::get(format!("http://{}/", started.http))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "<h1>echo</h1>");

    let mut ws = common::connect_ws(started.http, "/echo").await;
    assert_eq!(common::round_trip(&mut ws, "hello").await, "hello");

    let orchestrator = ShutdownOrchestrator::new(registry, DEADLINE);
    assert_eq!(
        orchestrator.on_termination_signal().await.map(|o| o.exit_code()),
        Some(0)
    );
    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn test_silent_strategy_starts_without_entry_point() {
    let config = common::memory_config_with_udp(0, 0);
    let (registry, started) = common::start(&config, "silent", ConnectionKind::Udp).await;
    let started = started.expect("startup failed");
    assert!(matches!(started.transport, Transport::Udp { .. }));

    let registry_guard = registry.lock().await;
    assert_eq!(registry_guard.udp().map(|u| u.receiver_count()), Some(0));
    drop(registry_guard);

    let orchestrator = ShutdownOrchestrator::new(registry, DEADLINE);
    assert!(matches!(
        orchestrator.on_termination_signal().await,
        Some(ShutdownOutcome::Graceful)
    ));
}

#[tokio::test]
async fn test_unknown_strategy_fails_before_any_transport() {
    let config = common::memory_config(0);
    let (registry, started) = common::start(&config, "nope", ConnectionKind::WebSocket).await;

    match started {
        Err(StartupError::Dispatch(DispatchError::UnknownStrategy { module_path })) => {
            assert_eq!(module_path, "strategies/nope/services/websocket");
        }
        other => panic!("expected unknown strategy, got {other:?}"),
    }

    let registry = registry.lock().await;
    assert!(registry.ws().is_none());
    assert!(registry.udp().is_none());
    assert!(!registry.http().map(|h| h.is_listening()).unwrap_or(false));
}

#[tokio::test]
async fn test_udp_bind_conflict_is_fatal() {
    let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let config = common::memory_config_with_udp(0, port);
    let (_registry, started) = common::start(&config, "echo", ConnectionKind::Udp).await;
    assert!(matches!(
        started,
        Err(StartupError::Dispatch(DispatchError::Bind(_)))
    ));
}

#[tokio::test]
async fn test_unreachable_store_is_fatal() {
    let mut config = common::memory_config(0);
    config.store = "redis://127.0.0.1:1".into();
    let (registry, started) = common::start(&config, "echo", ConnectionKind::WebSocket).await;

    assert!(matches!(started, Err(StartupError::Store(_))));
    assert!(registry.lock().await.populated().is_empty());
}
