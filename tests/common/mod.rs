//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use strategy_server::config::schema::UdpConfig;
use strategy_server::config::ServerConfig;
use strategy_server::lifecycle::{startup, ServiceRegistry, StartedServices, StartupError};
use strategy_server::strategies::{ConnectionKind, StrategyCatalog, StrategyDescriptor};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Memory-backed config on 127.0.0.1. Port 0 lets the OS pick both ports.
pub fn memory_config(port: u16) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port,
        store: "memory://".into(),
        ..ServerConfig::default()
    }
}

/// Same as [`memory_config`] with an explicit UDP port.
pub fn memory_config_with_udp(port: u16, udp_port: u16) -> ServerConfig {
    ServerConfig {
        udp: Some(UdpConfig {
            host: None,
            port: Some(udp_port),
        }),
        ..memory_config(port)
    }
}

/// Run the startup sequence against a fresh shared registry.
pub async fn start(
    config: &ServerConfig,
    strategy: &str,
    connection: ConnectionKind,
) -> (Arc<Mutex<ServiceRegistry>>, Result<StartedServices, StartupError>) {
    let registry = Arc::new(Mutex::new(ServiceRegistry::new()));
    let descriptor = StrategyDescriptor::new(strategy, connection);
    let result = startup::start(config, &descriptor, StrategyCatalog::builtin(), &registry).await;
    (registry, result)
}

pub async fn connect_ws(addr: SocketAddr, path: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("websocket handshake failed");
    stream
}

/// Send a text frame and wait for the next text reply.
pub async fn round_trip(ws: &mut WsStream, text: &str) -> String {
    ws.send(Message::text(text)).await.unwrap();
    loop {
        let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("no reply within 2s")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(reply) = next {
            return reply.to_string();
        }
    }
}

/// Fresh directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("strategy-server-it-{}-{}", std::process::id(), name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write a config file into a fresh temp directory and return its path.
pub fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = temp_dir(name).join("config.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

/// Poll until something accepts TCP connections on `addr`.
pub async fn wait_for_listener(addr: SocketAddr) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("nothing listening on {addr} after 5s");
}
