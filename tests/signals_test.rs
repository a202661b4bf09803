//! Signal handling of the real binary.

#![cfg(unix)]

use std::net::SocketAddr;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};

mod common;

fn spawn_server(config: &std::path::Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_strategy-server"))
        .arg("--config")
        .arg(config)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("failed to start server binary")
}

fn send_signal(child: &Child, signal: &str) {
    let pid = child.id().expect("server already exited");
    // The process may be gone by the time a later signal is sent.
    let _ = std::process::Command::new("kill")
        .arg(format!("-{signal}"))
        .arg(pid.to_string())
        .status();
}

async fn wait_exit(child: &mut Child) -> ExitStatus {
    tokio::time::timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("server did not exit within 10s")
        .unwrap()
}

#[tokio::test]
async fn test_sigterm_then_sigint_exits_cleanly() {
    let config = common::write_config(
        "signals-udp",
        r#"
        host = "127.0.0.1"
        port = 28490
        store = "memory://"

        [components]
        strategy = "echo"
        connection = "udp"
        "#,
    );
    let http: SocketAddr = "127.0.0.1:28490".parse().unwrap();
    let udp: SocketAddr = "127.0.0.1:28491".parse().unwrap();

    let mut child = spawn_server(&config);
    common::wait_for_listener(http).await;

    send_signal(&child, "TERM");
    // Arrives while teardown runs; must not restart or abort it.
    send_signal(&child, "INT");

    let status = wait_exit(&mut child).await;
    assert_eq!(status.code(), Some(0));

    tokio::net::UdpSocket::bind(udp).await.expect("udp port still held");
    tokio::net::TcpListener::bind(http)
        .await
        .expect("http port still held");
}

#[tokio::test]
async fn test_sigint_closes_open_websocket_sessions() {
    let config = common::write_config(
        "signals-ws",
        r#"
        host = "127.0.0.1"
        port = 28492
        store = "memory://"

        [components]
        strategy = "counter"
        "#,
    );
    let http: SocketAddr = "127.0.0.1:28492".parse().unwrap();

    let mut child = spawn_server(&config);
    common::wait_for_listener(http).await;

    let mut ws = common::connect_ws(http, "/counter").await;
    assert_eq!(common::round_trip(&mut ws, "one").await, "1");

    let started = Instant::now();
    send_signal(&child, "INT");
    let status = wait_exit(&mut child).await;
    assert_eq!(status.code(), Some(0));
    assert!(started.elapsed() < Duration::from_secs(5));

    tokio::net::TcpListener::bind(http)
        .await
        .expect("http port still held");
}

#[tokio::test]
async fn test_startup_failure_exits_with_error() {
    let config = common::write_config(
        "signals-no-store",
        r#"
        host = "127.0.0.1"
        port = 28494
        store = "redis://127.0.0.1:1"
        "#,
    );

    let mut child = spawn_server(&config);
    let status = wait_exit(&mut child).await;
    assert_eq!(status.code(), Some(1));
}
