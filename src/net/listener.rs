//! Socket binding shared by the HTTP and UDP services.
//!
//! # Responsibilities
//! - Bind TCP and UDP sockets to configured `host:port` pairs
//! - Report the bound address for logging
//! - Surface bind failures as startup-fatal errors

use std::net::SocketAddr;
use tokio::net::{TcpListener, UdpSocket};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind {
        address: String,
        source: std::io::Error,
    },
    /// `listen` called on a service that is already accepting.
    AlreadyListening(SocketAddr),
    /// The serve loop failed.
    Serve(std::io::Error),
    /// The serve task panicked or was cancelled.
    Join(tokio::task::JoinError),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind { address, source } => {
                write!(f, "Failed to bind {}: {}", address, source)
            }
            ListenerError::AlreadyListening(addr) => write!(f, "Already listening on {}", addr),
            ListenerError::Serve(e) => write!(f, "Server error: {}", e),
            ListenerError::Join(e) => write!(f, "Server task failed: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
            ListenerError::Serve(e) => Some(e),
            ListenerError::Join(e) => Some(e),
            ListenerError::AlreadyListening(_) => None,
        }
    }
}

fn bind_error(host: &str, port: u16, source: std::io::Error) -> ListenerError {
    ListenerError::Bind {
        address: format!("{}:{}", host, port),
        source,
    }
}

/// Bind a TCP listener on `host:port`.
pub async fn bind_tcp(host: &str, port: u16) -> Result<(TcpListener, SocketAddr), ListenerError> {
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|e| bind_error(host, port, e))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| bind_error(host, port, e))?;

    tracing::info!(address = %local_addr, protocol = "tcp", "Listener bound");
    Ok((listener, local_addr))
}

/// Bind a UDP socket on `host:port`.
pub async fn bind_udp(host: &str, port: u16) -> Result<(UdpSocket, SocketAddr), ListenerError> {
    let socket = UdpSocket::bind((host, port))
        .await
        .map_err(|e| bind_error(host, port, e))?;
    let local_addr = socket
        .local_addr()
        .map_err(|e| bind_error(host, port, e))?;

    tracing::info!(address = %local_addr, protocol = "udp", "Listener bound");
    Ok((socket, local_addr))
}
