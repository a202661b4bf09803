//! UDP socket service.
//!
//! # Responsibilities
//! - Own the bound UDP socket for the process
//! - Run strategy-supplied datagram handlers on receive loops
//! - Close: stop every receive loop, then release the socket

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::task::JoinSet;

use crate::net::listener::{bind_udp, ListenerError};
use crate::observability::metrics;

/// Largest payload a single UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_535;

/// A datagram received on the service socket.
#[derive(Debug, Clone)]
pub struct Datagram {
    payload: Vec<u8>,
    peer: SocketAddr,
    socket: Arc<UdpSocket>,
}

impl Datagram {
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Send `bytes` back to the datagram's sender.
    pub async fn reply(&self, bytes: &[u8]) -> std::io::Result<usize> {
        self.socket.send_to(bytes, self.peer).await
    }
}

/// The process's UDP socket and the receive loops running on it.
pub struct UdpService {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    receivers: JoinSet<()>,
}

impl UdpService {
    /// Bind the socket. Bind failure is startup-fatal; there is no retry.
    pub async fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let (socket, local_addr) = bind_udp(host, port).await?;
        Ok(Self {
            socket: Arc::new(socket),
            local_addr,
            receivers: JoinSet::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn socket(&self) -> &Arc<UdpSocket> {
        &self.socket
    }

    /// Number of receive loops currently attached.
    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    /// Spawn a receive loop that hands each datagram to `handler`.
    ///
    /// Datagrams are handled one at a time, in arrival order.
    pub fn on_datagram<F, Fut>(&mut self, handler: F)
    where
        F: Fn(Datagram) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let socket = Arc::clone(&self.socket);
        self.receivers.spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, peer)) => {
                        metrics::record_udp_datagram();
                        tracing::trace!(peer = %peer, bytes = len, "Datagram received");
                        handler(Datagram {
                            payload: buf[..len].to_vec(),
                            peer,
                            socket: Arc::clone(&socket),
                        })
                        .await;
                    }
                    // Errors on an unconnected UDP socket are per-datagram (e.g. ICMP
                    // port unreachable surfacing on the next read); keep receiving.
                    Err(e) => tracing::warn!(error = %e, "UDP receive failed"),
                }
            }
        });
    }

    /// Stop every receive loop and release the socket.
    pub async fn close(mut self) {
        self.receivers.shutdown().await;
        tracing::info!(address = %self.local_addr, "UDP socket closed");
    }
}

impl std::fmt::Debug for UdpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpService")
            .field("local_addr", &self.local_addr)
            .field("receivers", &self.receivers.len())
            .finish()
    }
}
