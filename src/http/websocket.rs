//! WebSocket upgrade layer.
//!
//! # Responsibilities
//! - Accept upgrade requests on a single path of the shared HTTP listener
//! - Track every connected client
//! - Dispatch frames to the strategy's connection handler
//! - Close: force-close every client, wait for their sessions to end,
//!   then refuse further upgrades
//!
//! # Data Flow
//! ```text
//! GET /<strategy> (Upgrade: websocket)
//!     → upgrade handler (refused once closing)
//!     → session loop
//!         inbound frames  → ConnectionHandler::on_message
//!         outbound queue  → socket (WsClient::send)
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Notify};

use crate::http::server::HttpService;
use crate::net::ConnectionId;
use crate::observability::metrics;

/// Callbacks a strategy installs to handle WebSocket clients.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn on_open(&self, _client: &WsClient) {}

    /// Called for every text or binary frame. The session awaits the returned
    /// future before reading the next frame, and `WsLayer::close` waits for
    /// sessions to end, so no message work outlives the layer.
    fn on_message<'a>(&'a self, client: &'a WsClient, message: Message) -> BoxFuture<'a, ()>;

    fn on_close(&self, _client: &WsClient) {}
}

/// Handle to a connected client.
#[derive(Debug, Clone)]
pub struct WsClient {
    id: ConnectionId,
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<Message>,
}

impl WsClient {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queue a frame for the client. Returns false if the session has ended.
    pub fn send(&self, message: Message) -> bool {
        self.outbound.send(message).is_ok()
    }

    /// Ask the session to close with `code`.
    pub fn close(&self, code: u16, reason: &str) -> bool {
        self.send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
    }
}

struct WsShared {
    clients: DashMap<ConnectionId, WsClient>,
    handler: ArcSwapOption<Box<dyn ConnectionHandler>>,
    closing: AtomicBool,
    drained: Notify,
}

impl WsShared {
    fn remove(&self, id: ConnectionId) {
        self.clients.remove(&id);
        metrics::set_ws_clients(self.clients.len());
        self.drained.notify_waiters();
    }
}

/// The upgrade layer attached to the shared HTTP listener.
pub struct WsLayer {
    path: String,
    shared: Arc<WsShared>,
}

impl WsLayer {
    /// Register the upgrade route at `path` on `http`.
    pub fn attach(http: &mut HttpService, path: impl Into<String>) -> Self {
        let path = path.into();
        let shared = Arc::new(WsShared {
            clients: DashMap::new(),
            handler: ArcSwapOption::empty(),
            closing: AtomicBool::new(false),
            drained: Notify::new(),
        });

        http.route(&path, get(upgrade).with_state(Arc::clone(&shared)));
        tracing::info!(path = %path, "WebSocket layer attached");

        Self { path, shared }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Install the handler for clients connecting from now on.
    pub fn set_handler(&self, handler: impl ConnectionHandler) {
        let handler: Box<dyn ConnectionHandler> = Box::new(handler);
        self.shared.handler.store(Some(Arc::new(handler)));
    }

    pub fn has_handler(&self) -> bool {
        self.shared.handler.load().is_some()
    }

    /// Snapshot of connected clients.
    pub fn clients(&self) -> Vec<WsClient> {
        self.shared
            .clients
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn client_count(&self) -> usize {
        self.shared.clients.len()
    }

    /// Force-close every client, wait for all sessions to end, and stop
    /// accepting upgrades.
    pub async fn close(self) {
        self.shared.closing.store(true, Ordering::Release);

        let clients = self.clients();
        tracing::info!(path = %self.path, clients = clients.len(), "Closing WebSocket clients");
        for client in &clients {
            client.close(close_code::AWAY, "server shutting down");
        }

        loop {
            // Registered before the emptiness check so a removal in between still wakes us.
            let drained = self.shared.drained.notified();
            if self.shared.clients.is_empty() {
                break;
            }
            drained.await;
        }

        tracing::info!(path = %self.path, "WebSocket layer closed");
    }
}

impl std::fmt::Debug for WsLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsLayer")
            .field("path", &self.path)
            .field("clients", &self.shared.clients.len())
            .finish()
    }
}

async fn upgrade(
    State(shared): State<Arc<WsShared>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    if shared.closing.load(Ordering::Acquire) {
        return (StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down").into_response();
    }
    ws.on_upgrade(move |socket| run_session(shared, socket, peer))
}

async fn run_session(shared: Arc<WsShared>, socket: WebSocket, peer: SocketAddr) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut queued) = mpsc::unbounded_channel();
    let client = WsClient {
        id: ConnectionId::next(),
        peer,
        outbound,
    };

    shared.clients.insert(client.id, client.clone());
    metrics::set_ws_clients(shared.clients.len());

    // Close may have snapshotted the clients just before this insert.
    if shared.closing.load(Ordering::Acquire) {
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: close_code::AWAY,
                reason: "server shutting down".into(),
            })))
            .await;
        shared.remove(client.id);
        return;
    }

    tracing::debug!(connection_id = %client.id, peer = %peer, "WebSocket client connected");
    let handler = shared.handler.load_full();
    if let Some(handler) = &handler {
        handler.on_open(&client);
    }

    loop {
        tokio::select! {
            queued_message = queued.recv() => match queued_message {
                Some(message) => {
                    let closing = matches!(message, Message::Close(_));
                    if sink.send(message).await.is_err() || closing {
                        break;
                    }
                }
                None => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(message @ (Message::Text(_) | Message::Binary(_)))) => {
                    if let Some(handler) = &handler {
                        handler.on_message(&client, message).await;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %client.id, error = %e, "WebSocket read failed");
                    break;
                }
            },
        }
    }

    shared.remove(client.id);
    if let Some(handler) = &handler {
        handler.on_close(&client);
    }
    tracing::debug!(connection_id = %client.id, "WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_tungstenite::{connect_async, tungstenite};

    struct Echo;

    impl ConnectionHandler for Echo {
        fn on_message<'a>(&'a self, client: &'a WsClient, message: Message) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                client.send(message);
            })
        }
    }

    #[tokio::test]
    async fn routes_frames_to_handler() {
        let mut http = HttpService::new("127.0.0.1", 0);
        let ws = WsLayer::attach(&mut http, "/echo");
        ws.set_handler(Echo);
        assert!(ws.has_handler());
        let addr = http.listen().await.unwrap();

        let (mut client, _) = connect_async(format!("ws://{}/echo", addr)).await.unwrap();
        client.send(tungstenite::Message::text("hello")).await.unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("no reply")
            .unwrap()
            .unwrap();
        assert_eq!(reply.to_text().unwrap(), "hello");
        assert_eq!(ws.client_count(), 1);

        ws.close().await;
        http.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_disconnects_clients_and_refuses_upgrades() {
        let mut http = HttpService::new("127.0.0.1", 0);
        let ws = WsLayer::attach(&mut http, "/room");
        let addr = http.listen().await.unwrap();

        let (mut client, _) = connect_async(format!("ws://{}/room", addr)).await.unwrap();
        // Wait for the session to register.
        for _ in 0..50 {
            if ws.client_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(ws.client_count(), 1);

        let shared = Arc::clone(&ws.shared);
        tokio::time::timeout(Duration::from_secs(2), ws.close())
            .await
            .expect("close should not wait on a force-closed client");
        assert!(shared.clients.is_empty());

        match client.next().await {
            Some(Ok(tungstenite::Message::Close(Some(frame)))) => {
                assert_eq!(u16::from(frame.code), close_code::AWAY);
            }
            other => panic!("expected close frame, got {other:?}"),
        }

        let refused = connect_async(format!("ws://{}/room", addr)).await;
        assert!(refused.is_err());

        http.close().await.unwrap();
    }
}
