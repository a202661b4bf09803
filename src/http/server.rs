//! Shared HTTP listener service.
//!
//! # Responsibilities
//! - Collect routes from the transport layer and the strategy before listening
//! - Bind and serve the Axum router with connect info
//! - Close: stop accepting, let in-flight requests finish, wait for the serve task

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::Request,
    response::IntoResponse,
    routing::MethodRouter,
    Router,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::Service;
use tower_http::trace::TraceLayer;

use crate::net::listener::{bind_tcp, ListenerError};

/// Serve loop started by [`HttpService::listen`].
struct RunningServer {
    local_addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// The process's HTTP listener.
///
/// Created before any transport so the WebSocket layer and the strategy can
/// register routes on it; begins accepting only once `listen` is called.
pub struct HttpService {
    host: String,
    port: u16,
    router: Router,
    running: Option<RunningServer>,
}

impl HttpService {
    /// Create an HTTP service for `host:port`. Nothing is bound yet.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            router: Router::new(),
            running: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address actually bound, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    pub fn is_listening(&self) -> bool {
        self.running.is_some()
    }

    /// Add a route. Routes added after `listen` are not served.
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> &mut Self {
        self.update_router(|router| router.route(path, method_router));
        self
    }

    /// Merge a whole router into the service.
    pub fn merge(&mut self, other: Router) -> &mut Self {
        self.update_router(|router| router.merge(other));
        self
    }

    /// Serve `service` for every request no route matched.
    pub fn fallback_service<T>(&mut self, service: T) -> &mut Self
    where
        T: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
        T::Response: IntoResponse,
        T::Future: Send + 'static,
    {
        self.update_router(|router| router.fallback_service(service));
        self
    }

    fn update_router(&mut self, f: impl FnOnce(Router) -> Router) {
        if self.running.is_some() {
            tracing::warn!("Route registered after the HTTP listener started; it will not be served");
        }
        let router = std::mem::replace(&mut self.router, Router::new());
        self.router = f(router);
    }

    /// Bind the listener and start serving in the background.
    pub async fn listen(&mut self) -> Result<SocketAddr, ListenerError> {
        if let Some(running) = &self.running {
            return Err(ListenerError::AlreadyListening(running.local_addr));
        }

        let (listener, local_addr) = bind_tcp(&self.host, self.port).await?;
        let router = std::mem::replace(&mut self.router, Router::new())
            .layer(TraceLayer::new_for_http());
        let (stop, stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let app = router.into_make_service_with_connect_info::<SocketAddr>();
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stopped.await;
                })
                .await
        });

        tracing::info!(address = %local_addr, "HTTP server listening");
        self.running = Some(RunningServer {
            local_addr,
            stop,
            task,
        });
        Ok(local_addr)
    }

    /// Stop accepting and wait for in-flight requests to finish.
    ///
    /// A service that never started listening has nothing to close.
    pub async fn close(self) -> Result<(), ListenerError> {
        let Some(running) = self.running else {
            tracing::debug!("HTTP service was never listening");
            return Ok(());
        };

        let _ = running.stop.send(());
        running
            .task
            .await
            .map_err(ListenerError::Join)?
            .map_err(ListenerError::Serve)?;

        tracing::info!(address = %running.local_addr, "HTTP server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for HttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpService")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("local_addr", &self.local_addr())
            .finish()
    }
}
