//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     server.rs (HttpService created, not yet bound)
//!     → websocket.rs (upgrade route at /<strategy>, websocket strategies only)
//!     → strategy attaches routes / static fallback (static_files.rs)
//!     → HttpService::listen
//!
//! Shutdown:
//!     websocket.rs close (clients first) → server.rs close (stop accepting, drain)
//! ```

pub mod server;
pub mod static_files;
pub mod websocket;

pub use server::HttpService;
pub use static_files::StaticHandler;
pub use websocket::{ConnectionHandler, WsClient, WsLayer};
