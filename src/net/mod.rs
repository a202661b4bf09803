//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured host:port
//!     → listener.rs (bind TCP for HTTP, UDP for datagrams)
//!     → udp.rs (socket ownership, receive loops)
//!     → connection.rs (IDs for WebSocket sessions)
//! ```
//!
//! # Design Decisions
//! - Bind failures are startup-fatal, never retried
//! - Receive loops are owned by the service so close can stop them

pub mod connection;
pub mod listener;
pub mod udp;

pub use connection::ConnectionId;
pub use listener::ListenerError;
pub use udp::{Datagram, UdpService};
