//! Metrics collection and exposition.
//!
//! # Metrics
//! - `server_services_started_total` (counter): services registered, by service
//! - `server_teardown_steps_total` (counter): teardown steps run, by service, result
//! - `server_ws_clients` (gauge): open WebSocket sessions
//! - `server_udp_datagrams_total` (counter): datagrams received
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus exporter only runs when enabled in config

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::ServiceKey;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
/// Must be called inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_service_started(service: ServiceKey) {
    metrics::counter!("server_services_started_total", "service" => service.as_str()).increment(1);
}

pub fn record_teardown_step(service: ServiceKey, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!(
        "server_teardown_steps_total",
        "service" => service.as_str(),
        "result" => result
    )
    .increment(1);
}

pub fn set_ws_clients(count: usize) {
    metrics::gauge!("server_ws_clients").set(count as f64);
}

pub fn record_udp_datagram() {
    metrics::counter!("server_udp_datagrams_total").increment(1);
}
