//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (deadline > 0, derivable UDP port)
//! - Check the store URL scheme and the metrics address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServerConfig;

/// Store URL schemes the server can connect to.
pub const STORE_SCHEMES: [&str; 3] = ["redis", "rediss", "memory"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("host must not be empty")]
    EmptyHost,

    #[error("udp port cannot be derived from http port {0}; set udp.port explicitly")]
    UdpPortNotDerivable(u16),

    #[error("store url '{url}' is invalid: {reason}")]
    InvalidStoreUrl { url: String, reason: String },

    #[error("store scheme '{0}' is not supported (expected redis, rediss or memory)")]
    UnsupportedStoreScheme(String),

    #[error("shutdown.deadline_ms must be greater than zero")]
    ZeroDeadline,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("strategy name '{0}' may only contain ASCII letters, digits, '-' and '_'")]
    InvalidStrategyName(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    let explicit_udp_port = config.udp.as_ref().and_then(|u| u.port).is_some();
    if !explicit_udp_port && config.port == u16::MAX {
        errors.push(ValidationError::UdpPortNotDerivable(config.port));
    }

    match Url::parse(&config.store) {
        Ok(url) if !STORE_SCHEMES.contains(&url.scheme()) => {
            errors.push(ValidationError::UnsupportedStoreScheme(url.scheme().to_string()));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidStoreUrl {
            url: config.store.clone(),
            reason: e.to_string(),
        }),
    }

    if config.shutdown.deadline_ms == 0 {
        errors.push(ValidationError::ZeroDeadline);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if let Some(name) = config.components.as_ref().and_then(|c| c.strategy.as_deref()) {
        if let Err(e) = validate_strategy_name(name) {
            errors.push(e);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Strategy names become URL paths and catalog keys.
pub fn validate_strategy_name(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidStrategyName(name.to_string()))
    }
}
