//! Registry of started services.
//!
//! A field is populated if and only if its service started successfully,
//! and each field is populated at most once.

use std::fmt;

use thiserror::Error;

use crate::http::{HttpService, WsLayer};
use crate::net::UdpService;
use crate::store::StoreClient;

/// Key naming one registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    Store,
    Http,
    Ws,
    Udp,
}

impl ServiceKey {
    /// Teardown order, independent of startup order.
    pub const TEARDOWN_ORDER: [ServiceKey; 4] =
        [ServiceKey::Udp, ServiceKey::Ws, ServiceKey::Http, ServiceKey::Store];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKey::Store => "store",
            ServiceKey::Http => "http",
            ServiceKey::Ws => "ws",
            ServiceKey::Udp => "udp",
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("service '{0}' is already registered")]
    AlreadySet(ServiceKey),
}

/// The registry's handles, moved out for teardown.
#[derive(Debug, Default)]
pub struct Services {
    pub store: Option<StoreClient>,
    pub http: Option<HttpService>,
    pub ws: Option<WsLayer>,
    pub udp: Option<UdpService>,
}

/// Owner-of-record for every started service handle.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Services,
}

fn set_once<T>(slot: &mut Option<T>, key: ServiceKey, value: T) -> Result<(), RegistryError> {
    if slot.is_some() {
        return Err(RegistryError::AlreadySet(key));
    }
    *slot = Some(value);
    crate::observability::metrics::record_service_started(key);
    tracing::debug!(service = %key, "Service registered");
    Ok(())
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> Option<&StoreClient> {
        self.services.store.as_ref()
    }

    pub fn http(&self) -> Option<&HttpService> {
        self.services.http.as_ref()
    }

    pub fn http_mut(&mut self) -> Option<&mut HttpService> {
        self.services.http.as_mut()
    }

    pub fn ws(&self) -> Option<&WsLayer> {
        self.services.ws.as_ref()
    }

    pub fn ws_mut(&mut self) -> Option<&mut WsLayer> {
        self.services.ws.as_mut()
    }

    pub fn udp(&self) -> Option<&UdpService> {
        self.services.udp.as_ref()
    }

    pub fn udp_mut(&mut self) -> Option<&mut UdpService> {
        self.services.udp.as_mut()
    }

    pub fn set_store(&mut self, store: StoreClient) -> Result<(), RegistryError> {
        set_once(&mut self.services.store, ServiceKey::Store, store)
    }

    pub fn set_http(&mut self, http: HttpService) -> Result<(), RegistryError> {
        set_once(&mut self.services.http, ServiceKey::Http, http)
    }

    pub fn set_ws(&mut self, ws: WsLayer) -> Result<(), RegistryError> {
        set_once(&mut self.services.ws, ServiceKey::Ws, ws)
    }

    pub fn set_udp(&mut self, udp: UdpService) -> Result<(), RegistryError> {
        set_once(&mut self.services.udp, ServiceKey::Udp, udp)
    }

    pub fn is_populated(&self, key: ServiceKey) -> bool {
        match key {
            ServiceKey::Store => self.services.store.is_some(),
            ServiceKey::Http => self.services.http.is_some(),
            ServiceKey::Ws => self.services.ws.is_some(),
            ServiceKey::Udp => self.services.udp.is_some(),
        }
    }

    /// Populated keys, in teardown order.
    pub fn populated(&self) -> Vec<ServiceKey> {
        ServiceKey::TEARDOWN_ORDER
            .into_iter()
            .filter(|key| self.is_populated(*key))
            .collect()
    }

    pub fn into_services(self) -> Services {
        self.services
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn empty_registry_has_nothing_populated() {
        let registry = ServiceRegistry::new();
        for key in ServiceKey::TEARDOWN_ORDER {
            assert!(!registry.is_populated(key));
        }
        assert!(registry.populated().is_empty());
        assert!(registry.store().is_none());
    }

    #[test]
    fn fields_are_set_once() {
        let mut registry = ServiceRegistry::new();
        registry
            .set_store(StoreClient::from_store(MemoryStore::new(), "memory"))
            .unwrap();
        registry.set_http(HttpService::new("127.0.0.1", 0)).unwrap();

        let err = registry
            .set_http(HttpService::new("127.0.0.1", 0))
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadySet(ServiceKey::Http)));

        assert_eq!(registry.populated(), vec![ServiceKey::Http, ServiceKey::Store]);
        assert!(registry.is_populated(ServiceKey::Store));
        assert!(!registry.is_populated(ServiceKey::Ws));
    }

    #[test]
    fn teardown_order_is_fixed() {
        assert_eq!(
            ServiceKey::TEARDOWN_ORDER.map(|k| k.as_str()),
            ["udp", "ws", "http", "store"]
        );
    }
}
