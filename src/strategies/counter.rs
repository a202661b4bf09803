//! Counter strategy: counts messages in the store and replies with the total.

use axum::extract::ws::Message;
use futures_util::future::BoxFuture;

use crate::http::{ConnectionHandler, StaticHandler, WsClient};
use crate::lifecycle::registry::{ServiceKey, ServiceRegistry};
use crate::store::StoreClient;
use crate::strategies::{Strategy, StrategyError};

/// Store key holding the message count.
pub const COUNTER_KEY: &str = "counter:messages";

pub struct CounterWebSocket;

struct CounterHandler {
    store: StoreClient,
}

impl ConnectionHandler for CounterHandler {
    fn on_message<'a>(&'a self, client: &'a WsClient, _message: Message) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            match self.store.incr(COUNTER_KEY).await {
                Ok(count) => {
                    client.send(Message::Text(count.to_string().into()));
                }
                Err(e) => {
                    tracing::warn!(connection_id = %client.id(), error = %e, "Counter update failed");
                }
            }
        })
    }
}

impl Strategy for CounterWebSocket {
    fn attach(
        &self,
        registry: &mut ServiceRegistry,
        _statics: &StaticHandler,
    ) -> Result<(), StrategyError> {
        let store = registry
            .store()
            .ok_or(StrategyError::MissingService(ServiceKey::Store))?
            .clone();
        registry
            .ws()
            .ok_or(StrategyError::MissingService(ServiceKey::Ws))?
            .set_handler(CounterHandler { store });
        Ok(())
    }
}
