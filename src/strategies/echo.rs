//! Echo strategies: every frame or datagram goes back to its sender.

use axum::extract::ws::Message;
use futures_util::future::BoxFuture;

use crate::http::{ConnectionHandler, StaticHandler, WsClient};
use crate::lifecycle::registry::{ServiceKey, ServiceRegistry};
use crate::strategies::{Strategy, StrategyError};

/// WebSocket echo. Also serves the strategy's static assets.
pub struct EchoWebSocket;

struct EchoHandler;

impl ConnectionHandler for EchoHandler {
    fn on_message<'a>(&'a self, client: &'a WsClient, message: Message) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            client.send(message);
        })
    }
}

impl Strategy for EchoWebSocket {
    fn attach(
        &self,
        registry: &mut ServiceRegistry,
        statics: &StaticHandler,
    ) -> Result<(), StrategyError> {
        registry
            .http_mut()
            .ok_or(StrategyError::MissingService(ServiceKey::Http))?
            .fallback_service(statics.service());
        registry
            .ws()
            .ok_or(StrategyError::MissingService(ServiceKey::Ws))?
            .set_handler(EchoHandler);
        Ok(())
    }
}

/// UDP echo.
pub struct EchoUdp;

impl Strategy for EchoUdp {
    fn attach(
        &self,
        registry: &mut ServiceRegistry,
        statics: &StaticHandler,
    ) -> Result<(), StrategyError> {
        registry
            .http_mut()
            .ok_or(StrategyError::MissingService(ServiceKey::Http))?
            .fallback_service(statics.service());
        registry
            .udp_mut()
            .ok_or(StrategyError::MissingService(ServiceKey::Udp))?
            .on_datagram(|datagram| async move {
                if let Err(e) = datagram.reply(datagram.payload()).await {
                    tracing::warn!(peer = %datagram.peer(), error = %e, "Echo reply failed");
                }
            });
        Ok(())
    }
}
