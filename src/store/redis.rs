//! Redis store client.

use redis::aio::MultiplexedConnection;
use redis::{AsyncConnectionConfig, Client};

use super::{KeyValueStore, StoreError, StoreFuture};

/// Redis-backed store over a single multiplexed connection.
///
/// The connection is cheap to clone; every command works on its own clone.
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Open a connection to the redis URL (e.g., "redis://127.0.0.1/").
    ///
    /// Commands have no response timeout: a slow FLUSHALL at shutdown is
    /// bounded only by the shutdown deadline.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let config = AsyncConnectionConfig::new().set_response_timeout(None);
        let conn = client
            .get_multiplexed_async_connection_with_config(&config)
            .await?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for RedisStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let value = redis::cmd("GET")
                .arg(key)
                .query_async::<Option<String>>(&mut conn)
                .await?;
            Ok(value)
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .query_async::<()>(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn incr<'a>(&'a self, key: &'a str) -> StoreFuture<'a, i64> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let value = redis::cmd("INCR")
                .arg(key)
                .query_async::<i64>(&mut conn)
                .await?;
            Ok(value)
        })
    }

    fn flush_all(&self) -> StoreFuture<'_, ()> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            redis::cmd("FLUSHALL").query_async::<()>(&mut conn).await?;
            Ok(())
        })
    }

    fn quit(&self) -> StoreFuture<'_, ()> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            redis::cmd("QUIT").query_async::<()>(&mut conn).await?;
            Ok(())
        })
    }
}
