//! Redis-backed cache gateway

use super::{CacheGateway, CacheResult};
use crate::error::CacheError;
use ::redis::aio::MultiplexedConnection;
use ::redis::AsyncCommands;
use async_trait::async_trait;
use tracing::info;

/// Cache gateway over a multiplexed Redis connection
///
/// The connection is cloned per command; clones share one socket.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Open a client and verify the server answers `PING`
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client =
            ::redis::Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let _: String = ::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        info!("Redis connection established");
        Ok(Self { conn })
    }
}

fn command_error(e: ::redis::RedisError) -> CacheError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
        CacheError::Connection(e.to_string())
    } else {
        CacheError::Command(e.to_string())
    }
}

#[async_trait]
impl CacheGateway for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(command_error)
    }

    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await.map_err(command_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(command_error)?;
        Ok(())
    }
}
