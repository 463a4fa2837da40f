/// Single-use token enforcement
///
/// Email validation tokens may be redeemed once. Redemption "consumes" the
/// token's `jti`; a second consumption of the same id is refused until the
/// entry expires together with the token itself.
///
/// Two implementations:
///
/// - [`RedisTokenBlacklist`]: `SET revoked:{jti} 1 NX EX ttl`, shared across nodes
/// - [`MemoryTokenBlacklist`]: process-local map, for single-node deployments and tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::redis::{RedisClient, RedisClientError};

/// Error type for blacklist operations
#[derive(Debug, thiserror::Error)]
pub enum BlacklistError {
    #[error("Token blacklist unavailable: {0}")]
    Unavailable(String),
}

impl From<RedisClientError> for BlacklistError {
    fn from(err: RedisClientError) -> Self {
        BlacklistError::Unavailable(err.to_string())
    }
}

/// Set of consumed token ids
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Marks `jti` as consumed for `ttl`
    ///
    /// Returns `true` on the first consumption and `false` if the id was
    /// already consumed.
    async fn consume(&self, jti: Uuid, ttl: Duration) -> Result<bool, BlacklistError>;

    /// Undoes a consumption whose redemption did not complete
    async fn release(&self, jti: Uuid) -> Result<(), BlacklistError>;
}

/// Process-local blacklist
#[derive(Debug, Default)]
pub struct MemoryTokenBlacklist {
    entries: Mutex<HashMap<Uuid, Instant>>,
}

impl MemoryTokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenBlacklist for MemoryTokenBlacklist {
    async fn consume(&self, jti: Uuid, ttl: Duration) -> Result<bool, BlacklistError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, expires_at| *expires_at > now);

        if entries.contains_key(&jti) {
            return Ok(false);
        }

        entries.insert(jti, now + ttl);
        Ok(true)
    }

    async fn release(&self, jti: Uuid) -> Result<(), BlacklistError> {
        self.entries.lock().await.remove(&jti);
        Ok(())
    }
}

/// Redis-backed blacklist
#[derive(Debug, Clone)]
pub struct RedisTokenBlacklist {
    client: RedisClient,
}

impl RedisTokenBlacklist {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn key(jti: Uuid) -> String {
        format!("revoked:{}", jti)
    }
}

#[async_trait]
impl TokenBlacklist for RedisTokenBlacklist {
    async fn consume(&self, jti: Uuid, ttl: Duration) -> Result<bool, BlacklistError> {
        let mut conn = self.client.get_connection();
        // EX 0 is rejected by Redis
        let seconds = ttl.as_secs().max(1);

        let reply: Option<String> = tokio::time::timeout(
            self.client.config().command_timeout(),
            redis::cmd("SET")
                .arg(Self::key(jti))
                .arg(1)
                .arg("NX")
                .arg("EX")
                .arg(seconds)
                .query_async(&mut conn),
        )
        .await
        .map_err(|_| RedisClientError::Timeout)?
        .map_err(RedisClientError::from)?;

        tracing::debug!(%jti, first_use = reply.is_some(), "Consumed token id");
        Ok(reply.is_some())
    }

    async fn release(&self, jti: Uuid) -> Result<(), BlacklistError> {
        let mut conn = self.client.get_connection();

        let _: i64 = tokio::time::timeout(
            self.client.config().command_timeout(),
            redis::cmd("DEL").arg(Self::key(jti)).query_async(&mut conn),
        )
        .await
        .map_err(|_| RedisClientError::Timeout)?
        .map_err(RedisClientError::from)?;

        tracing::debug!(%jti, "Released token id");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consume_once() {
        let blacklist = MemoryTokenBlacklist::new();
        let jti = Uuid::new_v4();

        assert!(blacklist.consume(jti, Duration::from_secs(60)).await.unwrap());
        assert!(!blacklist.consume(jti, Duration::from_secs(60)).await.unwrap());
        assert!(blacklist
            .consume(Uuid::new_v4(), Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_release_allows_reuse() {
        let blacklist = MemoryTokenBlacklist::new();
        let jti = Uuid::new_v4();

        assert!(blacklist.consume(jti, Duration::from_secs(60)).await.unwrap());
        blacklist.release(jti).await.unwrap();
        assert!(blacklist.consume(jti, Duration::from_secs(60)).await.unwrap());
        assert!(!blacklist.consume(jti, Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entries_are_purged() {
        let blacklist = MemoryTokenBlacklist::new();
        let jti = Uuid::new_v4();

        assert!(blacklist.consume(jti, Duration::ZERO).await.unwrap());
        assert!(blacklist.consume(jti, Duration::from_secs(60)).await.unwrap());
        assert_eq!(blacklist.entries.lock().await.len(), 1);
    }

    #[test]
    fn test_redis_key() {
        let jti = Uuid::nil();
        assert_eq!(
            RedisTokenBlacklist::key(jti),
            "revoked:00000000-0000-0000-0000-000000000000"
        );
    }
}
