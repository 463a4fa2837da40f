/// Redis connectivity
///
/// Redis is optional in this system: when configured it holds the set of
/// consumed single-use tokens so that every API node sees the same set.
///
/// ```text
/// ┌─────────────┐  SET revoked:{jti} 1 NX EX ttl   ┌─────────┐
/// │  API node   │ ───────────────────────────────> │  Redis  │
/// └─────────────┘  nil => already consumed         └─────────┘
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::redis::{RedisClient, RedisConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// assert!(client.ping().await?);
/// # Ok(())
/// # }
/// ```

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
