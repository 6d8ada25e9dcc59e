//! Redis LockStore implementation.
//!
//! Acquire is `SET key token NX [PX ttl]`; release is a Lua compare-and-delete
//! so a handle can never delete a key it does not hold (for example after its
//! own entry expired and another holder took the key).

use std::time::Duration;

use async_trait::async_trait;
use redis::{Client, Script, aio::ConnectionManager};
use tracing::{debug, info};

use super::key::{LockKey, LockToken};
use super::store::{LockStore, LockStoreError};

const COMPARE_AND_DELETE: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

pub struct RedisLockStore {
    conn: ConnectionManager,
    release_script: Script,
}

impl RedisLockStore {
    /// Connect to Redis.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., redis://localhost:6379/0)
    pub async fn connect(url: &str) -> Result<Self, LockStoreError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        info!("Connected to Redis lock store");

        Ok(Self {
            conn,
            release_script: Script::new(COMPARE_AND_DELETE),
        })
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn set_if_absent(
        &self,
        key: &LockKey,
        token: &LockToken,
        ttl: Option<Duration>,
    ) -> Result<bool, LockStoreError> {
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(key.as_str()).arg(token.as_str()).arg("NX");
        if let Some(ttl) = ttl {
            // PX 0 is rejected by Redis
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }

        // nil when the key already exists, "OK" when set
        let reply: Option<String> = cmd.query_async(&mut conn).await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &LockKey, token: &LockToken) -> Result<bool, LockStoreError> {
        let mut conn = self.conn.clone();

        let removed: i64 = self
            .release_script
            .key(key.as_str())
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await?;

        if removed == 0 {
            debug!(key = %key, "release found key absent or held by another token");
        }
        Ok(removed == 1)
    }

    async fn health_check(&self) -> Result<(), LockStoreError> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;

    // Integration tests require Redis running
    // Run with: cargo test -- --ignored

    async fn test_store() -> RedisLockStore {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        RedisLockStore::connect(&url)
            .await
            .expect("Failed to connect to Redis")
    }

    fn unique_key() -> LockKey {
        let id = AccountId::new(&format!("redis-test-{}", ulid::Ulid::new())).unwrap();
        LockKey::for_account(&id)
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_set_if_absent_and_compare_and_delete() {
        let store = test_store().await;
        let key = unique_key();
        let holder = LockToken::generate();
        let intruder = LockToken::generate();

        let ttl = Some(Duration::from_secs(5));
        assert!(store.set_if_absent(&key, &holder, ttl).await.unwrap());
        assert!(!store.set_if_absent(&key, &intruder, ttl).await.unwrap());

        // wrong token cannot release
        assert!(!store.delete(&key, &intruder).await.unwrap());
        assert!(store.delete(&key, &holder).await.unwrap());
        // idempotent
        assert!(!store.delete(&key, &holder).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_key_expires() {
        let store = test_store().await;
        let key = unique_key();
        let token = LockToken::generate();

        assert!(
            store
                .set_if_absent(&key, &token, Some(Duration::from_millis(50)))
                .await
                .unwrap()
        );
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(
            store
                .set_if_absent(&key, &LockToken::generate(), Some(Duration::from_secs(1)))
                .await
                .unwrap()
        );
    }
}
