//! Redis adapter
//!
//! Ordered sets map onto Redis sorted sets, detail hashes onto Redis
//! hashes. All calls go through a shared `ConnectionManager`, which
//! owns reconnection; errors propagate unmodified (no retry layer
//! here).
//!
//! Redis breaks equal-score ties in *descending* member order under
//! ZREVRANK/ZREVRANGE, which is the opposite of the store contract.
//! `rank_desc` therefore counts strictly-greater scores (ZCOUNT) and
//! adds the member's position among the lex-ascending equal-score
//! members (ZRANGEBYSCORE), and `range_by_rank_desc` re-sorts ties
//! inside the fetched window. Ties straddling a window boundary can
//! still appear swapped between requests; acceptable under the
//! eventual-consistency contract.

use crate::{HashStore, Keyspace, OrderedSetStore, StoreError, StoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Pipeline};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

pub struct RedisRankStore {
    redis: SharedConnectionManager,
}

impl RedisRankStore {
    pub fn new(redis: SharedConnectionManager) -> Self {
        Self { redis }
    }

    /// Open a client and wrap it in a shared connection manager.
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(Arc::new(Mutex::new(manager))))
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.redis.clone()
    }
}

#[async_trait]
impl OrderedSetStore for RedisRankStore {
    async fn add_or_update(&self, key: &str, member: &str, score: i64) -> StoreResult<()> {
        let mut conn = self.redis.lock().await;
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.redis.lock().await;
        let removed: i64 = conn.zrem(key, member).await?;
        Ok(removed > 0)
    }

    async fn range_by_rank_desc(
        &self,
        key: &str,
        from: isize,
        to: isize,
    ) -> StoreResult<Vec<(String, i64)>> {
        let mut conn = self.redis.lock().await;
        let mut entries: Vec<(String, i64)> = conn.zrevrange_withscores(key, from, to).await?;
        // Normalize ZREVRANGE tie order to the store contract.
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(entries)
    }

    async fn range_by_score(&self, key: &str, score: i64) -> StoreResult<Vec<String>> {
        let mut conn = self.redis.lock().await;
        let members: Vec<String> = conn.zrangebyscore(key, score, score).await?;
        Ok(members)
    }

    async fn rank_desc(&self, key: &str, member: &str) -> StoreResult<Option<u64>> {
        let mut conn = self.redis.lock().await;

        let score: Option<i64> = conn.zscore(key, member).await?;
        let Some(score) = score else {
            return Ok(None);
        };

        let greater: u64 = conn.zcount(key, format!("({}", score), "+inf").await?;
        let peers: Vec<String> = conn.zrangebyscore(key, score, score).await?;

        // The member can vanish between the two calls under a
        // concurrent remove; report it as absent.
        Ok(peers
            .iter()
            .position(|m| m == member)
            .map(|pos| greater + pos as u64))
    }

    async fn cardinality(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.redis.lock().await;
        let count: u64 = conn.zcard(key).await?;
        Ok(count)
    }
}

#[async_trait]
impl HashStore for RedisRankStore {
    async fn set_fields(&self, key: &str, fields: &[(String, String)]) -> StoreResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.redis.lock().await;
        let _: () = conn.hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.redis.lock().await;
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn get_fields(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.redis.lock().await;
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }
}

#[async_trait]
impl Keyspace for RedisRankStore {
    async fn delete_matching(&self, pattern: &str) -> StoreResult<u64> {
        let mut conn = self.redis.lock().await;
        let mut cursor: u64 = 0;
        let mut total_deleted: u64 = 0;

        loop {
            // SCAN instead of KEYS to avoid blocking the store.
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut *conn)
                .await
                .map_err(StoreError::Redis)?;

            if !keys.is_empty() {
                let mut pipe = Pipeline::new();
                for key in &keys {
                    pipe.del(key);
                }
                pipe.query_async::<_, ()>(&mut *conn)
                    .await
                    .map_err(StoreError::Redis)?;

                total_deleted += keys.len() as u64;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, deleted = total_deleted, "keyspace scan delete");
        Ok(total_deleted)
    }
}
