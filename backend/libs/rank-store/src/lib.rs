//! Ordered-set and hash store abstraction for the ratings engine
//!
//! Ranking state lives in an external key/value backend: one ordered
//! set per leaderboard scope (member string -> score) plus one hash of
//! denormalized display fields per user. The engine only talks to the
//! traits below; adapters exist for Redis (production) and an
//! in-memory map (tests, local development).
//!
//! Descending-order contract shared by all adapters: entries are
//! ordered by score descending, ties by member string ascending. An
//! equal-score member with a lexicographically smaller key ranks
//! ahead.

mod error;
mod memory;
mod redis_store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryRankStore;
pub use redis_store::{RedisRankStore, SharedConnectionManager};

use async_trait::async_trait;
use std::collections::HashMap;

/// Per-key ordered set of (member, score) pairs.
///
/// Each call is atomic at its own key; no operation spans keys.
#[async_trait]
pub trait OrderedSetStore: Send + Sync {
    /// Insert the member or overwrite its score.
    async fn add_or_update(&self, key: &str, member: &str, score: i64) -> StoreResult<()>;

    /// Remove the member. Returns whether it was present.
    async fn remove(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Entries at descending ranks `from..=to` (0-based, inclusive),
    /// with scores.
    async fn range_by_rank_desc(
        &self,
        key: &str,
        from: isize,
        to: isize,
    ) -> StoreResult<Vec<(String, i64)>>;

    /// Members whose score equals `score`, lexicographically ascending.
    async fn range_by_score(&self, key: &str, score: i64) -> StoreResult<Vec<String>>;

    /// 0-based rank of the member under the descending-order contract,
    /// or `None` if the member is absent.
    async fn rank_desc(&self, key: &str, member: &str) -> StoreResult<Option<u64>>;

    /// Number of members in the set.
    async fn cardinality(&self, key: &str) -> StoreResult<u64>;
}

/// Per-key field/value hash.
#[async_trait]
pub trait HashStore: Send + Sync {
    async fn set_fields(&self, key: &str, fields: &[(String, String)]) -> StoreResult<()>;

    async fn set_field(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;

    async fn get_fields(&self, key: &str) -> StoreResult<HashMap<String, String>>;
}

/// Keyspace maintenance used by the destructive rebuild path.
#[async_trait]
pub trait Keyspace: Send + Sync {
    /// Delete every key matching the glob pattern. Returns the number
    /// of keys removed. Must not block the store (SCAN, not KEYS).
    async fn delete_matching(&self, pattern: &str) -> StoreResult<u64>;
}

/// Everything the ranking engine needs from the backend.
pub trait RankStore: OrderedSetStore + HashStore + Keyspace {}

impl<T: OrderedSetStore + HashStore + Keyspace> RankStore for T {}
