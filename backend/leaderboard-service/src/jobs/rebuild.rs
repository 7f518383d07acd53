// ============================================
// Rating Rebuild Job
// ============================================
//
// Background job that recomputes every rating set and detail hash
// from the authoritative user population. Designed to run as a
// Kubernetes CronJob or a standalone looping process.
//
// Workflow:
// 1. Fetch the full user population from the configured source
// 2. Wipe the managed keyspace and refill it (engine.rebuild_all)
// 3. Log pass statistics
//
// The wipe-then-refill window leaves a visible leaderboard gap, and
// the pass is not safe to run concurrently with itself or with live
// updates; schedule it serialized and at low-traffic intervals.

use crate::config::{Config, RebuildConfig};
use crate::models::User;
use crate::services::RatingsEngine;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rank_store::RedisRankStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::info;

/// Source of the authoritative user population. The repository layer
/// owning users is an external collaborator; the job only sees this
/// seam.
#[async_trait]
pub trait UserSource: Send + Sync {
    async fn fetch_all(&self) -> anyhow::Result<Vec<User>>;
}

/// Reads the population from a JSON array snapshot on disk, the
/// format the operational export tooling produces.
pub struct SnapshotSource {
    path: String,
}

impl SnapshotSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl UserSource for SnapshotSource {
    async fn fetch_all(&self) -> anyhow::Result<Vec<User>> {
        let raw = tokio::fs::read(&self.path).await?;
        let users: Vec<User> = serde_json::from_slice(&raw)?;
        Ok(users)
    }
}

/// Statistics for one rebuild pass.
#[derive(Debug, Clone, Default)]
pub struct RebuildStats {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub users_total: usize,
    pub users_scored: usize,
    pub duration_ms: u64,
}

/// Rebuild job runner
pub struct RebuildJob {
    config: RebuildConfig,
    source: Arc<dyn UserSource>,
    engine: RatingsEngine,
}

impl RebuildJob {
    pub fn new(config: RebuildConfig, source: Arc<dyn UserSource>, engine: RatingsEngine) -> Self {
        Self {
            config,
            source,
            engine,
        }
    }

    /// Run passes until told to stop: once in CronJob mode, otherwise
    /// on the configured interval.
    pub async fn run(&self) -> anyhow::Result<RebuildStats> {
        loop {
            let stats = self.run_single_pass().await?;

            info!(
                users_total = stats.users_total,
                users_scored = stats.users_scored,
                duration_ms = stats.duration_ms,
                "rebuild pass completed"
            );

            if self.config.run_once {
                return Ok(stats);
            }

            info!(
                interval_secs = self.config.interval_secs,
                "sleeping until next rebuild pass"
            );
            sleep(Duration::from_secs(self.config.interval_secs)).await;
        }
    }

    pub async fn run_single_pass(&self) -> anyhow::Result<RebuildStats> {
        let start_time = Instant::now();
        let mut stats = RebuildStats {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let users = self.source.fetch_all().await?;
        stats.users_total = users.len();
        stats.users_scored = users.iter().filter(|u| u.points.is_some()).count();

        info!(
            users_total = stats.users_total,
            users_scored = stats.users_scored,
            "starting rebuild pass"
        );

        self.engine.rebuild_all(&users).await?;

        stats.completed_at = Some(Utc::now());
        stats.duration_ms = start_time.elapsed().as_millis() as u64;

        Ok(stats)
    }
}

/// Entry point for running the rebuild job as a standalone process.
pub async fn run_rebuild_job() -> anyhow::Result<()> {
    let config = Config::from_env();

    info!(
        snapshot_path = %config.rebuild.snapshot_path,
        run_once = config.rebuild.run_once,
        "initializing rebuild job"
    );

    let store = RedisRankStore::connect(&config.redis.url).await?;
    let engine = RatingsEngine::new(Arc::new(store));
    let source = Arc::new(SnapshotSource::new(config.rebuild.snapshot_path.clone()));

    let job = RebuildJob::new(config.rebuild, source, engine);
    let stats = job.run().await?;

    info!(
        users_total = stats.users_total,
        users_scored = stats.users_scored,
        "rebuild job completed"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rank_store::{MemoryRankStore, OrderedSetStore};

    struct FixedSource(Vec<User>);

    #[async_trait]
    impl UserSource for FixedSource {
        async fn fetch_all(&self) -> anyhow::Result<Vec<User>> {
            Ok(self.0.clone())
        }
    }

    fn scored_user(id: &str, points: i64) -> User {
        User {
            id: id.to_string(),
            points: Some(points),
            nick_name: format!("nick-{}", id),
            avatar_url: String::new(),
            country_short_name: None,
            unique_city_id: None,
            last_rating_place: None,
        }
    }

    #[tokio::test]
    async fn test_single_pass_counts_scored_users() {
        let store = Arc::new(MemoryRankStore::new());
        let engine = RatingsEngine::new(store.clone());

        let mut unscored = scored_user("u3", 0);
        unscored.points = None;
        let source = Arc::new(FixedSource(vec![
            scored_user("u1", 100),
            scored_user("u2", 50),
            unscored,
        ]));

        let config = RebuildConfig {
            snapshot_path: String::new(),
            run_once: true,
            interval_secs: 3600,
        };

        let job = RebuildJob::new(config, source, engine);
        let stats = job.run_single_pass().await.unwrap();

        assert_eq!(stats.users_total, 3);
        assert_eq!(stats.users_scored, 2);
        assert_eq!(store.cardinality("ratings:global").await.unwrap(), 2);
    }
}
