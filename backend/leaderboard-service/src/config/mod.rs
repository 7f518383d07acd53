use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub redis: RedisConfig,
    pub rebuild: RebuildConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Settings for the scheduled full-rebuild job.
#[derive(Debug, Clone, Deserialize)]
pub struct RebuildConfig {
    /// Path to the JSON user-population snapshot.
    pub snapshot_path: String,
    /// Exit after one pass (CronJob mode) instead of looping.
    pub run_once: bool,
    /// Interval between passes when looping.
    pub interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            service: ServiceConfig {
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "leaderboard-service".to_string()),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            rebuild: RebuildConfig {
                snapshot_path: env::var("REBUILD_SNAPSHOT_PATH")
                    .unwrap_or_else(|_| "users.json".to_string()),
                run_once: env::var("REBUILD_RUN_ONCE")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .expect("REBUILD_RUN_ONCE must be a valid bool"),
                interval_secs: env::var("REBUILD_INTERVAL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .expect("REBUILD_INTERVAL_SECS must be a valid u64"),
            },
        }
    }
}
