use leaderboard_service::{jobs, Config};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();

    info!(
        service = %config.service.service_name,
        redis = %config.redis.url,
        "starting rating rebuild scheduler"
    );

    jobs::run_rebuild_job().await?;

    Ok(())
}
