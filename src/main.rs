use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use perf_review::config::{Config, LogConfig};
use perf_review::desk::ReviewDesk;
use perf_review::web::WebServer;

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log.filter.clone().into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "perf-review.toml".to_string());

    let config = Config::load(&config_path)?;
    init_tracing(&config.log);

    info!("📋 perf-review v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Config loaded from {}", config_path);

    let config = Arc::new(config);

    // Store, sessions and activity feed
    let desk = Arc::new(ReviewDesk::new(config.clone())?);

    // Start session sweeper
    let sweeper_desk = desk.clone();
    tokio::spawn(async move {
        sweeper_desk.run_session_sweeper().await;
    });

    let web = WebServer::new(desk, config);
    if let Err(e) = web.run().await {
        error!("Web server error: {}", e);
        return Err(e);
    }
    Ok(())
}
