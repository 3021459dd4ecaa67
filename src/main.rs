use std::sync::Arc;
use std::time::Duration;

use switchyard::config::{self, Config};
use switchyard::{app, logger, server, ServerError};

/// How often expired sessions and rate-limit windows are dropped
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

fn main() -> Result<(), ServerError> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    // Worker threads follow the config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), ServerError> {
    let (router, stores) = app::build(&cfg)?;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = stores.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired store entries dropped");
            }
        }
    });

    server::serve(&cfg, Arc::new(router)).await
}
