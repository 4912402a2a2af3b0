use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vpsmon::*;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let app_config = config::AppConfig::load()?;
    tracing::info!(version = version::VERSION, "starting {}", version::NAME);

    let pool = db::connect(&app_config.database.path, app_config.database.max_pool_size).await?;
    db::init(&pool).await?;

    let history = Arc::new(history_store::HistoryStore::new(
        app_config.history.history_config(),
    ));
    let sampler = sampler::from_kind(app_config.collector.sampler);

    let cancel = CancellationToken::new();
    telemetry::cancel_on_signal(cancel.clone());

    // Embedded collector: this host's own snapshots go straight into the history store.
    let collector = if app_config.collector.enabled {
        let aggregator = Arc::new(aggregator::Aggregator::new(
            sampler.clone(),
            app_config.collector.aggregator_config(),
        ));
        Some(collector::spawn(
            collector::CollectorDeps {
                aggregator,
                transport: Arc::new(transport::PullTransport::new(history.clone())),
                cancel: cancel.clone(),
            },
            collector::CollectorConfig {
                interval: std::time::Duration::from_secs(app_config.collector.interval_secs),
                stats_log_interval: std::time::Duration::from_secs(
                    app_config.collector.stats_log_interval_secs,
                ),
            },
        ))
    } else {
        tracing::info!("embedded collector disabled; waiting for agent pushes");
        None
    };

    let app = routes::app(history, sampler, pool.clone(), app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    // Server may also stop on its own; make sure the collector follows.
    cancel.cancel();
    if let Some(handle) = collector {
        handle.stopped().await;
    }
    pool.close().await;
    Ok(())
}
