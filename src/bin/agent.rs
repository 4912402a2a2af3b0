// Standalone agent: samples this host and pushes snapshots to a backend, or serves them itself.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vpsmon::config::{AgentConfig, TransportMode};
use vpsmon::transport::{PullTransport, PushTransport, RetryPolicy, Retrying, Transport};
use vpsmon::*;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let agent_config = AgentConfig::load()?;
    tracing::info!(
        version = version::VERSION,
        mode = ?agent_config.transport.mode,
        "starting {}-agent",
        version::NAME
    );

    let cancel = CancellationToken::new();
    telemetry::cancel_on_signal(cancel.clone());

    let sampler = sampler::from_kind(agent_config.collector.sampler);
    let aggregator = Arc::new(aggregator::Aggregator::new(
        sampler,
        agent_config.collector.aggregator_config(),
    ));

    let mut server = None;
    let transport: Arc<dyn Transport> = match agent_config.transport.mode {
        TransportMode::Push => {
            let push = agent_config
                .push
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("push mode requires a [push] section"))?;
            let inner = PushTransport::new(
                &push.backend_url,
                &push.token,
                Duration::from_millis(push.timeout_ms),
            )?;
            tracing::info!(endpoint = inner.endpoint(), "pushing snapshots");
            Arc::new(Retrying::new(
                inner,
                RetryPolicy {
                    max_attempts: push.max_attempts,
                    delay: Duration::from_millis(push.retry_delay_ms),
                },
            ))
        }
        TransportMode::Pull => {
            let pull = agent_config
                .pull
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("pull mode requires a [pull] section"))?;
            let history = Arc::new(history_store::HistoryStore::new(
                pull.history.history_config(),
            ));
            let app = routes::pull_app(history.clone(), pull.token.clone());
            let addr = format!("{}:{}", pull.host, pull.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Serving snapshots on http://{}", addr);
            let shutdown = cancel.clone();
            server = Some(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move { shutdown.cancelled().await })
                    .await
            }));
            Arc::new(PullTransport::new(history))
        }
    };

    let collector = collector::spawn(
        collector::CollectorDeps {
            aggregator,
            transport,
            cancel: cancel.clone(),
        },
        collector::CollectorConfig {
            interval: Duration::from_secs(agent_config.collector.interval_secs),
            stats_log_interval: Duration::from_secs(agent_config.collector.stats_log_interval_secs),
        },
    );

    cancel.cancelled().await;
    collector.stopped().await;
    if let Some(server) = server {
        match server.await {
            Ok(Err(e)) => tracing::warn!(error = %e, "pull server stopped with error"),
            Err(e) => tracing::warn!(error = %e, "pull server task failed"),
            Ok(Ok(())) => {}
        }
    }
    Ok(())
}
