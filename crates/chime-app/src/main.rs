use std::sync::Arc;

use chime_app::host::HostClient;
use chime_app::realtime::{RealtimeHub, RealtimeMessage};
use chime_core::config::load_config;
use chime_core::model::UserId;
use chime_db::db::DbProvider;
use chime_db::db::connection::{DbPool, create_pool};
use chime_db::db::query::legacy::{LegacyReport, normalize_legacy_recurrence};
use chime_db::error::DbResult;
use chime_service::notify::NotificationRouter;
use chime_service::scheduler::TickScheduler;
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

const REALTIME_CAPACITY: usize = 256;

async fn normalize_legacy(pool: &DbPool) -> DbResult<LegacyReport> {
    let mut conn = pool.get_connection().await?;
    normalize_legacy_recurrence(&mut conn).await
}

/// Traces hub deliveries until every sender is gone.
async fn trace_realtime(mut deliveries: broadcast::Receiver<RealtimeMessage>) {
    loop {
        match deliveries.recv().await {
            Ok(message) => tracing::trace!(
                event = %message.event,
                user_id = %message.recipient,
                "Real-time event delivered"
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Real-time trace fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting chime event scheduler");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let pool = create_pool(
        &config.database.url,
        u32::from(config.database.max_connections),
    )
    .await?;

    tracing::info!("Database connection pool created.");

    if let Err(e) = normalize_legacy(&pool).await {
        tracing::warn!(error = %e, "Legacy recurrence normalization failed, continuing");
    }

    let host = HostClient::new(&config.host)?;
    let hub = RealtimeHub::new(REALTIME_CAPACITY);
    // Websocket sessions belong to the host's bridge, which subscribes to the
    // hub on its own; this subscriber only traces what is sent.
    let realtime_trace = tokio::spawn(trace_realtime(hub.subscribe()));
    let router = NotificationRouter::new(
        Arc::new(host),
        Arc::new(hub),
        UserId::new(config.host.bot_user_id.clone()),
    );

    let scheduler = TickScheduler::new(Arc::new(pool), router, config.scheduler.tick_interval());
    let handle = scheduler.start();

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown requested");

    handle.stop().await;
    if let Err(e) = realtime_trace.await {
        tracing::warn!(error = %e, "Real-time trace task ended abnormally");
    }

    Ok(())
}
