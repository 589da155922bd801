// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard serve` command implementation.
//!
//! Opens storage, seeds tenant channels, and runs the HTTP gateway alongside
//! the outbox worker until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use switchboard_config::model::SwitchboardConfig;
use switchboard_core::{
    ChannelConfig, FanoutBridge, StorageAdapter, SwitchboardError, TokenVerifier,
};
use switchboard_delivery::shutdown;
use switchboard_delivery::{
    CustomerMessages, OutboxWorker, ThreadResolver, WebhookIngestor, WorkerSettings,
};
use switchboard_fanout::{LocalBridge, LocalHub, SharedBridge};
use switchboard_gateway::{AuthConfig, GatewayState, HealthState, HmacTokenVerifier};
use switchboard_prometheus::{DeliveryMetrics, PrometheusAdapter};
use switchboard_storage::{SqliteBroadcast, SqliteStorage};
use switchboard_telegram::TelegramClient;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often expired webhook dedup markers are purged.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(300);

pub async fn run_serve(config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    crate::init_tracing(&config.log.level);

    info!("starting switchboard serve");
    serve(config).await
}

async fn serve(config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    // Nothing is opened or spawned until the port is ours.
    let listener = switchboard_gateway::bind(&config.server.host, config.server.port).await?;

    let cancel = shutdown::install_signal_handler();
    let storage = open_storage(&config).await?;

    let prometheus = match PrometheusAdapter::new() {
        Ok(adapter) => {
            info!("prometheus metrics enabled");
            Some(Arc::new(adapter))
        }
        Err(e) => {
            warn!(error = %e, "prometheus recorder unavailable, /metrics disabled");
            None
        }
    };
    let metrics = Arc::new(DeliveryMetrics::new());
    let telegram = Arc::new(TelegramClient::new(&config.telegram, Arc::clone(&metrics))?);

    let hub = Arc::new(LocalHub::new());
    let bridge: Arc<dyn FanoutBridge> = if config.fanout.distributed {
        let medium = Arc::new(SqliteBroadcast::new(
            storage.database()?,
            Duration::from_millis(config.fanout.poll_interval_ms),
            Duration::from_secs(config.fanout.retention_secs),
        ));
        let shared = SharedBridge::start(
            Arc::clone(&hub),
            medium,
            Arc::clone(&metrics),
            cancel.clone(),
        )
        .await?;
        Arc::new(shared)
    } else {
        info!("fanout limited to this process");
        Arc::new(LocalBridge::new(Arc::clone(&hub), Arc::clone(&metrics)))
    };

    let resolver = Arc::new(ThreadResolver::new(
        storage.clone(),
        storage.clone(),
        telegram.clone(),
        config.telegram.topic_name_limit,
    ));
    let customers = Arc::new(CustomerMessages::new(
        storage.clone(),
        storage.clone(),
        telegram.clone(),
        Arc::clone(&bridge),
        resolver,
        config.delivery.inline_send,
    ));
    let ingestor = Arc::new(WebhookIngestor::new(
        storage.clone(),
        storage.clone(),
        Arc::clone(&bridge),
        Arc::clone(&metrics),
        Duration::from_secs(config.webhook.dedup_ttl_secs),
    ));

    let worker = build_worker(&config, &storage, &telegram, &metrics);
    let worker_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(cancel).await })
    };
    let housekeeping_task = spawn_housekeeping(Arc::clone(&storage), cancel.clone());

    let state = GatewayState {
        storage: storage.clone(),
        ingestor,
        customers,
        hub,
        verifier: config
            .realtime
            .token_secret
            .as_deref()
            .map(|secret| Arc::new(HmacTokenVerifier::new(secret)) as Arc<dyn TokenVerifier>),
        secret_header: config.server.secret_header.clone(),
        connection_buffer: config.fanout.channel_capacity,
        auth: AuthConfig {
            bearer_token: config.server.bearer_token.clone(),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render: prometheus.map(|adapter| {
                Arc::new(move || adapter.render()) as Arc<dyn Fn() -> String + Send + Sync>
            }),
        },
    };
    if state.verifier.is_none() {
        warn!("realtime.token_secret not set, websocket subscriptions will be rejected");
    }
    if state.auth.bearer_token.is_none() {
        warn!("server.bearer_token not set, /v1 routes will reject every request");
    }

    let app = switchboard_gateway::router(state, &config.server.webhook_path);
    let served = switchboard_gateway::serve(listener, app, cancel.clone()).await;

    // The gateway can also stop on a listener error.
    cancel.cancel();
    join_task("outbox worker", worker_task).await;
    join_task("housekeeping", housekeeping_task).await;

    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }

    served?;
    info!("switchboard serve shutdown complete");
    Ok(())
}

/// Opens and migrates storage, then seeds the `[[channels]]` entries.
pub(crate) async fn open_storage(
    config: &SwitchboardConfig,
) -> Result<Arc<SqliteStorage>, SwitchboardError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;

    for entry in &config.channels {
        storage.upsert_channel(&ChannelConfig::from(entry)).await?;
    }
    info!(
        path = %config.storage.database_path,
        channels = config.channels.len(),
        "storage ready"
    );
    Ok(Arc::new(storage))
}

/// Builds an outbox worker that delivers channel sends through `telegram`.
pub(crate) fn build_worker(
    config: &SwitchboardConfig,
    storage: &Arc<SqliteStorage>,
    telegram: &Arc<TelegramClient>,
    metrics: &Arc<DeliveryMetrics>,
) -> OutboxWorker {
    OutboxWorker::new(
        storage.clone(),
        WorkerSettings::from(&config.outbox),
        Arc::clone(metrics),
    )
    .with_channel_send(storage.clone(), telegram.clone())
}

pub(crate) async fn join_task(name: &'static str, task: JoinHandle<()>) {
    if let Err(e) = task.await {
        warn!(task = name, error = %e, "background task panicked");
    }
}

fn spawn_housekeeping(storage: Arc<SqliteStorage>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match storage.purge_expired_markers().await {
                        Ok(removed) => debug!(removed, "purged expired dedup markers"),
                        Err(e) => warn!(error = %e, "dedup marker purge failed"),
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("housekeeping task shutting down");
                    break;
                }
            }
        }
    })
}
