// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard worker` command implementation.
//!
//! Runs only the outbox worker, for deployments that scale delivery
//! separately from the gateway.

use std::sync::Arc;

use switchboard_config::model::SwitchboardConfig;
use switchboard_core::{StorageAdapter, SwitchboardError};
use switchboard_delivery::shutdown;
use switchboard_prometheus::DeliveryMetrics;
use switchboard_telegram::TelegramClient;
use tracing::{info, warn};

use crate::serve::{build_worker, join_task, open_storage};

pub async fn run_worker(config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    crate::init_tracing(&config.log.level);

    info!("starting switchboard worker");

    let cancel = shutdown::install_signal_handler();
    let storage = open_storage(&config).await?;
    let metrics = Arc::new(DeliveryMetrics::new());
    let telegram = Arc::new(TelegramClient::new(&config.telegram, Arc::clone(&metrics))?);

    let worker = build_worker(&config, &storage, &telegram, &metrics);
    let task = tokio::spawn(async move { worker.run(cancel).await });
    join_task("outbox worker", task).await;

    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }
    info!("switchboard worker shutdown complete");
    Ok(())
}
