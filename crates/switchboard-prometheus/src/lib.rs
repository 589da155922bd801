// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for Switchboard.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Metrics are
//! rendered as Prometheus text through [`PrometheusAdapter::render`], which
//! the gateway exposes at `/metrics`.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use switchboard_core::{AdapterType, HealthStatus, PluginAdapter, SwitchboardError};

pub use recording::{DeliveryMetrics, MetricsSnapshot, WebhookOutcome, register_metrics};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Installs the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call errors.
    pub fn new() -> Result<Self, SwitchboardError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            SwitchboardError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test that installs the global recorder.
    #[test]
    fn adapter_renders_recorded_counters() {
        let adapter = PrometheusAdapter::new().expect("first install succeeds");
        assert_eq!(adapter.name(), "prometheus");
        assert_eq!(adapter.adapter_type(), AdapterType::Observability);

        let metrics = DeliveryMetrics::new();
        metrics.channel_send("sendMessage");
        metrics.webhook(WebhookOutcome::Accepted);

        let text = adapter.render();
        assert!(text.contains(recording::CHANNEL_SENDS_TOTAL));
        assert!(text.contains("method=\"sendMessage\""));
        assert!(text.contains("outcome=\"accepted\""));

        assert!(PrometheusAdapter::new().is_err(), "second install fails");
    }
}
