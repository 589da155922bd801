// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot API client built on teloxide.
//!
//! One HTTP client is shared by every tenant; a [`Bot`] carrying the
//! tenant's token is derived from it per call. A call makes one request
//! per attempt. `RetryAfter` answers are retried inside the call after the
//! advertised wait, capped; anything else fails the call immediately and
//! is left to the outbox.

use std::sync::Arc;
use std::time::Duration;

use switchboard_config::model::TelegramConfig;
use switchboard_core::SwitchboardError;
use switchboard_prometheus::DeliveryMetrics;
use teloxide::requests::{Output, Request};
use teloxide::{Bot, RequestError};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TelegramClient {
    /// Token-less bot holding the shared HTTP client and API URL.
    template: Bot,
    max_attempts: u32,
    max_retry_wait: Duration,
    pub(crate) topic_name_limit: usize,
    pub(crate) metrics: Arc<DeliveryMetrics>,
}

impl TelegramClient {
    /// Builds a client from the `[telegram]` configuration section.
    pub fn new(
        config: &TelegramConfig,
        metrics: Arc<DeliveryMetrics>,
    ) -> Result<Self, SwitchboardError> {
        let http = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SwitchboardError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let client = Self {
            template: Bot::with_client("", http),
            max_attempts: config.max_attempts.max(1),
            max_retry_wait: Duration::from_secs(config.max_retry_wait_secs),
            topic_name_limit: config.topic_name_limit,
            metrics,
        };
        client.with_base_url(&config.api_base)
    }

    /// Points every request at `url` instead of the configured API base.
    pub fn with_base_url(mut self, url: &str) -> Result<Self, SwitchboardError> {
        let url = reqwest::Url::parse(url).map_err(|e| {
            SwitchboardError::Config(format!("invalid telegram api_base {url:?}: {e}"))
        })?;
        self.template = self.template.set_api_url(url);
        Ok(self)
    }

    /// Overrides the cap on a single rate-limit wait.
    pub fn with_max_retry_wait(mut self, wait: Duration) -> Self {
        self.max_retry_wait = wait;
        self
    }

    /// Bot for one tenant's token, sharing the pooled HTTP client.
    pub(crate) fn bot(&self, token: &str) -> Bot {
        Bot::with_client(token, self.template.client().clone())
            .set_api_url(self.template.api_url())
    }

    /// Sends `request`, retrying rate-limit answers up to `max_attempts`.
    pub(crate) async fn call<R>(
        &self,
        method: &'static str,
        token: &str,
        request: R,
    ) -> Result<Output<R>, SwitchboardError>
    where
        R: Request<Err = RequestError>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.metrics.channel_send(method);

            let err = match request.send_ref().await {
                Ok(output) => return Ok(output),
                Err(err) => err,
            };
            self.metrics.channel_error(method);
            debug!(method, attempt, error = %redact(&err.to_string(), token), "bot api call failed");

            match err {
                RequestError::RetryAfter(secs) => {
                    let retry_after = secs.duration();
                    if attempt < self.max_attempts {
                        let wait = retry_after.min(self.max_retry_wait);
                        warn!(
                            method,
                            attempt,
                            wait_ms = wait.as_millis() as u64,
                            "rate limited, retrying"
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    return Err(SwitchboardError::RateLimited { retry_after });
                }
                RequestError::Api(api) => {
                    return Err(SwitchboardError::Channel {
                        message: format!("{method}: {api}"),
                        source: Some(Box::new(api)),
                    });
                }
                // Transport errors can carry the request URL, which embeds the token.
                other => {
                    return Err(SwitchboardError::channel(format!(
                        "{method}: {}",
                        redact(&other.to_string(), token)
                    )));
                }
            }
        }
    }
}

fn redact(text: &str, token: &str) -> String {
    if token.is_empty() {
        text.to_string()
    } else {
        text.replace(token, "[redacted]")
    }
}
