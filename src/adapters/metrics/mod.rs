//! HTTP client for the conversational agent metrics endpoint.
//!
//! Snapshot failures never abort an optimization cycle: every transport
//! or parse problem degrades to `None` and conversion-delta scoring is
//! skipped for that cycle.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::MetricsConfig;
use crate::domain::ports::MetricsSource;

const RECENT_CALLS_LIMIT: usize = 5;

pub struct HttpMetricsSource {
    base_url: String,
    http_client: Client,
}

impl HttpMetricsSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> DomainResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Build a source from configuration; `None` when no endpoint is
    /// configured.
    pub fn from_config(config: &MetricsConfig) -> DomainResult<Option<Self>> {
        match &config.base_url {
            Some(base_url) => Ok(Some(Self::new(
                base_url.clone(),
                Duration::from_secs(config.timeout_secs),
            )?)),
            None => Ok(None),
        }
    }

    /// Coerce the upstream payload into the snapshot shape the scorer
    /// and run records expect.
    fn normalize(payload: &Value) -> Value {
        let mut snapshot = json!({
            "timestamp": payload.get("timestamp").cloned().unwrap_or(Value::Null),
            "prompt_version": payload.get("prompt_version").cloned().unwrap_or(Value::Null),
            "total_calls": as_i64(payload.get("total_calls")),
            "successful_calls": as_i64(payload.get("successful_calls")),
            "failed_calls": as_i64(payload.get("failed_calls")),
            "conversion_rate": as_f64(payload.get("conversion_rate")),
            "failure_reasons": payload
                .get("failure_reasons")
                .cloned()
                .unwrap_or_else(|| json!({})),
        });
        if let Some(recent) = payload.get("recent_calls").and_then(Value::as_array) {
            snapshot["recent_calls"] =
                Value::Array(recent.iter().take(RECENT_CALLS_LIMIT).cloned().collect());
        }
        snapshot
    }
}

fn as_i64(value: Option<&Value>) -> i64 {
    value.and_then(Value::as_i64).unwrap_or(0)
}

fn as_f64(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

#[async_trait]
impl MetricsSource for HttpMetricsSource {
    async fn fetch_snapshot(&self) -> Option<Value> {
        let url = format!("{}/metrics", self.base_url);
        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(url = %url, error = %err, "failed to fetch metrics snapshot");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(url = %url, status = response.status().as_u16(), "metrics endpoint returned error");
            return None;
        }
        match response.json::<Value>().await {
            Ok(payload) => Some(Self::normalize(&payload)),
            Err(err) => {
                warn!(url = %url, error = %err, "failed to parse metrics snapshot");
                None
            }
        }
    }
}
