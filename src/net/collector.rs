// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP log collector client.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

use crate::engine_core::errors::AgentError;
use crate::engine_core::models::EnforcementEvent;
use crate::engine_core::traits::LogSink;

/// POSTs event batches as one JSON array. Any 2xx is acceptance.
pub struct HttpLogCollector {
    http_client: Client,
    url: String,
    timeout: Duration,
}

impl HttpLogCollector {
    pub fn new(http_client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl LogSink for HttpLogCollector {
    async fn ship(&self, batch: &[EnforcementEvent]) -> Result<(), AgentError> {
        debug!(url = %self.url, events = batch.len(), "Shipping event batch");

        let response = self
            .http_client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(batch)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::ShipFailed(format!(
                        "Request timeout after {}s",
                        self.timeout.as_secs()
                    ))
                } else if e.is_connect() {
                    AgentError::ShipFailed("Connection failed".to_string())
                } else {
                    AgentError::ShipFailed(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, url = %self.url, body = %body, "Log collector returned HTTP error");
            return Err(AgentError::ShipFailed(format!("HTTP {}", status)));
        }

        Ok(())
    }
}
