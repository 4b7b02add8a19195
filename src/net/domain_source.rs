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

//! HTTP client for the canonical LLM domain list.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, warn};

use crate::engine_core::errors::AgentError;
use crate::engine_core::models::DomainRecord;
use crate::engine_core::traits::DomainSource;
use crate::utils::policy_validator::PolicyValidator;

pub struct DomainSourceClient {
    http_client: Client,
    url: String,
}

impl DomainSourceClient {
    pub fn new(http_client: Client, url: impl Into<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DomainSource for DomainSourceClient {
    async fn fetch_canonical_domains(&self) -> Result<Vec<DomainRecord>, AgentError> {
        debug!(url = %self.url, "Fetching canonical domains");

        let response = self
            .http_client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::SourceUnavailable("Request timed out".to_string())
                } else if e.is_connect() {
                    AgentError::SourceUnavailable("Connection failed".to_string())
                } else {
                    AgentError::SourceUnavailable(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %self.url, "Domain source returned HTTP error");
            return Err(AgentError::SourceUnavailable(format!("HTTP {}", status)));
        }

        let records: Vec<DomainRecord> = response.json().await.map_err(|e| {
            error!(error = %e, url = %self.url, "Failed to parse domain list");
            AgentError::SourceUnavailable(format!("Failed to parse response: {}", e))
        })?;

        // Only bare hostnames compile to a `||domain^` filter that can match
        let domains: Vec<DomainRecord> = records
            .into_iter()
            .filter_map(|r| {
                let domain = r.domain.trim();
                match PolicyValidator::validate_domain(domain) {
                    Ok(()) => Some(DomainRecord::new(domain)),
                    Err(reason) => {
                        warn!(reason = %reason, "Dropping canonical domain entry");
                        None
                    }
                }
            })
            .collect();

        debug!(count = domains.len(), "Fetched canonical domains");
        Ok(domains)
    }
}
