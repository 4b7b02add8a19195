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

//! Network collaborators: the canonical domain source, the log collector and
//! the shipper that moves buffered events to it.

pub mod collector;
pub mod domain_source;
pub mod shipper;

use reqwest::Client;
use std::time::Duration;

use crate::engine_core::constants::http;
use crate::engine_core::errors::AgentError;

/// Shared HTTP client with connection pooling.
pub fn build_http_client(timeout: Duration) -> Result<Client, AgentError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(http::CONNECT_TIMEOUT_SECS))
        .tcp_nodelay(true)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(http::USER_AGENT)
        .build()
        .map_err(|e| AgentError::ConfigurationError(format!("Failed to create HTTP client: {}", e)))
}
