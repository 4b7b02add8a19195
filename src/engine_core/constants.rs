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

//! llm-warden Constants - Single source of truth for all configuration values.
//!
//! This module centralizes storage keys, defaults, host rule format details
//! and environment variable names.

/// Persisted state keys
pub mod keys {
    /// Per-install client identifier
    pub const CLIENT_ID: &str = "clientId";
    /// Buffered enforcement events
    pub const EVENTS: &str = "events";
    /// Policy index of the last successful reconciliation
    pub const POLICIES: &str = "policies";
    /// URL of the most recent warned request
    pub const LAST_BLOCKED_URL: &str = "lastBlockedUrl";
}

/// Event buffer and shipping defaults
pub mod shipping {
    /// Hard cap on buffered events
    pub const MAX_EVENTS: usize = 1000;
    /// Buffer length that triggers an immediate flush
    pub const FLUSH_THRESHOLD: usize = 200;
    /// Timer flush interval (5 minutes)
    pub const FLUSH_INTERVAL_SECS: u64 = 5 * 60;
    /// Upper bound for the best-effort flush on shutdown
    pub const SHUTDOWN_FLUSH_TIMEOUT_SECS: u64 = 5;
    /// Consecutive failures before the collector breaker opens
    pub const FAILURE_LIMIT: u32 = 3;
    pub const BACKOFF_INITIAL_SECS: u64 = 30;
    pub const BACKOFF_MAX_SECS: u64 = 5 * 60;
    /// `action` field of every enforcement event
    pub const EVENT_ACTION: &str = "policy.enforced";
}

/// Host declarative rule format
pub mod rules {
    /// Every reconciled rule shares the same priority
    pub const DEFAULT_PRIORITY: u32 = 1;
    pub const URL_FILTER_PREFIX: &str = "||";
    pub const URL_FILTER_SUFFIX: &str = "^";
    /// Page the host redirects warned requests to
    pub const WARNING_PAGE_PATH: &str = "/warning.html";
    /// Request types covered by every rule
    pub const RESOURCE_TYPES: [&str; 6] = [
        "main_frame",
        "sub_frame",
        "xmlhttprequest",
        "websocket",
        "webtransport",
        "ping",
    ];
}

/// HTTP client defaults
pub mod http {
    pub const DEFAULT_DOMAIN_SOURCE_URL: &str = "http://127.0.0.1:8080/llms";
    pub const DEFAULT_LOG_COLLECTOR_URL: &str = "http://127.0.0.1:8080/logs";
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
    /// Fail fast on connection
    pub const CONNECT_TIMEOUT_SECS: u64 = 2;
    pub const USER_AGENT: &str = concat!("llm-warden/", env!("CARGO_PKG_VERSION"));
}

/// Presentation defaults
pub mod display {
    /// Longest URL shown on the warning page before truncation
    pub const MAX_URL_LENGTH: usize = 80;
    pub const UNKNOWN_URL: &str = "Unknown URL";
}

/// Configuration Environment Variables
pub mod config {
    pub const ENV_CONFIG_PATH: &str = "LLM_WARDEN_CONFIG";
    pub const ENV_DOMAIN_SOURCE_URL: &str = "LLM_WARDEN_DOMAIN_SOURCE_URL";
    pub const ENV_LOG_COLLECTOR_URL: &str = "LLM_WARDEN_LOG_COLLECTOR_URL";
    pub const ENV_OVERRIDES_PATH: &str = "LLM_WARDEN_OVERRIDES_PATH";
    pub const ENV_STATE_DIR: &str = "LLM_WARDEN_STATE_DIR";
    pub const ENV_RULES_PATH: &str = "LLM_WARDEN_RULES_PATH";
    pub const ENV_FLUSH_INTERVAL_SECS: &str = "LLM_WARDEN_FLUSH_INTERVAL_SECS";
    pub const ENV_FLUSH_THRESHOLD: &str = "LLM_WARDEN_FLUSH_THRESHOLD";
    pub const ENV_MAX_EVENTS: &str = "LLM_WARDEN_MAX_EVENTS";
    pub const ENV_HTTP_TIMEOUT_SECS: &str = "LLM_WARDEN_HTTP_TIMEOUT_SECS";
    pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

    pub const DEFAULT_OVERRIDES_PATH: &str = "policies.json";
    pub const DEFAULT_STATE_DIR: &str = ".llm-warden";
    pub const RULES_FILE_NAME: &str = "dynamic_rules.json";
}

/// Transport Limits (DoS Protection)
pub mod limits {
    /// Maximum accepted host message size (1 MB)
    pub const MAX_MESSAGE_SIZE_BYTES: usize = 1024 * 1024;
    /// Capacity of the host reader channel
    pub const HOST_CHANNEL_CAPACITY: usize = 64;
}
