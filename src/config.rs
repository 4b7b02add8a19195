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

use crate::engine_core::constants::{config as env_keys, http, shipping};
use crate::engine_core::errors::AgentError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub domain_source_url: String,
    pub log_collector_url: String,
    pub overrides_path: PathBuf,
    pub state_dir: PathBuf,
    /// Defaults to `<state_dir>/dynamic_rules.json`
    pub rules_path: Option<PathBuf>,
    pub flush_interval_secs: u64,
    pub flush_threshold: usize,
    pub max_events: usize,
    pub http_timeout_secs: u64,
    pub shutdown_flush_timeout_secs: u64,
    pub ship_failure_limit: u32,
    pub ship_backoff_initial_secs: u64,
    pub ship_backoff_max_secs: u64,
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain_source_url: http::DEFAULT_DOMAIN_SOURCE_URL.to_string(),
            log_collector_url: http::DEFAULT_LOG_COLLECTOR_URL.to_string(),
            overrides_path: PathBuf::from(env_keys::DEFAULT_OVERRIDES_PATH),
            state_dir: PathBuf::from(env_keys::DEFAULT_STATE_DIR),
            rules_path: None,
            flush_interval_secs: shipping::FLUSH_INTERVAL_SECS,
            flush_threshold: shipping::FLUSH_THRESHOLD,
            max_events: shipping::MAX_EVENTS,
            http_timeout_secs: http::REQUEST_TIMEOUT_SECS,
            shutdown_flush_timeout_secs: shipping::SHUTDOWN_FLUSH_TIMEOUT_SECS,
            ship_failure_limit: shipping::FAILURE_LIMIT,
            ship_backoff_initial_secs: shipping::BACKOFF_INITIAL_SECS,
            ship_backoff_max_secs: shipping::BACKOFF_MAX_SECS,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> Result<T, AgentError> {
    raw.trim().parse().map_err(|_| {
        AgentError::ConfigurationError(format!("{} has an invalid value '{}'", name, raw))
    })
}

impl Config {
    /// Defaults, then the optional YAML file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AgentError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AgentError> {
        let content = fs::read_to_string(path).map_err(|e| {
            AgentError::ConfigurationError(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, AgentError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content)
            .map_err(|e| AgentError::ConfigurationError(format!("Failed to parse config: {}", e)))
    }

    /// Overlay `LLM_WARDEN_*`, `LOG_LEVEL` and `LOG_FORMAT` from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(env_keys::ENV_DOMAIN_SOURCE_URL) {
            self.domain_source_url = v;
        }
        if let Some(v) = lookup(env_keys::ENV_LOG_COLLECTOR_URL) {
            self.log_collector_url = v;
        }
        if let Some(v) = lookup(env_keys::ENV_OVERRIDES_PATH) {
            self.overrides_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(env_keys::ENV_STATE_DIR) {
            self.state_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(env_keys::ENV_RULES_PATH) {
            self.rules_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(env_keys::ENV_FLUSH_INTERVAL_SECS) {
            self.flush_interval_secs = parse_env(env_keys::ENV_FLUSH_INTERVAL_SECS, &v)?;
        }
        if let Some(v) = lookup(env_keys::ENV_FLUSH_THRESHOLD) {
            self.flush_threshold = parse_env(env_keys::ENV_FLUSH_THRESHOLD, &v)?;
        }
        if let Some(v) = lookup(env_keys::ENV_MAX_EVENTS) {
            self.max_events = parse_env(env_keys::ENV_MAX_EVENTS, &v)?;
        }
        if let Some(v) = lookup(env_keys::ENV_HTTP_TIMEOUT_SECS) {
            self.http_timeout_secs = parse_env(env_keys::ENV_HTTP_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = lookup(env_keys::ENV_LOG_LEVEL) {
            self.log_level = v;
        }
        if let Some(v) = lookup(env_keys::ENV_LOG_FORMAT) {
            self.log_format = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        let fail = |msg: &str| Err(AgentError::ConfigurationError(msg.to_string()));

        if self.domain_source_url.trim().is_empty() {
            return fail("domain_source_url must not be empty");
        }
        if self.log_collector_url.trim().is_empty() {
            return fail("log_collector_url must not be empty");
        }
        if self.max_events == 0 {
            return fail("max_events must be at least 1");
        }
        if self.flush_threshold == 0 {
            return fail("flush_threshold must be at least 1");
        }
        if self.flush_threshold > self.max_events {
            return Err(AgentError::ConfigurationError(format!(
                "flush_threshold ({}) exceeds max_events ({})",
                self.flush_threshold, self.max_events
            )));
        }
        if self.flush_interval_secs == 0
            || self.http_timeout_secs == 0
            || self.shutdown_flush_timeout_secs == 0
        {
            return fail("flush interval and timeouts must be non-zero");
        }
        if self.ship_failure_limit == 0 {
            return fail("ship_failure_limit must be at least 1");
        }
        if self.ship_backoff_initial_secs == 0
            || self.ship_backoff_initial_secs > self.ship_backoff_max_secs
        {
            return fail("ship backoff must satisfy 0 < initial <= max");
        }
        Ok(())
    }

    pub fn rules_path(&self) -> PathBuf {
        self.rules_path
            .clone()
            .unwrap_or_else(|| self.state_dir.join(env_keys::RULES_FILE_NAME))
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn shutdown_flush_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_flush_timeout_secs)
    }

    pub fn ship_backoff(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.ship_backoff_initial_secs),
            Duration::from_secs(self.ship_backoff_max_secs),
        )
    }
}
