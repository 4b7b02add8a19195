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

//! Domain error types.

use thiserror::Error;

/// Main error type for the agent
#[derive(Error, Debug)]
pub enum AgentError {
    /// Canonical domain fetch failed (reconciliation aborts, prior rules stay)
    #[error("Domain source unavailable: {0}")]
    SourceUnavailable(String),

    /// Local override asset missing or malformed (reconciliation continues without overrides)
    #[error("Override policies could not be loaded: {0}")]
    OverrideLoadFailed(String),

    /// Host evaluator rejected the rule replacement
    #[error("Rule apply failed: {0}")]
    ApplyFailed(String),

    /// Log collector unreachable or returned non-2xx
    #[error("Log shipment failed: {0}")]
    ShipFailed(String),

    /// Local state could not be read or written
    #[error("Persistence error: {0}")]
    PersistenceFailed(String),

    /// Invalid configuration value or inconsistent limits
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Malformed host message
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A stored document is not valid JSON
    #[error("Corrupt state: {0}")]
    CorruptState(String),
}

impl AgentError {
    /// Get a short message suitable for the presentation layer.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::SourceUnavailable(_) => "Domain list unavailable".to_string(),
            AgentError::OverrideLoadFailed(_) => "Local policies unavailable".to_string(),
            AgentError::ApplyFailed(_) => "Rules could not be installed".to_string(),
            AgentError::ShipFailed(_) => "Log collector unavailable".to_string(),
            AgentError::PersistenceFailed(_) => "Local storage error".to_string(),
            AgentError::ConfigurationError(_) => "Configuration error".to_string(),
            AgentError::InvalidMessage(reason) => format!("Invalid message: {}", reason),
            AgentError::CorruptState(_) => "Local storage error".to_string(),
        }
    }

    /// Re-label any host-side failure as `ApplyFailed`, keeping the detail.
    pub fn into_apply_failed(self) -> Self {
        match self {
            AgentError::ApplyFailed(_) => self,
            other => AgentError::ApplyFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_apply_failed_wraps_other_variants() {
        let err = AgentError::PersistenceFailed("disk full".to_string()).into_apply_failed();
        match err {
            AgentError::ApplyFailed(msg) => assert!(msg.contains("disk full")),
            other => panic!("Expected ApplyFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_into_apply_failed_keeps_detail() {
        let err = AgentError::ApplyFailed("duplicate id 3".to_string()).into_apply_failed();
        assert_eq!(err.to_string(), "Rule apply failed: duplicate id 3");
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AgentError::PersistenceFailed("/var/lib/secret/events.json".to_string());
        assert!(!err.user_message().contains("/var/lib"));
    }
}
