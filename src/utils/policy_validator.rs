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

//! Policy validation.
//!
//! Fail fast at load time and before touching the host.

use crate::engine_core::errors::AgentError;
use crate::engine_core::models::{OverridePolicy, Rule};

use std::collections::HashSet;
use tracing::debug;

/// Validates override assets and reconciled rule sets for structural correctness
pub struct PolicyValidator;

impl PolicyValidator {
    /// Validate loaded overrides. Duplicate domains are accepted (last one wins).
    pub fn validate_overrides(overrides: &[OverridePolicy]) -> Result<(), AgentError> {
        let mut seen = HashSet::new();

        for (idx, entry) in overrides.iter().enumerate() {
            let context = format!("Override #{}", idx + 1);

            if entry.id == 0 {
                return Err(AgentError::OverrideLoadFailed(format!(
                    "{}: rule id must be >= 1",
                    context
                )));
            }

            Self::validate_domain(&entry.domain)
                .map_err(|reason| AgentError::OverrideLoadFailed(format!("{}: {}", context, reason)))?;

            if !seen.insert(entry.domain.as_str()) {
                debug!(domain = %entry.domain, "Duplicate override domain, later entry wins");
            }
        }

        Ok(())
    }

    /// Validate a reconciled rule set before it is handed to the host
    pub fn validate_rule_set(rules: &[Rule]) -> Result<(), AgentError> {
        let mut ids = HashSet::new();
        let mut domains = HashSet::new();

        for rule in rules {
            if rule.id == 0 {
                return Err(AgentError::ApplyFailed(format!(
                    "Rule for '{}' has invalid id 0",
                    rule.domain
                )));
            }

            if rule.domain.is_empty() {
                return Err(AgentError::ApplyFailed(format!(
                    "Rule {} has an empty domain",
                    rule.id
                )));
            }

            if !ids.insert(rule.id) {
                return Err(AgentError::ApplyFailed(format!(
                    "Rule id {} is used by more than one domain (latest: '{}')",
                    rule.id, rule.domain
                )));
            }

            if !domains.insert(rule.domain.as_str()) {
                return Err(AgentError::ApplyFailed(format!(
                    "Domain '{}' appears in more than one rule",
                    rule.domain
                )));
            }
        }

        Ok(())
    }

    /// A domain is a bare hostname: no scheme, path or whitespace.
    pub fn validate_domain(domain: &str) -> Result<(), String> {
        if domain.is_empty() {
            return Err("domain cannot be empty".to_string());
        }
        if domain.chars().any(char::is_whitespace) {
            return Err(format!("domain '{}' contains whitespace", domain));
        }
        if domain.contains("://") || domain.contains('/') {
            return Err(format!(
                "domain '{}' must be a hostname, not a URL or path",
                domain
            ));
        }
        Ok(())
    }
}
