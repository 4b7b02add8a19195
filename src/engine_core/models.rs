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

//! Domain models for the llm-warden agent.
//!
//! This module contains pure data structures representing domains, policies,
//! rules and enforcement events. It is designed to be free of I/O side effects.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::engine_core::constants::rules;

/// Host rule identifier. Valid identifiers start at 1.
pub type RuleId = u32;

/// Newtype wrapper around Uuid for the per-install client identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(Uuid);

impl ClientId {
    /// Generate a new random ClientId
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for ClientId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(ClientId)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0.to_string()
    }
}

impl TryFrom<String> for ClientId {
    type Error = uuid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Uuid::parse_str(&s).map(ClientId)
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-domain enforcement policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    #[default]
    Allow,
    Warn,
    Block,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Allow => "allow",
            Policy::Warn => "warn",
            Policy::Block => "block",
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One canonical LLM domain as reported by the domain source.
///
/// The source returns either `{"domain": "..."}` objects (extra fields are
/// ignored) or bare strings; both decode into the same record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DomainRecordRepr")]
pub struct DomainRecord {
    pub domain: String,
}

impl DomainRecord {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DomainRecordRepr {
    Bare(String),
    Object { domain: String },
}

impl From<DomainRecordRepr> for DomainRecord {
    fn from(repr: DomainRecordRepr) -> Self {
        match repr {
            DomainRecordRepr::Bare(domain) | DomainRecordRepr::Object { domain } => {
                Self { domain }
            }
        }
    }
}

/// Locally defined policy that takes precedence over the canonical default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverridePolicy {
    pub id: RuleId,
    pub domain: String,
    pub policy: Policy,
}

/// Reconciled rule, one per domain in the active set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub priority: u32,
    pub domain: String,
    pub action: Policy,
}

impl Rule {
    /// Rule with the default priority
    pub fn new(id: RuleId, domain: impl Into<String>, action: Policy) -> Self {
        Self {
            id,
            priority: rules::DEFAULT_PRIORITY,
            domain: domain.into(),
            action,
        }
    }
}

/// Read-only projection of a `Rule` used for policy lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyIndexEntry {
    pub id: RuleId,
    pub domain: String,
    pub policy: Policy,
}

impl From<&Rule> for PolicyIndexEntry {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id,
            domain: rule.domain.clone(),
            policy: rule.action,
        }
    }
}

/// Record of one rule match on a live request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcementEvent {
    pub client_id: ClientId,
    #[serde(with = "crate::utils::time::iso8601")]
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub rule_id: Option<RuleId>,
    pub http_method: Option<String>,
    pub referrer: Option<String>,
    pub url: Option<String>,
    pub tab_id: Option<i64>,
}

/// Match notification emitted by the host evaluator.
///
/// Every field is optional and decoded leniently: a value of the wrong JSON
/// type is treated as absent instead of rejecting the whole notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchNotification {
    #[serde(default, deserialize_with = "lenient")]
    pub matched_rule_id: Option<RuleId>,
    #[serde(default, deserialize_with = "lenient")]
    pub request_method: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub initiator: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tab_id: Option<i64>,
    /// Action of the matched rule, when the host reports it
    #[serde(default, deserialize_with = "lenient")]
    pub action: Option<Policy>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
