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

//! Policy index and query service.
//!
//! Read-only view of the last successfully applied rule set, keyed by the
//! exact domain string. Rebuilt wholesale after every confirmed apply.

use serde::Serialize;

use crate::engine_core::constants::keys;
use crate::engine_core::errors::AgentError;
use crate::engine_core::models::{PolicyIndexEntry, Rule, RuleId};
use crate::store::PersistentState;
use crate::utils::domain::extract_domain;

/// Outcome of a policy lookup. `NotFound` means "not an LLM domain".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PolicyLookup {
    Found(PolicyIndexEntry),
    NotFound,
}

impl PolicyLookup {
    pub fn entry(self) -> Option<PolicyIndexEntry> {
        match self {
            PolicyLookup::Found(entry) => Some(entry),
            PolicyLookup::NotFound => None,
        }
    }
}

pub struct PolicyIndex {
    state: PersistentState,
}

impl PolicyIndex {
    pub fn new(state: PersistentState) -> Self {
        Self { state }
    }

    /// Replace the whole index with the projection of `rules`.
    pub async fn replace(&self, rules: &[Rule]) -> Result<(), AgentError> {
        let entries: Vec<PolicyIndexEntry> = rules.iter().map(PolicyIndexEntry::from).collect();
        self.state.save(keys::POLICIES, &entries).await
    }

    /// Every indexed entry, in rule order. Empty before the first reconciliation.
    pub async fn entries(&self) -> Result<Vec<PolicyIndexEntry>, AgentError> {
        Ok(self
            .state
            .load::<Vec<PolicyIndexEntry>>(keys::POLICIES)
            .await?
            .unwrap_or_default())
    }

    pub async fn lookup(&self, domain: &str) -> Result<PolicyLookup, AgentError> {
        let found = self.entries().await?.into_iter().find(|e| e.domain == domain);
        Ok(found.map_or(PolicyLookup::NotFound, PolicyLookup::Found))
    }

    /// Lookup by the hostname of a URL, or by `target` itself when it is not
    /// an absolute URL. Returns the domain that was looked up.
    pub async fn lookup_url(&self, target: &str) -> Result<(String, PolicyLookup), AgentError> {
        let domain = extract_domain(target).unwrap_or_else(|| target.trim().to_string());
        let found = self.lookup(&domain).await?;
        Ok((domain, found))
    }

    pub async fn by_rule_id(&self, id: RuleId) -> Result<Option<PolicyIndexEntry>, AgentError> {
        Ok(self.entries().await?.into_iter().find(|e| e.id == id))
    }
}
