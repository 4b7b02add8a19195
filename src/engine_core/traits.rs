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

//! Collaborator Traits.
//!
//! The agent core talks to persistence, the network and the host rule engine
//! only through these seams, so every component can run against in-memory
//! doubles in tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::engine_core::errors::AgentError;
use crate::engine_core::models::{DomainRecord, EnforcementEvent, Rule, RuleId};

/// Key/value persistence backend holding JSON documents.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the value stored under `key`, `None` when absent. A stored
    /// document that is not JSON is a `CorruptState`.
    async fn get(&self, key: &str) -> Result<Option<Value>, AgentError>;

    /// Overwrite the value stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), AgentError>;
}

/// Source of the canonical LLM domain list.
#[async_trait]
pub trait DomainSource: Send + Sync {
    /// Fails with `SourceUnavailable`; never retries internally.
    async fn fetch_canonical_domains(&self) -> Result<Vec<DomainRecord>, AgentError>;
}

/// Remote collector for enforcement events.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver one batch. Any error means the batch was not accepted.
    async fn ship(&self, batch: &[EnforcementEvent]) -> Result<(), AgentError>;
}

/// Host declarative filter evaluator.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    /// Rules currently installed in the host.
    async fn list_rules(&self) -> Result<Vec<Rule>, AgentError>;

    /// Remove the given rule ids and install `add`.
    async fn replace_rules(&self, remove: &[RuleId], add: &[Rule]) -> Result<(), AgentError>;

    /// Whether `replace_rules` commits removal and addition as one unit.
    fn is_transactional(&self) -> bool {
        true
    }
}
