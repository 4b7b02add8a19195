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

use serde::Serialize;
use tracing::info;

use crate::engine_core::models::{EnforcementEvent, Policy, Rule};

#[derive(Serialize)]
struct PolicySummary {
    rules: usize,
    allow: usize,
    warn: usize,
    block: usize,
}

/// Emits audit records on the `audit` tracing target.
pub struct AuditLogger;

impl AuditLogger {
    pub fn enforcement(event: &EnforcementEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();

        info!(
            target: "audit",
            rule_id = ?event.rule_id,
            tab_id = ?event.tab_id,
            payload = %payload,
            "POLICY_ENFORCED"
        );
    }

    pub fn policies_applied(rules: &[Rule]) {
        let count = |p: Policy| rules.iter().filter(|r| r.action == p).count();
        let summary = PolicySummary {
            rules: rules.len(),
            allow: count(Policy::Allow),
            warn: count(Policy::Warn),
            block: count(Policy::Block),
        };
        let payload = serde_json::to_string(&summary).unwrap_or_default();

        info!(
            target: "audit",
            payload = %payload,
            "POLICIES_APPLIED"
        );
    }
}
