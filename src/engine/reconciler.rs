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

//! Policy reconciliation engine.
//!
//! This module implements the `PolicyReconciler` which merges the canonical
//! domain list with local overrides into one ordered rule set where every
//! domain appears exactly once.

use std::collections::HashMap;

use crate::engine_core::models::{DomainRecord, OverridePolicy, Policy, Rule, RuleId};

pub struct PolicyReconciler;

impl PolicyReconciler {
    /// Merge canonical domains and overrides.
    ///
    /// Canonical domains become `allow` rules with sequential ids starting at 1
    /// (a repeated canonical domain keeps its first position). Each override
    /// then replaces the rule for the same domain in place, keeping that
    /// position but taking the override's id, or is appended when no rule
    /// matches. Matching is exact, case-sensitive string equality. Later
    /// overrides win over earlier ones for the same domain.
    pub fn reconcile(canonical: &[DomainRecord], overrides: &[OverridePolicy]) -> Vec<Rule> {
        let mut rules: Vec<Rule> = Vec::with_capacity(canonical.len() + overrides.len());
        // domain -> position in `rules`
        let mut positions: HashMap<&str, usize> = HashMap::new();

        // 1. Base allow rules
        for record in canonical {
            if positions.contains_key(record.domain.as_str()) {
                continue;
            }
            let id = (rules.len() + 1) as RuleId;
            positions.insert(record.domain.as_str(), rules.len());
            rules.push(Rule::new(id, record.domain.as_str(), Policy::Allow));
        }

        // 2. Overrides: find-and-replace, else append
        for entry in overrides {
            let rule = Rule::new(entry.id, entry.domain.as_str(), entry.policy);
            match positions.get(entry.domain.as_str()) {
                Some(&idx) => rules[idx] = rule,
                None => {
                    positions.insert(entry.domain.as_str(), rules.len());
                    rules.push(rule);
                }
            }
        }

        rules
    }
}
