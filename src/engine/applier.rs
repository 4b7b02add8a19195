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

//! Rule Applier.
//!
//! Installs a reconciled rule set into the host evaluator with replace-all
//! semantics. Hosts with a transactional replace get one call; for the others
//! the previous set is removed first and re-added if installing the new set
//! fails.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::engine_core::errors::AgentError;
use crate::engine_core::models::{Rule, RuleId};
use crate::engine_core::traits::RuleEvaluator;
use crate::utils::policy_validator::PolicyValidator;

pub struct RuleApplier {
    evaluator: Arc<dyn RuleEvaluator>,
}

impl RuleApplier {
    pub fn new(evaluator: Arc<dyn RuleEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Replace every installed rule with `rules`. Fails with `ApplyFailed`.
    pub async fn apply(&self, rules: &[Rule]) -> Result<(), AgentError> {
        PolicyValidator::validate_rule_set(rules)?;

        let existing = self
            .evaluator
            .list_rules()
            .await
            .map_err(AgentError::into_apply_failed)?;
        let remove: Vec<RuleId> = existing.iter().map(|r| r.id).collect();

        if self.evaluator.is_transactional() {
            self.evaluator
                .replace_rules(&remove, rules)
                .await
                .map_err(AgentError::into_apply_failed)?;
        } else {
            self.replace_with_rollback(&existing, &remove, rules).await?;
        }

        info!(
            installed = rules.len(),
            removed = remove.len(),
            "Rule set applied"
        );
        Ok(())
    }

    async fn replace_with_rollback(
        &self,
        existing: &[Rule],
        remove: &[RuleId],
        rules: &[Rule],
    ) -> Result<(), AgentError> {
        // Removal before addition so old and new ids never coexist
        self.evaluator
            .replace_rules(remove, &[])
            .await
            .map_err(AgentError::into_apply_failed)?;

        if let Err(e) = self.evaluator.replace_rules(&[], rules).await {
            warn!(error = %e, "Installing new rules failed, restoring previous rule set");
            if let Err(rollback) = self.evaluator.replace_rules(&[], existing).await {
                error!(
                    error = %rollback,
                    previous = existing.len(),
                    "Rollback failed, host may have no rules installed"
                );
            }
            return Err(e.into_apply_failed());
        }

        Ok(())
    }
}
