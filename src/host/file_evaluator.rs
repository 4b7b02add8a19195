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

//! File-backed rule evaluator.
//!
//! Keeps the installed rule set as a JSON array of declarative rules for the
//! host to pick up. A replace is computed in memory and written with a single
//! rename, so it either fully lands or leaves the previous file in place.

use async_trait::async_trait;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::engine::rule_compiler::{self, DeclarativeRule};
use crate::engine_core::errors::AgentError;
use crate::engine_core::models::{Rule, RuleId};
use crate::engine_core::traits::RuleEvaluator;
use crate::store::file::write_atomic;

#[derive(Debug, Clone)]
pub struct FileRuleEvaluator {
    path: PathBuf,
}

impl FileRuleEvaluator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_installed(path: &Path) -> Result<Vec<DeclarativeRule>, AgentError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AgentError::ApplyFailed(format!(
                    "Cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            AgentError::ApplyFailed(format!("Corrupt rules file {}: {}", path.display(), e))
        })
    }

    fn replace_in_file(path: &Path, remove: &[RuleId], add: &[Rule]) -> Result<usize, AgentError> {
        let removed: HashSet<RuleId> = remove.iter().copied().collect();
        let mut installed: Vec<DeclarativeRule> = Self::read_installed(path)?
            .into_iter()
            .filter(|r| !removed.contains(&r.id))
            .collect();

        let mut ids: HashSet<RuleId> = installed.iter().map(|r| r.id).collect();
        for rule in add {
            if !ids.insert(rule.id) {
                return Err(AgentError::ApplyFailed(format!(
                    "Rule id {} is already installed",
                    rule.id
                )));
            }
            installed.push(rule_compiler::compile(rule));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AgentError::ApplyFailed(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }

        let bytes = serde_json::to_vec_pretty(&installed)
            .map_err(|e| AgentError::ApplyFailed(format!("Cannot encode rules: {}", e)))?;
        write_atomic(path, &bytes).map_err(AgentError::into_apply_failed)?;
        Ok(installed.len())
    }
}

#[async_trait]
impl RuleEvaluator for FileRuleEvaluator {
    async fn list_rules(&self) -> Result<Vec<Rule>, AgentError> {
        let path = self.path.clone();
        let installed = tokio::task::spawn_blocking(move || Self::read_installed(&path))
            .await
            .map_err(|e| AgentError::ApplyFailed(format!("Evaluator task failed: {}", e)))??;

        installed.iter().map(rule_compiler::decompile).collect()
    }

    async fn replace_rules(&self, remove: &[RuleId], add: &[Rule]) -> Result<(), AgentError> {
        let path = self.path.clone();
        let remove = remove.to_vec();
        let add = add.to_vec();

        let total = tokio::task::spawn_blocking(move || Self::replace_in_file(&path, &remove, &add))
            .await
            .map_err(|e| AgentError::ApplyFailed(format!("Evaluator task failed: {}", e)))??;

        debug!(path = ?self.path, installed = total, "Rules file updated");
        Ok(())
    }
}
