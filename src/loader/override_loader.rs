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

//! Override loading.
//!
//! Reads the local override policy asset (JSON or YAML).

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::engine_core::errors::AgentError;
use crate::engine_core::models::OverridePolicy;
use crate::utils::policy_validator::PolicyValidator;

/// Loads the local override policy asset
#[derive(Debug, Clone)]
pub struct OverrideLoader {
    path: PathBuf,
}

impl OverrideLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, parse and validate the override file.
    ///
    /// Any failure is `OverrideLoadFailed`; callers continue with no overrides.
    pub async fn load(&self) -> Result<Vec<OverridePolicy>, AgentError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_from_file(&path))
            .await
            .map_err(|e| AgentError::OverrideLoadFailed(format!("Loader task failed: {}", e)))?
    }

    pub fn load_from_file(path: &Path) -> Result<Vec<OverridePolicy>, AgentError> {
        if !path.exists() {
            return Err(AgentError::OverrideLoadFailed(format!(
                "Override file not found at {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            AgentError::OverrideLoadFailed(format!("Failed to read override file: {}", e))
        })?;

        let overrides = Self::parse(&content, is_yaml(path))?;
        PolicyValidator::validate_overrides(&overrides)?;

        debug!(path = ?path, count = overrides.len(), "Loaded override policies");
        Ok(overrides)
    }

    pub fn parse(content: &str, yaml: bool) -> Result<Vec<OverridePolicy>, AgentError> {
        if yaml {
            serde_yaml_ng::from_str(content).map_err(|e| {
                AgentError::OverrideLoadFailed(format!("Failed to parse override YAML: {}", e))
            })
        } else {
            serde_json::from_str(content).map_err(|e| {
                AgentError::OverrideLoadFailed(format!("Failed to parse override JSON: {}", e))
            })
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_core::models::Policy;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policies.json");
        fs::write(
            &path,
            r#"[{"id": 101, "domain": "chat.openai.com", "policy": "block"}]"#,
        )
        .unwrap();

        let overrides = OverrideLoader::new(&path).load().await.unwrap();
        assert_eq!(
            overrides,
            vec![OverridePolicy {
                id: 101,
                domain: "chat.openai.com".to_string(),
                policy: Policy::Block,
            }]
        );
    }

    #[tokio::test]
    async fn test_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policies.yml");
        fs::write(
            &path,
            "- id: 7\n  domain: claude.ai\n  policy: warn\n- id: 8\n  domain: poe.com\n  policy: allow\n",
        )
        .unwrap();

        let overrides = OverrideLoader::new(&path).load().await.unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[0].policy, Policy::Warn);
        assert_eq!(overrides[1].domain, "poe.com");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = OverrideLoader::new(dir.path().join("absent.json"))
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::OverrideLoadFailed(_)));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let err = OverrideLoader::parse(r#"[{"id": 1, "domain": "a.ai", "policy": "deny"}]"#, false)
            .unwrap_err();
        assert!(matches!(err, AgentError::OverrideLoadFailed(_)));
    }

    #[test]
    fn test_invalid_entry_fails_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policies.json");
        fs::write(&path, r#"[{"id": 0, "domain": "a.ai", "policy": "block"}]"#).unwrap();

        let err = OverrideLoader::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Override #1"));
    }
}
