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

//! File-backed state store.
//!
//! One JSON document per key under the state directory. Readers take a
//! shared advisory lock on `<dir>/.lock` and writers an exclusive one, so a
//! CLI invocation and a running agent never observe a half-written file.
//! Writes go to a temporary file that is synced and renamed into place.

use async_trait::async_trait;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::engine_core::errors::AgentError;
use crate::engine_core::traits::StateStore;

const LOCK_FILE: &str = ".lock";

#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Open (and create if needed) the state directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AgentError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            AgentError::PersistenceFailed(format!(
                "Cannot create state directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, AgentError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(AgentError::PersistenceFailed(format!(
                "Invalid state key '{}'",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, AgentError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, AgentError> + Send + 'static,
    {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || op(&dir))
            .await
            .map_err(|e| AgentError::PersistenceFailed(format!("State task failed: {}", e)))?
    }
}

fn open_lock(dir: &Path) -> Result<File, AgentError> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join(LOCK_FILE))
        .map_err(|e| AgentError::PersistenceFailed(format!("Cannot open state lock: {}", e)))
}

fn lock_shared(dir: &Path) -> Result<File, AgentError> {
    let lock = open_lock(dir)?;
    fs2::FileExt::lock_shared(&lock)
        .map_err(|e| AgentError::PersistenceFailed(format!("Cannot lock state: {}", e)))?;
    Ok(lock)
}

fn lock_exclusive(dir: &Path) -> Result<File, AgentError> {
    let lock = open_lock(dir)?;
    fs2::FileExt::lock_exclusive(&lock)
        .map_err(|e| AgentError::PersistenceFailed(format!("Cannot lock state: {}", e)))?;
    Ok(lock)
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AgentError> {
    let tmp = path.with_extension("json.tmp");
    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AgentError::PersistenceFailed(format!("Cannot write {}: {}", path.display(), e))
    })
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, AgentError> {
        let path = self.path_for(key)?;
        self.blocking(move |dir| {
            let _lock = lock_shared(dir)?;
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(AgentError::PersistenceFailed(format!(
                        "Cannot read {}: {}",
                        path.display(),
                        e
                    )))
                }
            };
            serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                AgentError::CorruptState(format!("{}: {}", path.display(), e))
            })
        })
        .await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), AgentError> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec_pretty(&value)
            .map_err(|e| AgentError::PersistenceFailed(format!("Cannot encode '{}': {}", key, e)))?;
        self.blocking(move |dir| {
            let _lock = lock_exclusive(dir)?;
            write_atomic(&path, &bytes)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_core::models::{ClientId, EnforcementEvent};
    use crate::store::event_buffer::EventBuffer;
    use crate::store::identity::IdentityStore;
    use crate::store::PersistentState;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn sample_event(rule_id: u32) -> EnforcementEvent {
        EnforcementEvent {
            client_id: ClientId::generate(),
            timestamp: crate::utils::time::now(),
            action: "policy.enforced".to_string(),
            rule_id: Some(rule_id),
            http_method: Some("GET".to_string()),
            referrer: None,
            url: Some("https://claude.ai/".to_string()),
            tab_id: None,
        }
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).unwrap();
        store.set("clientId", json!("abc")).await.unwrap();

        let reopened = FileStateStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("clientId").await.unwrap(), Some(json!("abc")));
        assert!(dir.path().join("clientId.json").exists());
        assert!(!dir.path().join("clientId.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_key_in_nested_dir() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path().join("nested/state")).unwrap();

        assert_eq!(store.get("events").await.unwrap(), None);
        store.set("events", json!([])).await.unwrap();
        assert_eq!(store.get("events").await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_corrupt_state() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("policies.json"), b"{not json").unwrap();

        let err = store.get("policies").await.unwrap_err();
        assert!(matches!(err, AgentError::CorruptState(_)));
    }

    #[tokio::test]
    async fn test_truncated_events_file_recovers_on_append() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("events.json"), br#"[{"clientId":"#).unwrap();
        let state = PersistentState::new(Arc::new(FileStateStore::open(dir.path()).unwrap()));
        let buffer = EventBuffer::new(state, 10);

        assert!(buffer.drain_all().await.unwrap().is_empty());
        assert_eq!(buffer.append(sample_event(1)).await, Some(1));
        assert_eq!(buffer.append(sample_event(2)).await, Some(2));

        let events = buffer.drain_all().await.unwrap();
        assert_eq!(events.len(), 2);
        let on_disk: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join("events.json")).unwrap()).unwrap();
        assert_eq!(on_disk.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_client_id_is_not_regenerated() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clientId.json"), b"\"half").unwrap();
        let state = PersistentState::new(Arc::new(FileStateStore::open(dir.path()).unwrap()));

        let err = IdentityStore::new(state).get_or_create().await.unwrap_err();
        assert!(matches!(err, AgentError::PersistenceFailed(_)));
        assert_eq!(
            fs::read(dir.path().join("clientId.json")).unwrap(),
            b"\"half".to_vec()
        );
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).unwrap();

        assert!(store.get("../escape").await.is_err());
        assert!(store.set("", json!(1)).await.is_err());
    }
}
