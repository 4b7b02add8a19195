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

//! Local state.
//!
//! Typed stores (identity, event buffer, policy index, last blocked URL) over
//! a pluggable `StateStore` backend. Every store reloads the persisted copy
//! before mutating it and keeps nothing cached across await points, except
//! the immutable client identifier.

pub mod event_buffer;
pub mod file;
pub mod identity;
pub mod last_blocked;
pub mod memory;
pub mod policy_index;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::engine_core::errors::AgentError;
use crate::engine_core::traits::StateStore;

/// Typed JSON access to a `StateStore` backend.
#[derive(Clone)]
pub struct PersistentState {
    backend: Arc<dyn StateStore>,
}

impl PersistentState {
    pub fn new(backend: Arc<dyn StateStore>) -> Self {
        Self { backend }
    }

    /// Load and decode `key`. A value that does not decode is a `PersistenceFailed`.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AgentError> {
        let stored = self.backend.get(key).await.map_err(|e| match e {
            AgentError::CorruptState(reason) => {
                AgentError::PersistenceFailed(format!("Corrupt value under '{}': {}", key, reason))
            }
            other => other,
        })?;
        match stored {
            None => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                AgentError::PersistenceFailed(format!("Corrupt value under '{}': {}", key, e))
            }),
        }
    }

    /// Load `key`, falling back to the default when it is absent, is not JSON
    /// or does not decode. Other backend errors still propagate.
    pub async fn load_or_default<T: DeserializeOwned + Default>(
        &self,
        key: &str,
    ) -> Result<T, AgentError> {
        let stored = match self.backend.get(key).await {
            Ok(stored) => stored,
            Err(AgentError::CorruptState(reason)) => {
                warn!(key = %key, error = %reason, "Discarding unreadable persisted value");
                None
            }
            Err(e) => return Err(e),
        };
        match stored {
            None => Ok(T::default()),
            Some(value) => Ok(serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "Discarding malformed persisted value");
                T::default()
            })),
        }
    }

    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AgentError> {
        let value = serde_json::to_value(value).map_err(|e| {
            AgentError::PersistenceFailed(format!("Failed to encode '{}': {}", key, e))
        })?;
        self.backend.set(key, value).await
    }
}
