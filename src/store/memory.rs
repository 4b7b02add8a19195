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

//! In-memory state backend.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::engine_core::errors::AgentError;
use crate::engine_core::traits::StateStore;

/// Process-local backend; state is lost on exit.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>, AgentError> {
        self.entries
            .lock()
            .map_err(|_| AgentError::PersistenceFailed("State lock poisoned".to_string()))
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, AgentError> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), AgentError> {
        self.entries()?.insert(key.to_string(), value);
        Ok(())
    }
}
