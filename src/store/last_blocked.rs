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

use crate::engine_core::constants::keys;
use crate::engine_core::errors::AgentError;
use crate::store::PersistentState;

/// URL of the most recent request redirected by a warn rule.
pub struct LastBlockedUrl {
    state: PersistentState,
}

impl LastBlockedUrl {
    pub fn new(state: PersistentState) -> Self {
        Self { state }
    }

    pub async fn get(&self) -> Result<Option<String>, AgentError> {
        self.state.load(keys::LAST_BLOCKED_URL).await
    }

    pub async fn set(&self, url: &str) -> Result<(), AgentError> {
        self.state.save(keys::LAST_BLOCKED_URL, url).await
    }
}
