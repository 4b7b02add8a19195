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

//! Per-install client identity.

use tokio::sync::OnceCell;
use tracing::info;

use crate::engine_core::constants::keys;
use crate::engine_core::errors::AgentError;
use crate::engine_core::models::ClientId;
use crate::store::PersistentState;

/// Loads the persisted client id, generating and persisting one on first use.
/// The id is resolved at most once per process.
pub struct IdentityStore {
    state: PersistentState,
    cached: OnceCell<ClientId>,
}

impl IdentityStore {
    pub fn new(state: PersistentState) -> Self {
        Self {
            state,
            cached: OnceCell::new(),
        }
    }

    pub async fn get_or_create(&self) -> Result<ClientId, AgentError> {
        self.cached
            .get_or_try_init(|| async {
                if let Some(existing) = self.state.load::<ClientId>(keys::CLIENT_ID).await? {
                    return Ok(existing);
                }

                let id = ClientId::generate();
                self.state.save(keys::CLIENT_ID, &id).await?;
                info!(client_id = %id, "Generated new client id");
                Ok(id)
            })
            .await
            .copied()
    }
}
