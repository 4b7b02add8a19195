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

//! Enforcement Listener.
//!
//! Turns host match notifications into buffered enforcement events and
//! remembers the URL of the last request redirected by a warn rule.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::engine_core::audit::AuditLogger;
use crate::engine_core::constants::shipping;
use crate::engine_core::errors::AgentError;
use crate::engine_core::models::{ClientId, EnforcementEvent, MatchNotification, Policy};
use crate::net::shipper::LogShipper;
use crate::store::identity::IdentityStore;
use crate::store::last_blocked::LastBlockedUrl;
use crate::store::policy_index::PolicyIndex;

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

/// Build the event for one notification. Missing and empty fields become `None`.
pub fn to_event(
    notification: &MatchNotification,
    client_id: ClientId,
    at: DateTime<Utc>,
) -> EnforcementEvent {
    EnforcementEvent {
        client_id,
        timestamp: at,
        action: shipping::EVENT_ACTION.to_string(),
        rule_id: notification.matched_rule_id,
        http_method: non_empty(&notification.request_method),
        referrer: non_empty(&notification.initiator),
        url: non_empty(&notification.url),
        tab_id: notification.tab_id,
    }
}

pub struct EnforcementListener {
    identity: Arc<IdentityStore>,
    shipper: Arc<LogShipper>,
    index: Arc<PolicyIndex>,
    last_blocked: Arc<LastBlockedUrl>,
}

impl EnforcementListener {
    pub fn new(
        identity: Arc<IdentityStore>,
        shipper: Arc<LogShipper>,
        index: Arc<PolicyIndex>,
        last_blocked: Arc<LastBlockedUrl>,
    ) -> Self {
        Self {
            identity,
            shipper,
            index,
            last_blocked,
        }
    }

    /// Record one rule match. Only a client id failure is surfaced; buffering
    /// and last-URL bookkeeping failures are logged.
    pub async fn on_rule_matched(&self, notification: MatchNotification) -> Result<(), AgentError> {
        let client_id = self.identity.get_or_create().await?;
        let event = to_event(&notification, client_id, crate::utils::time::now());
        AuditLogger::enforcement(&event);

        let url = event.url.clone();
        self.shipper.record(event).await;

        if self.is_warn(&notification).await {
            match url {
                Some(url) => {
                    if let Err(e) = self.last_blocked.set(&url).await {
                        warn!(error = %e, "Failed to store last blocked URL");
                    }
                }
                None => debug!("Warn rule matched without a request URL"),
            }
        }

        Ok(())
    }

    async fn is_warn(&self, notification: &MatchNotification) -> bool {
        if let Some(action) = notification.action {
            return action == Policy::Warn;
        }

        let Some(rule_id) = notification.matched_rule_id else {
            return false;
        };
        match self.index.by_rule_id(rule_id).await {
            Ok(entry) => entry.is_some_and(|e| e.policy == Policy::Warn),
            Err(e) => {
                warn!(error = %e, rule_id, "Policy index unavailable for matched rule");
                false
            }
        }
    }
}
