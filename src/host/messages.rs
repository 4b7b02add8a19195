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

//! Host channel message types.
//!
//! Requests carry a `type` tag; replies are bare JSON objects whose shape
//! identifies them.

use serde::{Deserialize, Serialize};

use crate::engine_core::errors::AgentError;
use crate::engine_core::models::{EnforcementEvent, MatchNotification, PolicyIndexEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    /// The host evaluator matched a rule on a live request. No reply.
    RuleMatched(MatchNotification),
    GetPolicies,
    Lookup { domain: String },
    GetLastBlockedUrl,
    GetEvents,
    ClearEvents,
    RefreshPolicies,
    FlushLogs,
    /// Host is going away; the agent replies, flushes and stops.
    Suspend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HostReply {
    Policies {
        policies: Vec<PolicyIndexEntry>,
    },
    Lookup {
        domain: String,
        entry: Option<PolicyIndexEntry>,
    },
    LastBlockedUrl {
        #[serde(rename = "lastBlockedUrl")]
        last_blocked_url: Option<String>,
        display: String,
    },
    Events {
        events: Vec<EnforcementEvent>,
    },
    Applied {
        applied: usize,
    },
    Flushed {
        shipped: usize,
    },
    Ack {
        ok: bool,
    },
    Error {
        error: String,
    },
}

impl From<AgentError> for HostReply {
    fn from(err: AgentError) -> Self {
        HostReply::Error {
            error: err.user_message(),
        }
    }
}
