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

//! Event Buffer.
//!
//! Persisted FIFO of enforcement events awaiting shipment, capped at
//! `max_events`. When the cap is exceeded the oldest events are dropped.
//! Every operation reloads the persisted sequence before touching it.

use tracing::{debug, error};

use crate::engine_core::constants::keys;
use crate::engine_core::errors::AgentError;
use crate::engine_core::models::EnforcementEvent;
use crate::store::PersistentState;

pub struct EventBuffer {
    state: PersistentState,
    max_events: usize,
}

impl EventBuffer {
    pub fn new(state: PersistentState, max_events: usize) -> Self {
        Self { state, max_events }
    }

    async fn load(&self) -> Result<Vec<EnforcementEvent>, AgentError> {
        self.state.load_or_default(keys::EVENTS).await
    }

    /// Append one event, evicting from the front past the cap.
    ///
    /// Never fails the caller: persistence errors are logged and `None` is
    /// returned. On success returns the buffer length after the append.
    pub async fn append(&self, event: EnforcementEvent) -> Option<usize> {
        match self.try_append(event).await {
            Ok(len) => Some(len),
            Err(e) => {
                error!(error = %e, "Failed to buffer enforcement event");
                None
            }
        }
    }

    async fn try_append(&self, event: EnforcementEvent) -> Result<usize, AgentError> {
        let mut events = self.load().await?;
        events.push(event);

        if events.len() > self.max_events {
            let evicted = events.len() - self.max_events;
            events.drain(..evicted);
            debug!(evicted, "Event buffer full, dropped oldest events");
        }

        self.state.save(keys::EVENTS, &events).await?;
        Ok(events.len())
    }

    /// Snapshot of the buffer, oldest first. Does not remove anything.
    pub async fn drain_all(&self) -> Result<Vec<EnforcementEvent>, AgentError> {
        self.load().await
    }

    pub async fn len(&self) -> Result<usize, AgentError> {
        Ok(self.load().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, AgentError> {
        Ok(self.len().await? == 0)
    }

    pub async fn clear(&self) -> Result<(), AgentError> {
        self.state.save(keys::EVENTS, &Vec::<EnforcementEvent>::new()).await
    }

    /// Remove a batch that the collector accepted.
    ///
    /// Only the part of `shipped` still at the front of the buffer is removed:
    /// a prefix of the batch may have been evicted by appends made while the
    /// batch was in flight, and those appends stay buffered. Returns the
    /// number of events removed.
    pub async fn acknowledge(&self, shipped: &[EnforcementEvent]) -> Result<usize, AgentError> {
        if shipped.is_empty() {
            return Ok(0);
        }

        let mut events = self.load().await?;
        let removed = (0..=shipped.len())
            .map(|evicted| &shipped[evicted..])
            .find(|rest| events.starts_with(rest))
            .map_or(0, |rest| rest.len());

        if removed > 0 {
            events.drain(..removed);
            self.state.save(keys::EVENTS, &events).await?;
        }

        Ok(removed)
    }

    /// Buffer contents as newline-delimited JSON, one event per line.
    pub async fn export_ndjson(&self) -> Result<String, AgentError> {
        to_ndjson(&self.load().await?)
    }
}

pub fn to_ndjson(events: &[EnforcementEvent]) -> Result<String, AgentError> {
    let mut out = String::new();
    for event in events {
        let line = serde_json::to_string(event)
            .map_err(|e| AgentError::PersistenceFailed(format!("Cannot encode event: {}", e)))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_core::models::ClientId;
    use crate::store::memory::MemoryStateStore;
    use serde_json::json;
    use std::sync::Arc;

    fn event(rule_id: u32) -> EnforcementEvent {
        EnforcementEvent {
            client_id: ClientId::generate(),
            timestamp: crate::utils::time::now(),
            action: "policy.enforced".to_string(),
            rule_id: Some(rule_id),
            http_method: Some("GET".to_string()),
            referrer: None,
            url: Some(format!("https://llm{}.ai/", rule_id)),
            tab_id: None,
        }
    }

    fn buffer(max_events: usize) -> (EventBuffer, PersistentState) {
        let state = PersistentState::new(Arc::new(MemoryStateStore::new()));
        (EventBuffer::new(state.clone(), max_events), state)
    }

    fn ids(events: &[EnforcementEvent]) -> Vec<u32> {
        events.iter().filter_map(|e| e.rule_id).collect()
    }

    #[tokio::test]
    async fn test_append_reports_length_and_evicts_oldest() {
        let (buf, _) = buffer(3);
        for id in 1..=5 {
            let len = buf.append(event(id)).await;
            assert_eq!(len, Some((id as usize).min(3)));
        }
        assert_eq!(ids(&buf.drain_all().await.unwrap()), vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_drain_all_is_not_destructive() {
        let (buf, _) = buffer(10);
        buf.append(event(1)).await;
        assert_eq!(buf.drain_all().await.unwrap().len(), 1);
        assert_eq!(buf.len().await.unwrap(), 1);

        buf.clear().await.unwrap();
        assert!(buf.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_acknowledge_keeps_events_appended_in_flight() {
        let (buf, _) = buffer(10);
        buf.append(event(1)).await;
        buf.append(event(2)).await;
        let batch = buf.drain_all().await.unwrap();

        buf.append(event(3)).await;

        assert_eq!(buf.acknowledge(&batch).await.unwrap(), 2);
        assert_eq!(ids(&buf.drain_all().await.unwrap()), vec![3]);
    }

    #[tokio::test]
    async fn test_acknowledge_after_eviction_of_batch_head() {
        let (buf, _) = buffer(3);
        for id in 1..=3 {
            buf.append(event(id)).await;
        }
        let batch = buf.drain_all().await.unwrap();

        // Two appends in flight push events 1 and 2 out
        buf.append(event(4)).await;
        buf.append(event(5)).await;

        assert_eq!(buf.acknowledge(&batch).await.unwrap(), 1);
        assert_eq!(ids(&buf.drain_all().await.unwrap()), vec![4, 5]);
    }

    #[tokio::test]
    async fn test_acknowledge_after_clear_removes_nothing() {
        let (buf, _) = buffer(10);
        buf.append(event(1)).await;
        let batch = buf.drain_all().await.unwrap();
        buf.clear().await.unwrap();
        buf.append(event(2)).await;

        assert_eq!(buf.acknowledge(&batch).await.unwrap(), 0);
        assert_eq!(ids(&buf.drain_all().await.unwrap()), vec![2]);
    }

    #[tokio::test]
    async fn test_corrupt_buffer_reads_as_empty() {
        let (buf, state) = buffer(10);
        state.save(keys::EVENTS, &json!({"not": "a list"})).await.unwrap();

        assert!(buf.drain_all().await.unwrap().is_empty());
        assert_eq!(buf.append(event(1)).await, Some(1));
    }

    #[tokio::test]
    async fn test_ndjson_export() {
        let (buf, _) = buffer(10);
        buf.append(event(1)).await;
        buf.append(event(2)).await;

        let out = buf.export_ndjson().await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["ruleId"], json!(1));
        assert!(out.ends_with('\n'));
    }
}
