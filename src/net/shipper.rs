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

//! Log Shipper.
//!
//! Moves the buffered events to the collector. Every trigger (timer,
//! threshold, shutdown, manual) goes through the same `flush`, which ships the
//! whole buffer as one batch and removes that batch only after a 2xx.
//! Delivery is at-least-once.
//!
//! Shipment runs behind a consecutive-failures circuit breaker: once the
//! collector has failed `limit` times in a row, flushes fail fast without a
//! network call until the exponential backoff window elapses.

use failsafe::futures::CircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error, StateMachine};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine_core::errors::AgentError;
use crate::engine_core::models::EnforcementEvent;
use crate::engine_core::traits::LogSink;
use crate::store::event_buffer::EventBuffer;

pub type ShipBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

pub fn create_ship_breaker(limit: u32, initial: Duration, max: Duration) -> ShipBreaker {
    Config::new()
        .failure_policy(failure_policy::consecutive_failures(
            limit,
            backoff::exponential(initial, max),
        ))
        .build()
}

/// What caused a flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Timer,
    Threshold,
    Shutdown,
    Manual,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Timer => "timer",
            FlushTrigger::Threshold => "threshold",
            FlushTrigger::Shutdown => "shutdown",
            FlushTrigger::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing buffered, no network call made
    Empty,
    /// Number of events accepted by the collector
    Shipped(usize),
}

impl FlushOutcome {
    pub fn shipped(&self) -> usize {
        match self {
            FlushOutcome::Empty => 0,
            FlushOutcome::Shipped(n) => *n,
        }
    }
}

pub struct LogShipper {
    buffer: Arc<EventBuffer>,
    sink: Arc<dyn LogSink>,
    breaker: ShipBreaker,
    threshold: usize,
}

impl LogShipper {
    pub fn new(
        buffer: Arc<EventBuffer>,
        sink: Arc<dyn LogSink>,
        breaker: ShipBreaker,
        threshold: usize,
    ) -> Self {
        Self {
            buffer,
            sink,
            breaker,
            threshold,
        }
    }

    /// Buffer one event. When the buffer reaches the threshold, exactly one
    /// flush is attempted before returning; its failure is logged only.
    pub async fn record(&self, event: EnforcementEvent) -> Option<usize> {
        let len = self.buffer.append(event).await?;

        if len >= self.threshold {
            if let Err(e) = self.flush(FlushTrigger::Threshold).await {
                warn!(error = %e, buffered = len, "Threshold flush failed");
            }
        }

        Some(len)
    }

    pub async fn flush(&self, trigger: FlushTrigger) -> Result<FlushOutcome, AgentError> {
        let batch = self.buffer.drain_all().await?;
        if batch.is_empty() {
            debug!(trigger = trigger.as_str(), "Nothing to flush");
            return Ok(FlushOutcome::Empty);
        }

        match self.breaker.call(self.sink.ship(&batch)).await {
            Ok(()) => {}
            Err(Error::Inner(e)) => {
                warn!(
                    trigger = trigger.as_str(),
                    events = batch.len(),
                    error = %e,
                    "Log shipment failed, events retained"
                );
                return Err(e);
            }
            Err(Error::Rejected) => {
                debug!(trigger = trigger.as_str(), "Collector circuit open, flush skipped");
                return Err(AgentError::ShipFailed(
                    "Collector circuit open, retry later".to_string(),
                ));
            }
        }

        let removed = self.buffer.acknowledge(&batch).await?;
        info!(
            trigger = trigger.as_str(),
            shipped = batch.len(),
            removed,
            "Flushed enforcement events"
        );
        Ok(FlushOutcome::Shipped(batch.len()))
    }
}
