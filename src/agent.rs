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

//! Agent.
//!
//! Composition root. Builds every store and service over the injected
//! collaborators and drives them from one run loop that multiplexes the flush
//! timer, host messages and the shutdown signal. Handling is serialized: one
//! message or tick is processed to completion before the next.

use futures::SinkExt;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::codec::FramedWrite;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::applier::RuleApplier;
use crate::engine::reconciler::PolicyReconciler;
use crate::engine_core::audit::AuditLogger;
use crate::engine_core::constants::{display, limits};
use crate::engine_core::errors::AgentError;
use crate::engine_core::models::{ClientId, Rule};
use crate::engine_core::traits::{DomainSource, LogSink, RuleEvaluator, StateStore};
use crate::host::codec::HostCodec;
use crate::host::file_evaluator::FileRuleEvaluator;
use crate::host::listener::EnforcementListener;
use crate::host::messages::{HostMessage, HostReply};
use crate::host::pipeline::{spawn_host_reader, HostEvent};
use crate::loader::OverrideLoader;
use crate::net::collector::HttpLogCollector;
use crate::net::domain_source::DomainSourceClient;
use crate::net::shipper::{create_ship_breaker, FlushOutcome, FlushTrigger, LogShipper};
use crate::store::event_buffer::EventBuffer;
use crate::store::file::FileStateStore;
use crate::store::identity::IdentityStore;
use crate::store::last_blocked::LastBlockedUrl;
use crate::store::policy_index::{PolicyIndex, PolicyLookup};
use crate::store::PersistentState;
use crate::utils::domain::truncate_url;

/// External collaborators injected into the agent
pub struct AgentDeps {
    pub state: Arc<dyn StateStore>,
    pub domain_source: Arc<dyn DomainSource>,
    pub log_sink: Arc<dyn LogSink>,
    pub evaluator: Arc<dyn RuleEvaluator>,
}

pub struct Agent {
    config: Config,
    identity: Arc<IdentityStore>,
    index: Arc<PolicyIndex>,
    last_blocked: Arc<LastBlockedUrl>,
    buffer: Arc<EventBuffer>,
    shipper: Arc<LogShipper>,
    listener: EnforcementListener,
    domain_source: Arc<dyn DomainSource>,
    overrides: OverrideLoader,
    applier: RuleApplier,
}

impl Agent {
    pub fn new(config: Config, deps: AgentDeps) -> Self {
        let state = PersistentState::new(deps.state);

        let identity = Arc::new(IdentityStore::new(state.clone()));
        let index = Arc::new(PolicyIndex::new(state.clone()));
        let last_blocked = Arc::new(LastBlockedUrl::new(state.clone()));
        let buffer = Arc::new(EventBuffer::new(state, config.max_events));

        let (backoff_initial, backoff_max) = config.ship_backoff();
        let shipper = Arc::new(LogShipper::new(
            buffer.clone(),
            deps.log_sink,
            create_ship_breaker(config.ship_failure_limit, backoff_initial, backoff_max),
            config.flush_threshold,
        ));

        let listener = EnforcementListener::new(
            identity.clone(),
            shipper.clone(),
            index.clone(),
            last_blocked.clone(),
        );

        Self {
            overrides: OverrideLoader::new(config.overrides_path.clone()),
            applier: RuleApplier::new(deps.evaluator),
            domain_source: deps.domain_source,
            config,
            identity,
            index,
            last_blocked,
            buffer,
            shipper,
            listener,
        }
    }

    /// Wire the production collaborators: file state, HTTP clients and the
    /// file rule evaluator.
    pub fn from_config(config: Config) -> Result<Self, AgentError> {
        config.validate()?;

        let http_client = crate::net::build_http_client(config.http_timeout())?;
        let deps = AgentDeps {
            state: Arc::new(FileStateStore::open(&config.state_dir)?),
            domain_source: Arc::new(DomainSourceClient::new(
                http_client.clone(),
                config.domain_source_url.clone(),
            )),
            log_sink: Arc::new(HttpLogCollector::new(
                http_client,
                config.log_collector_url.clone(),
                config.http_timeout(),
            )),
            evaluator: Arc::new(FileRuleEvaluator::new(config.rules_path())),
        };

        Ok(Self::new(config, deps))
    }

    pub fn policy_index(&self) -> &PolicyIndex {
        &self.index
    }

    pub fn event_buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    pub async fn client_id(&self) -> Result<ClientId, AgentError> {
        self.identity.get_or_create().await
    }

    /// Resolve the client identity and run the initial reconciliation.
    /// A failed reconciliation is logged and leaves the previous rules active.
    pub async fn start(&self) -> Result<ClientId, AgentError> {
        let client_id = self.identity.get_or_create().await?;
        info!(client_id = %client_id, "Agent starting");

        if let Err(e) = self.refresh_policies().await {
            warn!(error = %e, "Initial policy reconciliation failed");
        }
        Ok(client_id)
    }

    /// Fetch, reconcile and install the policy set, then rebuild the index.
    pub async fn refresh_policies(&self) -> Result<Vec<Rule>, AgentError> {
        let canonical = self.domain_source.fetch_canonical_domains().await.map_err(|e| {
            error!(error = %e, "Domain source unavailable, keeping installed rules");
            e
        })?;

        let overrides = match self.overrides.load().await {
            Ok(overrides) => overrides,
            Err(e) => {
                warn!(
                    error = %e,
                    path = ?self.overrides.path(),
                    "Override policies unavailable, continuing without overrides"
                );
                Vec::new()
            }
        };

        let rules = PolicyReconciler::reconcile(&canonical, &overrides);
        debug!(
            canonical = canonical.len(),
            overrides = overrides.len(),
            rules = rules.len(),
            "Reconciled policy set"
        );

        self.applier.apply(&rules).await.map_err(|e| {
            error!(error = %e, "Rule apply failed, keeping previous rules and index");
            e
        })?;

        self.index.replace(&rules).await?;
        AuditLogger::policies_applied(&rules);
        Ok(rules)
    }

    /// Policy for a bare domain or for the host of a URL.
    pub async fn lookup(&self, query: &str) -> Result<(String, PolicyLookup), AgentError> {
        self.index.lookup_url(query).await
    }

    pub async fn flush(&self, trigger: FlushTrigger) -> Result<FlushOutcome, AgentError> {
        self.shipper.flush(trigger).await
    }

    /// Handle one host message. `RULE_MATCHED` produces no reply.
    pub async fn handle_message(&self, msg: HostMessage) -> Option<HostReply> {
        let reply = match msg {
            HostMessage::RuleMatched(notification) => {
                if let Err(e) = self.listener.on_rule_matched(notification).await {
                    error!(error = %e, "Failed to record rule match");
                }
                return None;
            }
            HostMessage::GetPolicies => self
                .index
                .entries()
                .await
                .map(|policies| HostReply::Policies { policies }),
            HostMessage::Lookup { domain } => {
                self.lookup(&domain)
                    .await
                    .map(|(domain, found)| HostReply::Lookup {
                        domain,
                        entry: found.entry(),
                    })
            }
            HostMessage::GetLastBlockedUrl => {
                self.last_blocked
                    .get()
                    .await
                    .map(|url| HostReply::LastBlockedUrl {
                        display: truncate_url(url.as_deref(), display::MAX_URL_LENGTH),
                        last_blocked_url: url,
                    })
            }
            HostMessage::GetEvents => self
                .buffer
                .drain_all()
                .await
                .map(|events| HostReply::Events { events }),
            HostMessage::ClearEvents => self.buffer.clear().await.map(|()| {
                info!("Event buffer cleared by host");
                HostReply::Ack { ok: true }
            }),
            HostMessage::RefreshPolicies => self
                .refresh_policies()
                .await
                .map(|rules| HostReply::Applied {
                    applied: rules.len(),
                }),
            HostMessage::FlushLogs => self
                .flush(FlushTrigger::Manual)
                .await
                .map(|outcome| HostReply::Flushed {
                    shipped: outcome.shipped(),
                }),
            HostMessage::Suspend => Ok(HostReply::Ack { ok: true }),
        };

        Some(reply.unwrap_or_else(HostReply::from))
    }

    /// Best-effort flush bounded by the shutdown timeout.
    pub async fn shutdown(&self) {
        let limit = self.config.shutdown_flush_timeout();
        match time::timeout(limit, self.flush(FlushTrigger::Shutdown)).await {
            Ok(Ok(outcome)) => info!(shipped = outcome.shipped(), "Shutdown flush complete"),
            Ok(Err(e)) => warn!(error = %e, "Shutdown flush failed, events kept for next start"),
            Err(_) => warn!(timeout_secs = limit.as_secs(), "Shutdown flush timed out"),
        }
    }

    /// Serve the host channel until EOF, `SUSPEND` or `shutdown` resolves,
    /// then run the shutdown flush.
    pub async fn run<R, W, F>(&self, input: R, output: W, shutdown: F) -> Result<(), AgentError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::channel(limits::HOST_CHANNEL_CAPACITY);
        let reader = spawn_host_reader(input, tx);
        let mut writer = FramedWrite::new(output, HostCodec::new());

        let period = self.config.flush_interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            flush_interval_secs = period.as_secs(),
            threshold = self.config.flush_threshold,
            "Host channel open"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.flush(FlushTrigger::Timer).await {
                        warn!(error = %e, "Timer flush failed");
                    }
                }
                event = rx.recv() => {
                    let reply = match event {
                        Some(HostEvent::Message(msg)) => {
                            let suspend = matches!(msg, HostMessage::Suspend);
                            let reply = self.handle_message(msg).await;
                            if suspend {
                                if let Some(reply) = reply {
                                    if let Err(e) = writer.send(&reply).await {
                                        warn!(error = %e, "Failed to acknowledge suspend");
                                    }
                                }
                                info!("Host requested suspend");
                                break;
                            }
                            reply
                        }
                        Some(HostEvent::Malformed(reason)) => {
                            Some(HostReply::from(AgentError::InvalidMessage(reason)))
                        }
                        Some(HostEvent::Disconnect) | None => {
                            info!("Host channel closed");
                            break;
                        }
                    };

                    if let Some(reply) = reply {
                        if let Err(e) = writer.send(&reply).await {
                            warn!(error = %e, "Host channel write failed");
                            break;
                        }
                    }
                }
            }
        }

        reader.abort();
        self.shutdown().await;
        Ok(())
    }
}
