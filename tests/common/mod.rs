// Common test utilities and helpers for all test modules
#![allow(dead_code)]

use async_trait::async_trait;
use llm_warden::agent::{Agent, AgentDeps};
use llm_warden::config::Config;
use llm_warden::engine_core::errors::AgentError;
use llm_warden::engine_core::models::{
    ClientId, DomainRecord, EnforcementEvent, MatchNotification, Policy, Rule, RuleId,
};
use llm_warden::engine_core::traits::{DomainSource, LogSink, RuleEvaluator, StateStore};
use llm_warden::store::memory::MemoryStateStore;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock host evaluator recording every replace call
pub struct MockRuleEvaluator {
    pub installed: Mutex<Vec<Rule>>,
    pub transactional: bool,
    pub list_should_fail: AtomicBool,
    /// Number of upcoming replace calls carrying rules to add that will fail
    pub failing_adds: AtomicUsize,
    pub calls: Mutex<Vec<(Vec<RuleId>, Vec<Rule>)>>,
}

impl MockRuleEvaluator {
    pub fn new(transactional: bool) -> Self {
        Self {
            installed: Mutex::new(Vec::new()),
            transactional,
            list_should_fail: AtomicBool::new(false),
            failing_adds: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_installed(transactional: bool, rules: Vec<Rule>) -> Self {
        let evaluator = Self::new(transactional);
        *evaluator.installed.lock().unwrap() = rules;
        evaluator
    }

    pub fn installed(&self) -> Vec<Rule> {
        self.installed.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn fail_next_adds(&self, n: usize) {
        self.failing_adds.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl RuleEvaluator for MockRuleEvaluator {
    async fn list_rules(&self) -> Result<Vec<Rule>, AgentError> {
        if self.list_should_fail.load(Ordering::SeqCst) {
            return Err(AgentError::ApplyFailed("Host unavailable".to_string()));
        }
        Ok(self.installed())
    }

    async fn replace_rules(&self, remove: &[RuleId], add: &[Rule]) -> Result<(), AgentError> {
        self.calls
            .lock()
            .unwrap()
            .push((remove.to_vec(), add.to_vec()));

        if !add.is_empty() {
            let pending = self.failing_adds.load(Ordering::SeqCst);
            if pending > 0 {
                self.failing_adds.store(pending - 1, Ordering::SeqCst);
                return Err(AgentError::ApplyFailed("Host rejected rules".to_string()));
            }
        }

        let mut installed = self.installed.lock().unwrap();
        installed.retain(|r| !remove.contains(&r.id));
        installed.extend_from_slice(add);
        Ok(())
    }

    fn is_transactional(&self) -> bool {
        self.transactional
    }
}

/// Mock canonical domain source
#[derive(Default)]
pub struct MockDomainSource {
    pub domains: Mutex<Vec<DomainRecord>>,
    pub should_fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockDomainSource {
    pub fn with_domains(domains: &[&str]) -> Self {
        let source = Self::default();
        source.set_domains(domains);
        source
    }

    pub fn set_domains(&self, domains: &[&str]) {
        *self.domains.lock().unwrap() = domains.iter().map(|d| DomainRecord::new(*d)).collect();
    }
}

#[async_trait]
impl DomainSource for MockDomainSource {
    async fn fetch_canonical_domains(&self) -> Result<Vec<DomainRecord>, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(AgentError::SourceUnavailable("HTTP 503".to_string()));
        }
        Ok(self.domains.lock().unwrap().clone())
    }
}

/// Mock log collector counting calls and keeping accepted batches
#[derive(Default)]
pub struct MockLogSink {
    pub received: Mutex<Vec<Vec<EnforcementEvent>>>,
    pub should_fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockLogSink {
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.should_fail.store(true, Ordering::SeqCst);
        sink
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shipped_events(&self) -> usize {
        self.received.lock().unwrap().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl LogSink for MockLogSink {
    async fn ship(&self, batch: &[EnforcementEvent]) -> Result<(), AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(AgentError::ShipFailed("HTTP 500".to_string()));
        }
        self.received.lock().unwrap().push(batch.to_vec());
        Ok(())
    }
}

/// State backend whose writes always fail
#[derive(Default)]
pub struct FailingStateStore;

#[async_trait]
impl StateStore for FailingStateStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, AgentError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<(), AgentError> {
        Err(AgentError::PersistenceFailed("Disk full".to_string()))
    }
}

/// Collaborators of one test agent, kept so tests can inspect them
pub struct TestHarness {
    pub agent: Agent,
    pub state: Arc<MemoryStateStore>,
    pub source: Arc<MockDomainSource>,
    pub sink: Arc<MockLogSink>,
    pub evaluator: Arc<MockRuleEvaluator>,
}

pub fn test_config(overrides_path: &Path) -> Config {
    Config {
        overrides_path: overrides_path.to_path_buf(),
        flush_threshold: 5,
        max_events: 10,
        ..Config::default()
    }
}

pub fn harness(config: Config, domains: &[&str]) -> TestHarness {
    let state = Arc::new(MemoryStateStore::new());
    let source = Arc::new(MockDomainSource::with_domains(domains));
    let sink = Arc::new(MockLogSink::default());
    let evaluator = Arc::new(MockRuleEvaluator::new(true));

    let agent = Agent::new(
        config,
        AgentDeps {
            state: state.clone(),
            domain_source: source.clone(),
            log_sink: sink.clone(),
            evaluator: evaluator.clone(),
        },
    );

    TestHarness {
        agent,
        state,
        source,
        sink,
        evaluator,
    }
}

pub fn event(rule_id: RuleId) -> EnforcementEvent {
    EnforcementEvent {
        client_id: ClientId::generate(),
        timestamp: llm_warden::utils::time::now(),
        action: "policy.enforced".to_string(),
        rule_id: Some(rule_id),
        http_method: Some("GET".to_string()),
        referrer: None,
        url: Some(format!("https://llm{}.example/", rule_id)),
        tab_id: Some(1),
    }
}

pub fn notification(rule_id: RuleId, url: &str, action: Option<Policy>) -> MatchNotification {
    MatchNotification {
        matched_rule_id: Some(rule_id),
        request_method: Some("GET".to_string()),
        initiator: Some("https://intranet.corp/".to_string()),
        url: Some(url.to_string()),
        tab_id: Some(3),
        action,
    }
}
