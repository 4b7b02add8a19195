mod common;

use common::{event, harness, notification, test_config, TestHarness};
use llm_warden::engine_core::errors::AgentError;
use llm_warden::engine_core::models::{Policy, Rule};
use llm_warden::host::messages::{HostMessage, HostReply};
use llm_warden::store::policy_index::PolicyLookup;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;

fn write_overrides(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("policies.json");
    fs::write(&path, body).unwrap();
    path
}

async fn refreshed(h: &TestHarness) -> Vec<Rule> {
    h.agent.refresh_policies().await.unwrap()
}

#[tokio::test]
async fn test_refresh_installs_and_indexes_rules() {
    let dir = tempdir().unwrap();
    let overrides = write_overrides(
        dir.path(),
        r#"[{"id": 50, "domain": "claude.ai", "policy": "warn"}]"#,
    );
    let h = harness(test_config(&overrides), &["openai.com", "claude.ai"]);

    let rules = refreshed(&h).await;

    assert_eq!(
        rules,
        vec![
            Rule::new(1, "openai.com", Policy::Allow),
            Rule::new(50, "claude.ai", Policy::Warn),
        ]
    );
    assert_eq!(h.evaluator.installed(), rules);
    let entries = h.agent.policy_index().entries().await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn test_source_unavailable_keeps_rules_and_index() {
    let dir = tempdir().unwrap();
    let h = harness(test_config(&dir.path().join("none.json")), &["openai.com"]);
    let before = refreshed(&h).await;

    h.source.should_fail.store(true, Ordering::SeqCst);
    let err = h.agent.refresh_policies().await.unwrap_err();

    assert!(matches!(err, AgentError::SourceUnavailable(_)));
    assert_eq!(h.evaluator.installed(), before);
    assert_eq!(h.evaluator.call_count(), 1);
    assert_eq!(h.agent.policy_index().entries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_broken_overrides_yield_canonical_only_rules() {
    let dir = tempdir().unwrap();
    let overrides = write_overrides(dir.path(), "{ this is not json");
    let h = harness(test_config(&overrides), &["openai.com", "gemini.google.com"]);

    let rules = refreshed(&h).await;

    assert_eq!(rules.len(), 2);
    assert!(rules.iter().all(|r| r.action == Policy::Allow));
}

#[tokio::test]
async fn test_apply_failure_leaves_index_untouched() {
    let dir = tempdir().unwrap();
    let h = harness(test_config(&dir.path().join("none.json")), &["openai.com"]);
    refreshed(&h).await;

    h.source.set_domains(&["openai.com", "claude.ai", "poe.com"]);
    h.evaluator.fail_next_adds(1);
    let err = h.agent.refresh_policies().await.unwrap_err();

    assert!(matches!(err, AgentError::ApplyFailed(_)));
    let entries = h.agent.policy_index().entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].domain, "openai.com");
}

#[tokio::test]
async fn test_start_survives_failed_reconciliation() {
    let dir = tempdir().unwrap();
    let h = harness(test_config(&dir.path().join("none.json")), &[]);
    h.source.should_fail.store(true, Ordering::SeqCst);

    let client_id = h.agent.start().await.unwrap();
    assert_eq!(h.agent.client_id().await.unwrap(), client_id);
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_warn_match_records_event_and_last_url() {
    let dir = tempdir().unwrap();
    let overrides = write_overrides(
        dir.path(),
        r#"[{"id": 8, "domain": "claude.ai", "policy": "warn"}]"#,
    );
    let h = harness(test_config(&overrides), &[]);
    refreshed(&h).await;

    // Action resolved through the policy index
    let reply = h
        .agent
        .handle_message(HostMessage::RuleMatched(notification(
            8,
            "https://claude.ai/new",
            None,
        )))
        .await;
    assert!(reply.is_none());

    let events = h.agent.event_buffer().drain_all().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].rule_id, Some(8));
    assert_eq!(events[0].referrer.as_deref(), Some("https://intranet.corp/"));
    assert_eq!(events[0].client_id, h.agent.client_id().await.unwrap());

    let reply = h.agent.handle_message(HostMessage::GetLastBlockedUrl).await;
    assert_eq!(
        reply,
        Some(HostReply::LastBlockedUrl {
            last_blocked_url: Some("https://claude.ai/new".to_string()),
            display: "https://claude.ai/new".to_string(),
        })
    );
}

#[tokio::test]
async fn test_block_match_does_not_touch_last_url() {
    let dir = tempdir().unwrap();
    let h = harness(test_config(&dir.path().join("none.json")), &[]);

    h.agent
        .handle_message(HostMessage::RuleMatched(notification(
            2,
            "https://poe.com/",
            Some(Policy::Block),
        )))
        .await;

    let reply = h.agent.handle_message(HostMessage::GetLastBlockedUrl).await;
    assert_eq!(
        reply,
        Some(HostReply::LastBlockedUrl {
            last_blocked_url: None,
            display: "Unknown URL".to_string(),
        })
    );
    assert_eq!(h.agent.event_buffer().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_threshold_reached_through_matches_ships_once() {
    let dir = tempdir().unwrap();
    let h = harness(test_config(&dir.path().join("none.json")), &[]);

    // Threshold is 5 in the test config
    for i in 0..5 {
        h.agent
            .handle_message(HostMessage::RuleMatched(notification(
                1,
                &format!("https://openai.com/{}", i),
                Some(Policy::Allow),
            )))
            .await;
    }

    assert_eq!(h.sink.call_count(), 1);
    assert_eq!(h.sink.shipped_events(), 5);
    assert!(h.agent.event_buffer().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_queries() {
    let dir = tempdir().unwrap();
    let h = harness(test_config(&dir.path().join("none.json")), &["openai.com"]);

    assert_eq!(
        h.agent.handle_message(HostMessage::GetPolicies).await,
        Some(HostReply::Policies { policies: vec![] })
    );

    assert_eq!(
        h.agent.handle_message(HostMessage::RefreshPolicies).await,
        Some(HostReply::Applied { applied: 1 })
    );

    let (domain, found) = h.agent.lookup("https://openai.com/chat").await.unwrap();
    assert_eq!(domain, "openai.com");
    assert!(matches!(found, PolicyLookup::Found(ref e) if e.policy == Policy::Allow));

    assert_eq!(
        h.agent
            .handle_message(HostMessage::Lookup {
                domain: "unknown.com".to_string()
            })
            .await,
        Some(HostReply::Lookup {
            domain: "unknown.com".to_string(),
            entry: None,
        })
    );

    assert_eq!(
        h.agent.handle_message(HostMessage::FlushLogs).await,
        Some(HostReply::Flushed { shipped: 0 })
    );
}

#[tokio::test]
async fn test_refresh_error_reply_is_user_message() {
    let dir = tempdir().unwrap();
    let h = harness(test_config(&dir.path().join("none.json")), &[]);
    h.source.should_fail.store(true, Ordering::SeqCst);

    assert_eq!(
        h.agent.handle_message(HostMessage::RefreshPolicies).await,
        Some(HostReply::Error {
            error: "Domain list unavailable".to_string()
        })
    );
}

#[tokio::test]
async fn test_run_loop_serves_host_until_suspend() {
    let dir = tempdir().unwrap();
    let h = harness(test_config(&dir.path().join("none.json")), &["openai.com"]);
    h.agent.refresh_policies().await.unwrap();

    let (agent_in, mut host_out) = tokio::io::duplex(64 * 1024);
    let (host_in, agent_out) = tokio::io::duplex(64 * 1024);

    let script = concat!(
        "{\"type\":\"GET_POLICIES\"}\n",
        "not json\n",
        "{\"type\":\"RULE_MATCHED\",\"matchedRuleId\":1,\"url\":\"https://openai.com/\"}\n",
        "\n",
        "{\"type\":\"GET_EVENTS\"}\n",
        "{\"type\":\"SUSPEND\"}\n",
    );
    host_out.write_all(script.as_bytes()).await.unwrap();

    h.agent
        .run(agent_in, agent_out, std::future::pending::<()>())
        .await
        .unwrap();

    let mut lines = BufReader::new(host_in).lines();
    let mut replies: Vec<Value> = Vec::new();
    while let Some(line) = lines.next_line().await.unwrap() {
        replies.push(serde_json::from_str(&line).unwrap());
    }

    assert_eq!(replies.len(), 4);
    assert_eq!(replies[0]["policies"][0]["domain"], json!("openai.com"));
    assert!(replies[1]["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid message"));
    assert_eq!(replies[2]["events"].as_array().unwrap().len(), 1);
    assert_eq!(replies[3], json!({"ok": true}));

    // Shutdown flush shipped the buffered match
    assert_eq!(h.sink.shipped_events(), 1);
}

#[tokio::test]
async fn test_run_loop_stops_on_eof() {
    let dir = tempdir().unwrap();
    let h = harness(test_config(&dir.path().join("none.json")), &[]);

    let (agent_in, host_out) = tokio::io::duplex(1024);
    let (_host_in, agent_out) = tokio::io::duplex(1024);
    drop(host_out);

    h.agent
        .run(agent_in, agent_out, std::future::pending::<()>())
        .await
        .unwrap();
    assert_eq!(h.sink.call_count(), 0);
}

#[tokio::test]
async fn test_run_loop_stops_on_shutdown_signal() {
    let dir = tempdir().unwrap();
    let h = harness(test_config(&dir.path().join("none.json")), &[]);

    h.agent.event_buffer().append(event(4)).await.unwrap();

    let (agent_in, _host_out) = tokio::io::duplex(1024);
    let (_host_in, agent_out) = tokio::io::duplex(1024);

    h.agent
        .run(agent_in, agent_out, async {})
        .await
        .unwrap();

    // Shutdown flush shipped the seeded event
    assert_eq!(h.sink.call_count(), 1);
    assert_eq!(h.sink.shipped_events(), 1);
    assert!(h.agent.event_buffer().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_run_loop_timer_flushes_buffer() {
    let dir = tempdir().unwrap();
    let mut config = test_config(&dir.path().join("none.json"));
    config.flush_interval_secs = 1;
    let h = harness(config, &[]);
    h.agent.event_buffer().append(event(6)).await.unwrap();

    let (agent_in, _host_out) = tokio::io::duplex(1024);
    let (_host_in, agent_out) = tokio::io::duplex(1024);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let sink = h.sink.clone();
    let watcher = async move {
        let shipped = tokio::time::timeout(Duration::from_secs(5), async {
            while sink.call_count() == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .is_ok();
        let _ = stop_tx.send(());
        shipped
    };
    let shutdown = async move {
        let _ = stop_rx.await;
    };

    let (result, shipped_by_timer) =
        tokio::join!(h.agent.run(agent_in, agent_out, shutdown), watcher);
    result.unwrap();

    assert!(shipped_by_timer);
    // Timer flush emptied the buffer, so the shutdown flush made no call
    assert_eq!(h.sink.call_count(), 1);
    assert_eq!(h.sink.shipped_events(), 1);
}
