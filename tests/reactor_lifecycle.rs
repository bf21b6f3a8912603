//! End-to-end tests: store edits flowing through the reactor into the host.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use query_enforcer::intercept::ResourceType;
use query_enforcer::lifecycle::{ApplyOutcome, Shutdown};
use query_enforcer::rules::{RuleEditor, RuleId};
use query_enforcer::store::{
    ConfigStore, FileStore, MemoryStore, StorageArea, StoreChange, RULES_KEY,
};

mod common;

use common::{reactor_for, request, seeded_store, stored_rule, values, wait_for, FlakyStore};

#[tokio::test]
async fn test_initial_sync_installs_interceptor() {
    let store = seeded_store("example.com", vec![stored_rule("r1", "q", "1", true)]);
    let (host, mut reactor) = reactor_for(store.clone());

    assert_eq!(reactor.sync().await.unwrap(), ApplyOutcome::Registered);
    assert!(reactor.manager().is_registered());
    assert_eq!(
        reactor.manager().active().pattern.as_ref().map(|p| p.as_str()),
        Some("*://*.example.com")
    );

    let response = host.dispatch(&request("https://www.example.com/search?q=0"));
    assert_eq!(
        response.redirect_url.as_deref(),
        Some("https://www.example.com/search?q=1")
    );

    // Outside the target pattern.
    assert!(!host.dispatch(&request("https://other.org/?q=0")).is_redirect());

    // Already carrying the forced value.
    assert!(!host.dispatch(&request("https://example.com/?q=1")).is_redirect());
}

#[tokio::test]
async fn test_resync_without_changes_keeps_single_listener() {
    let store = seeded_store("example.com", vec![stored_rule("r1", "q", "1", true)]);
    let (host, mut reactor) = reactor_for(store.clone());

    reactor.sync().await.unwrap();
    assert_eq!(reactor.sync().await.unwrap(), ApplyOutcome::Unchanged);
    assert_eq!(reactor.sync().await.unwrap(), ApplyOutcome::Unchanged);

    assert_eq!(host.live_listeners(), 1);
    assert_eq!(host.registrations(), 1);
}

#[tokio::test]
async fn test_disabled_rule_edit_does_not_reregister() {
    let store = seeded_store(
        "example.com",
        vec![
            stored_rule("on", "lang", "en", true),
            stored_rule("off", "debug", "1", false),
        ],
    );
    let (host, mut reactor) = reactor_for(store.clone());
    reactor.sync().await.unwrap();

    let mut changes = store.subscribe();
    let editor = RuleEditor::new(store.as_ref());
    editor.update_value(&RuleId::from("off"), "2").await.unwrap();

    let change = changes.recv().await.unwrap();
    assert_eq!(reactor.handle_change(&change).await, Some(ApplyOutcome::Unchanged));
    assert_eq!(host.registrations(), 1);
}

#[tokio::test]
async fn test_disabling_a_rule_removes_its_effect() {
    let store = seeded_store("example.com", vec![stored_rule("r1", "lang", "en", true)]);
    let (host, mut reactor) = reactor_for(store.clone());
    reactor.sync().await.unwrap();
    assert!(host.dispatch(&request("https://example.com/")).is_redirect());

    let mut changes = store.subscribe();
    let editor = RuleEditor::new(store.as_ref());
    assert!(!editor.toggle(&RuleId::from("r1")).await.unwrap());

    let change = changes.recv().await.unwrap();
    assert_eq!(reactor.handle_change(&change).await, Some(ApplyOutcome::Reregistered));
    assert!(!host.dispatch(&request("https://example.com/")).is_redirect());
    assert_eq!(host.live_listeners(), 1);
    assert_eq!(host.registrations(), 2);

    // And back on again.
    assert!(editor.toggle(&RuleId::from("r1")).await.unwrap());
    let change = changes.recv().await.unwrap();
    reactor.handle_change(&change).await;
    assert_eq!(
        host.dispatch(&request("https://example.com/")).redirect_url.as_deref(),
        Some("https://example.com/?lang=en")
    );
}

#[tokio::test]
async fn test_store_failure_keeps_previous_interceptor() {
    let inner = MemoryStore::with_values(
        StorageArea::Local,
        values(json!({
            "targetUrl": "example.com",
            "rules": [stored_rule("r1", "q", "old", true)],
        })),
    );
    let store = Arc::new(FlakyStore::new(inner));
    let (host, mut reactor) = reactor_for(store.clone());
    reactor.sync().await.unwrap();

    RuleEditor::new(store.as_ref())
        .update_value(&RuleId::from("r1"), "new")
        .await
        .unwrap();
    store.fail_reads(true);

    assert_eq!(reactor.sync_logged().await, None);
    assert!(reactor.manager().is_registered());
    assert_eq!(
        host.dispatch(&request("https://example.com/")).redirect_url.as_deref(),
        Some("https://example.com/?q=old")
    );

    // Recovery picks up the edit made while reads were failing.
    store.fail_reads(false);
    assert_eq!(reactor.sync_logged().await, Some(ApplyOutcome::Reregistered));
    assert_eq!(
        host.dispatch(&request("https://example.com/")).redirect_url.as_deref(),
        Some("https://example.com/?q=new")
    );
}

#[tokio::test]
async fn test_irrelevant_changes_are_ignored() {
    let store = seeded_store("example.com", vec![stored_rule("r1", "q", "1", true)]);
    let (host, mut reactor) = reactor_for(store.clone());
    reactor.sync().await.unwrap();

    let other_key = StoreChange {
        changed_keys: vec!["theme".into()],
        area: StorageArea::Local,
    };
    let other_area = StoreChange {
        changed_keys: vec![RULES_KEY.into()],
        area: StorageArea::Sync,
    };
    assert!(!reactor.is_relevant(&other_key));
    assert_eq!(reactor.handle_change(&other_key).await, None);
    assert_eq!(reactor.handle_change(&other_area).await, None);
    assert_eq!(host.registrations(), 1);
}

#[tokio::test]
async fn test_clearing_target_deregisters() {
    let store = seeded_store("example.com", vec![stored_rule("r1", "q", "1", true)]);
    let (host, mut reactor) = reactor_for(store.clone());
    reactor.sync().await.unwrap();

    let editor = RuleEditor::new(store.as_ref());
    editor.clear_target().await.unwrap();
    assert_eq!(reactor.sync().await.unwrap(), ApplyOutcome::Deregistered);
    assert_eq!(host.live_listeners(), 0);
    assert!(!host.dispatch(&request("https://example.com/")).is_redirect());

    // Whitespace-only target still means "off".
    editor.set_target("   ").await.unwrap();
    assert_eq!(reactor.sync().await.unwrap(), ApplyOutcome::Unchanged);
    assert_eq!(host.live_listeners(), 0);

    editor.set_target("*://example.com/*").await.unwrap();
    assert_eq!(reactor.sync().await.unwrap(), ApplyOutcome::Registered);
    assert_eq!(host.live_listeners(), 1);
}

#[tokio::test]
async fn test_resource_types_filter_requests() {
    let store = seeded_store("example.com", vec![stored_rule("r1", "q", "1", true)]);
    let (host, mut reactor) = reactor_for(store.clone());
    reactor.sync().await.unwrap();

    let mut image = request("https://example.com/logo.png");
    image.resource_type = ResourceType::Image;
    assert!(!host.dispatch(&image).is_redirect());

    let mut fetch = request("https://example.com/api");
    fetch.resource_type = ResourceType::Fetch;
    assert!(host.dispatch(&fetch).is_redirect());
}

#[tokio::test]
async fn test_running_reactor_follows_edits_until_shutdown() {
    let store = seeded_store("example.com", vec![]);
    let (host, reactor) = reactor_for(store.clone());
    let shutdown = Shutdown::new();
    let task = tokio::spawn(reactor.run(shutdown.subscribe()));

    assert!(wait_for(|| host.live_listeners() == 1, Duration::from_secs(2)).await);
    assert!(!host.dispatch(&request("https://example.com/")).is_redirect());

    RuleEditor::new(store.as_ref()).add("lang", "en").await.unwrap();
    assert!(
        wait_for(
            || host.dispatch(&request("https://example.com/")).is_redirect(),
            Duration::from_secs(2)
        )
        .await
    );

    shutdown.trigger();
    let manager = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("reactor did not stop")
        .unwrap();
    assert!(!manager.is_registered());
    assert_eq!(host.live_listeners(), 0);
}

#[tokio::test]
async fn test_file_store_round_trip_through_reactor() {
    let path = std::env::temp_dir().join(format!("query-enforcer-{}.json", uuid::Uuid::new_v4()));
    let store = Arc::new(FileStore::open(&path, StorageArea::Local).unwrap());

    let editor = RuleEditor::new(store.as_ref());
    editor.set_target("  https://example.com/*  ").await.unwrap();
    let id = editor.add(" utm_source ", " cli ").await.unwrap();

    let (host, mut reactor) = reactor_for(store.clone());
    assert_eq!(reactor.sync().await.unwrap(), ApplyOutcome::Registered);
    assert_eq!(
        host.dispatch(&request("https://example.com/page")).redirect_url.as_deref(),
        Some("https://example.com/page?utm_source=cli")
    );
    // Explicit https scheme is kept as written.
    assert!(!host.dispatch(&request("http://example.com/page")).is_redirect());

    // A second handle on the same file sees the persisted shape.
    let reopened = FileStore::open(&path, StorageArea::Local).unwrap();
    let persisted = reopened.get(&[RULES_KEY]).await.unwrap();
    assert_eq!(
        persisted.get(RULES_KEY),
        Some(&json!([{
            "id": id.as_str(),
            "paramName": "utm_source",
            "paramValue": "cli",
            "enabled": true,
        }]))
    );

    std::fs::remove_file(&path).unwrap_or_default();
}

#[tokio::test]
async fn test_loosely_written_rules_are_enforced_and_preserved() {
    let store = seeded_store(
        "example.com",
        vec![
            stored_rule("a", "lang", "en", true),
            json!({ "paramName": "page", "paramValue": 5, "enabled": true }),
            json!("not a rule"),
        ],
    );
    let (host, mut reactor) = reactor_for(store.clone());
    reactor.sync().await.unwrap();
    assert_eq!(
        host.dispatch(&request("https://example.com/")).redirect_url.as_deref(),
        Some("https://example.com/?lang=en&page=5")
    );

    RuleEditor::new(store.as_ref())
        .set_enabled(&RuleId::from("a"), false)
        .await
        .unwrap();
    let stored = store.get(&[RULES_KEY]).await.unwrap();
    let rules = stored[RULES_KEY].as_array().unwrap();
    assert_eq!(rules.len(), 3);
    assert_eq!(rules[1], json!({ "paramName": "page", "paramValue": 5, "enabled": true }));
    assert_eq!(rules[2], json!("not a rule"));

    assert_eq!(reactor.sync().await.unwrap(), ApplyOutcome::Reregistered);
    assert_eq!(
        host.dispatch(&request("https://example.com/")).redirect_url.as_deref(),
        Some("https://example.com/?page=5")
    );
}
