use std::net::{IpAddr, Ipv4Addr};

use clawboard::application::{
    actions::{ActionKind, ActionOutcome, ActionPhase, ActionRequest},
    app::AppState,
    config::RuntimeConfig,
};
use serde_json::json;

use super::support::{
    FakeOptions, post_form, refresh, region, spawn_dashboard, spawn_fake_proxy,
};

const SETTINGS_PATH: &str = "/proxy/dashboard/settings";

#[tokio::test]
async fn settings_save_round_trips_unknown_keys_and_nested_config() {
    let proxy = spawn_fake_proxy(FakeOptions {
        settings: json!({
            "scheduleHour": 7,
            "custom_flag": true,
            "provider_config": { "openai": { "key": "old", "models": ["a"] } }
        }),
        ..FakeOptions::default()
    })
    .await;
    let dashboard = spawn_dashboard(&proxy.url()).await;
    refresh(&dashboard).await;
    assert!(region(&dashboard, "countdown").await.contains("until 07:00"));

    post_form(
        &dashboard,
        "/actions/settings",
        &[
            ("schedule_hour", "6"),
            ("notes_path", "/srv/notes"),
            ("rss_feeds", "https://a.example/feed\n\nhttps://b.example/feed"),
            (
                "provider_config",
                r#"{"openai": {"key": "new", "models": ["a", "b"]}}"#,
            ),
        ],
    )
    .await;

    assert_eq!(proxy.posts_to(SETTINGS_PATH).len(), 1);
    let stored = proxy.stored_settings();
    assert_eq!(stored["custom_flag"], true);
    assert_eq!(stored["scheduleHour"], 6);
    assert_eq!(stored["notes_path"], "/srv/notes");
    assert_eq!(
        stored["rss_feeds"],
        json!(["https://a.example/feed", "https://b.example/feed"])
    );
    assert_eq!(
        stored["provider_config"],
        json!({ "openai": { "key": "new", "models": ["a", "b"] } })
    );

    assert!(region(&dashboard, "countdown").await.contains("until 06:00"));
    assert!(region(&dashboard, "notifications").await.contains("settings saved"));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn invalid_provider_config_is_rejected_without_a_call() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;
    refresh(&dashboard).await;

    post_form(
        &dashboard,
        "/actions/settings",
        &[("schedule_hour", "5"), ("provider_config", "{not json")],
    )
    .await;

    assert!(proxy.posts_to(SETTINGS_PATH).is_empty());
    let notifications = region(&dashboard, "notifications").await;
    assert!(notifications.contains("notification error"));
    assert_eq!(proxy.stored_settings(), json!({ "scheduleHour": 23 }));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn toggle_workflow_refreshes_from_the_server() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;
    refresh(&dashboard).await;
    assert!(region(&dashboard, "workflows").await.contains("Deactivate"));

    post_form(
        &dashboard,
        "/actions/workflows/toggle",
        &[("workflow_id", "wf-1"), ("active", "true")],
    )
    .await;

    assert_eq!(
        proxy
            .posts_to("/proxy/n8n/workflows/wf-1/deactivate")
            .len(),
        1
    );
    let workflows = region(&dashboard, "workflows").await;
    assert!(workflows.contains("inactive"));
    assert!(workflows.contains("Activate"));
    assert!(!workflows.contains("disabled"), "workflows region: {workflows}");
    let controls = region(&dashboard, "controls").await;
    assert!(!controls.contains("class=\"busy\""), "controls region: {controls}");

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn spawn_sends_agent_and_task() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    post_form(
        &dashboard,
        "/actions/spawn",
        &[("agent_id", "writer"), ("task", "  outline the launch post ")],
    )
    .await;

    let spawns = proxy.posts_to("/proxy/openclaw/sessions/spawn");
    assert_eq!(spawns.len(), 1);
    assert_eq!(
        spawns[0].body,
        json!({ "agentId": "writer", "task": "outline the launch post" })
    );
    let notifications = region(&dashboard, "notifications").await;
    assert!(notifications.contains("spawned writer (agent:writer:spawn-1)"));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn blank_task_never_reaches_the_proxy() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    post_form(
        &dashboard,
        "/actions/spawn",
        &[("agent_id", "writer"), ("task", "   ")],
    )
    .await;

    assert!(proxy.posts_to("/proxy/openclaw/sessions/spawn").is_empty());
    assert!(region(&dashboard, "notifications").await.contains("task is required"));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn failed_poller_run_is_reported() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    post_form(&dashboard, "/actions/pollers/run", &[("provider", "openai")]).await;

    assert_eq!(proxy.posts_to("/proxy/pollers/run").len(), 1);
    let notifications = region(&dashboard, "notifications").await;
    assert!(notifications.contains("run poller failed: HTTP 404: not found"));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn failed_action_reenables_its_forms() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;
    refresh(&dashboard).await;

    post_form(&dashboard, "/actions/pollers/run", &[("provider", "openai")]).await;

    let pollers = region(&dashboard, "pollers").await;
    assert!(pollers.contains("Run now"));
    assert!(!pollers.contains("disabled>Run now"), "pollers region: {pollers}");
    assert!(!region(&dashboard, "controls").await.contains("class=\"busy\""));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn superseded_response_neither_notifies_nor_refreshes() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let state = AppState::new(RuntimeConfig::for_test(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        0,
        &proxy.url(),
    ))
    .expect("state should build");

    let (slow, fast) = tokio::join!(
        state.dispatch(ActionRequest::TriggerCron {
            job_id: "slow-job".to_owned(),
        }),
        state.dispatch(ActionRequest::TriggerCron {
            job_id: "daily-digest".to_owned(),
        }),
    );

    assert_eq!(slow, ActionOutcome::Superseded);
    assert_eq!(
        fast,
        ActionOutcome::Succeeded("triggered cron job daily-digest".to_owned())
    );
    assert_eq!(proxy.posts_to("/proxy/openclaw/cron/run").len(), 2);
    assert_eq!(proxy.gets_to("/proxy/openclaw/cron").len(), 1);

    let store = state.store().read().await;
    let messages = store
        .notifications
        .iter()
        .map(|notification| notification.message.as_str())
        .collect::<Vec<_>>();
    assert_eq!(messages, vec!["triggered cron job daily-digest"]);
    assert_eq!(store.action_phase(ActionKind::TriggerCron), ActionPhase::Idle);
    drop(store);

    proxy.stop().await;
}
