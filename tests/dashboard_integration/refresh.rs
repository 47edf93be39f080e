use std::time::Duration;

use serde_json::Value;

use super::support::{
    DashboardHandle, FakeOptions, post_form, refresh, region, spawn_dashboard,
    spawn_dashboard_with, spawn_fake_proxy,
};

async fn health(dashboard: &DashboardHandle) -> Value {
    reqwest::get(dashboard.url("/healthz"))
        .await
        .expect("healthz should respond")
        .json()
        .await
        .expect("healthz should return json")
}

#[tokio::test]
async fn failing_source_does_not_block_the_rest() {
    let proxy = spawn_fake_proxy(FakeOptions {
        fail_cron: true,
        ..FakeOptions::default()
    })
    .await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    refresh(&dashboard).await;

    let cron = region(&dashboard, "cron").await;
    assert!(cron.contains("failed to load"), "cron region: {cron}");
    assert!(cron.contains("cron store locked"));

    let workflows = region(&dashboard, "workflows").await;
    assert!(workflows.contains("Digest"));
    let sessions = region(&dashboard, "sessions").await;
    assert!(sessions.contains("agent:writer:main"));
    let activity = region(&dashboard, "activity").await;
    assert!(activity.contains("draft the weekly post"));

    let health: Value = reqwest::get(dashboard.url("/healthz"))
        .await
        .expect("healthz should respond")
        .json()
        .await
        .expect("healthz should return json");
    assert_eq!(health["gatewayOnline"], true);
    assert_eq!(health["inferenceOnline"], true);

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn unreachable_proxy_marks_gateway_offline() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let proxy_url = proxy.url();
    proxy.stop().await;

    let dashboard = spawn_dashboard(&proxy_url).await;
    refresh(&dashboard).await;

    let gateway = region(&dashboard, "gateway").await;
    assert!(gateway.contains("offline"));
    let workflows = region(&dashboard, "workflows").await;
    assert!(workflows.contains("failed to load: proxy unreachable"));

    dashboard.stop().await;
}

#[tokio::test]
async fn agent_cards_follow_recent_sessions() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    refresh(&dashboard).await;

    let agents = region(&dashboard, "agents").await;
    assert!(agents.contains("agent-card active"));
    assert!(agents.contains("1 sessions"));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn hide_internal_drops_gateway_from_usage() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;
    refresh(&dashboard).await;

    let usage = region(&dashboard, "usage").await;
    assert!(usage.contains("<strong>Gateway</strong> 5 requests"));
    assert!(usage.contains("<strong>OpenAI</strong> 10 requests"));

    post_form(&dashboard, "/view/hide-internal", &[("hidden", "true")]).await;
    let usage = region(&dashboard, "usage").await;
    assert!(!usage.contains("<strong>Gateway</strong>"));
    assert!(usage.contains("<strong>OpenAI</strong>"));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn usage_filter_narrows_events() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;
    refresh(&dashboard).await;

    let events = region(&dashboard, "usage-events").await;
    assert!(events.contains("unparsed line"));

    post_form(
        &dashboard,
        "/view/usage-filter",
        &[("provider", "OpenAI"), ("search", "GPT-4O")],
    )
    .await;
    let events = region(&dashboard, "usage-events").await;
    assert!(events.contains("gpt-4o"));
    assert!(!events.contains("unparsed line"));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn auto_refresh_toggle_is_reported() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    post_form(&dashboard, "/view/auto-refresh", &[("enabled", "false")]).await;

    let health: Value = reqwest::get(dashboard.url("/healthz"))
        .await
        .expect("healthz should respond")
        .json()
        .await
        .expect("healthz should return json");
    assert_eq!(health["autoRefresh"], false);
    assert!(region(&dashboard, "controls").await.contains("Resume auto-refresh"));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn non_json_success_keeps_last_good_data() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;
    refresh(&dashboard).await;
    assert_eq!(health(&dashboard).await["gatewayOnline"], true);

    proxy.serve_html();
    refresh(&dashboard).await;

    assert_eq!(health(&dashboard).await["gatewayOnline"], false);
    let sessions = region(&dashboard, "sessions").await;
    assert!(sessions.contains("agent:writer:main"), "sessions region: {sessions}");
    assert!(sessions.contains("showing last loaded data (unexpected response)"));
    let cron = region(&dashboard, "cron").await;
    assert!(cron.contains("Daily digest"));
    assert!(region(&dashboard, "gateway").await.contains("offline"));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn paused_auto_refresh_ticks_without_fetching() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard_with(&proxy.url(), |config| {
        config.refresh_interval = Duration::from_millis(50);
        config.auto_refresh = false;
    })
    .await;

    // let the initial load finish
    tokio::time::sleep(Duration::from_millis(300)).await;
    let settled = proxy.gets().len();
    assert!(settled > 0, "initial load should have fetched");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(proxy.gets().len(), settled);

    post_form(&dashboard, "/view/auto-refresh", &[("enabled", "true")]).await;
    let resumed = proxy.gets().len();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(proxy.gets().len() > resumed, "ticks should fetch once resumed");

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn pollers_panel_charts_cost_history() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;
    refresh(&dashboard).await;

    let history_calls = proxy.gets_to("/proxy/pollers/history");
    assert!(!history_calls.is_empty());
    assert_eq!(history_calls[0].query.as_deref(), Some("days=30"));

    let pollers = region(&dashboard, "pollers").await;
    assert!(pollers.contains("Cost history"));
    assert!(pollers.contains("<strong>openai</strong>"));
    let older = pollers.find("$1.25").expect("older sample rendered");
    let newer = pollers.find("$2.50").expect("newer sample rendered");
    assert!(older < newer, "samples should run oldest first");

    dashboard.stop().await;
    proxy.stop().await;
}
