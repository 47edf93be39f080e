use reqwest::StatusCode;
use serde_json::Value;

use super::support::{FakeOptions, refresh, spawn_dashboard, spawn_fake_proxy};

#[tokio::test]
async fn healthz_reports_ok() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    let response = reqwest::get(dashboard.url("/healthz"))
        .await
        .expect("healthz endpoint should respond");
    assert!(response.status().is_success());
    let payload: Value = response.json().await.expect("healthz should return json");
    assert_eq!(payload["ok"], true);
    assert_eq!(payload["proxyUrl"], proxy.url());

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn dashboard_page_embeds_every_region() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    let page = refresh(&dashboard).await;
    assert!(page.contains("<title>Clawboard</title>"));
    for region in ["gateway", "sessions", "cron", "usage-events", "countdown", "settings"] {
        assert!(
            page.contains(&format!("data-region=\"{region}\"")),
            "missing region {region}"
        );
    }
    assert!(page.contains("Daily digest"));

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn unknown_region_is_not_found() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    let response = reqwest::get(dashboard.url("/regions/nope"))
        .await
        .expect("region request should complete");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn memory_search_skips_empty_queries() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    let page = reqwest::get(dashboard.url("/memory?query=deploy"))
        .await
        .expect("memory page should respond")
        .text()
        .await
        .expect("memory page should read");
    assert!(page.contains("deploy notes"));

    let searches_before = proxy
        .calls()
        .iter()
        .filter(|call| call.path == "/proxy/memory/search")
        .count();
    let _ = reqwest::get(dashboard.url("/memory?query=%20"))
        .await
        .expect("memory page should respond");
    let searches_after = proxy
        .calls()
        .iter()
        .filter(|call| call.path == "/proxy/memory/search")
        .count();
    assert_eq!(searches_before, 1);
    assert_eq!(searches_after, 1);

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn raw_note_renders_markdown() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    let page = reqwest::get(dashboard.url("/notes/raw?path=notes%2Fweekly.md"))
        .await
        .expect("note page should respond")
        .text()
        .await
        .expect("note page should read");
    assert!(page.contains("<h1>Weekly</h1>"));
    assert!(page.contains("<strong>dashboard</strong>"));

    let missing = reqwest::get(dashboard.url("/notes/raw"))
        .await
        .expect("note page should respond");
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    dashboard.stop().await;
    proxy.stop().await;
}

#[tokio::test]
async fn logs_page_shows_tail() {
    let proxy = spawn_fake_proxy(FakeOptions::default()).await;
    let dashboard = spawn_dashboard(&proxy.url()).await;

    let page = reqwest::get(dashboard.url("/logs?lines=50"))
        .await
        .expect("logs page should respond")
        .text()
        .await
        .expect("logs page should read");
    assert!(page.contains("Logs (last 50)"));
    assert!(page.contains("first line\nsecond line"));

    dashboard.stop().await;
    proxy.stop().await;
}
