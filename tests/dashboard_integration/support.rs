use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use clawboard::application::{config::RuntimeConfig, startup};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) body: Value,
}

pub(crate) struct FakeOptions {
    pub(crate) fail_cron: bool,
    pub(crate) settings: Value,
}

impl Default for FakeOptions {
    fn default() -> Self {
        Self {
            fail_cron: false,
            settings: json!({ "scheduleHour": 23 }),
        }
    }
}

struct FakeState {
    fail_cron: bool,
    settings: Mutex<Value>,
    workflow_active: Mutex<bool>,
    html_bodies: AtomicBool,
    calls: Mutex<Vec<RecordedCall>>,
}

pub(crate) struct FakeProxy {
    pub(crate) addr: SocketAddr,
    state: Arc<FakeState>,
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl FakeProxy {
    pub(crate) fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.state
            .calls
            .lock()
            .expect("calls lock should not be poisoned")
            .clone()
    }

    pub(crate) fn gets(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == Method::GET)
            .collect()
    }

    pub(crate) fn gets_to(&self, path: &str) -> Vec<RecordedCall> {
        self.gets()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }

    /// Answers every later GET with a 200 HTML page instead of JSON.
    pub(crate) fn serve_html(&self) {
        self.state.html_bodies.store(true, Ordering::SeqCst);
    }

    pub(crate) fn posts_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == Method::POST && call.path == path)
            .collect()
    }

    pub(crate) fn stored_settings(&self) -> Value {
        self.state
            .settings
            .lock()
            .expect("settings lock should not be poisoned")
            .clone()
    }

    pub(crate) async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = self.join.await;
    }
}

pub(crate) async fn spawn_fake_proxy(options: FakeOptions) -> FakeProxy {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("fake proxy should bind");
    let addr = listener
        .local_addr()
        .expect("fake proxy should expose local addr");

    let state = Arc::new(FakeState {
        fail_cron: options.fail_cron,
        settings: Mutex::new(options.settings),
        workflow_active: Mutex::new(true),
        html_bodies: AtomicBool::new(false),
        calls: Mutex::new(Vec::new()),
    });
    let router = Router::new().fallback(fake_handler).with_state(state.clone());

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let join = tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    FakeProxy {
        addr,
        state,
        shutdown: Some(shutdown_tx),
        join,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default()
}

async fn fake_handler(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path().to_owned();
    let body_json = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    state
        .calls
        .lock()
        .expect("calls lock should not be poisoned")
        .push(RecordedCall {
            method: method.clone(),
            path: path.clone(),
            query: uri.query().map(str::to_owned),
            body: body_json.clone(),
        });

    if method == Method::GET && state.html_bodies.load(Ordering::SeqCst) {
        return (StatusCode::OK, "<html>502 Bad Gateway</html>").into_response();
    }

    let now = now_ms();
    let payload = match (method.as_str(), path.as_str()) {
        ("GET", "/proxy/openclaw/health") => json!({ "ok": true }),
        ("GET", "/proxy/openclaw/sessions") => json!({
            "sessions": [{
                "key": "agent:writer:main",
                "updatedAt": now - 60_000,
                "totalTokens": 1_200,
                "lastMessages": [{ "role": "user", "content": "draft the weekly post" }]
            }]
        }),
        ("GET", "/proxy/openclaw/cron") if state.fail_cron => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "cron store locked" })),
            )
                .into_response();
        }
        ("GET", "/proxy/openclaw/cron") => json!({
            "jobs": [{
                "id": "daily-digest",
                "name": "Daily digest",
                "enabled": true,
                "schedule": { "kind": "cron", "expr": "0 23 * * *" },
                "state": { "nextRunAtMs": now + 3_600_000 }
            }]
        }),
        ("GET", "/proxy/n8n/workflows") => {
            let active = *state
                .workflow_active
                .lock()
                .expect("workflow lock should not be poisoned");
            json!({ "data": [{ "id": "wf-1", "name": "Digest", "active": active }] })
        }
        ("POST", "/proxy/n8n/workflows/wf-1/activate") => {
            *state
                .workflow_active
                .lock()
                .expect("workflow lock should not be poisoned") = true;
            json!({ "ok": true })
        }
        ("POST", "/proxy/n8n/workflows/wf-1/deactivate") => {
            *state
                .workflow_active
                .lock()
                .expect("workflow lock should not be poisoned") = false;
            json!({ "ok": true })
        }
        ("GET", "/proxy/usage") => json!({
            "summary": {
                "Gateway": { "models": { "local": { "requests": 5 } } },
                "OpenAI": { "models": { "gpt-4o": { "requests": 10 } } },
                "total_requests": 15
            },
            "events": [
                { "timestamp": now / 1_000, "provider": "OpenAI", "model": "gpt-4o", "duration_s": 1.5 },
                { "raw": "unparsed line" }
            ]
        }),
        ("GET", "/proxy/ollama") => json!({
            "local": { "online": true, "models": [{ "name": "qwen3:8b", "size": 5_200_000_000_u64 }] },
            "cloud": { "session_usage": 42.0 }
        }),
        ("GET", "/proxy/blog/posts") => json!({
            "posts": [{ "title": "Shipping week", "link": "https://example.com/p", "pubDate": "2026-10-01" }]
        }),
        ("GET", "/proxy/openclaw/notes") => json!({
            "notes": [{ "id": "n1", "title": "Weekly", "excerpt": "body", "path": "notes/weekly.md" }]
        }),
        ("GET", "/proxy/openclaw/notes/raw") => json!({
            "path": "notes/weekly.md",
            "content": "# Weekly\n\nShipped the **dashboard**."
        }),
        ("GET", "/proxy/openclaw/history") => json!({ "history": [{ "note": "posted digest" }] }),
        ("GET", "/proxy/pollers/status") => json!({
            "pollers": [{ "provider": "openai", "enabled": true, "last_run": 0 }]
        }),
        ("GET", "/proxy/pollers/history") => json!({
            "history": {
                "openai": [
                    { "timestamp": now / 1_000, "value": 2.5, "meta": {} },
                    { "timestamp": now / 1_000 - 86_400, "value": 1.25, "meta": {} }
                ]
            }
        }),
        ("GET", "/proxy/memory/search") => json!({
            "results": [{ "line": "deploy notes", "context": "ran the deploy", "index": 0 }]
        }),
        ("GET", "/proxy/logs") => json!({ "lines": ["first line", "second line"] }),
        ("GET", "/proxy/dashboard/settings") => {
            let settings = state
                .settings
                .lock()
                .expect("settings lock should not be poisoned")
                .clone();
            json!({ "settings": settings })
        }
        ("POST", "/proxy/dashboard/settings") => {
            *state
                .settings
                .lock()
                .expect("settings lock should not be poisoned") =
                body_json.get("settings").cloned().unwrap_or(Value::Null);
            json!({ "ok": true })
        }
        ("POST", "/proxy/openclaw/sessions/spawn") => {
            json!({ "ok": true, "sessionKey": "agent:writer:spawn-1" })
        }
        ("POST", "/proxy/openclaw/cron/run") => {
            if body_json["jobId"] == "slow-job" {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            json!({ "ok": true })
        }
        ("POST", "/proxy/openclaw/sessions/terminate") => json!({ "ok": true }),
        _ => {
            return (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response();
        }
    };

    Json(payload).into_response()
}

pub(crate) struct DashboardHandle {
    pub(crate) addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl DashboardHandle {
    pub(crate) fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub(crate) async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = self.join.await;
    }
}

pub(crate) async fn spawn_dashboard(proxy_url: &str) -> DashboardHandle {
    spawn_dashboard_with(proxy_url, |_| {}).await
}

pub(crate) async fn spawn_dashboard_with(
    proxy_url: &str,
    configure: impl FnOnce(&mut RuntimeConfig),
) -> DashboardHandle {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("listener should bind");
    let addr = listener
        .local_addr()
        .expect("listener should expose local addr");

    let mut config =
        RuntimeConfig::for_test(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port(), proxy_url);
    configure(&mut config);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        let _ = startup::run_with_listener(listener, config, async {
            let _ = shutdown_rx.await;
        })
        .await;
    });

    DashboardHandle {
        addr,
        shutdown: Some(shutdown_tx),
        join,
    }
}

/// Posts a form and returns the page the redirect lands on.
pub(crate) async fn post_form(dashboard: &DashboardHandle, path: &str, form: &[(&str, &str)]) -> String {
    let response = reqwest::Client::new()
        .post(dashboard.url(path))
        .form(form)
        .send()
        .await
        .expect("form post should complete");
    assert!(
        response.status().is_success(),
        "{path} answered {}",
        response.status()
    );
    response.text().await.expect("page body should read")
}

pub(crate) async fn refresh(dashboard: &DashboardHandle) -> String {
    post_form(dashboard, "/view/refresh", &[]).await
}

pub(crate) async fn region(dashboard: &DashboardHandle, panel: &str) -> String {
    let response = reqwest::get(dashboard.url(&format!("/regions/{panel}")))
        .await
        .expect("region request should complete");
    assert!(response.status().is_success(), "region {panel} missing");
    response.text().await.expect("region body should read")
}
