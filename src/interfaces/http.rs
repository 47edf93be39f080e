use std::future::Future;

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::{
    application::{
        actions::{ActionRequest, CloudUsageDraft},
        app::AppState,
    },
    domain::{error::DashboardError, settings::SettingsDraft},
    interfaces::{
        pages,
        render::Panel,
    },
    view::usage::EventFilter,
};

const DEFAULT_LOG_LINES: usize = 200;
const MAX_LOG_LINES: usize = 2_000;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/regions/{panel}", get(region_handler))
        .route("/healthz", get(healthz_handler))
        .route("/memory", get(memory_handler))
        .route("/logs", get(logs_handler))
        .route("/notes/raw", get(note_handler))
        .route("/actions/spawn", post(spawn_handler))
        .route("/actions/quick-spawn", post(quick_spawn_handler))
        .route("/actions/cron/run", post(run_cron_handler))
        .route("/actions/workflows/toggle", post(toggle_workflow_handler))
        .route("/actions/terminate", post(terminate_handler))
        .route("/actions/settings", post(save_settings_handler))
        .route("/actions/cloud-usage", post(cloud_usage_handler))
        .route("/actions/pollers/run", post(run_poller_handler))
        .route("/actions/notes/reindex", post(reindex_handler))
        .route("/view/auto-refresh", post(auto_refresh_handler))
        .route("/view/hide-internal", post(hide_internal_handler))
        .route("/view/usage-filter", post(usage_filter_handler))
        .route("/view/refresh", post(manual_refresh_handler))
        .with_state(state)
}

pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DashboardError> {
    let local_addr = listener.local_addr().map_err(|error| {
        DashboardError::Unavailable(format!("failed to read listener address: {error}"))
    })?;

    info!(
        "clawboard listening on http://{}:{}, proxy={}",
        local_addr.ip(),
        local_addr.port(),
        state.client().base_url(),
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|error| DashboardError::Unavailable(format!("server runtime error: {error}")))
}

async fn page_handler(State(state): State<AppState>) -> Html<String> {
    state.render_panels(&[Panel::Countdown, Panel::Notifications]).await;
    Html(pages::dashboard_page(&state.regions().snapshot().await))
}

async fn region_handler(State(state): State<AppState>, Path(panel): Path<String>) -> Response {
    let Some(panel) = Panel::from_id(&panel) else {
        return (StatusCode::NOT_FOUND, format!("unknown region: {panel}")).into_response();
    };
    if panel.is_fast() || state.regions().get(panel).await.is_none() {
        state.render_panels(&[panel]).await;
    }
    match state.regions().get(panel).await {
        Some(html) => Html(html).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn healthz_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.health_payload().await))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemoryQuery {
    query: String,
}

async fn memory_handler(
    State(state): State<AppState>,
    Query(query): Query<MemoryQuery>,
) -> Html<String> {
    let result = state.client().memory_search(&query.query).await;
    let page = match &result {
        Ok(hits) => pages::memory_page(&query.query, Ok(hits.as_slice())),
        Err(error) => pages::memory_page(&query.query, Err(&error.user_message())),
    };
    Html(page)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LogsQuery {
    lines: Option<usize>,
}

async fn logs_handler(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Html<String> {
    let lines = query
        .lines
        .unwrap_or(DEFAULT_LOG_LINES)
        .clamp(1, MAX_LOG_LINES);
    let result = state.client().logs(lines).await;
    let page = match &result {
        Ok(entries) => pages::logs_page(lines, Ok(entries.as_slice())),
        Err(error) => pages::logs_page(lines, Err(&error.user_message())),
    };
    Html(page)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NoteQuery {
    path: String,
}

async fn note_handler(State(state): State<AppState>, Query(query): Query<NoteQuery>) -> Response {
    let path = query.path.trim();
    if path.is_empty() {
        return (StatusCode::BAD_REQUEST, "path is required").into_response();
    }
    let result = state.client().note_raw(path).await;
    let page = match &result {
        Ok(document) => pages::note_page(path, Ok(document)),
        Err(error) => pages::note_page(path, Err(&error.user_message())),
    };
    Html(page).into_response()
}

#[derive(Debug, Deserialize)]
struct SpawnForm {
    #[serde(default)]
    agent_id: String,
    #[serde(default)]
    task: String,
}

#[derive(Debug, Deserialize)]
struct AgentForm {
    #[serde(default)]
    agent_id: String,
}

#[derive(Debug, Deserialize)]
struct CronForm {
    #[serde(default)]
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct ToggleForm {
    #[serde(default)]
    workflow_id: String,
    #[serde(default)]
    active: bool,
}

#[derive(Debug, Deserialize)]
struct TerminateForm {
    #[serde(default)]
    session_key: String,
}

#[derive(Debug, Deserialize)]
struct PollerForm {
    #[serde(default)]
    provider: String,
}

async fn dispatch_and_return(state: &AppState, request: ActionRequest) -> Redirect {
    let kind = request.kind();
    let outcome = state.dispatch(request).await;
    debug!("{} finished: {outcome:?}", kind.label());
    Redirect::to("/")
}

async fn spawn_handler(State(state): State<AppState>, Form(form): Form<SpawnForm>) -> Redirect {
    dispatch_and_return(
        &state,
        ActionRequest::SpawnAgent {
            agent_id: form.agent_id,
            task: form.task,
        },
    )
    .await
}

async fn quick_spawn_handler(
    State(state): State<AppState>,
    Form(form): Form<AgentForm>,
) -> Redirect {
    dispatch_and_return(
        &state,
        ActionRequest::QuickSpawn {
            agent_id: form.agent_id,
        },
    )
    .await
}

async fn run_cron_handler(State(state): State<AppState>, Form(form): Form<CronForm>) -> Redirect {
    dispatch_and_return(&state, ActionRequest::TriggerCron { job_id: form.job_id }).await
}

async fn toggle_workflow_handler(
    State(state): State<AppState>,
    Form(form): Form<ToggleForm>,
) -> Redirect {
    dispatch_and_return(
        &state,
        ActionRequest::ToggleWorkflow {
            workflow_id: form.workflow_id,
            currently_active: form.active,
        },
    )
    .await
}

async fn terminate_handler(
    State(state): State<AppState>,
    Form(form): Form<TerminateForm>,
) -> Redirect {
    dispatch_and_return(
        &state,
        ActionRequest::TerminateSession {
            session_key: form.session_key,
        },
    )
    .await
}

async fn save_settings_handler(
    State(state): State<AppState>,
    Form(draft): Form<SettingsDraft>,
) -> Redirect {
    dispatch_and_return(&state, ActionRequest::SaveSettings { draft }).await
}

async fn cloud_usage_handler(
    State(state): State<AppState>,
    Form(draft): Form<CloudUsageDraft>,
) -> Redirect {
    dispatch_and_return(&state, ActionRequest::SaveCloudUsage { draft }).await
}

async fn run_poller_handler(
    State(state): State<AppState>,
    Form(form): Form<PollerForm>,
) -> Redirect {
    dispatch_and_return(
        &state,
        ActionRequest::RunPoller {
            provider: form.provider,
        },
    )
    .await
}

async fn reindex_handler(State(state): State<AppState>) -> Redirect {
    dispatch_and_return(&state, ActionRequest::ReindexNotes).await
}

#[derive(Debug, Deserialize)]
struct AutoRefreshForm {
    #[serde(default)]
    enabled: bool,
}

async fn auto_refresh_handler(
    State(state): State<AppState>,
    Form(form): Form<AutoRefreshForm>,
) -> Redirect {
    state.store().set_auto_refresh(form.enabled).await;
    info!("auto-refresh {}", if form.enabled { "on" } else { "off" });
    state.render_panels(&[Panel::Controls]).await;
    Redirect::to("/")
}

#[derive(Debug, Deserialize)]
struct HideInternalForm {
    #[serde(default)]
    hidden: bool,
}

async fn hide_internal_handler(
    State(state): State<AppState>,
    Form(form): Form<HideInternalForm>,
) -> Redirect {
    state.store().set_hide_internal(form.hidden).await;
    state.render_panels(&[Panel::Usage]).await;
    Redirect::to("/")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UsageFilterForm {
    provider: String,
    search: String,
}

async fn usage_filter_handler(
    State(state): State<AppState>,
    Form(form): Form<UsageFilterForm>,
) -> Redirect {
    state
        .store()
        .set_usage_filter(EventFilter::new(&form.provider, &form.search))
        .await;
    state.render_panels(&[Panel::UsageEvents]).await;
    Redirect::to("/")
}

async fn manual_refresh_handler(State(state): State<AppState>) -> Redirect {
    state.load_settings().await;
    state.refresh_all().await;
    Redirect::to("/")
}
