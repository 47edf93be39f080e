use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use tokio::sync::RwLock;

use crate::{
    application::{
        actions::{ActionKind, ActionPhase},
        state::{DashboardState, Feed, NotificationLevel, now_unix_ms},
    },
    domain::{agents::AgentRegistry, settings::SettingsDraft},
    view::{
        agents::build_agent_cards,
        format::{
            format_cost, format_duration_s, format_relative, format_timestamp_ms,
            format_timestamp_s, format_tokens, truncate,
        },
        inference::{UsageGauge, build_inference_view},
        schedule::{build_cron_rows, countdown_to},
        sessions::build_session_rows,
        usage::{
            ALL_PROVIDERS, cost_bars, event_providers, provider_totals, scale_bars,
            visible_events,
        },
    },
};

const SUMMARY_CHARS: usize = 160;

/// One independently replaceable region of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Panel {
    Controls,
    Notifications,
    Countdown,
    Gateway,
    Agents,
    Sessions,
    Activity,
    CronJobs,
    Workflows,
    Usage,
    UsageEvents,
    Inference,
    Pollers,
    BlogPosts,
    Notes,
    History,
    Settings,
}

impl Panel {
    pub const ALL: [Self; 17] = [
        Self::Controls,
        Self::Notifications,
        Self::Countdown,
        Self::Gateway,
        Self::Agents,
        Self::Sessions,
        Self::Activity,
        Self::CronJobs,
        Self::Workflows,
        Self::Usage,
        Self::UsageEvents,
        Self::Inference,
        Self::Pollers,
        Self::BlogPosts,
        Self::Notes,
        Self::History,
        Self::Settings,
    ];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Controls => "controls",
            Self::Notifications => "notifications",
            Self::Countdown => "countdown",
            Self::Gateway => "gateway",
            Self::Agents => "agents",
            Self::Sessions => "sessions",
            Self::Activity => "activity",
            Self::CronJobs => "cron",
            Self::Workflows => "workflows",
            Self::Usage => "usage",
            Self::UsageEvents => "usage-events",
            Self::Inference => "inference",
            Self::Pollers => "pollers",
            Self::BlogPosts => "blog",
            Self::Notes => "notes",
            Self::History => "history",
            Self::Settings => "settings",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|panel| panel.id() == id)
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Controls => "Controls",
            Self::Notifications => "Notifications",
            Self::Countdown => "Next scheduled run",
            Self::Gateway => "Gateway",
            Self::Agents => "Agents",
            Self::Sessions => "Sessions",
            Self::Activity => "Activity",
            Self::CronJobs => "Cron jobs",
            Self::Workflows => "Workflows",
            Self::Usage => "Usage",
            Self::UsageEvents => "Usage events",
            Self::Inference => "Inference",
            Self::Pollers => "Billing pollers",
            Self::BlogPosts => "Blog posts",
            Self::Notes => "Learning notes",
            Self::History => "Schedule history",
            Self::Settings => "Settings",
        }
    }

    /// Regions rewritten every countdown tick rather than on a fetch.
    #[must_use]
    pub fn is_fast(self) -> bool {
        matches!(self, Self::Countdown | Self::Notifications)
    }
}

/// Last rendered HTML per region.
#[derive(Debug, Default)]
pub struct RegionCache {
    regions: RwLock<BTreeMap<Panel, String>>,
}

impl RegionCache {
    pub async fn replace(&self, rendered: impl IntoIterator<Item = (Panel, String)>) {
        let mut regions = self.regions.write().await;
        for (panel, html) in rendered {
            regions.insert(panel, html);
        }
    }

    pub async fn get(&self, panel: Panel) -> Option<String> {
        self.regions.read().await.get(&panel).cloned()
    }

    pub async fn snapshot(&self) -> BTreeMap<Panel, String> {
        self.regions.read().await.clone()
    }
}

pub struct RenderContext<'a> {
    pub registry: &'a AgentRegistry,
    pub internal_provider: &'a str,
    pub now_ms: u64,
    pub now_local: DateTime<Local>,
}

impl<'a> RenderContext<'a> {
    #[must_use]
    pub fn now(registry: &'a AgentRegistry, internal_provider: &'a str) -> Self {
        Self {
            registry,
            internal_provider,
            now_ms: now_unix_ms(),
            now_local: Local::now(),
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn render_panel(panel: Panel, state: &DashboardState, context: &RenderContext<'_>) -> String {
    match panel {
        Panel::Controls => render_controls(state),
        Panel::Notifications => render_notifications(state, context),
        Panel::Countdown => render_countdown(state, context),
        Panel::Gateway => render_gateway(state, context),
        Panel::Agents => render_agents(state, context),
        Panel::Sessions => render_sessions(state, context),
        Panel::Activity => render_activity(state, context),
        Panel::CronJobs => render_cron_jobs(state, context),
        Panel::Workflows => render_workflows(state),
        Panel::Usage => render_usage(state, context),
        Panel::UsageEvents => render_usage_events(state),
        Panel::Inference => render_inference(state),
        Panel::Pollers => render_pollers(state),
        Panel::BlogPosts => render_blog_posts(state),
        Panel::Notes => render_notes(state),
        Panel::History => render_history(state),
        Panel::Settings => render_settings(state),
    }
}

/// Loaded value (flagged when stale), else a failure or loading placeholder.
fn feed_body<T>(feed: &Feed<T>, body: impl FnOnce(&T) -> String) -> String {
    match (feed.value(), feed.error()) {
        (Some(value), Some(error)) => format!(
            "<p class=\"stale\">showing last loaded data ({})</p>{}",
            escape(error),
            body(value)
        ),
        (Some(value), None) => body(value),
        (None, Some(error)) => format!(
            "<p class=\"placeholder error\">failed to load: {}</p>",
            escape(error)
        ),
        (None, None) => "<p class=\"placeholder\">loading…</p>".to_owned(),
    }
}

fn empty(label: &str) -> String {
    format!("<p class=\"placeholder\">{}</p>", escape(label))
}

fn action_form(action: &str, fields: &[(&str, &str)], label: &str, busy: bool) -> String {
    let mut html = format!(
        "<form method=\"post\" action=\"{}\" class=\"inline\">",
        escape(action)
    );
    for (name, value) in fields {
        html.push_str(&format!(
            "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
            escape(name),
            escape(value)
        ));
    }
    html.push_str(&format!(
        "<button type=\"submit\"{}>{}</button></form>",
        if busy { " disabled" } else { "" },
        escape(label)
    ));
    html
}

fn is_busy(state: &DashboardState, kind: ActionKind) -> bool {
    state.action_phase(kind) != ActionPhase::Idle
}

fn online_badge(online: bool) -> &'static str {
    if online {
        "<span class=\"badge online\">online</span>"
    } else {
        "<span class=\"badge offline\">offline</span>"
    }
}

fn render_controls(state: &DashboardState) -> String {
    let view = &state.view;
    let mut html = String::from("<div class=\"controls\">");
    html.push_str(&action_form(
        "/view/auto-refresh",
        &[("enabled", if view.auto_refresh { "false" } else { "true" })],
        if view.auto_refresh {
            "Pause auto-refresh"
        } else {
            "Resume auto-refresh"
        },
        false,
    ));
    html.push_str(&action_form("/view/refresh", &[], "Refresh now", false));
    if let Some(refreshed) = state.sessions.refreshed_at_ms() {
        html.push_str(&format!(
            "<span class=\"muted\">last refresh {}</span>",
            escape(&format_timestamp_ms(refreshed))
        ));
    }
    let busy = ActionKind::ALL
        .iter()
        .filter_map(|kind| match state.action_phase(*kind) {
            ActionPhase::Idle => None,
            ActionPhase::Submitting => Some(format!("{}: submitting", kind.label())),
            ActionPhase::Refreshing => Some(format!("{}: refreshing", kind.label())),
        })
        .collect::<Vec<_>>();
    if !busy.is_empty() {
        html.push_str(&format!(
            "<span class=\"busy\">{}</span>",
            escape(&busy.join(", "))
        ));
    }
    html.push_str("</div>");
    html
}

fn render_notifications(state: &DashboardState, context: &RenderContext<'_>) -> String {
    let mut html = String::from("<ul class=\"notifications\">");
    for notification in state.active_notifications(context.now_ms) {
        let class = match notification.level {
            NotificationLevel::Success => "success",
            NotificationLevel::Error => "error",
            NotificationLevel::Info => "info",
        };
        html.push_str(&format!(
            "<li class=\"notification {class}\" data-id=\"{}\">{}</li>",
            escape(&notification.id),
            escape(&notification.message)
        ));
    }
    html.push_str("</ul>");
    html
}

fn render_countdown(state: &DashboardState, context: &RenderContext<'_>) -> String {
    let hour = state.view.schedule_hour;
    format!(
        "<div class=\"countdown\"><span class=\"clock\">{}</span><span class=\"muted\">until {hour:02}:00</span></div>",
        countdown_to(&context.now_local, hour)
    )
}

fn render_gateway(state: &DashboardState, context: &RenderContext<'_>) -> String {
    let mut html = format!("<div class=\"status\">{}", online_badge(state.gateway_online));
    match (state.gateway.error(), state.gateway.refreshed_at_ms()) {
        (Some(error), _) => html.push_str(&format!(
            "<span class=\"muted\">{}</span>",
            escape(error)
        )),
        (None, Some(checked)) => html.push_str(&format!(
            "<span class=\"muted\">checked {}</span>",
            format_relative(context.now_ms, checked)
        )),
        (None, None) => html.push_str("<span class=\"muted\">checking…</span>"),
    }
    html.push_str("</div>");
    html
}

fn render_agents(state: &DashboardState, context: &RenderContext<'_>) -> String {
    let sessions = state.sessions.value().map(Vec::as_slice).unwrap_or_default();
    let cards = build_agent_cards(context.registry, sessions, context.now_ms);
    let quick_busy = is_busy(state, ActionKind::QuickSpawn);

    let mut html = String::from("<div class=\"cards\">");
    for card in &cards {
        html.push_str(&format!(
            "<article class=\"agent-card {}\"><header><span class=\"icon\">{}</span> <strong>{}</strong> <span class=\"badge\">{}</span></header>",
            if card.active { "active" } else { "idle" },
            escape(&card.icon),
            escape(&card.name),
            if card.active { "active" } else { "idle" }
        ));
        html.push_str(&format!(
            "<p class=\"muted\">{} · {}</p>",
            escape(&card.model),
            escape(&card.workspace)
        ));
        html.push_str(&format!(
            "<p>{} sessions · {} tokens · {}</p>",
            card.session_count,
            format_tokens(card.total_tokens),
            card.last_activity_ms
                .map(|last| format_relative(context.now_ms, last))
                .unwrap_or_else(|| "no activity".to_owned())
        ));
        if card.has_quick_task {
            html.push_str(&action_form(
                "/actions/quick-spawn",
                &[("agent_id", card.id.as_str())],
                "Quick task",
                quick_busy,
            ));
        }
        html.push_str("</article>");
    }
    html.push_str("</div>");

    html.push_str("<form method=\"post\" action=\"/actions/spawn\" class=\"spawn\"><select name=\"agent_id\">");
    for agent in context.registry.agents() {
        html.push_str(&format!(
            "<option value=\"{}\">{}</option>",
            escape(&agent.id),
            escape(&agent.name)
        ));
    }
    html.push_str(&format!(
        "</select><input type=\"text\" name=\"task\" placeholder=\"Task\"><button type=\"submit\"{}>Spawn</button></form>",
        if is_busy(state, ActionKind::SpawnAgent) { " disabled" } else { "" }
    ));
    html
}

fn render_sessions(state: &DashboardState, context: &RenderContext<'_>) -> String {
    let busy = is_busy(state, ActionKind::TerminateSession);
    feed_body(&state.sessions, |sessions| {
        let rows = build_session_rows(sessions, context.now_ms);
        if rows.is_empty() {
            return empty("no sessions");
        }
        let mut html = String::from(
            "<table><thead><tr><th>Session</th><th>Agent</th><th>Updated</th><th>Tokens</th><th>Last message</th><th></th></tr></thead><tbody>",
        );
        for row in &rows {
            html.push_str(&format!(
                "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                if row.active { "active" } else { "" },
                escape(&row.key),
                escape(&row.agent),
                escape(&row.updated),
                escape(&row.tokens),
                escape(&row.preview),
                action_form(
                    "/actions/terminate",
                    &[("session_key", row.key.as_str())],
                    "Terminate",
                    busy
                )
            ));
        }
        html.push_str("</tbody></table>");
        html
    })
}

fn render_activity(state: &DashboardState, context: &RenderContext<'_>) -> String {
    if state.activity.is_empty() {
        return match (state.sessions.value(), state.sessions.error()) {
            (None, Some(error)) => format!(
                "<p class=\"placeholder error\">failed to load: {}</p>",
                escape(error)
            ),
            (None, None) => empty("loading…"),
            (Some(_), _) => empty("no recent activity"),
        };
    }
    let mut html = String::from("<ol class=\"activity\">");
    for item in &state.activity {
        html.push_str(&format!(
            "<li class=\"activity-{kind}\"><span class=\"badge\">{kind}</span> <strong>{}</strong> {} <span class=\"muted\">{}</span></li>",
            escape(&item.agent),
            escape(&truncate(&item.summary, SUMMARY_CHARS)),
            format_relative(context.now_ms, item.timestamp_ms),
            kind = item.kind.label(),
        ));
    }
    html.push_str("</ol>");
    html
}

fn render_cron_jobs(state: &DashboardState, context: &RenderContext<'_>) -> String {
    let busy = is_busy(state, ActionKind::TriggerCron);
    feed_body(&state.cron_jobs, |jobs| {
        let rows = build_cron_rows(jobs, context.now_ms);
        if rows.is_empty() {
            return empty("no cron jobs");
        }
        let mut html = String::from(
            "<table><thead><tr><th>Job</th><th>Schedule</th><th>Next run</th><th>Last status</th><th></th></tr></thead><tbody>",
        );
        for row in &rows {
            html.push_str(&format!(
                "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                if row.enabled { "" } else { "disabled" },
                escape(&row.name),
                escape(&row.schedule),
                escape(&row.next_run),
                escape(row.last_status.as_deref().unwrap_or("—")),
                action_form("/actions/cron/run", &[("job_id", row.id.as_str())], "Run now", busy)
            ));
        }
        html.push_str("</tbody></table>");
        html
    })
}

fn render_workflows(state: &DashboardState) -> String {
    let busy = is_busy(state, ActionKind::ToggleWorkflow);
    feed_body(&state.workflows, |workflows| {
        if workflows.is_empty() {
            return empty("no workflows");
        }
        let mut html = String::from("<ul class=\"workflows\">");
        for workflow in workflows {
            let name = if workflow.name.trim().is_empty() {
                workflow.id.as_str()
            } else {
                workflow.name.as_str()
            };
            html.push_str(&format!(
                "<li><span class=\"badge {}\">{}</span> {} {}</li>",
                if workflow.active { "online" } else { "offline" },
                if workflow.active { "active" } else { "inactive" },
                escape(name),
                action_form(
                    "/actions/workflows/toggle",
                    &[
                        ("workflow_id", workflow.id.as_str()),
                        ("active", if workflow.active { "true" } else { "false" }),
                    ],
                    if workflow.active { "Deactivate" } else { "Activate" },
                    busy
                )
            ));
        }
        html.push_str("</ul>");
        html
    })
}

fn render_usage(state: &DashboardState, context: &RenderContext<'_>) -> String {
    let hide_internal = state.view.hide_internal;
    let mut html = action_form(
        "/view/hide-internal",
        &[("hidden", if hide_internal { "false" } else { "true" })],
        &if hide_internal {
            format!("Show {}", context.internal_provider)
        } else {
            format!("Hide {}", context.internal_provider)
        },
        false,
    );
    html.push_str(&feed_body(&state.usage, |report| {
        let hidden = hide_internal.then_some(context.internal_provider);
        let totals = provider_totals(&report.summary, hidden);
        if totals.is_empty() {
            return empty("no usage recorded");
        }

        let mut body = String::from("<div class=\"chart\">");
        for bar in scale_bars(&totals) {
            body.push_str(&format!(
                "<div class=\"bar\" title=\"{label}: {value}\"><span style=\"height: {}px\"></span><label>{label}</label><em>{value}</em></div>",
                bar.height_px,
                label = escape(&bar.label),
                value = bar.value,
            ));
        }
        body.push_str("</div><div class=\"usage-grid\">");
        for total in &totals {
            body.push_str(&format!(
                "<article><header><strong>{}</strong> {} requests</header><ul>",
                escape(&total.provider),
                total.requests
            ));
            for model in &total.models {
                body.push_str(&format!(
                    "<li>{} · {} <span class=\"muted\">{}</span></li>",
                    escape(&model.model),
                    model.requests,
                    model
                        .last
                        .map(format_timestamp_s)
                        .unwrap_or_else(|| "—".to_owned())
                ));
            }
            body.push_str("</ul></article>");
        }
        body.push_str(&format!(
            "</div><p class=\"muted\">{} requests total</p>",
            report.summary.total_requests
        ));
        body
    }));
    html
}

fn render_usage_events(state: &DashboardState) -> String {
    let filter = &state.view.usage_filter;
    let providers = state
        .usage
        .value()
        .map(|report| event_providers(&report.events))
        .unwrap_or_default();
    let selected = filter.provider.as_deref().unwrap_or(ALL_PROVIDERS);

    let mut html = String::from(
        "<form method=\"post\" action=\"/view/usage-filter\" class=\"filter\"><select name=\"provider\">",
    );
    for provider in std::iter::once(ALL_PROVIDERS).chain(providers.iter().map(String::as_str)) {
        html.push_str(&format!(
            "<option value=\"{value}\"{}>{value}</option>",
            if provider == selected { " selected" } else { "" },
            value = escape(provider),
        ));
    }
    html.push_str(&format!(
        "</select><input type=\"search\" name=\"search\" value=\"{}\" placeholder=\"Search events\"><button type=\"submit\">Filter</button></form>",
        escape(filter.search.as_deref().unwrap_or_default())
    ));

    html.push_str(&feed_body(&state.usage, |report| {
        let events = visible_events(&report.events, filter);
        if events.is_empty() {
            return empty("no matching events");
        }
        let mut body = String::from("<ol class=\"events\">");
        for event in events {
            let when = event
                .timestamp
                .map(format_timestamp_s)
                .unwrap_or_else(|| "—".to_owned());
            if event.provider.is_empty() {
                let raw = event
                    .raw
                    .get("raw")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| event.raw.to_string());
                body.push_str(&format!(
                    "<li class=\"raw\"><code>{}</code></li>",
                    escape(&truncate(&raw, SUMMARY_CHARS))
                ));
                continue;
            }
            body.push_str(&format!(
                "<li class=\"{}\"><span class=\"muted\">{}</span> <strong>{}</strong> {} {}{}</li>",
                if event.error.is_some() { "error" } else { "" },
                escape(&when),
                escape(&event.provider),
                escape(&event.model),
                event.duration_s.map(format_duration_s).unwrap_or_default(),
                event
                    .error
                    .as_deref()
                    .map(|error| format!(" <em>{}</em>", escape(error)))
                    .unwrap_or_default()
            ));
        }
        body.push_str("</ol>");
        body
    }));
    html
}

fn gauge_html(gauge: &UsageGauge) -> String {
    format!(
        "<div class=\"gauge {}\"><label>{}</label><div class=\"track\"><span style=\"width: {:.0}%\"></span></div><span>{}</span> <span class=\"muted\">{}</span></div>",
        gauge.level.css_class(),
        escape(&gauge.label),
        gauge.width_pct,
        escape(&gauge.percent),
        escape(&gauge.reset)
    )
}

fn render_inference(state: &DashboardState) -> String {
    let online = state.inference_online;
    let busy = is_busy(state, ActionKind::SaveCloudUsage);
    let mut html = format!("<div class=\"status\">{}</div>", online_badge(online));
    html.push_str(&feed_body(&state.inference, |status| {
        let view = build_inference_view(status);
        let mut body = format!(
            "<p class=\"muted\">{} local · {} remote models</p><ul class=\"models\">",
            view.local_count, view.remote_count
        );
        for model in &view.models {
            body.push_str(&format!(
                "<li class=\"{}\"><strong>{}</strong> {} <span class=\"muted\">{}</span></li>",
                if model.remote { "remote" } else { "local" },
                escape(&model.name),
                escape(&model.size),
                escape(&model.detail)
            ));
        }
        body.push_str("</ul>");
        body.push_str(&gauge_html(&view.session));
        body.push_str(&gauge_html(&view.weekly));
        if !view.cloud_updated.is_empty() {
            body.push_str(&format!(
                "<p class=\"muted\">{}</p>",
                escape(&view.cloud_updated)
            ));
        }
        body
    }));
    html.push_str(&format!(
        "<form method=\"post\" action=\"/actions/cloud-usage\" class=\"cloud-usage\"><input name=\"session_usage\" placeholder=\"Session %\"><input name=\"session_reset\" placeholder=\"Session reset\"><input name=\"weekly_usage\" placeholder=\"Weekly %\"><input name=\"weekly_reset\" placeholder=\"Weekly reset\"><button type=\"submit\"{}>Save</button></form>",
        if busy { " disabled" } else { "" }
    ));
    html
}

fn render_pollers(state: &DashboardState) -> String {
    let mut html = render_poller_table(state);
    html.push_str("<h3>Cost history</h3>");
    html.push_str(&feed_body(&state.poller_history, |history| {
        let series = history
            .iter()
            .filter(|(_, points)| !points.is_empty())
            .collect::<Vec<_>>();
        if series.is_empty() {
            return empty("no cost history");
        }
        let mut body = String::new();
        for (provider, points) in series {
            body.push_str(&format!(
                "<div class=\"cost-history\"><strong>{}</strong><div class=\"chart sparkline\">",
                escape(provider)
            ));
            for bar in cost_bars(points) {
                body.push_str(&format!(
                    "<div class=\"bar\" title=\"{}: {}\"><span style=\"height: {}px\"></span></div>",
                    escape(&format_timestamp_s(bar.timestamp)),
                    format_cost(Some(bar.cost_usd)),
                    bar.height_px
                ));
            }
            body.push_str("</div></div>");
        }
        body
    }));
    html
}

fn render_poller_table(state: &DashboardState) -> String {
    let busy = is_busy(state, ActionKind::RunPoller);
    feed_body(&state.pollers, |pollers| {
        if pollers.is_empty() {
            return empty("no billing pollers");
        }
        let mut html = String::from(
            "<table><thead><tr><th>Provider</th><th>Last run</th><th>Cost</th><th>Tokens</th><th>Error</th><th></th></tr></thead><tbody>",
        );
        for poller in pollers {
            html.push_str(&format!(
                "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                if poller.enabled { "" } else { "disabled" },
                escape(&poller.provider),
                poller
                    .last_run
                    .filter(|last| *last > 0)
                    .map(format_timestamp_s)
                    .unwrap_or_else(|| "never".to_owned()),
                format_cost(poller.latest_cost_usd),
                poller
                    .latest_tokens
                    .filter(|tokens| tokens.is_finite() && *tokens >= 0.0)
                    .map(|tokens| format_tokens(tokens as u64))
                    .unwrap_or_else(|| "—".to_owned()),
                escape(poller.last_error.as_deref().unwrap_or_default()),
                action_form(
                    "/actions/pollers/run",
                    &[("provider", poller.provider.as_str())],
                    "Run now",
                    busy
                )
            ));
        }
        html.push_str("</tbody></table>");
        html
    })
}

fn render_blog_posts(state: &DashboardState) -> String {
    feed_body(&state.blog_posts, |posts| {
        if posts.is_empty() {
            return empty("no posts");
        }
        let mut html = String::from("<ul class=\"posts\">");
        for post in posts {
            html.push_str(&format!(
                "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a> <span class=\"muted\">{}</span><p>{}</p></li>",
                escape(&post.link),
                escape(&post.title),
                escape(&post.pub_date),
                escape(&truncate(&post.description, SUMMARY_CHARS))
            ));
        }
        html.push_str("</ul>");
        html
    })
}

fn render_notes(state: &DashboardState) -> String {
    let mut html = action_form(
        "/actions/notes/reindex",
        &[],
        "Rebuild index",
        is_busy(state, ActionKind::ReindexNotes),
    );
    html.push_str(&feed_body(&state.notes, |notes| {
        if notes.is_empty() {
            return empty("no notes");
        }
        let mut body = String::from("<ul class=\"notes\">");
        for note in notes {
            let title = if note.title.trim().is_empty() {
                note.path.as_str()
            } else {
                note.title.as_str()
            };
            body.push_str(&format!(
                "<li><a href=\"/notes/raw?path={}\">{}</a><p>{}</p></li>",
                escape(&urlencoding::encode(&note.path)),
                escape(title),
                escape(&truncate(&note.excerpt, SUMMARY_CHARS))
            ));
        }
        body.push_str("</ul>");
        body
    }));
    html.push_str(
        "<form method=\"get\" action=\"/memory\" class=\"search\"><input type=\"search\" name=\"query\" placeholder=\"Search memory\"><button type=\"submit\">Search</button></form>",
    );
    html
}

fn render_history(state: &DashboardState) -> String {
    feed_body(&state.history, |entries| {
        if entries.is_empty() {
            return empty("no history");
        }
        let mut html = String::from("<ol class=\"history\">");
        for entry in entries {
            html.push_str(&format!(
                "<li>{}</li>",
                escape(&truncate(&entry.note, SUMMARY_CHARS))
            ));
        }
        html.push_str("</ol><p><a href=\"/logs\">View logs</a></p>");
        html
    })
}

fn render_settings(state: &DashboardState) -> String {
    let draft = state
        .settings
        .value()
        .map(SettingsDraft::from_settings)
        .unwrap_or_default();
    let mut html = String::new();
    if let Some(error) = state.settings.error() {
        html.push_str(&format!(
            "<p class=\"placeholder error\">settings: {}</p>",
            escape(error)
        ));
    }
    html.push_str("<form method=\"post\" action=\"/actions/settings\" class=\"settings\">");
    for (name, label, value) in [
        ("hashnode_api_key", "Hashnode API key", &draft.hashnode_api_key),
        ("hashnode_url", "Hashnode URL", &draft.hashnode_url),
        ("publication_id", "Publication id", &draft.publication_id),
        ("schedule_hour", "Schedule hour (0-23)", &draft.schedule_hour),
        ("notes_path", "Notes path", &draft.notes_path),
    ] {
        html.push_str(&format!(
            "<label>{}<input name=\"{name}\" value=\"{}\"></label>",
            escape(label),
            escape(value)
        ));
    }
    html.push_str(&format!(
        "<label>RSS feeds<textarea name=\"rss_feeds\">{}</textarea></label><label>Provider config (JSON)<textarea name=\"provider_config\">{}</textarea></label><button type=\"submit\"{}>Save settings</button></form>",
        escape(&draft.rss_feeds),
        escape(&draft.provider_config),
        if is_busy(state, ActionKind::SaveSettings) { " disabled" } else { "" }
    ));
    html
}
