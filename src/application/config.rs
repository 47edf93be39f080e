use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use reqwest::Url;

use crate::domain::agents::AgentRegistry;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "clawboard",
    version,
    about = "Clawboard: polling dashboard for an OpenClaw gateway, its workflows, usage and inference"
)]
pub struct Args {
    #[arg(long, env = "CLAWBOARD_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(long, env = "CLAWBOARD_PORT", default_value_t = 5556)]
    pub port: u16,

    #[arg(long, env = "CLAWBOARD_PROXY_URL", default_value = "http://127.0.0.1:5555")]
    pub proxy_url: String,

    #[arg(long, env = "CLAWBOARD_REFRESH_INTERVAL_MS", default_value_t = 30_000)]
    pub refresh_interval_ms: u64,

    #[arg(long, env = "CLAWBOARD_COUNTDOWN_TICK_MS", default_value_t = 1_000)]
    pub countdown_tick_ms: u64,

    #[arg(long, env = "CLAWBOARD_AUTO_REFRESH", default_value_t = true)]
    pub auto_refresh: bool,

    #[arg(long, env = "CLAWBOARD_SCHEDULE_HOUR", default_value_t = 23)]
    pub schedule_hour: u8,

    #[arg(long, env = "CLAWBOARD_INTERNAL_PROVIDER", default_value = "Gateway")]
    pub internal_provider: String,

    #[arg(long, env = "CLAWBOARD_HIDE_INTERNAL", default_value_t = false)]
    pub hide_internal: bool,

    #[arg(long, env = "CLAWBOARD_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    #[arg(long, env = "CLAWBOARD_ACTION_REFRESH_DELAY_MS", default_value_t = 750)]
    pub action_refresh_delay_ms: u64,

    #[arg(long, env = "CLAWBOARD_NOTIFICATION_TTL_MS", default_value_t = 5_000)]
    pub notification_ttl_ms: u64,

    #[arg(long, env = "CLAWBOARD_POLLER_HISTORY_DAYS", default_value_t = 30)]
    pub poller_history_days: u32,

    #[arg(long, env = "CLAWBOARD_AGENTS_FILE")]
    pub agents_file: Option<PathBuf>,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,

    #[arg(long, env = "CLAWBOARD_JSON_LOGS", default_value_t = false)]
    pub json_logs: bool,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host: IpAddr,
    pub port: u16,
    pub proxy_url: String,
    pub refresh_interval: Duration,
    pub countdown_tick: Duration,
    pub auto_refresh: bool,
    pub schedule_hour: u8,
    pub internal_provider: String,
    pub hide_internal: bool,
    pub request_timeout: Option<Duration>,
    pub action_refresh_delay: Duration,
    pub notification_ttl: Duration,
    pub poller_history_days: u32,
    pub agents: AgentRegistry,
    pub log_filter: String,
    pub json_logs: bool,
}

impl RuntimeConfig {
    pub fn from_args(args: Args) -> Result<Self, String> {
        if args.port == 0 {
            return Err("port must be greater than 0".to_owned());
        }
        if args.refresh_interval_ms < 1_000 {
            return Err("refresh_interval_ms must be at least 1000".to_owned());
        }
        if args.countdown_tick_ms == 0 {
            return Err("countdown_tick_ms must be greater than 0".to_owned());
        }
        if args.schedule_hour > 23 {
            return Err("schedule_hour must be between 0 and 23".to_owned());
        }
        if !(1..=365).contains(&args.poller_history_days) {
            return Err("poller_history_days must be between 1 and 365".to_owned());
        }
        if args.request_timeout_ms == Some(0) {
            return Err("request_timeout_ms must be greater than 0 when set".to_owned());
        }
        let proxy_url = normalize_proxy_url(&args.proxy_url)?;

        let agents = match &args.agents_file {
            Some(path) => AgentRegistry::load(path).map_err(|error| error.to_string())?,
            None => AgentRegistry::builtin(),
        };

        Ok(Self {
            host: args.host,
            port: args.port,
            proxy_url,
            refresh_interval: Duration::from_millis(args.refresh_interval_ms),
            countdown_tick: Duration::from_millis(args.countdown_tick_ms),
            auto_refresh: args.auto_refresh,
            schedule_hour: args.schedule_hour,
            internal_provider: args.internal_provider.trim().to_owned(),
            hide_internal: args.hide_internal,
            request_timeout: args.request_timeout_ms.map(Duration::from_millis),
            action_refresh_delay: Duration::from_millis(args.action_refresh_delay_ms),
            notification_ttl: Duration::from_millis(args.notification_ttl_ms),
            poller_history_days: args.poller_history_days,
            agents,
            log_filter: args.log_filter,
            json_logs: args.json_logs,
        })
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn for_test(host: IpAddr, port: u16, proxy_url: &str) -> Self {
        Self {
            host,
            port,
            proxy_url: proxy_url.trim_end_matches('/').to_owned(),
            refresh_interval: Duration::from_secs(3_600),
            countdown_tick: Duration::from_millis(200),
            auto_refresh: true,
            schedule_hour: 23,
            internal_provider: "Gateway".to_owned(),
            hide_internal: false,
            request_timeout: Some(Duration::from_secs(5)),
            action_refresh_delay: Duration::ZERO,
            notification_ttl: Duration::from_secs(60),
            poller_history_days: 30,
            agents: AgentRegistry::builtin(),
            log_filter: "warn".to_owned(),
            json_logs: false,
        }
    }
}

fn normalize_proxy_url(input: &str) -> Result<String, String> {
    let trimmed = input.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|error| format!("invalid proxy_url: {error}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err("proxy_url must use http or https".to_owned());
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Args, RuntimeConfig, normalize_proxy_url};

    #[test]
    fn defaults_parse_into_runtime_config() {
        let args = Args::parse_from(["clawboard"]);
        let config = RuntimeConfig::from_args(args).expect("defaults should be valid");
        assert_eq!(config.refresh_interval.as_secs(), 30);
        assert_eq!(config.schedule_hour, 23);
        assert_eq!(config.internal_provider, "Gateway");
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn schedule_hour_is_bounded() {
        let args = Args::parse_from(["clawboard", "--schedule-hour", "24"]);
        assert!(RuntimeConfig::from_args(args).is_err());
    }

    #[test]
    fn poller_history_window_is_bounded() {
        let args = Args::parse_from(["clawboard", "--poller-history-days", "0"]);
        assert!(RuntimeConfig::from_args(args).is_err());
        let args = Args::parse_from(["clawboard", "--poller-history-days", "7"]);
        let config = RuntimeConfig::from_args(args).expect("7 days should be valid");
        assert_eq!(config.poller_history_days, 7);
    }

    #[test]
    fn proxy_url_requires_http_scheme() {
        assert!(normalize_proxy_url("ftp://example.com").is_err());
        assert_eq!(
            normalize_proxy_url(" http://127.0.0.1:5555/ ").expect("url should normalize"),
            "http://127.0.0.1:5555"
        );
    }

    #[test]
    fn agents_file_replaces_builtin_registry() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("agents.toml");
        std::fs::write(
            &path,
            "[[agents]]\nid = \"solo\"\nname = \"Solo\"\nquick_task = \"ping\"\n",
        )
        .expect("agents file should be written");

        let args = Args::parse_from([
            "clawboard",
            "--agents-file",
            path.to_str().expect("utf8 path"),
        ]);
        let config = RuntimeConfig::from_args(args).expect("config should load");
        assert_eq!(config.agents.agents().len(), 1);
        assert_eq!(config.agents.quick_task("solo"), Some("ping"));
    }
}
