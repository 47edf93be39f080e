use std::future::Future;

use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    application::{
        app::AppState,
        config::{Args, RuntimeConfig},
        refresh::{spawn_countdown_ticker, spawn_refresh_ticker},
    },
    domain::error::DashboardError,
    interfaces::http,
};

pub async fn run(args: Args) -> Result<(), DashboardError> {
    let config = RuntimeConfig::from_args(args)
        .map_err(|error| DashboardError::Validation(format!("configuration error: {error}")))?;

    init_logging(&config.log_filter, config.json_logs)?;
    let listener = TcpListener::bind(config.bind_addr())
        .await
        .map_err(|error| DashboardError::Unavailable(format!("failed to bind listener: {error}")))?;

    let signal = shutdown_signal();
    run_with_listener(listener, config, signal).await
}

pub async fn run_with_listener(
    listener: TcpListener,
    config: RuntimeConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DashboardError> {
    info!(
        "starting clawboard host={} port={} proxy={} refresh={}s auto_refresh={}",
        config.host,
        config.port,
        config.proxy_url,
        config.refresh_interval.as_secs(),
        config.auto_refresh,
    );

    let state = AppState::new(config)?;
    state.render_all().await;

    let tickers = CancellationToken::new();
    let initial = spawn_initial_load(state.clone());
    let refresh_task = spawn_refresh_ticker(state.clone(), tickers.clone());
    let countdown_task = spawn_countdown_ticker(state.clone(), tickers.clone());

    let serve_result = http::serve(listener, state, shutdown).await;

    tickers.cancel();
    initial.abort();
    for (name, task) in [
        ("refresh ticker", refresh_task),
        ("countdown ticker", countdown_task),
    ] {
        if let Err(error) = task.await {
            warn!("{name} task ended abnormally: {error}");
        }
    }
    if let Err(error) = initial.await
        && !error.is_cancelled()
    {
        warn!("initial load task ended abnormally: {error}");
    }

    serve_result
}

/// Settings first so the countdown targets the configured hour, then every source.
fn spawn_initial_load(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        state.load_settings().await;
        state.refresh_all().await;
    })
}

fn init_logging(filter: &str, json_logs: bool) -> Result<(), DashboardError> {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(env_filter).with_target(false);

    if json_logs {
        builder.json().try_init().map_err(|error| {
            DashboardError::Unavailable(format!("failed to initialize logger: {error}"))
        })?;
    } else {
        builder.compact().try_init().map_err(|error| {
            DashboardError::Unavailable(format!("failed to initialize logger: {error}"))
        })?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
