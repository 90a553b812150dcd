use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use legal_core::{config::Config, pipeline::Pipeline};
use legal_server::{
    app,
    logging::{BroadcastLayer, RING_CAPACITY},
    AppState,
};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "legal_server=info,legal_core=info,legal_agent=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (log_tx, _log_rx) = broadcast::channel::<String>(256);
    let log_ring = Arc::new(Mutex::new(VecDeque::with_capacity(RING_CAPACITY)));

    // LOG_FORMAT=json switches stdout to one JSON object per line.
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let fmt_layer = if json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt_layer)
        .with(BroadcastLayer {
            tx: log_tx.clone(),
            ring: Arc::clone(&log_ring),
        })
        .init();

    let config = Arc::new(Config::from_env());
    let backend = legal_agent::from_config(&config);
    info!(
        backend = backend.name(),
        model = backend.model(),
        clause_mode = %config.clause_mode,
        timeout_s = config.completion_timeout_s,
        "completion backend ready"
    );

    let addr = config.bind_addr();
    let pipeline = Pipeline::new(Arc::clone(&config), backend);
    let state = Arc::new(AppState::new(pipeline, log_tx, log_ring));

    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
