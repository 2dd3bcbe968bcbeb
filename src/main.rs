use std::env;
use std::path::PathBuf;

use anyhow::anyhow;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use callpilot::{ServerConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("callpilot=info,tower_http=info")),
        )
        .init();

    // Must happen before any TLS connection is attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Optional `--config <path>` selects a YAML file
    let mut args = env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                config_path = Some(PathBuf::from(path));
            }
            other => anyhow::bail!("Unknown argument '{other}'. Usage: callpilot [--config <file>]"),
        }
    }

    let config = match &config_path {
        Some(path) => ServerConfig::from_file(path),
        None => ServerConfig::from_env(),
    }
    .map_err(|e| anyhow!(e.to_string()))?;

    let address = config.address();
    let call_max_age = config.call_max_age();

    let app_state = AppState::new(config);
    let sweeper = app_state.core_state.spawn_stale_sweep(call_max_age);

    let app = routes::create_app(app_state.clone());

    let listener = TcpListener::bind(&address).await?;
    info!(address = %address, public_url = %app_state.config.public_url, "Server listening");

    let result = axum::serve(listener, app).await;

    sweeper.abort();
    result?;

    Ok(())
}
