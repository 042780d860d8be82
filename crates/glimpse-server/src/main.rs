pub mod editor_link;
pub mod error;
pub mod routes;
pub mod state;

use std::path::PathBuf;

use clap::Parser;
use dotenvy::dotenv;
use glimpse_common::telemetry::{self, TelemetryConfig, TelemetryGuard};
use glimpse_common::{Config, PreambleStore};
use miette::miette;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::ServerError;
use crate::state::AppState;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file. Defaults to `<config dir>/glimpse/config.toml` when present.
    #[arg(short, long, value_name = "FILE", env = "GLIMPSE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let (config, _guard) = initialize()?;
    let preamble = PreambleStore::default_location()?;
    info!(
        preamble = %preamble.path().display(),
        custom = preamble.is_custom(),
        "loading preamble"
    );

    let addr = config.server.listen_addr.clone();
    let (state, session) = AppState::spawn(config, preamble);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Starting server on {}", addr);
    axum::serve(listener, routes::router(state))
        .await
        .map_err(|source| ServerError::Serve { source })?;

    session.abort();
    Ok(())
}

pub fn initialize() -> miette::Result<(Config, TelemetryGuard)> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .map_err(|e| miette!("Failed to set miette hook: {}", e))?;
    miette::set_panic_hook();
    dotenv().ok();
    let cli = Cli::parse();
    let guard = telemetry::init(TelemetryConfig::from_env());
    let config = Config::load_or_default(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration loaded");
    Ok((config, guard))
}
