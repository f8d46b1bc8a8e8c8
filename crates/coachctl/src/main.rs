//! Coach Control - spoken self-assessment sessions against the
//! skill-progress inference server.

use anyhow::{Context, Result};
use clap::Parser;
use coach_common::config::CoachConfig;
use coachctl::client::InferenceClient;
use coachctl::completion::HttpCompletionClient;
use coachctl::controller::SessionController;
use coachctl::render::TerminalRenderer;
use coachctl::speech::ConsoleSpeech;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coachctl")]
#[command(about = "Spoken skill-progress coaching sessions", long_about = None)]
#[command(version)]
struct Cli {
    /// Inference server host
    #[arg(long)]
    host: Option<String>,

    /// Inference server port
    #[arg(long)]
    port: Option<u16>,

    /// Name the coach greets you by
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = CoachConfig::load().context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(name) = cli.name {
        config.session.user_name = name;
    }

    info!("coachctl v{} starting", env!("CARGO_PKG_VERSION"));

    let client = InferenceClient::connect(&config.server.host, config.server.port)
        .await
        .context("Cannot reach the inference server")?;
    info!(
        "connected to inference server at {}:{}",
        config.server.host, config.server.port
    );

    let speech = ConsoleSpeech;
    let completion =
        HttpCompletionClient::new(&config.completion).context("Failed to set up completions")?;
    let renderer = TerminalRenderer::default();

    let controller = SessionController::new(client, &speech, &completion, &renderer, &config);

    // An interrupt drops the controller future, which tears the connection
    // down with it.
    tokio::select! {
        result = controller.run() => {
            result.context("Session ended with an error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
        }
    }

    info!("client shutting down");
    Ok(())
}
