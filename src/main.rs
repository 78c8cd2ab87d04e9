use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use mirrorhook::{config, http, AppState};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "mirrorhook", about = "Webhook-driven branch mirror")]
struct Cli {
    /// Path to the YAML configuration file.  When omitted, configuration is
    /// read from environment variables.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // ---- CLI ----
    let cli = Cli::parse();

    // ---- Config ----
    let config = config::load_config(cli.config.as_deref())?;

    // ---- Tracing ----
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        destination = %config.destination.base_url,
        strategy = config.mirror.strategy.as_str(),
        temp_dir = %config.mirror.temp_dir.display(),
        "starting mirrorhook"
    );

    // ---- Secrets ----
    let webhook_token = config.webhook_token()?;
    let destination_token = config.destination_token()?;

    // ---- Ensure the workspace root exists ----
    tokio::fs::create_dir_all(&config.mirror.temp_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create workspace root: {}",
                config.mirror.temp_dir.display()
            )
        })?;

    // ---- App state ----
    let listen = config.server.listen.clone();
    let state = AppState::new(config, webhook_token, destination_token)?;
    let app = http::handler::create_router(std::sync::Arc::new(state));

    // ---- HTTP server ----
    let listen_addr: std::net::SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address: {listen}"))?;

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;

    tracing::info!(%listen_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("mirrorhook shut down cleanly");
    Ok(())
}
