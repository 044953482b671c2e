use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use songforge::api::{AppState, build_router};
use songforge::app::SongService;
use songforge::config::{Settings, load_env_file};
use songforge::infra::llm::ProviderRouter;
use songforge::logging::init_logging;
use tokio::signal;
use tracing::{error, info};

/// Command-line arguments for songforge
#[derive(Parser, Debug)]
#[command(name = "songforge")]
#[command(about = "Song pack generation API with Gemini/OpenAI fallback")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "SONGFORGE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8000", env = "SONGFORGE_PORT")]
    port: u16,

    /// Prebuilt frontend bundle served for non-API paths
    #[arg(long, default_value = "dist", env = "SONGFORGE_STATIC_DIR")]
    static_dir: PathBuf,

    /// Optional dotenv file loaded before reading settings
    #[arg(long, default_value = "server/.env")]
    env_file: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let env_file_loaded = load_env_file(&args.env_file)
        .with_context(|| format!("Failed to read {}", args.env_file.display()))?;
    init_logging().context("Failed to initialize logging")?;
    info!(
        "Starting songforge v{} (env file {}: {})",
        env!("CARGO_PKG_VERSION"),
        args.env_file.display(),
        if env_file_loaded { "loaded" } else { "not found" }
    );

    let settings = Settings::from_env().context("Invalid configuration")?;
    // Blocking HTTP clients must be built outside the async runtime.
    let router =
        ProviderRouter::from_settings(&settings).context("Failed to configure providers")?;
    if router.configured().is_empty() {
        info!("No provider API keys configured; song endpoints will return 503");
    }

    let state = AppState::new(SongService::new(Arc::new(router)));
    let app = build_router(
        state,
        Some(args.static_dir.as_path()),
        &settings.cors_allow_origins,
    );

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?
        .block_on(serve(addr, app))
}

async fn serve(addr: SocketAddr, app: axum::Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("songforge listening on http://{addr}");
    info!("Health check: http://{addr}/api/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
