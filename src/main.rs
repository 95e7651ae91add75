use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use moodchat_client::{
    create_router, AppState, Config, FileDevices, HttpBackend, LogPlayer, Session,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "moodchat-client", about = "Mood detection and chat session orchestrator")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/moodchat")]
    config: String,

    /// Override the control API bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the control API port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Loaded config: {}", cfg.service.name);
    info!("Backend: {}", cfg.backend.base_url);

    let backend = match cfg.backend.timeout_secs {
        Some(secs) => HttpBackend::with_timeout(&cfg.backend.base_url, Duration::from_secs(secs))
            .context("Failed to build HTTP client")?,
        None => HttpBackend::new(&cfg.backend.base_url),
    };
    let devices = FileDevices::new(&cfg.devices.camera_image, &cfg.devices.microphone_wav);

    let session = Session::new(
        cfg.session_config(),
        Arc::new(devices),
        Arc::new(backend),
        Arc::new(LogPlayer),
    );

    let bind = args.bind.unwrap_or(cfg.service.http.bind);
    let port = args.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", bind, port);

    let app = create_router(AppState::new(session.clone()));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Control API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    info!("Shutting down session");
    session.shutdown().await;

    Ok(())
}
