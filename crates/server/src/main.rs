//! Spray simulation HTTP server

use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spray_server::{app, AppState};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "spray_server=debug,spray_orchestrator=info,spray_kernel=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting spray simulation server");

    // Get port from environment or default to 3000
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let configs_dir = PathBuf::from("configs");
    let frames_dir = PathBuf::from("outputs/server");
    let frontend_dist = PathBuf::from("frontend/dist");

    std::fs::create_dir_all(&configs_dir)?;
    std::fs::create_dir_all(&frames_dir)?;

    let state = Arc::new(AppState::new(configs_dir, frames_dir));
    let router = app(state, Some(frontend_dist));

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await
}
