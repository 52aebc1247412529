//! HTTP server for spray runs
//!
//! Lists configs, launches background runs, reports their progress and
//! serves the latest texture plus the written frame directories. Finished
//! runs stay in memory until deleted.

pub mod api;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub use state::AppState;

/// Build the application router.
///
/// `frontend_dist`, when it exists, is served as the fallback.
pub fn app(state: Arc<AppState>, frontend_dist: Option<PathBuf>) -> Router {
    // Configure CORS for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_router = Router::new()
        .route("/configs", get(api::list_configs))
        .route("/configs/:name", get(api::get_config))
        .route("/simulations", post(api::create_simulation))
        .route(
            "/simulations/:id",
            get(api::get_simulation).delete(api::delete_simulation),
        )
        .route("/simulations/:id/texture", get(api::get_texture));

    let frames = ServeDir::new(state.frames_dir.clone());

    let app = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .nest_service("/frames", frames)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(cors));

    match frontend_dist {
        Some(dist) if dist.exists() => {
            tracing::info!("Serving frontend from {:?}", dist);
            app.fallback_service(ServeDir::new(dist))
        }
        Some(dist) => {
            tracing::warn!("Frontend dist directory not found at {:?}", dist);
            app
        }
        None => app,
    }
}

async fn health_handler() -> &'static str {
    "OK"
}
