//! REST API endpoints for spray runs

use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use spray_kernel::RasterPath;
use spray_orchestrator::{create_runner, PoseSample, RunnerState, SprayConfig};

use crate::state::AppState;

/// Header carrying the texture width on `/texture` responses
pub const TEXTURE_WIDTH_HEADER: &str = "x-texture-width";
/// Header carrying the texture height on `/texture` responses
pub const TEXTURE_HEIGHT_HEADER: &str = "x-texture-height";

type ApiError = (StatusCode, String);

// ---------------------------------------------------------------------------
// Request/Response Types
// ---------------------------------------------------------------------------

/// Request body for creating a simulation
#[derive(Debug, Deserialize)]
pub struct CreateSimulationRequest {
    /// Configuration file stem (e.g., "wall-ray")
    pub config: String,
}

/// Response for simulation creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSimulationResponse {
    /// Unique simulation ID
    pub simulation_id: String,
    /// Current status
    pub status: String,
    /// Steps in the full run
    pub total_steps: usize,
    /// URL prefix where frames and the manifest appear
    pub frames_url: String,
}

/// Configuration file metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigInfo {
    /// File stem, used to create simulations
    pub id: String,
    /// Run name from the file
    pub name: String,
    /// Free-form notes
    pub description: Option<String>,
    /// Steps in a full run
    pub total_steps: usize,
    /// Texture resolution `[width, height]`
    pub texture: [usize; 2],
}

/// List of available configurations
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigListResponse {
    /// Available configurations
    pub configs: Vec<ConfigInfo>,
}

/// Simulation status response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimulationStatusResponse {
    /// Simulation ID
    pub simulation_id: String,
    /// created, running, finished or error
    pub status: String,
    /// Steps completed
    pub step: usize,
    /// Steps in the full run
    pub total_steps: usize,
    /// Coverage after the last step (percent)
    pub coverage_percent: f32,
    /// Frames written so far
    pub frames: usize,
    /// Pose of the last completed step
    pub latest_pose: Option<PoseSample>,
    /// Failure reason when status is error
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// GET /api/configs - List available configuration files
pub async fn list_configs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConfigListResponse>, ApiError> {
    let entries = std::fs::read_dir(&state.configs_dir).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read configs directory: {}", e),
        )
    })?;

    let mut configs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };

        match SprayConfig::load(&path) {
            Ok(config) => {
                let sim = &config.simulation;
                let total_steps = RasterPath::new(&sim.wall, &sim.raster).total_steps();
                configs.push(ConfigInfo {
                    id,
                    name: config.name,
                    description: config.description,
                    total_steps,
                    texture: [sim.texture.width, sim.texture.height],
                });
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {:?}: {}", path, e);
            }
        }
    }
    configs.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(Json(ConfigListResponse { configs }))
}

/// GET /api/configs/{name} - Get raw configuration JSON
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config_path = state.config_path(&name);
    if !config_path.exists() {
        return Err((StatusCode::NOT_FOUND, format!("Configuration '{}' not found", name)));
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to read config: {}", e))
    })?;
    let json: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to parse config: {}", e))
    })?;

    Ok(Json(json))
}

/// POST /api/simulations - Create and start a simulation
pub async fn create_simulation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSimulationRequest>,
) -> Result<Json<CreateSimulationResponse>, ApiError> {
    let config_path = state.config_path(&req.config);
    if !config_path.exists() {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Configuration '{}' not found", req.config),
        ));
    }

    let sim_id = uuid::Uuid::new_v4().to_string();
    let frames_dir = state.frames_dir.join(&sim_id);

    let runner = create_runner(&config_path, Some(frames_dir.as_path()))
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid configuration: {}", e)))?;
    runner.start();
    let progress = runner.progress();
    tracing::info!(
        "Started simulation {} from '{}' ({} steps)",
        sim_id,
        req.config,
        progress.total_steps
    );

    state.simulations().insert(sim_id.clone(), runner);

    Ok(Json(CreateSimulationResponse {
        frames_url: format!("/frames/{}/", sim_id),
        simulation_id: sim_id,
        status: progress.state.as_str().to_string(),
        total_steps: progress.total_steps,
    }))
}

/// GET /api/simulations/{id} - Get simulation status
pub async fn get_simulation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SimulationStatusResponse>, ApiError> {
    let simulations = state.simulations();
    let runner = simulations
        .get(&id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Simulation '{}' not found", id)))?;

    let progress = runner.progress();
    Ok(Json(SimulationStatusResponse {
        simulation_id: id,
        status: progress.state.as_str().to_string(),
        step: progress.steps_taken,
        total_steps: progress.total_steps,
        coverage_percent: progress.coverage_percent,
        frames: progress.frames,
        latest_pose: progress.latest_pose,
        error: progress.error_message,
    }))
}

/// GET /api/simulations/{id}/texture - Latest materialized texture as raw RGB
pub async fn get_texture(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let frame = {
        let simulations = state.simulations();
        let runner = simulations
            .get(&id)
            .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Simulation '{}' not found", id)))?;
        runner.latest_frame()
    };
    let frame = frame.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("Simulation '{}' has no texture yet", id),
        )
    })?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (HeaderName::from_static(TEXTURE_WIDTH_HEADER), frame.width.to_string()),
        (HeaderName::from_static(TEXTURE_HEIGHT_HEADER), frame.height.to_string()),
    ];
    Ok((headers, frame.rgb).into_response())
}

/// DELETE /api/simulations/{id} - Forget a finished simulation
///
/// Drops the runner and its in-memory texture. Frames already written stay
/// on disk under `/frames`.
pub async fn delete_simulation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut simulations = state.simulations();
    let runner = simulations
        .get(&id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Simulation '{}' not found", id)))?;
    if runner.state() == RunnerState::Running {
        return Err((
            StatusCode::CONFLICT,
            format!("Simulation '{}' is still running", id),
        ));
    }

    simulations.remove(&id);
    tracing::info!("Removed simulation {} ({} remaining)", id, simulations.len());
    Ok(StatusCode::NO_CONTENT)
}
