//! Router-level API tests, driven in-process with `oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use spray_server::api::{
    ConfigListResponse, CreateSimulationResponse, SimulationStatusResponse, TEXTURE_HEIGHT_HEADER,
    TEXTURE_WIDTH_HEADER,
};
use spray_server::{app, AppState};

const SMALL: &str = r#"{
    "name": "api small",
    "description": "two short passes",
    "simulation": {
        "wall": { "width": 0.5, "height": 0.25 },
        "raster": { "pass_speed": 1.0, "frame_rate": 16.0 },
        "arm": { "base": [0.25, -0.1], "link_lengths": [0.4, 0.35] },
        "emit_per_step": 200,
        "texture": { "width": 24, "height": 12 }
    },
    "output": { "save_every": 4 }
}"#;

fn setup(root: &Path) -> Router {
    let configs = root.join("configs");
    std::fs::create_dir_all(&configs).unwrap();
    std::fs::write(configs.join("small.json"), SMALL).unwrap();
    std::fs::write(configs.join("broken.json"), "{ not json").unwrap();
    std::fs::write(configs.join("notes.txt"), "ignored").unwrap();
    app(Arc::new(AppState::new(configs, root.join("frames"))), None)
}

async fn get(router: &Router, uri: &str) -> axum::response::Response {
    router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn delete(router: &Router, uri: &str) -> axum::response::Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let tmp = tempfile::tempdir().unwrap();
    let router = setup(tmp.path());
    let resp = get(&router, "/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_list_configs_skips_invalid_files() {
    let tmp = tempfile::tempdir().unwrap();
    let router = setup(tmp.path());

    let resp = get(&router, "/api/configs").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: ConfigListResponse = json(resp).await;
    assert_eq!(list.configs.len(), 1);
    let info = &list.configs[0];
    assert_eq!(info.id, "small");
    assert_eq!(info.name, "api small");
    assert_eq!(info.total_steps, 16);
    assert_eq!(info.texture, [24, 12]);
}

#[tokio::test]
async fn test_get_config_and_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let router = setup(tmp.path());

    let resp = get(&router, "/api/configs/small").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let raw: serde_json::Value = json(resp).await;
    assert_eq!(raw["simulation"]["emit_per_step"], 200);

    let resp = get(&router, "/api/configs/nope").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = get(&router, "/api/simulations/unknown").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_simulation_runs_to_completion() {
    let tmp = tempfile::tempdir().unwrap();
    let router = setup(tmp.path());

    let resp = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/simulations")
                .header("content-type", "application/json")
                .body(Body::from(r#"{ "config": "small" }"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created: CreateSimulationResponse = json(resp).await;
    assert_eq!(created.total_steps, 16);
    let id = created.simulation_id;

    let mut status: SimulationStatusResponse;
    let mut polls = 0;
    loop {
        status = json(get(&router, &format!("/api/simulations/{}", id)).await).await;
        if status.status == "finished" || status.status == "error" || polls > 2000 {
            break;
        }
        polls += 1;
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(status.status, "finished", "{:?}", status.error);
    assert_eq!(status.step, 16);
    assert_eq!(status.latest_pose.map(|p| p.step), Some(15));

    let resp = get(&router, &format!("/api/simulations/{}/texture", id)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[TEXTURE_WIDTH_HEADER], "24");
    assert_eq!(resp.headers()[TEXTURE_HEIGHT_HEADER], "12");
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.len(), 24 * 12 * 3);

    let resp = get(&router, &format!("/frames/{}/frames.json", id)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Deleting a finished run frees it; its frames stay on disk
    let resp = delete(&router, &format!("/api/simulations/{}", id)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = get(&router, &format!("/api/simulations/{}", id)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = get(&router, &format!("/api/simulations/{}/texture", id)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = get(&router, &format!("/frames/{}/frames.json", id)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_unknown_simulation() {
    let tmp = tempfile::tempdir().unwrap();
    let router = setup(tmp.path());
    let resp = delete(&router, "/api/simulations/nope").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_with_unknown_config() {
    let tmp = tempfile::tempdir().unwrap();
    let router = setup(tmp.path());

    let resp = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/simulations")
                .header("content-type", "application/json")
                .body(Body::from(r#"{ "config": "missing" }"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
