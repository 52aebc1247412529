//! Reference scenarios runnable via cargo test.

use crate::{
    CoverageCheck, ExpectedResult, ReachCheck, ReferenceTest, RowFillCheck,
};

/// Resolve a path relative to the workspace root
fn project_path(relative: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let project_root = std::path::Path::new(manifest_dir)
        .parent()
        .expect("Could not find workspace root");
    project_root.join(relative).to_string_lossy().to_string()
}

/// Full serpentine over a small wall in ray mode, no blur
fn smoke_ray_test() -> ReferenceTest {
    ReferenceTest {
        name: "Smoke Ray Sweep".to_string(),
        config_path: project_path("configs/smoke-ray.json"),
        steps: None,
        expected: ExpectedResult {
            coverage: Some(CoverageCheck {
                min_percent: 60.0,
                max_percent: 100.0,
            }),
            monotonic_coverage: true,
            texture_bounds: true,
            reach: Some(ReachCheck { max_clamped_steps: 0 }),
            row_fill: Some(RowFillCheck {
                threshold: 0.5,
                min_fraction: 0.9,
            }),
        },
    }
}

/// Same wall with ballistic particles and a blurred texture
fn smoke_particle_test() -> ReferenceTest {
    ReferenceTest {
        name: "Smoke Particle Sweep".to_string(),
        config_path: project_path("configs/smoke-particle.json"),
        steps: None,
        expected: ExpectedResult {
            coverage: Some(CoverageCheck {
                min_percent: 40.0,
                max_percent: 100.0,
            }),
            monotonic_coverage: false,
            texture_bounds: true,
            reach: Some(ReachCheck { max_clamped_steps: 0 }),
            row_fill: None,
        },
    }
}

/// First steps of the full-size wall: coverage starts at zero and the arm
/// reaches every target
fn full_wall_start_test() -> ReferenceTest {
    ReferenceTest {
        name: "Full Wall Start".to_string(),
        config_path: project_path("configs/wall-ray.json"),
        steps: Some(10),
        expected: ExpectedResult {
            coverage: None,
            monotonic_coverage: false,
            texture_bounds: true,
            reach: Some(ReachCheck { max_clamped_steps: 0 }),
            row_fill: None,
        },
    }
}

#[test]
fn test_smoke_ray_sweep() {
    let result = smoke_ray_test().run().expect("Test execution failed");
    result.print_summary();
    assert!(result.passed, "Smoke ray sweep failed");
    assert_eq!(result.steps, 80);
}

#[test]
fn test_smoke_particle_sweep() {
    let result = smoke_particle_test().run().expect("Test execution failed");
    result.print_summary();
    assert!(result.passed, "Smoke particle sweep failed");
}

#[test]
fn test_full_wall_start() {
    let result = full_wall_start_test().run().expect("Test execution failed");
    result.print_summary();
    assert!(result.passed, "Full wall start failed");
    assert_eq!(result.steps, 10);
}

#[test]
fn test_missing_config_is_reported() {
    let test = ReferenceTest {
        name: "Missing".to_string(),
        config_path: project_path("configs/does-not-exist.json"),
        steps: Some(1),
        expected: ExpectedResult::default(),
    };
    assert!(test.run().is_err());
}
