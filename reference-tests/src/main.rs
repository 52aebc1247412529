//! Reference scenario binary entry point
//!
//! Runs every scenario against the configs in `configs/`, including full
//! runs of the full-size walls that are too slow for `cargo test`.

use reference_tests::{CoverageCheck, ExpectedResult, ReachCheck, ReferenceTest, RowFillCheck, TestResult};

fn sweep(name: &str, config: &str, min_coverage: f32, monotonic: bool) -> ReferenceTest {
    ReferenceTest {
        name: name.to_string(),
        config_path: format!("configs/{}.json", config),
        steps: None,
        expected: ExpectedResult {
            coverage: Some(CoverageCheck {
                min_percent: min_coverage,
                max_percent: 100.0,
            }),
            monotonic_coverage: monotonic,
            texture_bounds: true,
            reach: Some(ReachCheck { max_clamped_steps: 0 }),
            row_fill: None,
        },
    }
}

/// Get all reference scenarios
fn all_tests() -> Vec<ReferenceTest> {
    let mut smoke = sweep("Smoke Ray Sweep", "smoke-ray", 60.0, true);
    smoke.expected.row_fill = Some(RowFillCheck {
        threshold: 0.5,
        min_fraction: 0.9,
    });

    vec![
        smoke,
        sweep("Smoke Particle Sweep", "smoke-particle", 40.0, false),
        sweep("Full Wall Ray", "wall-ray", 25.0, false),
        sweep("Full Wall Particle", "wall-particle", 20.0, false),
        sweep("Full Wall Cone", "wall-cone", 40.0, false),
    ]
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    tracing::info!("Spray Reference Scenario Suite");
    tracing::info!("==============================");

    let tests = all_tests();
    tracing::info!("Found {} reference scenarios", tests.len());

    let mut results: Vec<TestResult> = Vec::new();
    let mut passed_count = 0;
    let mut failed_count = 0;

    for test in tests {
        match test.run() {
            Ok(result) => {
                if result.passed {
                    passed_count += 1;
                } else {
                    failed_count += 1;
                }
                result.print_summary();
                results.push(result);
            }
            Err(e) => {
                eprintln!("\nERROR running scenario {}: {}", test.name, e);
                failed_count += 1;
            }
        }
    }

    println!("\n{}", "=".repeat(80));
    println!("OVERALL SUMMARY");
    println!("{}", "=".repeat(80));
    println!("Total scenarios: {}", results.len());
    println!("Passed: {}", passed_count);
    println!("Failed: {}", failed_count);
    println!("{}", "=".repeat(80));

    // Exit with error code if any scenario failed
    if failed_count > 0 {
        std::process::exit(1);
    }
}
