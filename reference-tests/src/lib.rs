//! Reference scenarios for the spray simulator
//!
//! Each scenario loads a config from `configs/`, runs it (fully or for a
//! fixed number of steps) and validates coverage, texture bounds and arm
//! reach against expected criteria.

#[cfg(test)]
mod tests;

use spray_kernel::Texture;
use spray_orchestrator::{build_simulation, SprayConfig};
use std::time::Instant;

/// Expected result criteria for a reference scenario
#[derive(Debug, Clone, Default)]
pub struct ExpectedResult {
    /// Final coverage range
    pub coverage: Option<CoverageCheck>,
    /// Coverage never decreases from one step to the next
    pub monotonic_coverage: bool,
    /// Both textures stay in [0, 1] after every step
    pub texture_bounds: bool,
    /// Limit on steps whose target had to be clamped
    pub reach: Option<ReachCheck>,
    /// Fraction of texture rows that received paint
    pub row_fill: Option<RowFillCheck>,
}

/// Check final coverage
#[derive(Debug, Clone)]
pub struct CoverageCheck {
    /// Lowest acceptable coverage (percent)
    pub min_percent: f32,
    /// Highest acceptable coverage (percent)
    pub max_percent: f32,
}

/// Check how often the planner asked for an unreachable point
#[derive(Debug, Clone)]
pub struct ReachCheck {
    /// Maximum number of clamped steps
    pub max_clamped_steps: usize,
}

/// Check that the sweep reaches the full wall height
#[derive(Debug, Clone)]
pub struct RowFillCheck {
    /// A texel counts as painted at or above this value
    pub threshold: f32,
    /// Minimum fraction of texture rows with a painted texel (0 to 1)
    pub min_fraction: f32,
}

/// Result of running a reference scenario
#[derive(Debug)]
pub struct TestResult {
    /// Scenario name
    pub name: String,
    /// Whether every check passed
    pub passed: bool,
    /// Individual check results
    pub checks: Vec<CheckResult>,
    /// Steps executed
    pub steps: usize,
    /// Coverage after the last step (percent)
    pub final_coverage_percent: f32,
    /// Wall-clock duration (seconds)
    pub elapsed_secs: f64,
}

/// Result of an individual validation check
#[derive(Debug)]
pub struct CheckResult {
    /// Check name
    pub name: String,
    /// Whether check passed
    pub passed: bool,
    /// Detail or failure reason
    pub message: Option<String>,
}

impl CheckResult {
    fn new(name: &str, passed: bool, message: String) -> Self {
        Self {
            name: name.to_string(),
            passed,
            message: Some(message),
        }
    }
}

/// A reference scenario
pub struct ReferenceTest {
    /// Scenario name
    pub name: String,
    /// Path to configuration file
    pub config_path: String,
    /// Steps to run; `None` runs the full raster
    pub steps: Option<usize>,
    /// Expected results to validate
    pub expected: ExpectedResult,
}

/// Per-step observations collected during a run
#[derive(Debug, Default)]
struct RunTrace {
    coverage_drops: usize,
    worst_drop: f32,
    out_of_bounds_steps: usize,
    clamped_steps: usize,
}

impl ReferenceTest {
    /// Run the scenario and return results
    pub fn run(&self) -> Result<TestResult, String> {
        tracing::info!("Running reference scenario: {}", self.name);

        let config = SprayConfig::load(&self.config_path).map_err(|e| e.to_string())?;
        let mut sim = build_simulation(&config).map_err(|e| e.to_string())?;

        let total = sim.total_steps();
        let steps = self.steps.map_or(total, |n| n.min(total));
        tracing::info!("Running {} of {} steps...", steps, total);

        let start = Instant::now();
        let mut trace = RunTrace::default();
        let mut previous = sim.coverage_percent();
        for step in 0..steps {
            let result = sim.step();

            if result.coverage_percent < previous {
                trace.coverage_drops += 1;
                trace.worst_drop = trace.worst_drop.max(previous - result.coverage_percent);
            }
            previous = result.coverage_percent;

            if self.expected.texture_bounds
                && !(in_unit_range(sim.accumulation()) && in_unit_range(sim.fresh()))
            {
                trace.out_of_bounds_steps += 1;
            }
            if result.pose.clamped {
                trace.clamped_steps += 1;
            }

            // Log progress every 10% of steps
            if (step + 1) % (steps / 10).max(1) == 0 {
                let progress = ((step + 1) as f32 / steps as f32) * 100.0;
                tracing::info!(
                    "Progress: {:.0}% ({}/{}), coverage {:.2}%",
                    progress,
                    step + 1,
                    steps,
                    result.coverage_percent
                );
            }
        }
        let elapsed_secs = start.elapsed().as_secs_f64();
        let final_coverage = sim.coverage_percent();
        tracing::info!(
            "Scenario complete: {} steps, coverage {:.2}%, {:.2}s",
            steps,
            final_coverage,
            elapsed_secs
        );

        // Validate results
        let mut checks = Vec::new();

        if let Some(ref coverage) = self.expected.coverage {
            checks.push(validate_coverage(final_coverage, coverage));
        }
        if self.expected.monotonic_coverage {
            checks.push(validate_monotonic(&trace));
        }
        if self.expected.texture_bounds {
            checks.push(validate_bounds(&trace, steps));
        }
        if let Some(ref reach) = self.expected.reach {
            checks.push(validate_reach(&trace, reach, steps));
        }
        if let Some(ref fill) = self.expected.row_fill {
            checks.push(validate_row_fill(sim.accumulation(), fill));
        }

        Ok(TestResult {
            name: self.name.clone(),
            passed: checks.iter().all(|c| c.passed),
            checks,
            steps,
            final_coverage_percent: final_coverage,
            elapsed_secs,
        })
    }
}

fn in_unit_range(tex: &Texture) -> bool {
    tex.data().iter().all(|v| (0.0..=1.0).contains(v))
}

/// Validate final coverage against a range
fn validate_coverage(coverage: f32, check: &CoverageCheck) -> CheckResult {
    let passed = (check.min_percent..=check.max_percent).contains(&coverage);
    CheckResult::new(
        "Coverage",
        passed,
        format!(
            "Got: {:.2}%, expected {:.1}% to {:.1}%",
            coverage, check.min_percent, check.max_percent
        ),
    )
}

/// Validate that coverage never decreased
fn validate_monotonic(trace: &RunTrace) -> CheckResult {
    if trace.coverage_drops == 0 {
        CheckResult::new("Monotonic Coverage", true, "No decreases".to_string())
    } else {
        CheckResult::new(
            "Monotonic Coverage",
            false,
            format!(
                "{} decreases (worst: {:.4} points)",
                trace.coverage_drops, trace.worst_drop
            ),
        )
    }
}

/// Validate that textures stayed in [0, 1]
fn validate_bounds(trace: &RunTrace, steps: usize) -> CheckResult {
    CheckResult::new(
        "Texture Bounds",
        trace.out_of_bounds_steps == 0,
        format!(
            "{} / {} steps had texels outside [0, 1]",
            trace.out_of_bounds_steps, steps
        ),
    )
}

/// Validate the number of clamped IK targets
fn validate_reach(trace: &RunTrace, check: &ReachCheck, steps: usize) -> CheckResult {
    CheckResult::new(
        "Reach",
        trace.clamped_steps <= check.max_clamped_steps,
        format!(
            "{} / {} steps clamped (limit: {})",
            trace.clamped_steps, steps, check.max_clamped_steps
        ),
    )
}

/// Validate that paint reached enough texture rows
fn validate_row_fill(acc: &Texture, check: &RowFillCheck) -> CheckResult {
    let height = acc.height();
    if height == 0 {
        return CheckResult::new("Row Fill", false, "Empty texture".to_string());
    }
    let filled = acc
        .data()
        .chunks(acc.width().max(1))
        .filter(|row| row.iter().any(|&v| v >= check.threshold))
        .count();
    let fraction = filled as f32 / height as f32;
    CheckResult::new(
        "Row Fill",
        fraction >= check.min_fraction,
        format!(
            "{} / {} rows painted ({:.1}%, limit: {:.1}%)",
            filled,
            height,
            fraction * 100.0,
            check.min_fraction * 100.0
        ),
    )
}

impl TestResult {
    /// Print a summary of the test result
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(80));
        println!("Scenario: {}", self.name);
        println!("{}", "=".repeat(80));
        println!("Status: {}", if self.passed { "PASSED" } else { "FAILED" });
        println!("Steps: {}", self.steps);
        println!("Final coverage: {:.2}%", self.final_coverage_percent);
        println!("Wall time: {:.2} s", self.elapsed_secs);
        println!("\nValidation Checks:");
        for check in &self.checks {
            let status = if check.passed { "PASS" } else { "FAIL" };
            print!("  [{}] {}", status, check.name);
            if let Some(ref msg) = check.message {
                print!(" - {}", msg);
            }
            println!();
        }
        println!("{}", "=".repeat(80));
    }
}
