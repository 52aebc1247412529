//! Frame driver: runs every step of a simulation in order and hands poses
//! and selected frames to a [`FrameSink`].

use serde::{Deserialize, Serialize};
use spray_kernel::{RgbFrame, SimulationKernel, StepResult};
use std::time::Instant;

use crate::error::Result;
use crate::sink::FrameSink;

/// Decides which steps are materialized.
///
/// A step is materialized when `step % stride == 0` or when it is the last
/// step, so the final state is always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializePolicy {
    stride: usize,
    total_steps: usize,
}

impl MaterializePolicy {
    /// Stride is `save_every` when given, else `ceil(total / max_frames)`.
    pub fn new(total_steps: usize, save_every: Option<usize>, max_saved_frames: usize) -> Self {
        let stride = match save_every {
            Some(n) => n.max(1),
            None => total_steps.div_ceil(max_saved_frames.max(1)).max(1),
        };
        Self { stride, total_steps }
    }

    /// Steps between materialized frames.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Steps in the run.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Whether `step` produces a frame.
    pub fn should_materialize(&self, step: usize) -> bool {
        step % self.stride == 0 || step + 1 == self.total_steps
    }

    /// Number of frames a complete run produces.
    pub fn frame_count(&self) -> usize {
        if self.total_steps == 0 {
            return 0;
        }
        let on_stride = (self.total_steps - 1) / self.stride + 1;
        if (self.total_steps - 1) % self.stride == 0 {
            on_stride
        } else {
            on_stride + 1
        }
    }
}

/// Arm pose and coverage for one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    /// Step index
    pub step: usize,
    /// Planner target `[x, z]`
    pub target: [f32; 2],
    /// Shoulder angle (degrees)
    pub shoulder_deg: f32,
    /// Elbow angle relative to link 1 (degrees)
    pub elbow_deg: f32,
    /// Elbow position `[x, z]`
    pub elbow: [f32; 2],
    /// Tool position `[x, z]`
    pub tool: [f32; 2],
    /// Whether the target was clamped to the reachable annulus
    pub clamped: bool,
    /// Coverage after the step (percent)
    pub coverage_percent: f32,
}

impl From<&StepResult> for PoseSample {
    fn from(r: &StepResult) -> Self {
        Self {
            step: r.step,
            target: r.target,
            shoulder_deg: r.pose.shoulder_deg,
            elbow_deg: r.pose.elbow_deg,
            elbow: r.pose.elbow,
            tool: r.pose.tool,
            clamped: r.pose.clamped,
            coverage_percent: r.coverage_percent,
        }
    }
}

/// A texture snapshot taken after a materialized step.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedFrame {
    /// Sequential frame number, starting at 0
    pub index: usize,
    /// Step the frame was taken after
    pub step: usize,
    /// Coverage at that step (percent)
    pub coverage_percent: f32,
    /// Rendered texture
    pub image: RgbFrame,
}

/// Totals for a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Steps executed
    pub steps: usize,
    /// Frames materialized
    pub frames: usize,
    /// Coverage after the last step (percent)
    pub final_coverage_percent: f32,
    /// Wall-clock duration (seconds)
    pub elapsed_secs: f64,
}

/// Drives a kernel through a complete run.
pub struct FrameDriver<'a> {
    kernel: &'a mut dyn SimulationKernel,
    policy: MaterializePolicy,
}

impl<'a> FrameDriver<'a> {
    /// Driver for `kernel` with the given policy.
    pub fn new(kernel: &'a mut dyn SimulationKernel, policy: MaterializePolicy) -> Self {
        Self { kernel, policy }
    }

    /// Run steps `0..total_steps`, feeding `sink`. A sink error aborts the
    /// run; the kernel itself never fails mid-run.
    pub fn run(self, sink: &mut dyn FrameSink) -> Result<RunSummary> {
        let total = self.policy.total_steps();
        let start = Instant::now();
        let progress_every = (total / 10).max(1);
        let mut frames = 0;
        let mut coverage = self.kernel.coverage_percent();

        tracing::info!(
            "Running {} steps, materializing every {} ({} frames)",
            total,
            self.policy.stride(),
            self.policy.frame_count(),
        );

        for step in 0..total {
            let result = self.kernel.step();
            coverage = result.coverage_percent;
            sink.record_pose(&PoseSample::from(&result))?;

            if self.policy.should_materialize(step) {
                let frame = MaterializedFrame {
                    index: frames,
                    step,
                    coverage_percent: coverage,
                    image: self.kernel.read_texture(),
                };
                sink.materialize(&frame)?;
                frames += 1;
            }

            if (step + 1) % progress_every == 0 {
                tracing::info!(
                    "Step {}/{} ({:.0}%): coverage {:.2}%",
                    step + 1,
                    total,
                    100.0 * (step + 1) as f64 / total as f64,
                    coverage,
                );
            }
        }

        let summary = RunSummary {
            steps: total,
            frames,
            final_coverage_percent: coverage,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            "Run finished: {} steps, {} frames, coverage {:.2}%, {:.2}s",
            summary.steps,
            summary.frames,
            summary.final_coverage_percent,
            summary.elapsed_secs,
        );
        sink.finish(&summary)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use spray_kernel::JointPose;

    /// Kernel stand-in whose coverage rises by one point per step.
    struct CountingKernel {
        steps: usize,
        total: usize,
    }

    impl SimulationKernel for CountingKernel {
        fn step(&mut self) -> StepResult {
            let step = self.steps;
            self.steps += 1;
            StepResult {
                step,
                target: [step as f32, 0.0],
                pose: JointPose {
                    shoulder_deg: 0.0,
                    elbow_deg: 0.0,
                    elbow: [0.0, 0.0],
                    tool: [step as f32, 0.0],
                    clamped: false,
                },
                coverage_percent: self.steps as f32,
                hits: 1,
            }
        }

        fn read_texture(&self) -> RgbFrame {
            RgbFrame {
                width: 1,
                height: 1,
                rgb: vec![self.steps as u8, 0, 0],
            }
        }

        fn total_steps(&self) -> usize {
            self.total
        }

        fn steps_taken(&self) -> usize {
            self.steps
        }

        fn coverage_percent(&self) -> f32 {
            self.steps as f32
        }
    }

    #[test]
    fn stride_from_frame_budget() {
        let p = MaterializePolicy::new(8400, None, 100);
        assert_eq!(p.stride(), 84);
        let p = MaterializePolicy::new(50, None, 100);
        assert_eq!(p.stride(), 1);
        let p = MaterializePolicy::new(10, Some(3), 100);
        assert_eq!(p.stride(), 3);
    }

    #[test]
    fn final_step_is_always_materialized() {
        let p = MaterializePolicy::new(10, Some(3), 100);
        let steps: Vec<usize> = (0..10).filter(|&s| p.should_materialize(s)).collect();
        assert_eq!(steps, vec![0, 3, 6, 9]);

        let p = MaterializePolicy::new(11, Some(3), 100);
        let steps: Vec<usize> = (0..11).filter(|&s| p.should_materialize(s)).collect();
        assert_eq!(steps, vec![0, 3, 6, 9, 10]);
        assert_eq!(p.frame_count(), steps.len());
    }

    #[test]
    fn frame_count_matches_policy() {
        for total in 1..40 {
            for stride in 1..7 {
                let p = MaterializePolicy::new(total, Some(stride), 1);
                let n = (0..total).filter(|&s| p.should_materialize(s)).count();
                assert_eq!(p.frame_count(), n, "total {} stride {}", total, stride);
            }
        }
    }

    #[test]
    fn driver_feeds_every_pose_and_selected_frames() {
        let mut kernel = CountingKernel { steps: 0, total: 7 };
        let policy = MaterializePolicy::new(7, Some(3), 100);
        let mut sink = MemorySink::default();

        let summary = FrameDriver::new(&mut kernel, policy).run(&mut sink).unwrap();

        assert_eq!(summary.steps, 7);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.final_coverage_percent, 7.0);
        assert_eq!(sink.poses.len(), 7);
        let frame_steps: Vec<usize> = sink.frames.iter().map(|f| f.step).collect();
        assert_eq!(frame_steps, vec![0, 3, 6]);
        assert_eq!(sink.frames[2].index, 2);
        // Texture read after step 6 completes
        assert_eq!(sink.frames[2].image.rgb[0], 7);
        assert_eq!(sink.summary, Some(summary));
    }
}
