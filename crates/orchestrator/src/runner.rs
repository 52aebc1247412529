//! Background simulation runner
//!
//! `SimulationRunner` moves a kernel into a worker thread, drives it with a
//! [`FrameDriver`], and publishes progress (step count, coverage, latest pose,
//! latest materialized texture) for other threads to poll.
//!
//! A started run always completes every step; there is no pause or cancel.

use spray_kernel::{RgbFrame, SimulationKernel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::driver::{FrameDriver, MaterializePolicy, MaterializedFrame, PoseSample, RunSummary};
use crate::error::Result;
use crate::sink::FrameSink;

/// Runner state enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Created but not yet started
    Created,
    /// Worker thread is stepping
    Running,
    /// Every step completed
    Finished,
    /// The sink failed; see [`Progress::error_message`]
    Error,
}

impl RunnerState {
    /// Lowercase name used in API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Error => "error",
        }
    }
}

/// Snapshot of a run's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Lifecycle state
    pub state: RunnerState,
    /// Steps completed
    pub steps_taken: usize,
    /// Steps in the full run
    pub total_steps: usize,
    /// Coverage after the last completed step (percent)
    pub coverage_percent: f32,
    /// Frames materialized so far
    pub frames: usize,
    /// Pose of the last completed step
    pub latest_pose: Option<PoseSample>,
    /// Set once the run finishes
    pub summary: Option<RunSummary>,
    /// Set when state is `Error`
    pub error_message: Option<String>,
}

/// Shared state between the worker thread and the handle
struct SharedState {
    progress: Progress,
    latest_frame: Option<RgbFrame>,
}

fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for starting and querying a background run
pub struct SimulationRunner {
    shared: Arc<Mutex<SharedState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl SimulationRunner {
    /// Spawn the worker thread. Nothing runs until [`Self::start`].
    ///
    /// `sink`, when given, receives every pose and frame in addition to the
    /// runner's own progress tracking.
    pub fn new(
        mut kernel: Box<dyn SimulationKernel + Send>,
        policy: MaterializePolicy,
        sink: Option<Box<dyn FrameSink + Send>>,
    ) -> Self {
        let shared = Arc::new(Mutex::new(SharedState {
            progress: Progress {
                state: RunnerState::Created,
                steps_taken: kernel.steps_taken(),
                total_steps: policy.total_steps(),
                coverage_percent: kernel.coverage_percent(),
                frames: 0,
                latest_pose: None,
                summary: None,
                error_message: None,
            },
            latest_frame: None,
        }));

        let shared_clone = Arc::clone(&shared);
        let thread_handle = thread::spawn(move || {
            run_loop(kernel.as_mut(), policy, sink, shared_clone);
        });

        Self {
            shared,
            thread_handle: Some(thread_handle),
        }
    }

    /// Start the run (Created to Running)
    pub fn start(&self) {
        let mut guard = lock(&self.shared);
        if guard.progress.state == RunnerState::Created {
            guard.progress.state = RunnerState::Running;
        }
    }

    /// Current state
    pub fn state(&self) -> RunnerState {
        lock(&self.shared).progress.state
    }

    /// Copy of the current progress
    pub fn progress(&self) -> Progress {
        lock(&self.shared).progress.clone()
    }

    /// Copy of the most recently materialized texture
    pub fn latest_frame(&self) -> Option<RgbFrame> {
        lock(&self.shared).latest_frame.clone()
    }

    /// Wait for the run to end. Fails if the run was never started, the
    /// sink failed, or the worker panicked.
    pub fn join(mut self) -> std::result::Result<RunSummary, String> {
        if self.state() == RunnerState::Created {
            return Err("runner was never started".to_string());
        }
        if let Some(handle) = self.thread_handle.take() {
            handle.join().map_err(|_| "Thread panicked".to_string())?;
        }
        let progress = self.progress();
        match (progress.state, progress.summary) {
            (RunnerState::Finished, Some(summary)) => Ok(summary),
            _ => Err(progress
                .error_message
                .unwrap_or_else(|| format!("run ended in state {:?}", progress.state))),
        }
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        // An unstarted worker is still polling; tell it to exit. A running
        // worker finishes its steps detached.
        let mut guard = lock(&self.shared);
        if guard.progress.state == RunnerState::Created {
            guard.progress.state = RunnerState::Finished;
        }
    }
}

/// Publishes driver output into the shared state, then forwards it.
struct PublishingSink {
    shared: Arc<Mutex<SharedState>>,
    inner: Option<Box<dyn FrameSink + Send>>,
}

impl FrameSink for PublishingSink {
    fn record_pose(&mut self, pose: &PoseSample) -> Result<()> {
        if let Some(inner) = self.inner.as_mut() {
            inner.record_pose(pose)?;
        }
        let mut guard = lock(&self.shared);
        guard.progress.steps_taken = pose.step + 1;
        guard.progress.coverage_percent = pose.coverage_percent;
        guard.progress.latest_pose = Some(*pose);
        Ok(())
    }

    fn materialize(&mut self, frame: &MaterializedFrame) -> Result<()> {
        if let Some(inner) = self.inner.as_mut() {
            inner.materialize(frame)?;
        }
        let mut guard = lock(&self.shared);
        guard.progress.frames += 1;
        guard.latest_frame = Some(frame.image.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        if let Some(inner) = self.inner.as_mut() {
            inner.finish(summary)?;
        }
        lock(&self.shared).progress.summary = Some(*summary);
        Ok(())
    }
}

/// Worker body: wait for the start signal, then drive every step
fn run_loop(
    kernel: &mut dyn SimulationKernel,
    policy: MaterializePolicy,
    sink: Option<Box<dyn FrameSink + Send>>,
    shared: Arc<Mutex<SharedState>>,
) {
    loop {
        let state = lock(&shared).progress.state;
        match state {
            RunnerState::Created => thread::sleep(Duration::from_millis(10)),
            RunnerState::Running => break,
            _ => return,
        }
    }

    let mut publisher = PublishingSink {
        shared: Arc::clone(&shared),
        inner: sink,
    };
    let outcome = FrameDriver::new(kernel, policy).run(&mut publisher);

    let mut guard = lock(&shared);
    match outcome {
        Ok(_) => guard.progress.state = RunnerState::Finished,
        Err(e) => {
            tracing::error!("Run failed after {} steps: {}", guard.progress.steps_taken, e);
            guard.progress.state = RunnerState::Error;
            guard.progress.error_message = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use spray_kernel::{Simulation, SprayParams};

    fn small_params() -> SprayParams {
        let mut p = SprayParams::default();
        p.wall.width = 0.5;
        p.wall.height = 0.25;
        p.arm.base = [0.25, -0.1];
        p.arm.link_lengths = [0.4, 0.35];
        p.raster.pass_speed = 1.0;
        p.raster.frame_rate = 20.0;
        p.emit_per_step = 200;
        p.texture.width = 16;
        p.texture.height = 16;
        p
    }

    fn runner(sink: Option<Box<dyn FrameSink + Send>>) -> SimulationRunner {
        let sim = Simulation::configure(small_params()).unwrap();
        let policy = MaterializePolicy::new(sim.total_steps(), Some(4), 100);
        SimulationRunner::new(Box::new(sim), policy, sink)
    }

    struct FailingSink;

    impl FrameSink for FailingSink {
        fn record_pose(&mut self, _pose: &PoseSample) -> Result<()> {
            Ok(())
        }

        fn materialize(&mut self, _frame: &MaterializedFrame) -> Result<()> {
            Err(Error::Invalid("disk full".to_string()))
        }

        fn finish(&mut self, _summary: &RunSummary) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_runner_lifecycle() {
        let runner = runner(None);
        assert_eq!(runner.state(), RunnerState::Created);
        assert_eq!(runner.progress().steps_taken, 0);
        assert!(runner.latest_frame().is_none());

        runner.start();
        assert_ne!(runner.state(), RunnerState::Created);

        let total = runner.progress().total_steps;
        let summary = runner.join().unwrap();
        assert_eq!(summary.steps, total);
        assert!(summary.final_coverage_percent >= 0.0);
    }

    #[test]
    fn test_progress_after_completion() {
        let runner = runner(None);
        runner.start();
        while runner.state() == RunnerState::Running {
            thread::sleep(Duration::from_millis(5));
        }
        let progress = runner.progress();
        assert_eq!(progress.state, RunnerState::Finished);
        assert_eq!(progress.steps_taken, progress.total_steps);
        assert_eq!(progress.latest_pose.map(|p| p.step), Some(progress.total_steps - 1));

        let frame = runner.latest_frame().unwrap();
        assert_eq!((frame.width, frame.height), (16, 16));
        assert_eq!(frame.rgb.len(), 16 * 16 * 3);
    }

    #[test]
    fn test_join_without_start_fails() {
        let runner = runner(None);
        assert!(runner.join().is_err());
    }

    #[test]
    fn test_sink_failure_sets_error_state() {
        let runner = runner(Some(Box::new(FailingSink)));
        runner.start();
        let err = runner.join().unwrap_err();
        assert!(err.contains("disk full"), "{}", err);
    }
}
