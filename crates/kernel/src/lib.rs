//! Spray Paint Simulation Kernel
//!
//! This crate simulates a two-link robot arm sweeping a spray nozzle across
//! a flat wall and accumulates the paint it deposits into a coverage texture.
//! It is compute-only: no file formats, no rendering beyond an RGB copy-out.
//!
//! # Modules
//! - [`kinematics`] -- Closed-form two-link inverse kinematics with reach clamping.
//! - [`path`] -- Serpentine raster planner mapping a step index to a wall target.
//! - [`emission`] -- Fan and cone direction sampling.
//! - [`particle`] -- Fixed-capacity struct-of-arrays particle ring.
//! - [`transport`] -- Ray and ballistic particle transport to the wall plane.
//! - [`splat`] -- Hit footprints and the order-independent deposit buffer.
//! - [`texture`] -- Blur, decay, clamping, coverage and RGB rendering.
//! - [`dispatch`] -- Serial or rayon execution of per-element phases.
//! - [`params`] -- Runtime parameters and validation.

#![warn(missing_docs)]

pub mod dispatch;
pub mod emission;
pub mod error;
pub mod kinematics;
pub mod params;
pub mod particle;
pub mod path;
pub mod splat;
pub mod texture;
pub mod transport;

use rand::rngs::StdRng;
use rand::SeedableRng;

pub use dispatch::Backend;
pub use emission::{EmissionSample, FanProfile, FanSampler, FanShape};
pub use error::{ConfigError, Result};
pub use kinematics::{forward_kinematics, ElbowBranch, JointPose, TwoLinkArm};
pub use params::{
    ArmParams, FanParams, IntensityParams, RasterParams, SprayParams, TextureParams,
    TransportParams, WallParams,
};
pub use particle::{ParticleRing, ParticleState};
pub use path::{RasterPath, TravelDirection};
pub use splat::{DepositBuffer, Splat, SplatFalloff, SplatKernel};
pub use texture::{Background, GaussianKernel, RenderParams, RgbFrame, Texture};
pub use transport::{DepositionMode, IntensityFalloff, IntensityModel, Integrator, WallHit};

// ---------------------------------------------------------------------------
// SimulationKernel trait
// ---------------------------------------------------------------------------

/// Outcome of one simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Index of the step just taken
    pub step: usize,
    /// Planner target `[x, z]`
    pub target: [f32; 2],
    /// Solved arm pose
    pub pose: JointPose,
    /// Accumulation coverage after the step (percent)
    pub coverage_percent: f32,
    /// Hits deposited this step
    pub hits: usize,
}

/// Interface the orchestrator drives. [`Simulation`] is the only
/// implementation; the trait keeps the driver testable with fakes.
pub trait SimulationKernel {
    /// Advance one step.
    fn step(&mut self) -> StepResult;

    /// Copy the accumulation texture out as an RGB image.
    fn read_texture(&self) -> RgbFrame;

    /// Steps in a complete raster run.
    fn total_steps(&self) -> usize;

    /// Steps taken so far.
    fn steps_taken(&self) -> usize;

    /// Current coverage (percent).
    fn coverage_percent(&self) -> f32;
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Owns every piece of mutable state for one run: textures, particle ring,
/// deposit buffer and RNG.
///
/// Each call to [`Simulation::step`] runs these phases in order, each one
/// finishing before the next starts:
///
/// 1. Plan the target and solve the arm pose
/// 2. Sample spray directions (serial, seeded)
/// 3. Transport to the wall (parallel per sample or slot)
/// 4. Build splats (serial, seeded) and scatter them (parallel, atomic)
/// 5. Resolve into both textures
/// 6. Blur, decay fresh, clamp
/// 7. Measure coverage
pub struct Simulation {
    params: SprayParams,
    path: RasterPath,
    arm: TwoLinkArm,
    sampler: FanSampler,
    intensity: IntensityModel,
    integrator: Integrator,
    ring: ParticleRing,
    deposit: DepositBuffer,
    accumulation: Texture,
    fresh: Texture,
    blur: Option<GaussianKernel>,
    scratch: Vec<f32>,
    rng: StdRng,
    steps_taken: usize,
    coverage: f32,
}

impl Simulation {
    /// Validate `params` and allocate a fresh simulation.
    pub fn configure(params: SprayParams) -> Result<Self> {
        params.validate()?;

        let path = RasterPath::new(&params.wall, &params.raster);
        let arm = TwoLinkArm::new(
            params.arm.base,
            params.arm.link_lengths[0],
            params.arm.link_lengths[1],
            params.arm.branch,
        );
        let sampler = FanSampler::new(params.fan.shape, params.fan.profile);
        let intensity = IntensityModel::new(&params.intensity, params.raster.pass_speed);
        let integrator = Integrator::new(&params.transport);
        let capacity = match params.transport.mode {
            DepositionMode::Ray => 0,
            DepositionMode::Particle => params.transport.particle_capacity,
        };
        let (tw, th) = (params.texture.width, params.texture.height);

        tracing::info!(
            "Configured spray simulation: wall {}x{} m, texture {}x{}, {} rows x {} frames, {:?} mode, {:?} backend",
            params.wall.width,
            params.wall.height,
            tw,
            th,
            path.rows(),
            path.frames_per_row(),
            params.transport.mode,
            params.backend,
        );

        Ok(Self {
            path,
            arm,
            sampler,
            intensity,
            integrator,
            ring: ParticleRing::new(capacity),
            deposit: DepositBuffer::new(tw, th),
            accumulation: Texture::new(tw, th),
            fresh: Texture::new(tw, th),
            blur: GaussianKernel::new(params.texture.blur_sigma),
            scratch: Vec::with_capacity(tw * th),
            rng: StdRng::seed_from_u64(params.seed),
            steps_taken: 0,
            coverage: 0.0,
            params,
        })
    }

    /// Advance one step.
    pub fn step(&mut self) -> StepResult {
        let backend = self.params.backend;
        let step = self.steps_taken;

        // --- 1. Plan and solve ---
        let target = self.path.target(step);
        let pose = self.arm.solve(target);
        let origin = [pose.tool[0], self.params.wall.standoff, pose.tool[1]];

        // --- 2. Sample ---
        let samples = self
            .sampler
            .sample_batch(self.params.emit_per_step as usize, &mut self.rng);

        // --- 3. Transport ---
        let hits = match self.params.transport.mode {
            DepositionMode::Ray => transport::trace_rays(
                backend,
                origin,
                &samples,
                &self.params.wall,
                &self.intensity,
            ),
            DepositionMode::Particle => {
                transport::spawn_particles(
                    &mut self.ring,
                    origin,
                    &samples,
                    self.params.transport.particle_speed,
                );
                transport::advance_particles(
                    backend,
                    &mut self.ring,
                    &self.integrator,
                    &self.params.wall,
                    &self.intensity,
                )
            }
        };

        // --- 4. Splat ---
        let (tw, th) = (self.accumulation.width(), self.accumulation.height());
        let kernel = self.params.splat;
        let splats: Vec<Splat> = hits
            .iter()
            .map(|hit| Splat::from_hit(hit, tw, th, &kernel, &mut self.rng))
            .collect();
        self.deposit.scatter(backend, &splats, &kernel);

        // --- 5. Resolve ---
        self.deposit.resolve(
            backend,
            self.accumulation.data_mut(),
            self.fresh.data_mut(),
        );

        // --- 6. Composite ---
        if let Some(gauss) = &self.blur {
            texture::blur(backend, &mut self.accumulation, gauss, &mut self.scratch);
            texture::blur(backend, &mut self.fresh, gauss, &mut self.scratch);
        }
        let decay = self.params.texture.decay_factor;
        if decay < 1.0 {
            self.fresh.scale(backend, decay);
        }
        self.accumulation.clamp_unit(backend);
        self.fresh.clamp_unit(backend);

        // --- 7. Coverage ---
        self.coverage = self
            .accumulation
            .coverage_percent(backend, self.params.texture.coverage_threshold);
        self.steps_taken += 1;

        tracing::debug!(
            "step {}: target ({:.3}, {:.3}), {} hits, coverage {:.2}%",
            step,
            target[0],
            target[1],
            hits.len(),
            self.coverage,
        );

        StepResult {
            step,
            target,
            pose,
            coverage_percent: self.coverage,
            hits: hits.len(),
        }
    }

    /// Copy the accumulation texture out as an RGB image.
    pub fn read_texture(&self) -> RgbFrame {
        texture::render(&self.accumulation, &self.params.render, self.params.emit_per_step)
    }

    /// Steps in a complete raster run.
    pub fn total_steps(&self) -> usize {
        self.path.total_steps()
    }

    /// Steps taken so far.
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Coverage after the last step (percent).
    pub fn coverage_percent(&self) -> f32 {
        self.coverage
    }

    /// Permanent paint layer.
    pub fn accumulation(&self) -> &Texture {
        &self.accumulation
    }

    /// Decaying wet layer.
    pub fn fresh(&self) -> &Texture {
        &self.fresh
    }

    /// Particles in flight; always 0 in ray mode.
    pub fn live_particles(&self) -> usize {
        self.ring.live_count()
    }

    /// Parameters this simulation was configured with.
    pub fn params(&self) -> &SprayParams {
        &self.params
    }

    /// The raster planner.
    pub fn path(&self) -> &RasterPath {
        &self.path
    }

    /// The particle ring; never spawned into in ray mode.
    pub fn particles(&self) -> &ParticleRing {
        &self.ring
    }
}

impl SimulationKernel for Simulation {
    fn step(&mut self) -> StepResult {
        Simulation::step(self)
    }

    fn read_texture(&self) -> RgbFrame {
        Simulation::read_texture(self)
    }

    fn total_steps(&self) -> usize {
        Simulation::total_steps(self)
    }

    fn steps_taken(&self) -> usize {
        Simulation::steps_taken(self)
    }

    fn coverage_percent(&self) -> f32 {
        Simulation::coverage_percent(self)
    }
}
