//! Runtime parameters for a spray simulation.
//!
//! Every struct carries `#[serde(default)]` so a JSON config only needs to
//! name the fields it changes. [`SprayParams::validate`] is the single gate
//! between untrusted input and the kernel.

use serde::{Deserialize, Serialize};

use crate::dispatch::Backend;
use crate::emission::{FanProfile, FanShape};
use crate::error::{require_positive, ConfigError, Result};
use crate::kinematics::{ElbowBranch, REACH_EPSILON};
use crate::path::{RasterPath, TravelDirection};
use crate::splat::SplatKernel;
use crate::texture::RenderParams;
use crate::transport::{DepositionMode, IntensityFalloff};

/// Wall rectangle in the plane `y = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallParams {
    /// Width along x (meters)
    pub width: f32,
    /// Height along z (meters)
    pub height: f32,
    /// Left edge x coordinate (meters)
    pub offset_x: f32,
    /// Nozzle distance from the wall along +y (meters)
    pub standoff: f32,
}

impl Default for WallParams {
    fn default() -> Self {
        Self {
            width: 4.0,
            height: 2.0,
            offset_x: 0.0,
            standoff: 0.3,
        }
    }
}

impl WallParams {
    /// The four corners `[x, z]`, bottom-left first, counter-clockwise.
    pub fn corners(&self) -> [[f32; 2]; 4] {
        let x0 = self.offset_x;
        let x1 = self.offset_x + self.width;
        [[x0, 0.0], [x1, 0.0], [x1, self.height], [x0, self.height]]
    }
}

/// Serpentine raster settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterParams {
    /// Vertical distance between passes (meters)
    pub row_pitch: f32,
    /// Nozzle travel speed along a pass (m/s)
    pub pass_speed: f32,
    /// Steps per second of simulated time
    pub frame_rate: f32,
    /// Overshoot past each side edge (meters)
    pub edge_margin: f32,
    /// Direction of the top row
    pub first_row_direction: TravelDirection,
}

impl Default for RasterParams {
    fn default() -> Self {
        Self {
            row_pitch: 0.15,
            pass_speed: 0.2,
            frame_rate: 30.0,
            edge_margin: 0.0,
            first_row_direction: TravelDirection::LeftToRight,
        }
    }
}

/// Two-link arm geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmParams {
    /// Shoulder position `[x, z]` in wall coordinates
    pub base: [f32; 2],
    /// `[L1, L2]` (meters)
    pub link_lengths: [f32; 2],
    /// IK solution branch
    pub branch: ElbowBranch,
}

impl Default for ArmParams {
    fn default() -> Self {
        Self {
            base: [2.0, -0.5],
            link_lengths: [2.9, 2.6],
            branch: ElbowBranch::Up,
        }
    }
}

/// Nozzle spray pattern.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FanParams {
    /// Angular extent
    pub shape: FanShape,
    /// Horizontal density profile
    pub profile: FanProfile,
}

/// Ballistic transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportParams {
    /// Straight rays or integrated particles
    pub mode: DepositionMode,
    /// Ring buffer size in particle mode
    pub particle_capacity: usize,
    /// Launch speed (m/s)
    pub particle_speed: f32,
    /// Gravitational acceleration (m/s^2)
    pub gravity: [f32; 3],
    /// Linear drag coefficient (1/s)
    pub drag: f32,
    /// Integration timestep (seconds)
    pub dt: f32,
    /// Integration substeps per simulation step
    pub substeps: u32,
    /// Particles older than this are retired (seconds)
    pub max_age: f32,
}

impl Default for TransportParams {
    fn default() -> Self {
        Self {
            mode: DepositionMode::Ray,
            particle_capacity: 200_000,
            particle_speed: 8.0,
            gravity: [0.0, 0.0, -9.81],
            drag: 0.5,
            dt: 1.0 / 60.0,
            substeps: 1,
            max_age: 2.0,
        }
    }
}

/// Per-hit intensity model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityParams {
    /// Intensity of a centred, unattenuated hit
    pub base: f32,
    /// Distance or incidence attenuation
    pub falloff: IntensityFalloff,
    /// Pass speed at which no compensation applies; `None` disables it
    pub speed_reference: Option<f32>,
}

impl Default for IntensityParams {
    fn default() -> Self {
        Self {
            base: 0.02,
            falloff: IntensityFalloff::None,
            speed_reference: None,
        }
    }
}

/// Texture resolution and compositing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureParams {
    /// Width in texels
    pub width: usize,
    /// Height in texels
    pub height: usize,
    /// Overspray blur sigma in texels; `<= 0` disables the blur
    pub blur_sigma: f32,
    /// Per-step multiplier on the fresh layer, in (0, 1]
    pub decay_factor: f32,
    /// Accumulation level counted as covered
    pub coverage_threshold: f32,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            blur_sigma: 1.0,
            decay_factor: 0.9,
            coverage_threshold: 0.5,
        }
    }
}

fn default_emit_per_step() -> u32 {
    2000
}

fn default_seed() -> u64 {
    0xA5A5A5
}

/// Complete parameter bundle for [`crate::Simulation::configure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprayParams {
    /// Wall geometry
    #[serde(default)]
    pub wall: WallParams,
    /// Path planner
    #[serde(default)]
    pub raster: RasterParams,
    /// Arm geometry
    #[serde(default)]
    pub arm: ArmParams,
    /// Spray pattern
    #[serde(default)]
    pub fan: FanParams,
    /// Samples emitted each step
    #[serde(default = "default_emit_per_step")]
    pub emit_per_step: u32,
    /// Transport model
    #[serde(default)]
    pub transport: TransportParams,
    /// Hit intensity model
    #[serde(default)]
    pub intensity: IntensityParams,
    /// Deposition footprint
    #[serde(default)]
    pub splat: SplatKernel,
    /// Texture settings
    #[serde(default)]
    pub texture: TextureParams,
    /// RGB rendering
    #[serde(default)]
    pub render: RenderParams,
    /// Serial or rayon execution
    #[serde(default)]
    pub backend: Backend,
    /// RNG seed
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SprayParams {
    fn default() -> Self {
        Self {
            wall: WallParams::default(),
            raster: RasterParams::default(),
            arm: ArmParams::default(),
            fan: FanParams::default(),
            emit_per_step: default_emit_per_step(),
            transport: TransportParams::default(),
            intensity: IntensityParams::default(),
            splat: SplatKernel::default(),
            texture: TextureParams::default(),
            render: RenderParams::default(),
            backend: Backend::default(),
            seed: default_seed(),
        }
    }
}

impl SprayParams {
    /// Check every parameter. The first problem found is returned.
    pub fn validate(&self) -> Result<()> {
        // --- Wall ---
        require_positive("wall.width", self.wall.width)?;
        require_positive("wall.height", self.wall.height)?;
        require_positive("wall.standoff", self.wall.standoff)?;
        require_finite("wall.offset_x", self.wall.offset_x)?;

        // --- Raster ---
        let pitch = self.raster.row_pitch;
        if !(pitch.is_finite() && pitch > 0.0) {
            return Err(ConfigError::InvalidRowPitch(pitch));
        }
        require_positive("raster.pass_speed", self.raster.pass_speed)?;
        require_positive("raster.frame_rate", self.raster.frame_rate)?;
        if !(self.raster.edge_margin.is_finite() && self.raster.edge_margin >= 0.0) {
            return Err(ConfigError::out_of_range(
                "raster.edge_margin",
                format!("must be finite and >= 0, got {}", self.raster.edge_margin),
            ));
        }
        if RasterPath::checked_total_steps(&self.wall, &self.raster).is_none() {
            return Err(ConfigError::out_of_range(
                "raster",
                format!(
                    "step count overflows at pass_speed {} and frame_rate {}",
                    self.raster.pass_speed, self.raster.frame_rate
                ),
            ));
        }

        // --- Arm ---
        let [l1, l2] = self.arm.link_lengths;
        require_positive("arm.link_lengths[0]", l1)?;
        require_positive("arm.link_lengths[1]", l2)?;
        require_finite("arm.base[0]", self.arm.base[0])?;
        require_finite("arm.base[1]", self.arm.base[1])?;
        let reach = l1 + l2;
        for [x, z] in self.wall.corners() {
            let distance = ((x - self.arm.base[0]).powi(2) + (z - self.arm.base[1]).powi(2)).sqrt();
            // The solver clamps targets to `reach - REACH_EPSILON`
            if distance > reach - REACH_EPSILON {
                return Err(ConfigError::UnreachableCorner {
                    x,
                    z,
                    distance,
                    reach,
                });
            }
        }

        // --- Emission ---
        self.fan.shape.validate()?;
        self.fan.profile.validate()?;

        // --- Transport ---
        let t = &self.transport;
        require_positive("transport.particle_speed", t.particle_speed)?;
        require_positive("transport.dt", t.dt)?;
        require_positive("transport.max_age", t.max_age)?;
        if !(t.drag.is_finite() && t.drag >= 0.0) {
            return Err(ConfigError::out_of_range(
                "transport.drag",
                format!("must be finite and >= 0, got {}", t.drag),
            ));
        }
        for g in t.gravity {
            require_finite("transport.gravity", g)?;
        }
        if t.substeps == 0 {
            return Err(ConfigError::out_of_range("transport.substeps", "must be at least 1"));
        }
        if t.mode == DepositionMode::Particle && t.particle_capacity == 0 {
            return Err(ConfigError::out_of_range(
                "transport.particle_capacity",
                "must be at least 1 in particle mode",
            ));
        }

        // --- Intensity ---
        if !(self.intensity.base.is_finite() && self.intensity.base >= 0.0) {
            return Err(ConfigError::out_of_range(
                "intensity.base",
                format!("must be finite and >= 0, got {}", self.intensity.base),
            ));
        }
        self.intensity.falloff.validate()?;
        if let Some(reference) = self.intensity.speed_reference {
            require_positive("intensity.speed_reference", reference)?;
        }

        // --- Texture ---
        let tex = &self.texture;
        if tex.width == 0 || tex.height == 0 {
            return Err(ConfigError::InvalidResolution {
                width: tex.width,
                height: tex.height,
            });
        }
        match tex.width.checked_mul(tex.height) {
            Some(texels) if texels <= MAX_TEXELS => {}
            _ => {
                return Err(ConfigError::out_of_range(
                    "texture",
                    format!(
                        "{}x{} exceeds the {} texel limit",
                        tex.width, tex.height, MAX_TEXELS
                    ),
                ))
            }
        }

        let extent = tex.width.max(tex.height);
        require_finite("texture.blur_sigma", tex.blur_sigma)?;
        if tex.blur_sigma > extent as f32 {
            return Err(ConfigError::out_of_range(
                "texture.blur_sigma",
                format!("must not exceed the texture size ({extent}), got {}", tex.blur_sigma),
            ));
        }
        if !(tex.decay_factor > 0.0 && tex.decay_factor <= 1.0) {
            return Err(ConfigError::out_of_range(
                "texture.decay_factor",
                format!("must be in (0, 1], got {}", tex.decay_factor),
            ));
        }
        if !(0.0..=1.0).contains(&tex.coverage_threshold) {
            return Err(ConfigError::out_of_range(
                "texture.coverage_threshold",
                format!("must be in [0, 1], got {}", tex.coverage_threshold),
            ));
        }

        // --- Splat ---
        self.splat.validate()?;
        self.splat.check_extent(extent)?;

        // --- Render ---
        self.render.validate()?;

        Ok(())
    }
}

/// Largest texture accepted, in texels (16384 x 16384).
pub const MAX_TEXELS: usize = 1 << 28;

fn require_finite(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(name, format!("must be finite, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SprayParams::default().validate().unwrap();
    }

    #[test]
    fn short_arm_cannot_reach_far_corner() {
        let mut p = SprayParams::default();
        p.arm.link_lengths = [1.0, 1.0];
        match p.validate() {
            Err(ConfigError::UnreachableCorner { reach, distance, .. }) => {
                assert!((reach - 2.0).abs() < 1e-6);
                assert!(distance > reach);
            }
            other => panic!("expected UnreachableCorner, got {:?}", other),
        }
    }

    #[test]
    fn corner_inside_the_clamp_margin_is_rejected() {
        let mut p = SprayParams::default();
        let [x, z] = p.wall.corners()[3];
        let far = ((x - p.arm.base[0]).powi(2) + (z - p.arm.base[1]).powi(2)).sqrt();
        // Links reach the far corner exactly; the solver would stop short of it
        p.arm.link_lengths = [far * 0.5, far * 0.5];
        assert!(matches!(
            p.validate(),
            Err(ConfigError::UnreachableCorner { .. })
        ));
        p.arm.link_lengths = [far * 0.5, far * 0.5 + 10.0 * REACH_EPSILON];
        assert!(p.validate().is_ok());
    }

    #[test]
    fn step_count_overflow_is_rejected() {
        let mut p = SprayParams::default();
        p.raster.pass_speed = 1.0e-20;
        assert!(matches!(
            p.validate(),
            Err(ConfigError::OutOfRange { name: "raster", .. })
        ));
    }

    #[test]
    fn oversized_texture_is_rejected() {
        let mut p = SprayParams::default();
        p.texture.width = 1 << 33;
        p.texture.height = 1 << 33;
        assert!(matches!(
            p.validate(),
            Err(ConfigError::OutOfRange { name: "texture", .. })
        ));

        p.texture.width = 1 << 20;
        p.texture.height = 1 << 20;
        assert!(p.validate().is_err());

        p.texture.width = 16384;
        p.texture.height = 16384;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn oversized_splat_and_blur_are_rejected() {
        let mut p = SprayParams::default();
        p.texture.width = 64;
        p.texture.height = 32;
        p.splat = SplatKernel::Square { radius_px: u32::MAX };
        assert!(matches!(
            p.validate(),
            Err(ConfigError::OutOfRange { name: "splat", .. })
        ));
        p.splat = SplatKernel::Square { radius_px: 8 };
        assert!(p.validate().is_ok());

        p.texture.blur_sigma = 1.0e30;
        assert!(matches!(
            p.validate(),
            Err(ConfigError::OutOfRange {
                name: "texture.blur_sigma",
                ..
            })
        ));
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let mut p = SprayParams::default();
        p.texture.height = 0;
        assert_eq!(
            p.validate(),
            Err(ConfigError::InvalidResolution {
                width: 512,
                height: 0
            })
        );
    }

    #[test]
    fn non_positive_pitch_is_rejected() {
        let mut p = SprayParams::default();
        p.raster.row_pitch = 0.0;
        assert_eq!(p.validate(), Err(ConfigError::InvalidRowPitch(0.0)));
    }

    #[test]
    fn decay_factor_bounds() {
        let mut p = SprayParams::default();
        p.texture.decay_factor = 1.0;
        assert!(p.validate().is_ok());
        p.texture.decay_factor = 0.0;
        assert!(p.validate().is_err());
        p.texture.decay_factor = 1.5;
        assert!(p.validate().is_err());
    }

    #[test]
    fn particle_mode_needs_capacity() {
        let mut p = SprayParams::default();
        p.transport.mode = DepositionMode::Particle;
        p.transport.particle_capacity = 0;
        assert!(p.validate().is_err());
        p.transport.mode = DepositionMode::Ray;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn degenerate_fan_is_rejected() {
        let mut p = SprayParams::default();
        p.fan.shape = FanShape::Fan {
            width_deg: 0.0,
            thickness_deg: 10.0,
        };
        assert!(matches!(p.validate(), Err(ConfigError::DegenerateFan(_))));
    }
}
