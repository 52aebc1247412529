//! Ballistic transport from the nozzle to the wall plane.
//!
//! Two models share the [`WallHit`] output. In [`DepositionMode::Ray`] every
//! sample is a straight line that either lands this step or is discarded. In
//! [`DepositionMode::Particle`] samples become particles in a
//! [`ParticleRing`] and fly under gravity and linear drag until they cross
//! `y = 0` or age out.

use serde::{Deserialize, Serialize};

use crate::dispatch::Backend;
use crate::emission::EmissionSample;
use crate::error::{require_positive, ConfigError, Result};
use crate::params::{IntensityParams, TransportParams, WallParams};
use crate::particle::{ParticleRing, ParticleState};

/// How samples travel to the wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DepositionMode {
    /// Instant straight-line rays
    #[default]
    Ray,
    /// Integrated particles carried across steps
    Particle,
}

/// Attenuation applied to each hit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum IntensityFalloff {
    /// No attenuation
    #[default]
    None,
    /// `(reference_distance / path_length)^2`, capped at 1
    InverseSquare {
        /// Path length with no attenuation (meters)
        reference_distance: f32,
    },
    /// `|cos(incidence)|^power`
    CosinePower {
        /// Exponent on the incidence cosine
        power: f32,
    },
}

impl IntensityFalloff {
    /// Attenuation for a hit after `path_length` meters arriving with
    /// incidence cosine `incidence`.
    pub fn factor(&self, path_length: f32, incidence: f32) -> f32 {
        match *self {
            Self::None => 1.0,
            Self::InverseSquare { reference_distance } => {
                if path_length <= reference_distance {
                    1.0
                } else {
                    let r = reference_distance / path_length;
                    r * r
                }
            }
            Self::CosinePower { power } => incidence.abs().min(1.0).powf(power),
        }
    }

    /// Parameters must be positive (distance) or non-negative (power).
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::None => Ok(()),
            Self::InverseSquare { reference_distance } => {
                require_positive("intensity.falloff.reference_distance", reference_distance)
            }
            Self::CosinePower { power } => {
                if power.is_finite() && power >= 0.0 {
                    Ok(())
                } else {
                    Err(ConfigError::out_of_range(
                        "intensity.falloff.power",
                        format!("must be finite and >= 0, got {power}"),
                    ))
                }
            }
        }
    }
}

/// A deposit on the wall in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    /// Horizontal position, 0 at the left edge, 1 at the right
    pub u: f32,
    /// Vertical position, 0 at the bottom, 1 at the top
    pub v: f32,
    /// Deposit intensity in [0, 1]
    pub weight: f32,
}

/// Turns a profile weight into a deposit intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityModel {
    base: f32,
    falloff: IntensityFalloff,
    speed_scale: f32,
}

impl IntensityModel {
    /// Build the model; `pass_speed` feeds the optional speed compensation.
    pub fn new(params: &IntensityParams, pass_speed: f32) -> Self {
        let speed_scale = match params.speed_reference {
            Some(reference) => reference / pass_speed,
            None => 1.0,
        };
        Self {
            base: params.base,
            falloff: params.falloff,
            speed_scale,
        }
    }

    /// Deposit intensity, clamped to [0, 1].
    pub fn weight(&self, fan_weight: f32, path_length: f32, incidence: f32) -> f32 {
        let w = self.base * self.speed_scale * self.falloff.factor(path_length, incidence) * fan_weight;
        w.clamp(0.0, 1.0)
    }
}

/// Normalized wall coordinates for a point on the plane, or `None` outside
/// the rectangle.
pub fn wall_uv(wall: &WallParams, x: f32, z: f32) -> Option<(f32, f32)> {
    let u = (x - wall.offset_x) / wall.width;
    let v = z / wall.height;
    if (0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v) {
        Some((u, v))
    } else {
        None
    }
}

/// Intersect a ray with the wall plane. Returns `(u, v, t)`.
pub fn trace_ray(origin: [f32; 3], dir: [f32; 3], wall: &WallParams) -> Option<(f32, f32, f32)> {
    if dir[1] == 0.0 {
        return None;
    }
    let t = -origin[1] / dir[1];
    if t.is_nan() || t <= 0.0 {
        return None;
    }
    let x = origin[0] + t * dir[0];
    let z = origin[2] + t * dir[2];
    wall_uv(wall, x, z).map(|(u, v)| (u, v, t))
}

/// Ray-mode hit for one sample.
pub fn ray_hit(
    origin: [f32; 3],
    sample: &EmissionSample,
    wall: &WallParams,
    intensity: &IntensityModel,
) -> Option<WallHit> {
    let dir = sample.direction();
    let (u, v, t) = trace_ray(origin, dir, wall)?;
    Some(WallHit {
        u,
        v,
        weight: intensity.weight(sample.weight, t, dir[1]),
    })
}

/// Transport every sample as a ray.
pub fn trace_rays(
    backend: Backend,
    origin: [f32; 3],
    samples: &[EmissionSample],
    wall: &WallParams,
    intensity: &IntensityModel,
) -> Vec<WallHit> {
    backend
        .map_indices(samples.len(), |i| ray_hit(origin, &samples[i], wall, intensity))
        .into_iter()
        .flatten()
        .collect()
}

/// Semi-implicit Euler integrator with linear drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrator {
    gravity: [f32; 3],
    drag_scale: f32,
    dt: f32,
    substeps: u32,
    max_age: f32,
}

impl Integrator {
    /// Build from validated transport parameters.
    pub fn new(params: &TransportParams) -> Self {
        Self {
            gravity: params.gravity,
            drag_scale: 1.0 / (1.0 + params.drag * params.dt),
            dt: params.dt,
            substeps: params.substeps,
            max_age: params.max_age,
        }
    }

    /// Advance one particle through every substep of a simulation step.
    ///
    /// Returns the new state and, if it crossed the wall plane inside the
    /// rectangle, the hit. A crossing retires the particle either way.
    pub fn advance(
        &self,
        mut s: ParticleState,
        wall: &WallParams,
        intensity: &IntensityModel,
    ) -> (ParticleState, Option<WallHit>) {
        if !s.alive {
            return (s, None);
        }
        let dt = self.dt;

        for _ in 0..self.substeps {
            let p0 = s.position;
            for k in 0..3 {
                s.velocity[k] = (s.velocity[k] + self.gravity[k] * dt) * self.drag_scale;
                s.position[k] += s.velocity[k] * dt;
            }
            let p1 = s.position;
            let seg = ((p1[0] - p0[0]).powi(2) + (p1[1] - p0[1]).powi(2) + (p1[2] - p0[2]).powi(2)).sqrt();
            s.age += dt;

            if p0[1] > 0.0 && p1[1] <= 0.0 {
                let t = p0[1] / (p0[1] - p1[1]);
                let x = p0[0] + (p1[0] - p0[0]) * t;
                let z = p0[2] + (p1[2] - p0[2]) * t;
                let path_length = s.travelled + seg * t;
                let speed = (s.velocity[0].powi(2) + s.velocity[1].powi(2) + s.velocity[2].powi(2)).sqrt();
                let incidence = if speed > 0.0 { s.velocity[1] / speed } else { 1.0 };

                let hit = wall_uv(wall, x, z).map(|(u, v)| WallHit {
                    u,
                    v,
                    weight: intensity.weight(s.weight, path_length, incidence),
                });
                s.travelled = path_length;
                s.retire();
                return (s, hit);
            }
            s.travelled += seg;
        }

        if s.age > self.max_age {
            s.retire();
        }
        (s, None)
    }
}

/// Spawn one particle per sample at `origin`.
pub fn spawn_particles(
    ring: &mut ParticleRing,
    origin: [f32; 3],
    samples: &[EmissionSample],
    speed: f32,
) {
    for sample in samples {
        let d = sample.direction();
        ring.spawn(origin, [d[0] * speed, d[1] * speed, d[2] * speed], sample.weight);
    }
}

/// Advance every live particle and collect this step's hits.
///
/// Integration runs per slot through `backend`; results are written back
/// serially so the ring is only ever mutated from one thread.
pub fn advance_particles(
    backend: Backend,
    ring: &mut ParticleRing,
    integrator: &Integrator,
    wall: &WallParams,
    intensity: &IntensityModel,
) -> Vec<WallHit> {
    let results = {
        let ring_ref = &*ring;
        backend.map_indices(ring_ref.capacity(), |i| {
            integrator.advance(ring_ref.get(i), wall, intensity)
        })
    };

    let mut hits = Vec::new();
    for (i, (state, hit)) in results.into_iter().enumerate() {
        ring.set(i, &state);
        if let Some(hit) = hit {
            hits.push(hit);
        }
    }
    hits
}
