//! Spray direction sampling.
//!
//! A sample is a pair of angles off the nozzle axis (`-y`): `horizontal`
//! rotates toward `+x`, `vertical` toward `+z`. The horizontal angle follows
//! the configured [`FanProfile`]; the vertical angle is always uniform over
//! the fan thickness.

use std::f32::consts::FRAC_PI_2;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Rejection rounds before a cosine sample falls back to the fan centre.
const MAX_REJECTION_ROUNDS: usize = 64;

/// Angular extent of the spray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FanShape {
    /// Flat fan: full horizontal width and full vertical thickness (degrees)
    Fan {
        /// Full horizontal opening angle
        width_deg: f32,
        /// Full vertical opening angle
        thickness_deg: f32,
    },
    /// Symmetric cone; both half-angles are `angle_deg / 2`
    Cone {
        /// Full opening angle
        angle_deg: f32,
    },
}

impl Default for FanShape {
    fn default() -> Self {
        Self::Fan {
            width_deg: 30.0,
            thickness_deg: 10.0,
        }
    }
}

impl FanShape {
    /// Horizontal and vertical half-angles in radians.
    pub fn half_angles(&self) -> (f32, f32) {
        match *self {
            Self::Fan {
                width_deg,
                thickness_deg,
            } => (
                (0.5 * width_deg).to_radians(),
                (0.5 * thickness_deg).to_radians(),
            ),
            Self::Cone { angle_deg } => {
                let half = (0.5 * angle_deg).to_radians();
                (half, half)
            }
        }
    }

    /// Reject empty or flat-out angles.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Fan {
                width_deg,
                thickness_deg,
            } => {
                if !(width_deg > 0.0 && width_deg < 180.0) {
                    return Err(ConfigError::DegenerateFan(format!(
                        "fan width must be in (0, 180) degrees, got {width_deg}"
                    )));
                }
                if !(thickness_deg >= 0.0 && thickness_deg < 180.0) {
                    return Err(ConfigError::DegenerateFan(format!(
                        "fan thickness must be in [0, 180) degrees, got {thickness_deg}"
                    )));
                }
            }
            Self::Cone { angle_deg } => {
                if !(angle_deg > 0.0 && angle_deg < 180.0) {
                    return Err(ConfigError::DegenerateFan(format!(
                        "cone angle must be in (0, 180) degrees, got {angle_deg}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Horizontal density profile across the fan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FanProfile {
    /// Flat density, every sample weighted 1
    Uniform,
    /// Triangular density peaking at the centre
    Triangular {
        /// Exponent on the `1 - |h|/hw` weight
        weight_power: f32,
    },
    /// `cos(|h|/hw * pi/2)^power` density
    Cosine {
        /// Exponent on the cosine
        power: f32,
    },
}

impl Default for FanProfile {
    fn default() -> Self {
        Self::Triangular { weight_power: 1.0 }
    }
}

impl FanProfile {
    /// Exponents must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let (name, value) = match *self {
            Self::Uniform => return Ok(()),
            Self::Triangular { weight_power } => ("fan.profile.weight_power", weight_power),
            Self::Cosine { power } => ("fan.profile.power", power),
        };
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError::out_of_range(
                name,
                format!("must be finite and >= 0, got {value}"),
            ))
        }
    }
}

/// One sampled spray direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionSample {
    /// Horizontal angle (radians)
    pub horizontal: f32,
    /// Vertical angle (radians)
    pub vertical: f32,
    /// Profile weight in [0, 1]
    pub weight: f32,
}

impl EmissionSample {
    /// Unit direction vector, `normalize(tan h, -1, tan v)`.
    pub fn direction(&self) -> [f32; 3] {
        let x = self.horizontal.tan();
        let z = self.vertical.tan();
        let inv = 1.0 / (x * x + 1.0 + z * z).sqrt();
        [x * inv, -inv, z * inv]
    }
}

/// Draws [`EmissionSample`]s for a fixed shape and profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanSampler {
    half_width: f32,
    half_thickness: f32,
    profile: FanProfile,
}

impl FanSampler {
    /// Sampler for a validated shape.
    pub fn new(shape: FanShape, profile: FanProfile) -> Self {
        let (half_width, half_thickness) = shape.half_angles();
        Self {
            half_width,
            half_thickness,
            profile,
        }
    }

    /// Horizontal half-angle (radians).
    pub fn half_width(&self) -> f32 {
        self.half_width
    }

    /// Vertical half-angle (radians).
    pub fn half_thickness(&self) -> f32 {
        self.half_thickness
    }

    /// Draw a single sample.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> EmissionSample {
        let hw = self.half_width;
        let (horizontal, weight) = match self.profile {
            FanProfile::Uniform => (symmetric(rng, hw), 1.0),
            FanProfile::Triangular { weight_power } => {
                let u: f32 = rng.random();
                let h = if u < 0.5 {
                    -hw + hw * (2.0 * u).sqrt()
                } else {
                    hw - hw * (2.0 * (1.0 - u)).sqrt()
                };
                let w = (1.0 - h.abs() / hw).max(0.0).powf(weight_power);
                (h, w)
            }
            FanProfile::Cosine { power } => {
                let mut accepted = (0.0, 1.0);
                for _ in 0..MAX_REJECTION_ROUNDS {
                    let h = symmetric(rng, hw);
                    let w = (h.abs() / hw * FRAC_PI_2).cos().max(0.0).powf(power);
                    if rng.random::<f32>() <= w {
                        accepted = (h, w);
                        break;
                    }
                }
                accepted
            }
        };
        let vertical = symmetric(rng, self.half_thickness);

        EmissionSample {
            horizontal,
            vertical,
            weight: weight.clamp(0.0, 1.0),
        }
    }

    /// Draw `count` samples in order. A zero count yields an empty batch.
    pub fn sample_batch<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<EmissionSample> {
        (0..count).map(|_| self.sample(rng)).collect()
    }
}

/// Uniform draw from `[-half, half]`; zero when `half` is zero.
fn symmetric<R: Rng + ?Sized>(rng: &mut R, half: f32) -> f32 {
    (2.0 * rng.random::<f32>() - 1.0) * half
}
