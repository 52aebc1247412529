//! Splat deposition into the paint textures.
//!
//! Hits are first turned into [`Splat`]s (serially, since the disc kernel
//! draws a radius from the simulation RNG), then scattered into a
//! [`DepositBuffer`] of fixed-point atomic counters. Integer addition is
//! associative and commutative, so the resolved textures are bit-identical
//! no matter how the scatter is scheduled.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dispatch::Backend;
use crate::error::{ConfigError, Result};
use crate::transport::WallHit;

/// Fixed-point scale for deposited intensity (32 fractional bits).
const FIXED_SCALE: f64 = 4_294_967_296.0;

/// Radial falloff for the disc kernel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SplatFalloff {
    /// `1 - d`
    #[default]
    Linear,
    /// `(1 - d)^exponent`
    Power {
        /// Falloff exponent
        exponent: f32,
    },
}

/// Footprint of a single hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SplatKernel {
    /// Flat square stamp of side `2 * radius_px + 1`
    Square {
        /// Half-width in texels
        radius_px: u32,
    },
    /// Round stamp with a random radius per hit
    Disc {
        /// Smallest radius (texels)
        min_radius_px: f32,
        /// Largest radius (texels)
        max_radius_px: f32,
        /// Radial falloff
        falloff: SplatFalloff,
    },
    /// Horizontally stretched stamp matching a flat fan's footprint
    Ellipse {
        /// Vertical radius (texels)
        radius_px: f32,
        /// Horizontal stretch
        aspect_x: f32,
        /// Edge softness exponent
        edge_power: f32,
    },
}

impl Default for SplatKernel {
    fn default() -> Self {
        Self::Ellipse {
            radius_px: 2.0,
            aspect_x: 2.5,
            edge_power: 1.5,
        }
    }
}

impl SplatKernel {
    /// Check radii and exponents.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Square { .. } => Ok(()),
            Self::Disc {
                min_radius_px,
                max_radius_px,
                falloff,
            } => {
                if !(min_radius_px.is_finite() && min_radius_px > 0.0) {
                    return Err(ConfigError::NonPositive {
                        name: "splat.min_radius_px",
                        value: min_radius_px,
                    });
                }
                if !(max_radius_px.is_finite() && max_radius_px >= min_radius_px) {
                    return Err(ConfigError::out_of_range(
                        "splat.max_radius_px",
                        format!("must be >= min_radius_px ({min_radius_px}), got {max_radius_px}"),
                    ));
                }
                if let SplatFalloff::Power { exponent } = falloff {
                    if !(exponent.is_finite() && exponent >= 0.0) {
                        return Err(ConfigError::out_of_range(
                            "splat.falloff.exponent",
                            format!("must be finite and >= 0, got {exponent}"),
                        ));
                    }
                }
                Ok(())
            }
            Self::Ellipse {
                radius_px,
                aspect_x,
                edge_power,
            } => {
                if !(radius_px.is_finite() && radius_px > 0.0) {
                    return Err(ConfigError::NonPositive {
                        name: "splat.radius_px",
                        value: radius_px,
                    });
                }
                if !(aspect_x.is_finite() && aspect_x > 0.0) {
                    return Err(ConfigError::NonPositive {
                        name: "splat.aspect_x",
                        value: aspect_x,
                    });
                }
                if !(edge_power.is_finite() && edge_power >= 0.0) {
                    return Err(ConfigError::out_of_range(
                        "splat.edge_power",
                        format!("must be finite and >= 0, got {edge_power}"),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Largest footprint half-width in texels.
    pub fn max_extent_px(&self) -> f32 {
        match *self {
            Self::Square { radius_px } => radius_px as f32,
            Self::Disc { max_radius_px, .. } => max_radius_px,
            Self::Ellipse {
                radius_px,
                aspect_x,
                ..
            } => radius_px * aspect_x.max(1.0),
        }
    }

    /// Reject footprints wider than a `texture_extent`-texel texture, which
    /// would only burn time stamping off-texture texels.
    pub fn check_extent(&self, texture_extent: usize) -> Result<()> {
        let extent = self.max_extent_px();
        if extent > texture_extent as f32 {
            return Err(ConfigError::out_of_range(
                "splat",
                format!("footprint radius {extent} exceeds the texture size ({texture_extent})"),
            ));
        }
        Ok(())
    }
}

/// A hit resolved to texel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splat {
    /// Centre column
    pub cx: i64,
    /// Centre row, 0 at the top
    pub cy: i64,
    /// Disc radius for this hit; unused by the other kernels
    pub radius: f32,
    /// Peak intensity
    pub weight: f32,
}

impl Splat {
    /// Map a hit onto a `width x height` texture.
    pub fn from_hit<R: Rng + ?Sized>(
        hit: &WallHit,
        width: usize,
        height: usize,
        kernel: &SplatKernel,
        rng: &mut R,
    ) -> Self {
        let cx = (hit.u * (width.saturating_sub(1)) as f32).floor() as i64;
        let cy = ((1.0 - hit.v) * (height.saturating_sub(1)) as f32).floor() as i64;
        let radius = match *kernel {
            SplatKernel::Disc {
                min_radius_px,
                max_radius_px,
                ..
            } => min_radius_px + rng.random::<f32>() * (max_radius_px - min_radius_px),
            _ => 0.0,
        };
        Self {
            cx,
            cy,
            radius,
            weight: hit.weight,
        }
    }

    /// Add this splat's footprint to `buffer`. Texels off the texture are
    /// skipped.
    pub fn deposit(&self, kernel: &SplatKernel, buffer: &DepositBuffer) {
        if self.weight <= 0.0 {
            return;
        }
        match *kernel {
            SplatKernel::Square { radius_px } => {
                let r = radius_px as i64;
                for dy in -r..=r {
                    for dx in -r..=r {
                        buffer.add(self.cx + dx, self.cy + dy, self.weight);
                    }
                }
            }
            SplatKernel::Disc { falloff, .. } => {
                let radius = self.radius.max(f32::EPSILON);
                let r = radius.ceil() as i64;
                for dy in -r..=r {
                    for dx in -r..=r {
                        let d = ((dx * dx + dy * dy) as f32).sqrt() / radius;
                        if d > 1.0 {
                            continue;
                        }
                        let f = match falloff {
                            SplatFalloff::Linear => 1.0 - d,
                            SplatFalloff::Power { exponent } => (1.0 - d).powf(exponent),
                        };
                        buffer.add(self.cx + dx, self.cy + dy, self.weight * f);
                    }
                }
            }
            SplatKernel::Ellipse {
                radius_px,
                aspect_x,
                edge_power,
            } => {
                let rx = ((radius_px * aspect_x).round() as i64).max(1);
                let rz = (radius_px.round() as i64).max(1);
                for dy in -rz..=rz {
                    let ny = dy as f32 / rz as f32;
                    for dx in -rx..=rx {
                        let nx = dx as f32 / rx as f32;
                        // Rim rows carry no paint, even at edge_power 0
                        if nx * nx + ny * ny > 1.0 || 1.0 - ny * ny <= 0.0 {
                            continue;
                        }
                        let f = (1.0 - nx.abs()).powf(edge_power) * (1.0 - ny * ny).powf(edge_power);
                        buffer.add(self.cx + dx, self.cy + dy, self.weight * f);
                    }
                }
            }
        }
    }
}

/// Fixed-point accumulation buffer shared by concurrent splats.
#[derive(Debug)]
pub struct DepositBuffer {
    width: usize,
    height: usize,
    cells: Vec<AtomicU64>,
}

impl DepositBuffer {
    /// Zeroed buffer of `width x height` cells.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: (0..width * height).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Add `value` at texel `(x, y)`; out-of-bounds texels are ignored.
    pub fn add(&self, x: i64, y: i64, value: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height || value <= 0.0 {
            return;
        }
        let q = (value as f64 * FIXED_SCALE).round() as u64;
        self.cells[y as usize * self.width + x as usize].fetch_add(q, Ordering::Relaxed);
    }

    /// Current value at a flat index.
    pub fn value(&self, index: usize) -> f32 {
        (self.cells[index].load(Ordering::Relaxed) as f64 / FIXED_SCALE) as f32
    }

    /// Scatter every splat through `backend`.
    pub fn scatter(&self, backend: Backend, splats: &[Splat], kernel: &SplatKernel) {
        backend.for_each_index(splats.len(), |i| splats[i].deposit(kernel, self));
    }

    /// Add the buffer into both textures and zero it.
    pub fn resolve(&mut self, backend: Backend, accumulation: &mut [f32], fresh: &mut [f32]) {
        let width = self.width;
        let cells = &self.cells;
        backend.for_each_row_mut(accumulation, width, |r, row| {
            for (c, texel) in row.iter_mut().enumerate() {
                let q = cells[r * width + c].load(Ordering::Relaxed);
                *texel += (q as f64 / FIXED_SCALE) as f32;
            }
        });
        backend.for_each_row_mut(fresh, width, |r, row| {
            for (c, texel) in row.iter_mut().enumerate() {
                let q = cells[r * width + c].swap(0, Ordering::Relaxed);
                *texel += (q as f64 / FIXED_SCALE) as f32;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hit(u: f32, v: f32, weight: f32) -> WallHit {
        WallHit { u, v, weight }
    }

    #[test]
    fn centre_pixel_mapping() {
        let mut rng = StdRng::seed_from_u64(0);
        let k = SplatKernel::Square { radius_px: 0 };
        let s = Splat::from_hit(&hit(0.0, 1.0, 1.0), 64, 64, &k, &mut rng);
        assert_eq!((s.cx, s.cy), (0, 0));
        let s = Splat::from_hit(&hit(1.0, 0.0, 1.0), 64, 64, &k, &mut rng);
        assert_eq!((s.cx, s.cy), (63, 63));
    }

    #[test]
    fn square_stamp_is_flat() {
        let buf = DepositBuffer::new(8, 8);
        let s = Splat {
            cx: 4,
            cy: 4,
            radius: 0.0,
            weight: 0.25,
        };
        s.deposit(&SplatKernel::Square { radius_px: 1 }, &buf);
        assert_eq!(buf.value(4 * 8 + 4), 0.25);
        assert_eq!(buf.value(3 * 8 + 5), 0.25);
        assert_eq!(buf.value(2 * 8 + 4), 0.0);
    }

    #[test]
    fn off_texture_texels_are_skipped() {
        let buf = DepositBuffer::new(4, 4);
        let s = Splat {
            cx: 0,
            cy: 0,
            radius: 0.0,
            weight: 0.5,
        };
        s.deposit(&SplatKernel::Square { radius_px: 2 }, &buf);
        // 3x3 of the 5x5 stamp lands on the texture
        let total: f32 = (0..16).map(|i| buf.value(i)).sum();
        assert!((total - 4.5).abs() < 1e-6);
    }

    #[test]
    fn ellipse_is_wider_than_tall() {
        let buf = DepositBuffer::new(32, 32);
        let s = Splat {
            cx: 16,
            cy: 16,
            radius: 0.0,
            weight: 1.0,
        };
        s.deposit(
            &SplatKernel::Ellipse {
                radius_px: 2.0,
                aspect_x: 2.5,
                edge_power: 1.0,
            },
            &buf,
        );
        assert_eq!(buf.value(16 * 32 + 16), 1.0);
        assert!(buf.value(16 * 32 + 20) > 0.0);
        assert_eq!(buf.value(20 * 32 + 16), 0.0);
    }

    #[test]
    fn ellipse_rim_rows_stay_dry_at_zero_edge_power() {
        let buf = DepositBuffer::new(32, 32);
        let s = Splat {
            cx: 16,
            cy: 16,
            radius: 0.0,
            weight: 1.0,
        };
        s.deposit(
            &SplatKernel::Ellipse {
                radius_px: 2.0,
                aspect_x: 2.5,
                edge_power: 0.0,
            },
            &buf,
        );
        // Interior rows get full weight, the ny = +-1 rows get nothing
        assert_eq!(buf.value(16 * 32 + 16), 1.0);
        assert_eq!(buf.value(15 * 32 + 16), 1.0);
        assert_eq!(buf.value(14 * 32 + 16), 0.0);
        assert_eq!(buf.value(18 * 32 + 16), 0.0);
    }

    #[test]
    fn footprint_must_fit_the_texture() {
        let square = SplatKernel::Square { radius_px: 64 };
        assert!(square.check_extent(64).is_ok());
        assert!(square.check_extent(63).is_err());

        let disc = SplatKernel::Disc {
            min_radius_px: 1.0,
            max_radius_px: 1.0e9,
            falloff: SplatFalloff::Linear,
        };
        assert!(disc.validate().is_ok());
        assert!(disc.check_extent(4096).is_err());

        let ellipse = SplatKernel::Ellipse {
            radius_px: 10.0,
            aspect_x: 4.0,
            edge_power: 1.0,
        };
        assert_eq!(ellipse.max_extent_px(), 40.0);
        assert!(ellipse.check_extent(32).is_err());
    }

    #[test]
    fn disc_radius_within_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let k = SplatKernel::Disc {
            min_radius_px: 1.5,
            max_radius_px: 3.0,
            falloff: SplatFalloff::Linear,
        };
        for _ in 0..100 {
            let s = Splat::from_hit(&hit(0.5, 0.5, 1.0), 16, 16, &k, &mut rng);
            assert!(s.radius >= 1.5 && s.radius <= 3.0);
        }
    }

    #[test]
    fn resolve_adds_to_both_and_clears() {
        let mut buf = DepositBuffer::new(2, 2);
        buf.add(1, 0, 0.5);
        let mut acc = vec![0.25; 4];
        let mut fresh = vec![0.0; 4];
        buf.resolve(Backend::Serial, &mut acc, &mut fresh);
        assert_eq!(acc[1], 0.75);
        assert_eq!(fresh[1], 0.5);
        assert_eq!(buf.value(1), 0.0);
    }

    #[test]
    fn validation_rejects_inverted_disc() {
        let k = SplatKernel::Disc {
            min_radius_px: 3.0,
            max_radius_px: 1.0,
            falloff: SplatFalloff::Linear,
        };
        assert!(k.validate().is_err());
    }
}
