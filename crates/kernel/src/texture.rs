//! Paint textures and the per-step compositing passes.
//!
//! Textures are row-major `f32` grids with row 0 at the top of the wall.
//! Each pass is a row-parallel transform through [`Backend`]; the separable
//! blur reads a full horizontal result before the vertical pass starts.

use serde::{Deserialize, Serialize};

use crate::dispatch::Backend;
use crate::error::{require_positive, ConfigError, Result};

// ---------------------------------------------------------------------------
// Texture
// ---------------------------------------------------------------------------

/// Scalar intensity grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Texture {
    /// Zeroed `width x height` texture.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Width in texels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in texels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major texel values.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable row-major texel values.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Value at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Largest texel value.
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }

    /// Multiply every texel by `factor`.
    pub fn scale(&mut self, backend: Backend, factor: f32) {
        backend.for_each_row_mut(&mut self.data, self.width, |_, row| {
            for v in row.iter_mut() {
                *v *= factor;
            }
        });
    }

    /// Clamp every texel to [0, 1].
    pub fn clamp_unit(&mut self, backend: Backend) {
        backend.for_each_row_mut(&mut self.data, self.width, |_, row| {
            for v in row.iter_mut() {
                *v = v.clamp(0.0, 1.0);
            }
        });
    }

    /// Percentage of texels at or above `threshold`.
    pub fn coverage_percent(&self, backend: Backend, threshold: f32) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let covered = backend.count(&self.data, |v| v >= threshold);
        100.0 * covered as f32 / self.data.len() as f32
    }
}

// ---------------------------------------------------------------------------
// Gaussian blur
// ---------------------------------------------------------------------------

/// Normalized 1D Gaussian weights.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    radius: usize,
    weights: Vec<f32>,
}

impl GaussianKernel {
    /// Kernel for `sigma` texels, radius `max(1, floor(3 sigma))`.
    ///
    /// Returns `None` when `sigma <= 0`, meaning no blur.
    pub fn new(sigma: f32) -> Option<Self> {
        if sigma.is_nan() || sigma <= 0.0 {
            return None;
        }
        let radius = ((3.0 * sigma).floor() as usize).max(1);
        let mut weights: Vec<f32> = (0..=2 * radius)
            .map(|k| {
                let x = k as f32 - radius as f32;
                (-0.5 * (x / sigma) * (x / sigma)).exp()
            })
            .collect();
        let sum: f32 = weights.iter().sum();
        for w in &mut weights {
            *w /= sum;
        }
        Some(Self { radius, weights })
    }

    /// Half-width in texels.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Weights from `-radius` to `+radius`.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

/// Separable blur of `tex` in place using `scratch` for the horizontal pass.
/// Edges are clamped.
pub fn blur(backend: Backend, tex: &mut Texture, kernel: &GaussianKernel, scratch: &mut Vec<f32>) {
    let (w, h) = (tex.width, tex.height);
    let r = kernel.radius as i64;
    let weights = &kernel.weights;
    scratch.resize(w * h, 0.0);

    // --- Horizontal: tex -> scratch ---
    {
        let src = &tex.data;
        backend.for_each_row_mut(scratch.as_mut_slice(), w, |y, row| {
            let line = &src[y * w..(y + 1) * w];
            for (x, out) in row.iter_mut().enumerate() {
                let mut s = 0.0;
                for (k, wk) in weights.iter().enumerate() {
                    let xx = (x as i64 + k as i64 - r).clamp(0, w as i64 - 1) as usize;
                    s += line[xx] * wk;
                }
                *out = s;
            }
        });
    }

    // --- Vertical: scratch -> tex ---
    let src = &*scratch;
    backend.for_each_row_mut(&mut tex.data, w, |y, row| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut s = 0.0;
            for (k, wk) in weights.iter().enumerate() {
                let yy = (y as i64 + k as i64 - r).clamp(0, h as i64 - 1) as usize;
                s += src[yy * w + x] * wk;
            }
            *out = s;
        }
    });
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Colour behind unpainted texels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Background {
    /// Pure white
    #[default]
    White,
    /// Pure black
    Black,
    /// Uniform gray
    Gray {
        /// Gray level in [0, 1]
        level: f32,
    },
}

impl Background {
    /// Linear RGB in [0, 1].
    pub fn rgb(&self) -> [f32; 3] {
        match *self {
            Self::White => [1.0; 3],
            Self::Black => [0.0; 3],
            Self::Gray { level } => [level; 3],
        }
    }
}

/// How the accumulation texture is turned into an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Visual gain on accumulated paint
    pub gain: f32,
    /// Unpainted colour
    pub background: Background,
    /// Paint colour, linear RGB in [0, 1]
    pub paint_color: [f32; 3],
    /// Emission count that renders at unit density; `None` disables scaling
    pub reference_emit: Option<u32>,
    /// Exponent on the emission density ratio
    pub density_exponent: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            background: Background::White,
            paint_color: [1.0, 0.0, 0.0],
            reference_emit: None,
            density_exponent: 1.0,
        }
    }
}

impl RenderParams {
    /// Check gain, colours and density settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.gain.is_finite() && self.gain >= 0.0) {
            return Err(ConfigError::out_of_range(
                "render.gain",
                format!("must be finite and >= 0, got {}", self.gain),
            ));
        }
        if let Background::Gray { level } = self.background {
            if !(0.0..=1.0).contains(&level) {
                return Err(ConfigError::out_of_range(
                    "render.background",
                    format!("gray level must be in [0, 1], got {level}"),
                ));
            }
        }
        if !self.paint_color.iter().all(|c| (0.0..=1.0).contains(c)) {
            return Err(ConfigError::out_of_range(
                "render.paint_color",
                "components must be in [0, 1]",
            ));
        }
        if let Some(reference) = self.reference_emit {
            require_positive("render.reference_emit", reference as f32)?;
        }
        if !self.density_exponent.is_finite() {
            return Err(ConfigError::out_of_range(
                "render.density_exponent",
                format!("must be finite, got {}", self.density_exponent),
            ));
        }
        Ok(())
    }

    /// Multiplier for the emission density, `(emit / reference)^exponent`.
    pub fn density(&self, emit_per_step: u32) -> f32 {
        match self.reference_emit {
            Some(reference) if reference > 0 => {
                (emit_per_step as f32 / reference as f32).powf(self.density_exponent)
            }
            _ => 1.0,
        }
    }
}

/// 8-bit RGB image, row-major, 3 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// Interleaved RGB bytes
    pub rgb: Vec<u8>,
}

impl RgbFrame {
    /// Pixel at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = 3 * (y * self.width + x);
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }
}

/// Blend paint over the background using `accumulation` as alpha.
pub fn render(accumulation: &Texture, params: &RenderParams, emit_per_step: u32) -> RgbFrame {
    let scale = params.gain * params.density(emit_per_step);
    let bg = params.background.rgb();
    let paint = params.paint_color;

    let mut rgb = Vec::with_capacity(accumulation.data.len() * 3);
    for &value in &accumulation.data {
        let a = (value * scale).clamp(0.0, 1.0);
        for c in 0..3 {
            let out = (1.0 - a) * bg[c] + a * paint[c];
            rgb.push((out * 255.0 + 0.5).clamp(0.0, 255.0) as u8);
        }
    }

    RgbFrame {
        width: accumulation.width,
        height: accumulation.height,
        rgb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_radius_and_normalization() {
        let k = GaussianKernel::new(1.0).unwrap();
        assert_eq!(k.radius(), 3);
        let sum: f32 = k.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);

        assert_eq!(GaussianKernel::new(0.2).unwrap().radius(), 1);
        assert!(GaussianKernel::new(0.0).is_none());
        assert!(GaussianKernel::new(-1.0).is_none());
    }

    #[test]
    fn blur_preserves_mass_away_from_edges() {
        let mut tex = Texture::new(16, 16);
        tex.data_mut()[8 * 16 + 8] = 1.0;
        let k = GaussianKernel::new(1.0).unwrap();
        let mut scratch = Vec::new();
        blur(Backend::Serial, &mut tex, &k, &mut scratch);
        let total: f32 = tex.data().iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(tex.get(8, 8) < 1.0);
        assert!(tex.get(9, 8) > 0.0 && tex.get(8, 9) > 0.0);
    }

    #[test]
    fn blur_of_constant_is_constant() {
        let mut tex = Texture::new(8, 4);
        tex.data_mut().fill(0.5);
        let k = GaussianKernel::new(2.0).unwrap();
        let mut scratch = Vec::new();
        blur(Backend::Parallel, &mut tex, &k, &mut scratch);
        assert!(tex.data().iter().all(|v| (v - 0.5).abs() < 1e-5));
    }

    #[test]
    fn blur_backends_agree() {
        let mut a = Texture::new(12, 9);
        for (i, v) in a.data_mut().iter_mut().enumerate() {
            *v = ((i * 37) % 11) as f32 / 11.0;
        }
        let mut b = a.clone();
        let k = GaussianKernel::new(1.3).unwrap();
        let mut scratch = Vec::new();
        blur(Backend::Serial, &mut a, &k, &mut scratch);
        blur(Backend::Parallel, &mut b, &k, &mut scratch);
        assert_eq!(a, b);
    }

    #[test]
    fn clamp_and_coverage() {
        let mut tex = Texture::new(2, 2);
        tex.data_mut().copy_from_slice(&[-0.5, 0.3, 0.9, 1.7]);
        tex.clamp_unit(Backend::Serial);
        assert_eq!(tex.data(), &[0.0, 0.3, 0.9, 1.0]);
        assert_eq!(tex.coverage_percent(Backend::Serial, 0.5), 50.0);
    }

    #[test]
    fn render_blends_over_background() {
        let mut tex = Texture::new(2, 1);
        tex.data_mut().copy_from_slice(&[0.0, 1.0]);
        let frame = render(&tex, &RenderParams::default(), 2000);
        assert_eq!(frame.pixel(0, 0), [255, 255, 255]);
        assert_eq!(frame.pixel(1, 0), [255, 0, 0]);

        let gray = RenderParams {
            background: Background::Gray { level: 0.5 },
            ..RenderParams::default()
        };
        assert_eq!(render(&tex, &gray, 2000).pixel(0, 0), [128, 128, 128]);
    }

    #[test]
    fn density_scales_alpha() {
        let params = RenderParams {
            reference_emit: Some(1000),
            density_exponent: 1.0,
            background: Background::Black,
            ..RenderParams::default()
        };
        let mut tex = Texture::new(1, 1);
        tex.data_mut()[0] = 0.25;
        // 2000 / 1000 doubles the alpha
        assert_eq!(render(&tex, &params, 2000).pixel(0, 0), [128, 0, 0]);
    }
}
