//! Serpentine raster path over the wall.
//!
//! The nozzle sweeps one row per pass, top row first, alternating direction
//! every row. Row `r` is centred `pitch/2 + r*pitch` below the top edge.

use serde::{Deserialize, Serialize};

use crate::params::{RasterParams, WallParams};

/// Horizontal travel direction of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TravelDirection {
    /// Increasing x
    #[default]
    LeftToRight,
    /// Decreasing x
    RightToLeft,
}

impl TravelDirection {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::LeftToRight => Self::RightToLeft,
            Self::RightToLeft => Self::LeftToRight,
        }
    }
}

/// Step-indexed raster path. Immutable; [`RasterPath::target`] is a pure
/// function of the step index.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterPath {
    x_start: f32,
    sweep: f32,
    wall_height: f32,
    row_pitch: f32,
    frames_per_row: usize,
    rows: usize,
    first_direction: TravelDirection,
}

impl RasterPath {
    /// Build the path for `wall` with the given raster parameters.
    ///
    /// Parameters are expected to be validated (positive pitch, speed, rate).
    pub fn new(wall: &WallParams, raster: &RasterParams) -> Self {
        let margin = raster.edge_margin.max(0.0);
        let sweep = wall.width + 2.0 * margin;
        let (rows, frames_per_row) = Self::dimensions(wall, raster);

        Self {
            x_start: wall.offset_x - margin,
            sweep,
            wall_height: wall.height,
            row_pitch: raster.row_pitch,
            frames_per_row,
            rows,
            first_direction: raster.first_row_direction,
        }
    }

    /// `(rows, frames_per_row)` for these parameters. Float-to-int casts
    /// saturate, so absurd inputs come back as `usize::MAX` rather than
    /// wrapping.
    fn dimensions(wall: &WallParams, raster: &RasterParams) -> (usize, usize) {
        let sweep = wall.width + 2.0 * raster.edge_margin.max(0.0);
        let advance_per_frame = raster.pass_speed / raster.frame_rate;
        let frames_per_row = ((sweep / advance_per_frame).ceil() as usize).max(1);
        let rows = ((wall.height / raster.row_pitch).ceil() as usize).max(1);
        (rows, frames_per_row)
    }

    /// Step count of the path `new` would build, or `None` when it does
    /// not fit in a `usize`.
    pub fn checked_total_steps(wall: &WallParams, raster: &RasterParams) -> Option<usize> {
        let (rows, frames_per_row) = Self::dimensions(wall, raster);
        if rows == usize::MAX || frames_per_row == usize::MAX {
            return None;
        }
        rows.checked_mul(frames_per_row)
    }

    /// Frames spent on each row.
    pub fn frames_per_row(&self) -> usize {
        self.frames_per_row
    }

    /// Number of rows needed to cover the wall height.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Total steps in a complete run, `rows * frames_per_row`.
    ///
    /// Saturates for parameters that [`RasterPath::checked_total_steps`]
    /// rejects.
    pub fn total_steps(&self) -> usize {
        self.rows.saturating_mul(self.frames_per_row)
    }

    /// Row index for a step.
    pub fn row_of(&self, step: usize) -> usize {
        step / self.frames_per_row
    }

    /// Travel direction of a row.
    pub fn direction_of_row(&self, row: usize) -> TravelDirection {
        if row % 2 == 0 {
            self.first_direction
        } else {
            self.first_direction.reversed()
        }
    }

    /// Target point `[x, z]` for `step`.
    pub fn target(&self, step: usize) -> [f32; 2] {
        let row = self.row_of(step);
        let within = step % self.frames_per_row;

        let frac = if self.frames_per_row > 1 {
            within as f32 / (self.frames_per_row - 1) as f32
        } else {
            0.0
        };
        let frac = match self.direction_of_row(row) {
            TravelDirection::LeftToRight => frac,
            TravelDirection::RightToLeft => 1.0 - frac,
        };
        let x = self.x_start + frac * self.sweep;

        let half = 0.5 * self.row_pitch;
        let z = self.wall_height - half - row as f32 * self.row_pitch;
        let lo = half.min(0.5 * self.wall_height);
        let hi = (self.wall_height - half).max(0.5 * self.wall_height);
        [x, z.clamp(lo, hi)]
    }
}
