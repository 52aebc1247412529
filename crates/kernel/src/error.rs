//! Configuration errors.
//!
//! Only configuration can fail. Once a [`crate::Simulation`] exists, every
//! per-step edge case (unreachable targets, splats hanging off the texture,
//! empty emission batches) is handled locally by clamping or skipping.

use thiserror::Error;

/// Result alias for fallible configuration.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Rejected simulation parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The arm cannot reach one of the wall corners.
    #[error("wall corner ({x:.3}, {z:.3}) is {distance:.3} m from the arm base but the arm only reaches {reach:.3} m")]
    UnreachableCorner {
        /// Corner x coordinate (wall frame)
        x: f32,
        /// Corner z coordinate (wall frame)
        z: f32,
        /// Distance from the arm base to the corner
        distance: f32,
        /// Maximum reach, L1 + L2
        reach: f32,
    },

    /// Texture width or height is zero.
    #[error("texture resolution must be positive, got {width}x{height}")]
    InvalidResolution {
        /// Requested width in texels
        width: usize,
        /// Requested height in texels
        height: usize,
    },

    /// Row pitch is zero, negative or not finite.
    #[error("row pitch must be positive, got {0}")]
    InvalidRowPitch(f32),

    /// Fan or cone angles describe an empty or flat-out spray.
    #[error("degenerate fan angles: {0}")]
    DegenerateFan(String),

    /// A parameter that must be strictly positive is not.
    #[error("{name} must be positive, got {value}")]
    NonPositive {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// A parameter is outside its allowed range.
    #[error("{name} out of range: {message}")]
    OutOfRange {
        /// Parameter name
        name: &'static str,
        /// Explanation
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn out_of_range(name: &'static str, message: impl Into<String>) -> Self {
        Self::OutOfRange {
            name,
            message: message.into(),
        }
    }
}

/// Check that `value` is finite and strictly positive.
pub(crate) fn require_positive(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}
