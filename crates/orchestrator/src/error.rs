//! Orchestration errors.

use std::path::PathBuf;

use spray_kernel::ConfigError;
use thiserror::Error;

/// Result alias for orchestration.
pub type Result<T> = std::result::Result<T, Error>;

/// Anything that can stop a run before or while it executes.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A config or manifest was not valid JSON for its schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The simulation parameters were rejected.
    #[error("invalid simulation parameters: {0}")]
    Config(#[from] ConfigError),

    /// Settings outside the kernel (name, output) are unusable.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// Encoding a frame image failed.
    #[error("failed to write image {path}: {source}")]
    Image {
        /// Target file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: image::ImageError,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
