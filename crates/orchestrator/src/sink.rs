//! Frame sinks: where poses and materialized frames go.
//!
//! [`DirectorySink`] is the hand-off to scene exporters. It writes one
//! `mask_NNNN.png` per materialized frame and, when the run finishes, a
//! `frames.json` manifest listing every pose and every frame file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::driver::{MaterializedFrame, PoseSample, RunSummary};
use crate::error::{Error, Result};

/// Receives the output of a [`crate::FrameDriver`] run.
pub trait FrameSink {
    /// Called once for every step, in order.
    fn record_pose(&mut self, pose: &PoseSample) -> Result<()>;

    /// Called for each materialized step, after its pose.
    fn materialize(&mut self, frame: &MaterializedFrame) -> Result<()>;

    /// Called once after the final step.
    fn finish(&mut self, summary: &RunSummary) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Keeps everything in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    /// Every recorded pose
    pub poses: Vec<PoseSample>,
    /// Every materialized frame
    pub frames: Vec<MaterializedFrame>,
    /// Set by [`FrameSink::finish`]
    pub summary: Option<RunSummary>,
}

impl FrameSink for MemorySink {
    fn record_pose(&mut self, pose: &PoseSample) -> Result<()> {
        self.poses.push(*pose);
        Ok(())
    }

    fn materialize(&mut self, frame: &MaterializedFrame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        self.summary = Some(*summary);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DirectorySink
// ---------------------------------------------------------------------------

/// Manifest file name written by [`DirectorySink`].
pub const MANIFEST_FILE: &str = "frames.json";

/// One materialized frame in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Frame number
    pub index: usize,
    /// Step it was taken after
    pub step: usize,
    /// PNG file name, relative to the manifest
    pub file: String,
    /// Coverage at that step (percent)
    pub coverage_percent: f32,
}

/// Contents of `frames.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Run name
    pub name: String,
    /// Texture width in pixels
    pub width: usize,
    /// Texture height in pixels
    pub height: usize,
    /// Materialized frames in order
    pub frames: Vec<FrameRecord>,
    /// One pose per step
    pub poses: Vec<PoseSample>,
    /// Run totals
    pub summary: RunSummary,
}

impl Manifest {
    /// Read a manifest written by [`DirectorySink`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// File name for frame `index`.
pub fn frame_file_name(index: usize) -> String {
    format!("mask_{:04}.png", index)
}

/// Writes PNG frames and a JSON manifest into a directory.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    name: String,
    size: (usize, usize),
    frames: Vec<FrameRecord>,
    poses: Vec<PoseSample>,
}

impl DirectorySink {
    /// Create `dir` (and parents) if needed.
    pub fn create(dir: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        tracing::info!("Writing frames to {:?}", dir);
        Ok(Self {
            dir,
            name: name.into(),
            size: (0, 0),
            frames: Vec::new(),
            poses: Vec::new(),
        })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSink for DirectorySink {
    fn record_pose(&mut self, pose: &PoseSample) -> Result<()> {
        self.poses.push(*pose);
        Ok(())
    }

    fn materialize(&mut self, frame: &MaterializedFrame) -> Result<()> {
        let file = frame_file_name(frame.index);
        let path = self.dir.join(&file);
        let img = &frame.image;

        let buffer = image::RgbImage::from_raw(img.width as u32, img.height as u32, img.rgb.clone())
            .ok_or_else(|| {
                Error::Invalid(format!(
                    "frame {} has {} bytes, expected {}",
                    frame.index,
                    img.rgb.len(),
                    img.width * img.height * 3
                ))
            })?;
        buffer.save(&path).map_err(|source| Error::Image {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Wrote {:?} (step {})", path, frame.step);

        self.size = (img.width, img.height);
        self.frames.push(FrameRecord {
            index: frame.index,
            step: frame.step,
            file,
            coverage_percent: frame.coverage_percent,
        });
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        let manifest = Manifest {
            name: self.name.clone(),
            width: self.size.0,
            height: self.size.1,
            frames: std::mem::take(&mut self.frames),
            poses: std::mem::take(&mut self.poses),
            summary: *summary,
        };
        let path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&path, json).map_err(|e| Error::io(&path, e))?;
        tracing::info!("Wrote manifest {:?} ({} frames)", path, manifest.frames.len());
        Ok(())
    }
}
