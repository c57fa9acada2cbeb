//! Frame sinks — where processed frames end up.
//!
//! The windowing toolkit is somebody else's problem; here a sink either
//! writes PNGs or just counts what went past.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use viewfinder_core::FrameBuffer;

/// Accepts one frame at a time; ownership of the buffer stays with the
/// caller for the duration of the call.
pub trait FrameSink {
    fn put(&mut self, frame: &FrameBuffer) -> Result<()>;
}

/// Sink that discards frames, keeping only a count.
#[derive(Default)]
pub struct NullSink {
    pub frames_seen: u64,
}

impl FrameSink for NullSink {
    fn put(&mut self, _frame: &FrameBuffer) -> Result<()> {
        self.frames_seen += 1;
        Ok(())
    }
}

/// Sink writing numbered PNGs into a directory.
pub struct PngDirSink {
    dir: PathBuf,
    written: u64,
}

impl PngDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(Self { dir, written: 0 })
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for PngDirSink {
    fn put(&mut self, frame: &FrameBuffer) -> Result<()> {
        let path = self.dir.join(format!("frame_{:04}.png", self.written));
        write_png(frame, &path)?;
        self.written += 1;
        Ok(())
    }
}

/// Encode a frame as PNG at `path`.
pub fn write_png(frame: &FrameBuffer, path: &Path) -> Result<()> {
    match frame.channels {
        1 => {
            let img =
                image::GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
                    .context("frame data does not match its dimensions")?;
            img.save(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        3 => {
            let img = image::RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
                .context("frame data does not match its dimensions")?;
            img.save(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        other => bail!("cannot encode a {other}-channel frame"),
    }
    Ok(())
}
