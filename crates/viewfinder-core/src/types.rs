use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameters { field: &'static str, reason: String },
    #[error("unsupported channel count: {0} (need 1 or 3)")]
    UnsupportedChannels(u8),
    #[error("empty frame")]
    EmptyFrame,
    #[error("frame data length {actual} does not match {width}x{height}x{channels}")]
    DataLengthMismatch {
        actual: usize,
        width: u32,
        height: u32,
        channels: u8,
    },
}

/// A rectangular pixel grid handed between pipeline stages.
///
/// Row-major, channels interleaved: 1 channel for grayscale/edge output,
/// 3 channels (RGB) for color capture. Each stage returns a new buffer;
/// buffers are moved between owners, never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl FrameBuffer {
    /// Build a frame, checking that `data` covers `width * height * channels`.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self, ProcessError> {
        if width == 0 || height == 0 {
            return Err(ProcessError::EmptyFrame);
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(ProcessError::DataLengthMismatch {
                actual: data.len(),
                width,
                height,
                channels,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// A frame filled with a single value.
    pub fn flat(width: u32, height: u32, channels: u8, value: u8) -> Result<Self, ProcessError> {
        let len = width as usize * height as usize * channels as usize;
        Self::new(vec![value; len], width, height, channels)
    }

    /// Number of pixels (not samples).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Tunables for the edge-detection chain.
///
/// The thresholds are set once at startup (env or CLI) and held fixed for
/// the lifetime of a preview stream; there is no runtime adjustment path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingParameters {
    /// Lower hysteresis threshold, 0–255.
    pub low_threshold: u8,
    /// Upper hysteresis threshold, 0–255. Must be >= `low_threshold`.
    pub high_threshold: u8,
    /// Gaussian kernel size for the denoise stage. Odd, >= 1.
    pub blur_kernel_size: u32,
    /// Sobel aperture for the gradient pass: 3, 5, or 7.
    pub aperture_size: u32,
}

impl Default for ProcessingParameters {
    fn default() -> Self {
        Self {
            low_threshold: 70,
            high_threshold: 130,
            blur_kernel_size: 5,
            aperture_size: 3,
        }
    }
}

impl ProcessingParameters {
    /// Check every field, reporting the first one out of contract by name.
    pub fn validate(&self) -> Result<(), ProcessError> {
        if self.high_threshold < self.low_threshold {
            return Err(ProcessError::InvalidParameters {
                field: "high_threshold",
                reason: format!(
                    "{} is below low_threshold {}",
                    self.high_threshold, self.low_threshold
                ),
            });
        }
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(ProcessError::InvalidParameters {
                field: "blur_kernel_size",
                reason: format!("{} is not an odd size >= 1", self.blur_kernel_size),
            });
        }
        if !matches!(self.aperture_size, 3 | 5 | 7) {
            return Err(ProcessError::InvalidParameters {
                field: "aperture_size",
                reason: format!("{} is not one of 3, 5, 7", self.aperture_size),
            });
        }
        Ok(())
    }
}
