//! Color-to-grayscale conversion.

use crate::types::{FrameBuffer, ProcessError};

// BT.601 luma weights scaled by 1000 (integer arithmetic, matches the
// rounding of common capture stacks).
const LUMA_R: u32 = 299;
const LUMA_G: u32 = 587;
const LUMA_B: u32 = 114;

/// Convert an interleaved RGB frame to single-channel luma.
///
/// Deterministic: `y = (299*r + 587*g + 114*b) / 1000`, truncating.
/// A frame that is already single-channel passes through as a copy.
pub fn to_grayscale(frame: &FrameBuffer) -> Result<FrameBuffer, ProcessError> {
    match frame.channels {
        1 => Ok(frame.clone()),
        3 => {
            let mut gray = Vec::with_capacity(frame.pixel_count());
            for rgb in frame.data.chunks_exact(3) {
                let y = (LUMA_R * rgb[0] as u32 + LUMA_G * rgb[1] as u32 + LUMA_B * rgb[2] as u32)
                    / 1000;
                gray.push(y as u8);
            }
            FrameBuffer::new(gray, frame.width, frame.height, 1)
        }
        other => Err(ProcessError::UnsupportedChannels(other)),
    }
}
