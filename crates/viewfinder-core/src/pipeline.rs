//! The fixed per-frame processing chain.

use crate::blur::denoise;
use crate::edges::detect_edges;
use crate::grayscale::to_grayscale;
use crate::types::{FrameBuffer, ProcessError, ProcessingParameters};

/// Run one frame through grayscale → denoise → edge detection.
///
/// Parameters are validated once up front; the chain never starts on a bad
/// parameter set. Each stage hands a fresh buffer to the next, so the input
/// frame is untouched.
pub fn process_frame(
    frame: &FrameBuffer,
    params: &ProcessingParameters,
) -> Result<FrameBuffer, ProcessError> {
    params.validate()?;

    let gray = to_grayscale(frame)?;
    let smoothed = denoise(&gray, params.blur_kernel_size)?;
    let edges = detect_edges(
        &smoothed,
        params.low_threshold,
        params.high_threshold,
        params.aperture_size,
    )?;

    tracing::trace!(
        width = edges.width,
        height = edges.height,
        "processed frame"
    );
    Ok(edges)
}
