//! Separable Gaussian smoothing for the denoise stage.

use crate::types::{FrameBuffer, ProcessError};

/// Smooth a grayscale frame with a separable Gaussian kernel of odd size.
///
/// Sigma is derived from the kernel size as `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
/// Borders replicate the nearest edge pixel. `kernel_size == 1` is the
/// identity.
pub fn denoise(frame: &FrameBuffer, kernel_size: u32) -> Result<FrameBuffer, ProcessError> {
    if frame.channels != 1 {
        return Err(ProcessError::UnsupportedChannels(frame.channels));
    }
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(ProcessError::InvalidParameters {
            field: "kernel_size",
            reason: format!("{kernel_size} is not an odd size >= 1"),
        });
    }
    if kernel_size == 1 {
        return Ok(frame.clone());
    }

    let kernel = gaussian_kernel(kernel_size as usize);
    let w = frame.width as usize;
    let h = frame.height as usize;
    let radius = (kernel.len() / 2) as isize;

    // Horizontal pass into f32 to avoid rounding twice.
    let mut rows = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, &weight) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - radius).clamp(0, w as isize - 1) as usize;
                acc += frame.data[y * w + sx] as f32 * weight;
            }
            rows[y * w + x] = acc;
        }
    }

    // Vertical pass, rounding to u8.
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, &weight) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - radius).clamp(0, h as isize - 1) as usize;
                acc += rows[sy * w + x] * weight;
            }
            out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    FrameBuffer::new(out, frame.width, frame.height, 1)
}

/// Normalized 1-D Gaussian weights for an odd kernel size.
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size - 1) as f32 * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let mut weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in weights.iter_mut() {
        *w /= sum;
    }
    weights
}
