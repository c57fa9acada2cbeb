//! Two-threshold hysteresis edge detection over Sobel gradients.
//!
//! Gradient magnitudes above the high threshold seed edges; magnitudes above
//! the low threshold that connect (8-neighborhood, transitively) to a seed
//! are promoted. Everything else is zero. Classification works on the raw
//! L1 gradient magnitude; there is no thinning pass.

use crate::types::{FrameBuffer, ProcessError};

// Separable Sobel rows per aperture: binomial smoothing x derivative.
const SMOOTH_3: &[i32] = &[1, 2, 1];
const DERIV_3: &[i32] = &[-1, 0, 1];
const SMOOTH_5: &[i32] = &[1, 4, 6, 4, 1];
const DERIV_5: &[i32] = &[-1, -2, 0, 2, 1];
const SMOOTH_7: &[i32] = &[1, 6, 15, 20, 15, 6, 1];
const DERIV_7: &[i32] = &[-1, -4, -5, 0, 5, 4, 1];

const EDGE: u8 = 255;

/// Classify edge pixels in a grayscale frame.
///
/// Output is single-channel, same dimensions, 255 for edge and 0 otherwise.
/// With `low == high` the hysteresis expansion is empty and the result is a
/// plain magnitude threshold. A border of `aperture / 2` pixels is always
/// zero (no kernel support there).
pub fn detect_edges(
    frame: &FrameBuffer,
    low_threshold: u8,
    high_threshold: u8,
    aperture_size: u32,
) -> Result<FrameBuffer, ProcessError> {
    if frame.channels != 1 {
        return Err(ProcessError::UnsupportedChannels(frame.channels));
    }
    if high_threshold < low_threshold {
        return Err(ProcessError::InvalidParameters {
            field: "high_threshold",
            reason: format!("{high_threshold} is below low_threshold {low_threshold}"),
        });
    }
    let (smooth, deriv) = match aperture_size {
        3 => (SMOOTH_3, DERIV_3),
        5 => (SMOOTH_5, DERIV_5),
        7 => (SMOOTH_7, DERIV_7),
        other => {
            return Err(ProcessError::InvalidParameters {
                field: "aperture_size",
                reason: format!("{other} is not one of 3, 5, 7"),
            })
        }
    };

    let w = frame.width as usize;
    let h = frame.height as usize;

    let magnitude = sobel_magnitude(&frame.data, w, h, smooth, deriv);
    let out = hysteresis(&magnitude, w, h, low_threshold as i32, high_threshold as i32);

    FrameBuffer::new(out, frame.width, frame.height, 1)
}

/// L1 gradient magnitude (`|gx| + |gy|`) per pixel.
///
/// Pixels within `aperture / 2` of the border are left at zero.
fn sobel_magnitude(gray: &[u8], w: usize, h: usize, smooth: &[i32], deriv: &[i32]) -> Vec<i32> {
    let k = smooth.len();
    let radius = k / 2;
    let mut magnitude = vec![0i32; w * h];
    if w < k || h < k {
        return magnitude;
    }

    for y in radius..h - radius {
        for x in radius..w - radius {
            let mut gx = 0i32;
            let mut gy = 0i32;
            for ky in 0..k {
                for kx in 0..k {
                    let val = gray[(y + ky - radius) * w + (x + kx - radius)] as i32;
                    gx += val * deriv[kx] * smooth[ky];
                    gy += val * smooth[kx] * deriv[ky];
                }
            }
            magnitude[y * w + x] = gx.abs() + gy.abs();
        }
    }

    magnitude
}

/// Seed pixels above `high`, then flood the 8-neighborhood promoting pixels
/// above `low` that touch an already-marked pixel.
fn hysteresis(magnitude: &[i32], w: usize, h: usize, low: i32, high: i32) -> Vec<u8> {
    let mut out = vec![0u8; w * h];
    let mut stack = Vec::new();

    for (idx, &mag) in magnitude.iter().enumerate() {
        if mag > high {
            out[idx] = EDGE;
            stack.push(idx);
        }
    }
    let seeds = stack.len();

    let mut promoted = 0usize;
    while let Some(idx) = stack.pop() {
        let x = idx % w;
        let y = idx / w;
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                    continue;
                }
                let nidx = ny as usize * w + nx as usize;
                if out[nidx] == 0 && magnitude[nidx] > low {
                    out[nidx] = EDGE;
                    promoted += 1;
                    stack.push(nidx);
                }
            }
        }
    }

    tracing::trace!(seeds, promoted, "hysteresis pass");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_count(frame: &FrameBuffer) -> usize {
        frame.data.iter().filter(|&&p| p == EDGE).count()
    }

    #[test]
    fn test_flat_frame_has_no_edges() {
        let frame = FrameBuffer::flat(16, 16, 1, 200).unwrap();
        let edges = detect_edges(&frame, 70, 130, 3).unwrap();
        assert_eq!(edge_count(&edges), 0);
    }

    #[test]
    fn test_vertical_step_is_detected() {
        // Left half 0, right half 255: strong vertical edge down the middle.
        let w = 8u32;
        let h = 6u32;
        let data: Vec<u8> = (0..h * w)
            .map(|i| if i % w < w / 2 { 0 } else { 255 })
            .collect();
        let frame = FrameBuffer::new(data, w, h, 1).unwrap();
        let edges = detect_edges(&frame, 70, 130, 3).unwrap();
        assert_eq!((edges.width, edges.height, edges.channels), (w, h, 1));
        // Interior rows mark the columns flanking the step.
        for y in 1..h as usize - 1 {
            assert_eq!(edges.data[y * w as usize + 3], EDGE, "row {y} col 3");
            assert_eq!(edges.data[y * w as usize + 4], EDGE, "row {y} col 4");
        }
        // Far columns stay flat.
        for y in 0..h as usize {
            assert_eq!(edges.data[y * w as usize], 0);
            assert_eq!(edges.data[y * w as usize + w as usize - 1], 0);
        }
    }

    #[test]
    fn test_border_margin_is_zero() {
        let data: Vec<u8> = (0..100).map(|i| (i * 17 % 256) as u8).collect();
        let frame = FrameBuffer::new(data, 10, 10, 1).unwrap();
        for (aperture, margin) in [(3u32, 1usize), (5, 2), (7, 3)] {
            let edges = detect_edges(&frame, 0, 0, aperture).unwrap();
            for y in 0..10usize {
                for x in 0..10usize {
                    if x < margin || y < margin || x >= 10 - margin || y >= 10 - margin {
                        assert_eq!(edges.data[y * 10 + x], 0, "aperture {aperture} ({x},{y})");
                    }
                }
            }
        }
    }

    #[test]
    fn test_frame_smaller_than_aperture_is_all_zero() {
        let frame = FrameBuffer::flat(4, 4, 1, 128).unwrap();
        let edges = detect_edges(&frame, 10, 20, 5).unwrap();
        assert_eq!(edge_count(&edges), 0);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let frame = FrameBuffer::flat(8, 8, 1, 0).unwrap();
        assert!(matches!(
            detect_edges(&frame, 130, 70, 3),
            Err(ProcessError::InvalidParameters {
                field: "high_threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_even_aperture() {
        let frame = FrameBuffer::flat(8, 8, 1, 0).unwrap();
        assert!(matches!(
            detect_edges(&frame, 70, 130, 4),
            Err(ProcessError::InvalidParameters {
                field: "aperture_size",
                ..
            })
        ));
    }

    // Hysteresis rule tests drive the flood directly with hand-built
    // magnitude grids for exact control over connectivity.

    #[test]
    fn test_weak_pixel_promoted_when_adjacent_to_seed() {
        // 3x3: center is a seed, its right neighbor is weak.
        let mut mag = vec![0i32; 9];
        mag[4] = 200;
        mag[5] = 100;
        let out = hysteresis(&mag, 3, 3, 80, 150);
        assert_eq!(out[4], EDGE);
        assert_eq!(out[5], EDGE);
        assert_eq!(out.iter().filter(|&&p| p == EDGE).count(), 2);
    }

    #[test]
    fn test_weak_pixel_without_seed_stays_dark() {
        let mut mag = vec![0i32; 9];
        mag[4] = 100;
        let out = hysteresis(&mag, 3, 3, 80, 150);
        assert_eq!(out.iter().filter(|&&p| p == EDGE).count(), 0);
    }

    #[test]
    fn test_promotion_chains_through_weak_pixels() {
        // Row: seed, weak, weak. The far weak pixel connects transitively.
        let mag = vec![200i32, 100, 100, 0];
        let out = hysteresis(&mag, 4, 1, 80, 150);
        assert_eq!(out, vec![EDGE, EDGE, EDGE, 0]);
    }

    #[test]
    fn test_diagonal_adjacency_counts() {
        // Seed at (0,0), weak at (1,1): 8-connected, so promoted.
        let mut mag = vec![0i32; 9];
        mag[0] = 200;
        mag[4] = 100;
        let out = hysteresis(&mag, 3, 3, 80, 150);
        assert_eq!(out[4], EDGE);
    }

    #[test]
    fn test_gap_blocks_promotion() {
        // Seed, gap (below low), weak: the gap breaks the chain.
        let mag = vec![200i32, 10, 100];
        let out = hysteresis(&mag, 3, 1, 80, 150);
        assert_eq!(out, vec![EDGE, 0, 0]);
    }

    #[test]
    fn test_equal_thresholds_disable_expansion() {
        // Same grid as the promotion test, but low == high: the weak
        // neighbor is no longer above low without also being a seed.
        let mut mag = vec![0i32; 9];
        mag[4] = 200;
        mag[5] = 100;
        let out = hysteresis(&mag, 3, 3, 150, 150);
        assert_eq!(out[4], EDGE);
        assert_eq!(out[5], 0);
        assert_eq!(out.iter().filter(|&&p| p == EDGE).count(), 1);
    }

    #[test]
    fn test_equal_thresholds_match_plain_threshold() {
        let mag: Vec<i32> = vec![0, 50, 150, 151, 200, 149, 150, 90, 300];
        let out = hysteresis(&mag, 3, 3, 150, 150);
        let expected: Vec<u8> = mag
            .iter()
            .map(|&m| if m > 150 { EDGE } else { 0 })
            .collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_threshold_boundary_is_strict() {
        // Exactly `high` is not a seed; exactly `low` is not promotable.
        let mag = vec![150i32, 80, 200];
        let out = hysteresis(&mag, 3, 1, 80, 150);
        assert_eq!(out, vec![0, 0, EDGE]);
    }

    #[test]
    fn test_aperture_five_step_magnitude() {
        // Step edge under the 5-tap kernel: interior gradient columns fire.
        let w = 12usize;
        let h = 7usize;
        let data: Vec<u8> = (0..w * h)
            .map(|i| if i % w < w / 2 { 0 } else { 255 })
            .collect();
        let mag = sobel_magnitude(&data, w, h, SMOOTH_5, DERIV_5);
        // Column well away from the step has no gradient.
        assert_eq!(mag[3 * w + 2], 0);
        // Column at the step has a large response.
        assert!(mag[3 * w + 5] > 255 * 6);
        // Symmetric response on both sides of the step.
        assert_eq!(mag[3 * w + 5], mag[3 * w + 6]);
    }
}
