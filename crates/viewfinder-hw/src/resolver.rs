//! Camera discovery: index probing and registry reconciliation.

use crate::capture::{CaptureBackend, CaptureHandle};
use crate::registry::DeviceRegistry;
use serde::Serialize;

/// Default ceiling for the probe scan.
pub const DEFAULT_MAX_PROBE: u32 = 10;

/// Outcome of probing one capture index. Transient: produced during a
/// resolution pass and discarded after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureCandidate {
    pub index: u32,
    pub opened: bool,
    pub first_frame_ok: bool,
}

impl CaptureCandidate {
    /// A source counts as working only if it opened and delivered a frame.
    pub fn is_working(&self) -> bool {
        self.opened && self.first_frame_ok
    }
}

/// A selectable camera as exposed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCamera {
    pub index: u32,
    pub display_name: String,
}

/// Try every index in `[0, max_index)`: open, read exactly one frame, and
/// record both outcomes.
///
/// The handle for each index is dropped before the next one is opened, so no
/// capture source stays acquired past its own probe, whichever way the probe
/// went. Failures land in the candidate record, never in an error.
pub fn probe_capture_indices<B: CaptureBackend>(
    backend: &B,
    max_index: u32,
) -> Vec<CaptureCandidate> {
    let mut candidates = Vec::with_capacity(max_index.min(64) as usize);

    for index in 0..max_index {
        let candidate = match backend.open(index) {
            Ok(mut handle) => {
                let first_frame_ok = match handle.read_frame() {
                    Ok(frame) => {
                        tracing::debug!(
                            index,
                            width = frame.width,
                            height = frame.height,
                            "probe: first frame ok"
                        );
                        true
                    }
                    Err(err) => {
                        tracing::debug!(index, error = %err, "probe: opened but no frame");
                        false
                    }
                };
                CaptureCandidate {
                    index,
                    opened: true,
                    first_frame_ok,
                }
            }
            Err(err) => {
                tracing::debug!(index, error = %err, "probe: open failed");
                CaptureCandidate {
                    index,
                    opened: false,
                    first_frame_ok: false,
                }
            }
        };
        candidates.push(candidate);
    }

    candidates
}

/// Reconcile OS-reported imaging devices with working capture indices.
///
/// Matching is positional: the i-th working index is paired with the i-th
/// registry entry, by list position. Nothing ties the two enumerations to
/// the same physical ordering, so a name can land on the wrong index when
/// the OS and the capture stack disagree; this is a best-effort heuristic,
/// not a hardware identity. Working indices beyond the registry list get the
/// placeholder name `Unknown Camera {index}`.
///
/// Indices that fail to open or to deliver a frame are simply absent from
/// the result. With no hardware change (and stable orderings underneath,
/// which is itself not guaranteed) two passes return the same sequence.
pub fn resolve_cameras<R, B>(registry: &R, backend: &B, max_index: u32) -> Vec<ResolvedCamera>
where
    R: DeviceRegistry + ?Sized,
    B: CaptureBackend,
{
    let devices = registry.list_imaging_devices();
    tracing::info!(count = devices.len(), "registry reported imaging devices");

    let candidates = probe_capture_indices(backend, max_index);

    let mut cameras: Vec<ResolvedCamera> = Vec::new();
    for candidate in candidates.iter().filter(|c| c.is_working()) {
        let display_name = match devices.get(cameras.len()) {
            Some(device) => device.name.clone(),
            None => format!("Unknown Camera {}", candidate.index),
        };
        cameras.push(ResolvedCamera {
            index: candidate.index,
            display_name,
        });
    }

    tracing::info!(count = cameras.len(), "resolved cameras");
    cameras
}
