//! viewfinder-hw — Hardware abstraction for camera discovery and capture.
//!
//! Reconciles the OS-level imaging-device registry with probeable numeric
//! capture indices, and owns the single active capture stream.

pub mod capture;
pub mod registry;
pub mod resolver;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use capture::{CaptureBackend, CaptureError, CaptureHandle, V4lCaptureBackend};
pub use registry::{DeviceRegistry, ImagingDevice, NullRegistry, SysfsRegistry};
pub use resolver::{probe_capture_indices, resolve_cameras, CaptureCandidate, ResolvedCamera};
pub use session::{CaptureSession, SessionError};
