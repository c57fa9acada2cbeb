//! viewfinder-core — Frame processing engine.
//!
//! Owns the `FrameBuffer` type passed between pipeline stages and the fixed
//! grayscale → blur → edge-detection chain applied to live preview frames.

pub mod blur;
pub mod edges;
pub mod grayscale;
pub mod pipeline;
pub mod types;

pub use pipeline::process_frame;
pub use types::{FrameBuffer, ProcessError, ProcessingParameters};
