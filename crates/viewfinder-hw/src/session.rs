//! Single-stream capture session.
//!
//! At most one capture handle is open at a time: starting a stream closes
//! whatever was running first, and a read failure on an active stream tears
//! the stream down rather than silently retrying.

use crate::capture::{CaptureBackend, CaptureError, CaptureHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use viewfinder_core::FrameBuffer;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no active capture stream")]
    NotRunning,
    #[error("capture stream lost after {frames_delivered} frames: {reason}")]
    StreamLost {
        frames_delivered: u64,
        reason: String,
    },
    #[error("failed to start stream: {0}")]
    Open(#[from] CaptureError),
}

struct ActiveStream<H> {
    handle: H,
    index: u32,
    started_at: Instant,
    frames_delivered: u64,
    dimensions: Option<(u32, u32)>,
}

/// Owner of the one allowed open capture handle.
pub struct CaptureSession<B: CaptureBackend> {
    backend: B,
    active: Option<ActiveStream<B::Handle>>,
}

impl<B: CaptureBackend> CaptureSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: None,
        }
    }

    /// Open the source at `index`, closing any running stream first.
    pub fn start(&mut self, index: u32) -> Result<(), SessionError> {
        self.stop();
        let handle = self.backend.open(index)?;
        self.active = Some(ActiveStream {
            handle,
            index,
            started_at: Instant::now(),
            frames_delivered: 0,
            dimensions: None,
        });
        tracing::info!(index, "capture stream started");
        Ok(())
    }

    /// Close the active stream, if any. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(stream) = self.active.take() {
            tracing::info!(
                index = stream.index,
                frames = stream.frames_delivered,
                "capture stream stopped"
            );
        }
    }

    /// Pull one frame from the active stream.
    ///
    /// A read failure means the source stopped delivering: the stream is
    /// closed and the failure surfaces as [`SessionError::StreamLost`].
    pub fn next_frame(&mut self) -> Result<FrameBuffer, SessionError> {
        let Some(stream) = self.active.as_mut() else {
            return Err(SessionError::NotRunning);
        };

        match stream.handle.read_frame() {
            Ok(frame) => {
                stream.frames_delivered += 1;
                stream.dimensions = Some((frame.width, frame.height));
                Ok(frame)
            }
            Err(err) => {
                let frames_delivered = stream.frames_delivered;
                tracing::warn!(
                    index = stream.index,
                    frames_delivered,
                    error = %err,
                    "active stream stopped delivering"
                );
                self.stop();
                Err(SessionError::StreamLost {
                    frames_delivered,
                    reason: err.to_string(),
                })
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_index(&self) -> Option<u32> {
        self.active.as_ref().map(|s| s.index)
    }

    pub fn frames_delivered(&self) -> u64 {
        self.active.as_ref().map_or(0, |s| s.frames_delivered)
    }

    pub fn uptime(&self) -> Option<Duration> {
        self.active.as_ref().map(|s| s.started_at.elapsed())
    }

    /// Width and height of the most recent frame, once one has been read.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.active.as_ref().and_then(|s| s.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeBackend;

    #[test]
    fn test_next_frame_without_start() {
        let mut session = CaptureSession::new(FakeBackend::new(&[0], &[0]));
        assert!(matches!(
            session.next_frame(),
            Err(SessionError::NotRunning)
        ));
    }

    #[test]
    fn test_start_open_failure_leaves_session_stopped() {
        let mut session = CaptureSession::new(FakeBackend::new(&[], &[]));
        assert!(matches!(session.start(0), Err(SessionError::Open(_))));
        assert!(!session.is_running());
    }

    #[test]
    fn test_frames_are_counted() {
        let mut session = CaptureSession::new(FakeBackend::new(&[0], &[0]));
        session.start(0).unwrap();
        session.next_frame().unwrap();
        session.next_frame().unwrap();
        assert_eq!(session.frames_delivered(), 2);
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(session.dimensions(), Some((4, 4)));
    }

    #[test]
    fn test_restart_closes_prior_handle_first() {
        let backend = FakeBackend::new(&[0, 1], &[0, 1]);
        let counters = std::rc::Rc::clone(&backend.counters);
        let mut session = CaptureSession::new(backend);

        session.start(0).unwrap();
        assert_eq!(counters.borrow().opened, 1);
        assert_eq!(counters.borrow().closed, 0);

        // Switching cameras: the old handle must be gone before the new
        // open happens across the transition.
        session.start(1).unwrap();
        assert_eq!(counters.borrow().opened, 2);
        assert_eq!(counters.borrow().closed, 1);
        assert_eq!(session.current_index(), Some(1));
    }

    #[test]
    fn test_read_failure_becomes_stream_lost_and_stops() {
        // Index 1 opens but never delivers frames.
        let mut session = CaptureSession::new(FakeBackend::new(&[1], &[]));
        session.start(1).unwrap();
        match session.next_frame() {
            Err(SessionError::StreamLost {
                frames_delivered, ..
            }) => assert_eq!(frames_delivered, 0),
            other => panic!("expected StreamLost, got {other:?}"),
        }
        assert!(!session.is_running());
        // Subsequent pulls report the stream as gone, not lost again.
        assert!(matches!(
            session.next_frame(),
            Err(SessionError::NotRunning)
        ));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let backend = FakeBackend::new(&[0], &[0]);
        let counters = std::rc::Rc::clone(&backend.counters);
        let mut session = CaptureSession::new(backend);
        session.start(0).unwrap();
        session.stop();
        session.stop();
        assert_eq!(counters.borrow().closed, 1);
        assert!(!session.is_running());
    }
}
