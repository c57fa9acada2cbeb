//! The preview pull loop.
//!
//! Scheduling lives here, with the caller, not in the processing contract:
//! every tick pulls one frame from the session, runs it through the chain,
//! and hands the result to the sink. A lost stream ends the loop.

use crate::sink::FrameSink;
use anyhow::Result;
use std::time::{Duration, Instant};
use viewfinder_core::{process_frame, ProcessingParameters};
use viewfinder_hw::capture::CaptureBackend;
use viewfinder_hw::session::{CaptureSession, SessionError};

pub struct PumpOptions {
    /// Target spacing between pulls.
    pub interval: Duration,
    /// Stop after this many delivered frames; `None` runs until the stream dies.
    pub max_frames: Option<u64>,
    /// Run the edge chain; `false` forwards raw frames.
    pub process: bool,
}

pub struct PumpStats {
    pub frames: u64,
    pub elapsed: Duration,
    pub stream_lost: bool,
}

impl PumpStats {
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

/// Pull frames at a fixed interval until the budget runs out or the stream
/// is lost. Parameters are validated on the first processed frame and the
/// loop fails fast if they are out of contract.
pub fn run_pump<B: CaptureBackend>(
    session: &mut CaptureSession<B>,
    params: &ProcessingParameters,
    options: &PumpOptions,
    sink: &mut dyn FrameSink,
) -> Result<PumpStats> {
    anyhow::ensure!(session.is_running(), "no active capture stream");

    let started = Instant::now();
    let mut frames = 0u64;
    let mut stream_lost = false;

    loop {
        if let Some(max) = options.max_frames {
            if frames >= max {
                break;
            }
        }

        let tick = Instant::now();
        let frame = match session.next_frame() {
            Ok(frame) => frame,
            Err(SessionError::StreamLost {
                frames_delivered,
                reason,
            }) => {
                tracing::error!(frames_delivered, reason = %reason, "stream lost, ending preview");
                stream_lost = true;
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let output = if options.process {
            process_frame(&frame, params)?
        } else {
            frame
        };
        sink.put(&output)?;
        frames += 1;

        if let Some(remaining) = options.interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    Ok(PumpStats {
        frames,
        elapsed: started.elapsed(),
        stream_lost,
    })
}
