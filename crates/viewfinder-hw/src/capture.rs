//! Capture subsystem — capability traits and the V4L2 implementation.

use std::os::fd::AsRawFd;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::{CaptureStream, Stream};
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;
use viewfinder_core::FrameBuffer;

/// How long a single frame read may wait on the device before it is treated
/// as a stalled stream.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture index {index}: {reason}")]
    OpenFailed { index: u32, reason: String },
    #[error("frame read failed: {0}")]
    ReadFailed(String),
    #[error("timed out waiting for a frame")]
    Timeout,
    #[error("unsupported capture device: {0}")]
    Unsupported(String),
}

/// One open capture source.
///
/// The handle is the exclusive owner of the underlying device; dropping it
/// releases the device, on every exit path.
pub trait CaptureHandle {
    /// Read one frame. Implementations return within a bounded time and
    /// report a stalled device as [`CaptureError::Timeout`].
    fn read_frame(&mut self) -> Result<FrameBuffer, CaptureError>;
}

/// Factory for capture handles addressed by numeric index.
pub trait CaptureBackend {
    type Handle: CaptureHandle;

    fn open(&self, index: u32) -> Result<Self::Handle, CaptureError>;
}

/// Negotiated pixel format for an open V4L2 source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    /// YUYV 4:2:2 packed, converted to interleaved RGB on read.
    Yuyv,
    /// 8-bit grayscale, passed through as a single-channel frame.
    Grey,
}

/// Backend mapping index `N` to `/dev/videoN` via the `v4l` crate.
pub struct V4lCaptureBackend {
    read_timeout: Duration,
}

impl V4lCaptureBackend {
    pub fn new() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_timeout(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl Default for V4lCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for V4lCaptureBackend {
    type Handle = V4lCaptureHandle;

    fn open(&self, index: u32) -> Result<V4lCaptureHandle, CaptureError> {
        let path = format!("/dev/video{index}");
        if !Path::new(&path).exists() {
            return Err(CaptureError::OpenFailed {
                index,
                reason: "no such device node".into(),
            });
        }

        let device = Device::with_path(&path).map_err(|e| CaptureError::OpenFailed {
            index,
            reason: e.to_string(),
        })?;

        let caps = device.query_caps().map_err(|e| CaptureError::OpenFailed {
            index,
            reason: format!("failed to query capabilities: {e}"),
        })?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CaptureError::Unsupported(format!(
                "{path}: not a video capture device"
            )));
        }

        // Ask for YUYV at a common webcam resolution; accept GREY if that is
        // what the driver gives back.
        let mut fmt = device.format().map_err(|e| {
            CaptureError::Unsupported(format!("{path}: failed to get format: {e}"))
        })?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = 640;
        fmt.height = 480;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CaptureError::Unsupported(format!("{path}: failed to set format: {e}"))
        })?;

        let pixel_format = if negotiated.fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if negotiated.fourcc == FourCC::new(b"GREY") {
            PixelFormat::Grey
        } else {
            return Err(CaptureError::Unsupported(format!(
                "{path}: pixel format {:?} (need YUYV or GREY)",
                negotiated.fourcc
            )));
        };

        tracing::info!(
            device = path,
            card = %caps.card,
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?negotiated.fourcc,
            "opened capture source"
        );

        Ok(V4lCaptureHandle {
            device,
            path,
            width: negotiated.width,
            height: negotiated.height,
            pixel_format,
            read_timeout: self.read_timeout,
        })
    }
}

/// Exclusive handle to one `/dev/videoN` node; releases it on drop.
pub struct V4lCaptureHandle {
    device: Device,
    path: String,
    pub width: u32,
    pub height: u32,
    pixel_format: PixelFormat,
    read_timeout: Duration,
}

impl V4lCaptureHandle {
    /// Block until the device fd is readable, up to the configured timeout.
    ///
    /// V4L2 gives no read deadline of its own; a wedged sensor would park
    /// the dequeue forever without this.
    fn wait_readable(&self) -> Result<(), CaptureError> {
        let timeout_ms = self.read_timeout.as_millis().min(i32::MAX as u128) as i32;
        let mut pfd = libc::pollfd {
            fd: self.device.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        match rc {
            0 => {
                tracing::warn!(device = %self.path, timeout_ms, "capture poll timed out");
                Err(CaptureError::Timeout)
            }
            rc if rc < 0 => Err(CaptureError::ReadFailed(
                std::io::Error::last_os_error().to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl CaptureHandle for V4lCaptureHandle {
    fn read_frame(&mut self) -> Result<FrameBuffer, CaptureError> {
        let mut stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, 4)
            .map_err(|e| CaptureError::ReadFailed(format!("failed to create mmap stream: {e}")))?;
        stream
            .start()
            .map_err(|e| CaptureError::ReadFailed(format!("failed to start stream: {e}")))?;

        self.wait_readable()?;

        let (buf, _meta) = stream
            .next()
            .map_err(|e| CaptureError::ReadFailed(format!("failed to dequeue buffer: {e}")))?;

        match self.pixel_format {
            PixelFormat::Grey => {
                let pixels = (self.width * self.height) as usize;
                if buf.len() < pixels {
                    return Err(CaptureError::ReadFailed(format!(
                        "GREY buffer too short: expected {pixels}, got {}",
                        buf.len()
                    )));
                }
                FrameBuffer::new(buf[..pixels].to_vec(), self.width, self.height, 1)
                    .map_err(|e| CaptureError::ReadFailed(e.to_string()))
            }
            PixelFormat::Yuyv => yuyv_to_rgb(buf, self.width, self.height),
        }
    }
}

/// Unpack packed YUYV (4:2:2) into interleaved RGB.
///
/// Each 4-byte group is [Y0, U, Y1, V] covering two pixels that share the
/// chroma pair. BT.601 conversion in 10-bit fixed point.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<FrameBuffer, CaptureError> {
    if width % 2 != 0 {
        return Err(CaptureError::ReadFailed(format!(
            "YUYV requires an even width, got {width}"
        )));
    }
    let pixels = (width * height) as usize;
    let expected = pixels * 2;
    if yuyv.len() < expected {
        return Err(CaptureError::ReadFailed(format!(
            "YUYV buffer too short: expected {expected}, got {}",
            yuyv.len()
        )));
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for quad in yuyv[..expected].chunks_exact(4) {
        let u = quad[1] as i32 - 128;
        let v = quad[3] as i32 - 128;
        push_rgb(&mut rgb, quad[0] as i32, u, v);
        push_rgb(&mut rgb, quad[2] as i32, u, v);
    }

    FrameBuffer::new(rgb, width, height, 3).map_err(|e| CaptureError::ReadFailed(e.to_string()))
}

fn push_rgb(out: &mut Vec<u8>, y: i32, u: i32, v: i32) {
    let r = y + ((1436 * v) >> 10);
    let g = y - ((352 * u + 731 * v) >> 10);
    let b = y + ((1815 * u) >> 10);
    out.push(r.clamp(0, 255) as u8);
    out.push(g.clamp(0, 255) as u8);
    out.push(b.clamp(0, 255) as u8);
}
