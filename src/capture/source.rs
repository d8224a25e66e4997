//! Frame source seam between the device library and the capture loop.

use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;

use crate::capture::frame::{ColorImage, DepthImage, RawFrameSet};

/// Fixed stream configuration, set once and never renegotiated.
#[derive(Debug, Clone, Copy)]
pub struct StreamProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for StreamProfile {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Capture-side failures.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Device-internal wait timeout; the capture loop retries.
    #[error("timed out waiting for a frame set")]
    Timeout,

    /// Transient device failure; the capture loop retries.
    #[error("device failure: {0}")]
    Device(String),

    /// The device could not be opened or the configured stream could not
    /// start. There is no degraded mode without a device, so this is fatal.
    #[error("device initialization failed: {0}")]
    Init(String),
}

impl CaptureError {
    /// Transient errors are absorbed by the capture loop; anything else
    /// ends it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Device(_))
    }
}

/// Blocking frame acquisition, one synchronized color+depth set per call.
pub trait FrameSource: Send {
    /// Start the device stream. Called exactly once, before the first wait.
    fn start(&mut self, profile: &StreamProfile) -> Result<(), CaptureError>;

    /// Block until the next frame set arrives or the device-internal
    /// timeout fires.
    fn wait_for_frame_set(&mut self) -> Result<RawFrameSet, CaptureError>;
}

/// Paced test-pattern source for running the bridge without a camera.
///
/// Produces a drifting BGR gradient and a linear depth ramp at the profiled
/// frame rate. Used as the default backend when the crate is built without
/// the `realsense` feature.
pub struct SyntheticSource {
    profile: StreamProfile,
    frame_interval: Duration,
    next_due: Option<Instant>,
    sequence: u64,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            profile: StreamProfile::default(),
            frame_interval: Duration::from_millis(33),
            next_due: None,
            sequence: 0,
        }
    }

    fn color_pattern(&self) -> ColorImage {
        let (w, h) = (self.profile.width as usize, self.profile.height as usize);
        let phase = (self.sequence % 256) as u8;
        let mut data = vec![0u8; w * h * 3];
        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) * 3;
                data[i] = (x % 256) as u8;
                data[i + 1] = (y % 256) as u8;
                data[i + 2] = phase;
            }
        }
        ColorImage::new(Bytes::from(data), self.profile.width, self.profile.height)
    }

    fn depth_pattern(&self) -> DepthImage {
        let (w, h) = (self.profile.width as usize, self.profile.height as usize);
        // Ramp from the camera out to a few metres of Z16 units.
        let mut data = vec![0u16; w * h];
        for y in 0..h {
            let d = (y * 8000 / h.max(1)) as u16;
            data[y * w..(y + 1) * w].fill(d);
        }
        DepthImage {
            data,
            width: self.profile.width,
            height: self.profile.height,
        }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for SyntheticSource {
    fn start(&mut self, profile: &StreamProfile) -> Result<(), CaptureError> {
        if profile.width == 0 || profile.height == 0 || profile.fps == 0 {
            return Err(CaptureError::Init(format!(
                "unusable stream profile {}x{}@{}",
                profile.width, profile.height, profile.fps
            )));
        }
        self.profile = *profile;
        self.frame_interval = Duration::from_secs(1) / profile.fps;
        self.next_due = Some(Instant::now());
        Ok(())
    }

    fn wait_for_frame_set(&mut self) -> Result<RawFrameSet, CaptureError> {
        let due = self
            .next_due
            .ok_or_else(|| CaptureError::Device("stream not started".into()))?;

        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
        self.next_due = Some(due + self.frame_interval);
        self.sequence += 1;

        Ok(RawFrameSet {
            color: Some(self.color_pattern()),
            depth: Some(self.depth_pattern()),
        })
    }
}
