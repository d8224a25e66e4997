//! RealSense backend for the frame source seam.
//!
//! Compiled behind the `realsense` feature; needs librealsense2 on the
//! build host.

use std::collections::HashSet;
use std::time::Duration;

use bytes::Bytes;
use realsense_rust::config::Config;
use realsense_rust::context::Context;
use realsense_rust::frame::{ColorFrame, DepthFrame};
use realsense_rust::kind::{Rs2Format, Rs2StreamKind};
use realsense_rust::pipeline::{ActivePipeline, InactivePipeline};

use crate::capture::frame::{ColorImage, DepthImage, RawFrameSet};
use crate::capture::source::{CaptureError, FrameSource, StreamProfile};

/// Device-internal frame wait timeout.
const FRAME_WAIT_TIMEOUT: Duration = Duration::from_millis(500);

/// An Intel RealSense depth camera streaming synchronized BGR8 color and
/// Z16 depth.
pub struct RealSenseSource {
    context: Context,
    pipeline: Option<ActivePipeline>,
}

impl RealSenseSource {
    pub fn new() -> Result<Self, CaptureError> {
        let context = Context::new().map_err(|e| CaptureError::Init(e.to_string()))?;
        if context.query_devices(HashSet::new()).is_empty() {
            return Err(CaptureError::Init("no realsense device found".into()));
        }
        Ok(Self {
            context,
            pipeline: None,
        })
    }
}

impl FrameSource for RealSenseSource {
    fn start(&mut self, profile: &StreamProfile) -> Result<(), CaptureError> {
        let pipeline = InactivePipeline::try_from(&self.context)
            .map_err(|e| CaptureError::Init(e.to_string()))?;

        let mut config = Config::new();
        config
            .enable_stream(
                Rs2StreamKind::Color,
                None,
                profile.width as usize,
                profile.height as usize,
                Rs2Format::Bgr8,
                profile.fps as usize,
            )
            .map_err(|e| CaptureError::Init(e.to_string()))?
            .enable_stream(
                Rs2StreamKind::Depth,
                None,
                profile.width as usize,
                profile.height as usize,
                Rs2Format::Z16,
                profile.fps as usize,
            )
            .map_err(|e| CaptureError::Init(e.to_string()))?;

        let pipeline = pipeline
            .start(Some(config))
            .map_err(|e| CaptureError::Init(e.to_string()))?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn wait_for_frame_set(&mut self) -> Result<RawFrameSet, CaptureError> {
        let pipeline = self
            .pipeline
            .as_mut()
            .ok_or_else(|| CaptureError::Device("stream not started".into()))?;

        let frames = pipeline
            .wait(Some(FRAME_WAIT_TIMEOUT))
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        let color = frames
            .frames_of_type::<ColorFrame>()
            .into_iter()
            .next()
            .map(|frame| unsafe {
                let ptr: *const _ = frame.get_data();
                let ptr: *const u8 = ptr.cast();
                let data = std::slice::from_raw_parts(ptr, frame.get_data_size()).to_vec();
                ColorImage::new(Bytes::from(data), frame.width() as u32, frame.height() as u32)
            });

        let depth = frames
            .frames_of_type::<DepthFrame>()
            .into_iter()
            .next()
            .map(|frame| unsafe {
                let ptr: *const _ = frame.get_data();
                let ptr: *const u16 = ptr.cast();
                let data =
                    std::slice::from_raw_parts(ptr, frame.get_data_size() / 2).to_vec();
                DepthImage {
                    data,
                    width: frame.width() as u32,
                    height: frame.height() as u32,
                }
            });

        Ok(RawFrameSet { color, depth })
    }
}
