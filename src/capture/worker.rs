//! Capture loop: bridges the blocking device wait to the exchange slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::capture::colorize::colorize;
use crate::capture::frame::FrameSet;
use crate::capture::source::{CaptureError, FrameSource, StreamProfile};
use crate::pipeline::FrameSlot;
use crate::utils::now_ns;

/// Consecutive wait failures after which the device is declared dead.
const MAX_CONSECUTIVE_FAILURES: u32 = 30;

/// Run the capture loop until `shutdown` is set.
///
/// Starts the stream once, then blocks on the device for each frame set,
/// stamps the ingress time, colorizes the depth component, and deposits the
/// result. A transient failure or an incomplete frame set skips the
/// iteration; a persistently failing device ends the loop with an error.
pub fn run(
    mut source: Box<dyn FrameSource>,
    profile: StreamProfile,
    slot: Arc<FrameSlot>,
    shutdown: Arc<AtomicBool>,
) -> Result<(), CaptureError> {
    source.start(&profile)?;
    info!(
        width = profile.width,
        height = profile.height,
        fps = profile.fps,
        "capture stream started"
    );

    let mut consecutive_failures = 0u32;

    while !shutdown.load(Ordering::Relaxed) {
        let raw = match source.wait_for_frame_set() {
            Ok(raw) => {
                consecutive_failures = 0;
                raw
            }
            Err(e) if e.is_transient() => {
                consecutive_failures += 1;
                if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    warn!("device failed {consecutive_failures} waits in a row, giving up");
                    return Err(e);
                }
                debug!("no frame this iteration: {e}");
                continue;
            }
            Err(e) => return Err(e),
        };

        // Stamp on receipt, before any per-frame processing.
        let ingress_ns = now_ns();
        debug!(ingress_ns, "got new frame set");

        let (Some(color), Some(depth)) = (raw.color, raw.depth) else {
            counter!("pelorus_frames_skipped").increment(1);
            debug!("incomplete frame set, skipping cycle");
            continue;
        };

        let depth_colormap = colorize(&depth);
        slot.deposit(FrameSet {
            color,
            depth_colormap,
            ingress_ns,
        });
        counter!("pelorus_frames_captured").increment(1);
    }

    info!("capture loop stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use bytes::Bytes;

    use super::*;
    use crate::capture::frame::{ColorImage, DepthImage, RawFrameSet};

    /// Replays a fixed sequence of wait results, then requests shutdown so
    /// the loop under test terminates.
    struct ScriptedSource {
        script: VecDeque<Result<RawFrameSet, CaptureError>>,
        start_result: Result<(), CaptureError>,
        shutdown: Arc<AtomicBool>,
    }

    impl ScriptedSource {
        fn new(
            script: Vec<Result<RawFrameSet, CaptureError>>,
            shutdown: &Arc<AtomicBool>,
        ) -> Box<Self> {
            Box::new(Self {
                script: script.into(),
                start_result: Ok(()),
                shutdown: Arc::clone(shutdown),
            })
        }
    }

    impl FrameSource for ScriptedSource {
        fn start(&mut self, _profile: &StreamProfile) -> Result<(), CaptureError> {
            std::mem::replace(&mut self.start_result, Ok(()))
        }

        fn wait_for_frame_set(&mut self) -> Result<RawFrameSet, CaptureError> {
            match self.script.pop_front() {
                Some(result) => result,
                None => {
                    self.shutdown.store(true, Ordering::Relaxed);
                    Err(CaptureError::Timeout)
                }
            }
        }
    }

    fn complete_set(width: u32, height: u32) -> RawFrameSet {
        let pixels = (width * height) as usize;
        RawFrameSet {
            color: Some(ColorImage::new(
                Bytes::from(vec![0u8; pixels * 3]),
                width,
                height,
            )),
            depth: Some(DepthImage {
                data: vec![1000u16; pixels],
                width,
                height,
            }),
        }
    }

    fn small_profile() -> StreamProfile {
        StreamProfile {
            width: 4,
            height: 4,
            fps: 30,
        }
    }

    #[test]
    fn deposits_complete_sets() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(FrameSlot::new());
        let source = ScriptedSource::new(vec![Ok(complete_set(4, 4))], &shutdown);

        run(source, small_profile(), Arc::clone(&slot), shutdown).unwrap();

        let frame_set = slot.try_withdraw().expect("one frame set deposited");
        assert_eq!(frame_set.color.width, 4);
        assert_eq!(frame_set.depth_colormap.data.len(), 4 * 4 * 3);
        assert!(frame_set.ingress_ns > 0);
    }

    #[test]
    fn missing_component_skips_the_cycle() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(FrameSlot::new());
        let mut partial = complete_set(4, 4);
        partial.depth = None;
        let source = ScriptedSource::new(vec![Ok(partial)], &shutdown);

        run(source, small_profile(), Arc::clone(&slot), shutdown).unwrap();

        assert!(slot.try_withdraw().is_none());
        assert_eq!(slot.stats().0, 0);
    }

    #[test]
    fn rapid_capture_leaves_only_the_newest_frame() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(FrameSlot::new());
        let source = ScriptedSource::new(
            vec![
                Ok(complete_set(4, 4)),
                Ok(complete_set(4, 4)),
                Ok(complete_set(8, 8)),
            ],
            &shutdown,
        );

        run(source, small_profile(), Arc::clone(&slot), shutdown).unwrap();

        let frame_set = slot.try_withdraw().expect("newest frame set");
        assert_eq!(frame_set.color.width, 8);
        assert!(slot.try_withdraw().is_none());
        assert_eq!(slot.stats(), (3, 1, 2));
    }

    #[test]
    fn transient_failure_is_absorbed() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(FrameSlot::new());
        let source = ScriptedSource::new(
            vec![
                Err(CaptureError::Timeout),
                Err(CaptureError::Device("usb glitch".into())),
                Ok(complete_set(4, 4)),
            ],
            &shutdown,
        );

        run(source, small_profile(), Arc::clone(&slot), shutdown).unwrap();

        assert!(slot.try_withdraw().is_some());
    }

    #[test]
    fn persistent_failure_is_fatal() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(FrameSlot::new());
        let script = (0..MAX_CONSECUTIVE_FAILURES)
            .map(|_| Err(CaptureError::Timeout))
            .collect();
        let source = ScriptedSource::new(script, &shutdown);

        let err = run(source, small_profile(), slot, shutdown).unwrap_err();
        assert!(matches!(err, CaptureError::Timeout));
    }

    #[test]
    fn init_failure_propagates() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(FrameSlot::new());
        let mut source = ScriptedSource::new(vec![], &shutdown);
        source.start_result = Err(CaptureError::Init("no device".into()));

        let err = run(source, small_profile(), slot, shutdown).unwrap_err();
        assert!(matches!(err, CaptureError::Init(_)));
    }
}
