//! Publish loop and the bus seam it drains into.

pub mod encoder;
pub mod keys;
pub mod payloads;
pub mod zenoh_sink;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, info};

use crate::pipeline::FrameSlot;
use crate::publish::encoder::encode_raw_image;
use crate::publish::payloads::enclose;
use crate::utils::now_ns;
use crate::PublishOptions;

/// Poll interval while the slot is empty.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Output streams of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Color,
    Depth,
}

/// Failure to hand an envelope to the bus.
///
/// With drop-on-congestion QoS the transport sheds load by discarding
/// messages rather than erroring, so in practice this only covers
/// session-level faults. The publish loop logs and moves on either way.
#[derive(Debug, Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

/// One-way sink for serialized envelopes.
pub trait EnvelopeSink: Send {
    fn publish(&self, stream: StreamKind, envelope: &[u8]) -> Result<(), PublishError>;
}

/// Run the publish loop until `shutdown` is set.
///
/// Drains the slot at the consumer's own pace: an empty slot means a short
/// fixed sleep and a retry; an occupied one is encoded and published once
/// per enabled stream. A failed publish is never retried, the next captured
/// frame supersedes it.
pub fn run(
    slot: Arc<FrameSlot>,
    sink: impl EnvelopeSink,
    options: &PublishOptions,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let Some(frame_set) = slot.try_withdraw() else {
            thread::sleep(POLL_INTERVAL);
            continue;
        };
        debug!(ingress_ns = frame_set.ingress_ns, "processing raw frame");

        let frame_id = options.frame_id.as_deref();

        if options.color {
            let payload = encode_raw_image(&frame_set.color, frame_set.ingress_ns, frame_id);
            publish_one(&sink, StreamKind::Color, &enclose(&payload, now_ns()));
        }
        if options.depth {
            let payload =
                encode_raw_image(&frame_set.depth_colormap, frame_set.ingress_ns, frame_id);
            publish_one(&sink, StreamKind::Depth, &enclose(&payload, now_ns()));
        }
    }
    info!("publish loop stopped");
}

fn publish_one(sink: &impl EnvelopeSink, stream: StreamKind, envelope: &[u8]) {
    match sink.publish(stream, envelope) {
        Ok(()) => counter!("pelorus_envelopes_published").increment(1),
        // Dropping under congestion is the intended policy.
        Err(e) => debug!(?stream, "envelope dropped: {e}"),
    }
}
