//! Zenoh-backed envelope sink.

use tracing::info;
use zenoh::pubsub::Publisher;
use zenoh::qos::{CongestionControl, Priority};
use zenoh::{Session, Wait};

use crate::publish::keys::construct_pubsub_key;
use crate::publish::{EnvelopeSink, PublishError, StreamKind};
use crate::{BusConfig, PublishOptions};

/// Publishes envelopes on the keelson key space through one declared
/// publisher per enabled stream, each at interactive-high priority with
/// drop-on-congestion so a congested bus sheds frames instead of backing up
/// the publish loop.
pub struct ZenohSink {
    color: Option<Publisher<'static>>,
    depth: Option<Publisher<'static>>,
    /// Declared in the keelson layout but nothing publishes to it yet.
    _point_cloud: Publisher<'static>,
}

impl ZenohSink {
    /// Declare the publishers for the configured key space.
    pub fn new(
        session: &Session,
        bus: &BusConfig,
        options: &PublishOptions,
    ) -> Result<Self, PublishError> {
        let point_cloud = declare_publisher(
            session,
            construct_pubsub_key(&bus.realm, &bus.entity_id, "point_cloud", &bus.source_id),
        )?;

        let color = options
            .color
            .then(|| {
                declare_publisher(
                    session,
                    construct_pubsub_key(
                        &bus.realm,
                        &bus.entity_id,
                        "raw_image",
                        &format!("{}/color", bus.source_id),
                    ),
                )
            })
            .transpose()?;

        let depth = options
            .depth
            .then(|| {
                declare_publisher(
                    session,
                    construct_pubsub_key(
                        &bus.realm,
                        &bus.entity_id,
                        "raw_image",
                        &format!("{}/depth", bus.source_id),
                    ),
                )
            })
            .transpose()?;

        Ok(Self {
            color,
            depth,
            _point_cloud: point_cloud,
        })
    }
}

fn declare_publisher(session: &Session, key: String) -> Result<Publisher<'static>, PublishError> {
    info!("declaring publisher at {key}");
    session
        .declare_publisher(key)
        .priority(Priority::InteractiveHigh)
        .congestion_control(CongestionControl::Drop)
        .wait()
        .map_err(|e| PublishError(e.to_string()))
}

impl EnvelopeSink for ZenohSink {
    fn publish(&self, stream: StreamKind, envelope: &[u8]) -> Result<(), PublishError> {
        let publisher = match stream {
            StreamKind::Color => self.color.as_ref(),
            StreamKind::Depth => self.depth.as_ref(),
        };
        let Some(publisher) = publisher else {
            return Err(PublishError(format!("{stream:?} stream is not enabled")));
        };

        publisher
            .put(envelope.to_vec())
            .wait()
            .map_err(|e| PublishError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_session() -> Session {
        let mut config = zenoh::Config::default();
        // Keep the test session off the network.
        config
            .insert_json5("scouting/multicast/enabled", "false")
            .unwrap();
        config
            .insert_json5("scouting/gossip/enabled", "false")
            .unwrap();
        zenoh::open(config).wait().unwrap()
    }

    #[test]
    fn declares_publishers_for_enabled_streams_only() {
        let session = local_session();
        let options = PublishOptions {
            color: true,
            depth: false,
            frame_id: None,
        };
        let sink = ZenohSink::new(&session, &BusConfig::default(), &options).unwrap();

        assert!(sink.publish(StreamKind::Color, b"envelope").is_ok());
        assert!(sink.publish(StreamKind::Depth, b"envelope").is_err());
    }
}
