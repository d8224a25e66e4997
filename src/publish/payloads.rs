//! Keelson wire messages, hand-derived with prost.
//!
//! Field numbers follow the keelson `RawImage` schema and the well-known
//! `google.protobuf.Timestamp` layout, so envelopes stay interoperable with
//! other keelson consumers without a protoc build step.

use prost::Message;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// `google.protobuf.Timestamp`.
#[derive(Clone, PartialEq, Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl Timestamp {
    /// Split a nanosecond instant into the protobuf seconds/nanos pair.
    pub fn from_nanos(ns: u64) -> Self {
        Self {
            seconds: (ns / NANOS_PER_SEC) as i64,
            nanos: (ns % NANOS_PER_SEC) as i32,
        }
    }

    pub fn as_nanos(&self) -> u64 {
        self.seconds as u64 * NANOS_PER_SEC + self.nanos as u64
    }
}

/// Keelson `RawImage` payload.
#[derive(Clone, PartialEq, Message)]
pub struct RawImage {
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<Timestamp>,
    /// Left empty (and thus off the wire) when no frame id is configured.
    #[prost(string, tag = "2")]
    pub frame_id: String,
    #[prost(uint32, tag = "3")]
    pub width: u32,
    #[prost(uint32, tag = "4")]
    pub height: u32,
    #[prost(string, tag = "5")]
    pub encoding: String,
    /// Row stride in bytes.
    #[prost(uint32, tag = "6")]
    pub step: u32,
    #[prost(bytes = "vec", tag = "7")]
    pub data: Vec<u8>,
}

/// Keelson outer envelope: framing metadata plus the serialized payload.
#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    #[prost(message, optional, tag = "1")]
    pub enclosed_at: Option<Timestamp>,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

/// Wrap a serialized payload in the outer envelope.
pub fn enclose(payload: &[u8], enclosed_at_ns: u64) -> Vec<u8> {
    let envelope = Envelope {
        enclosed_at: Some(Timestamp::from_nanos(enclosed_at_ns)),
        payload: payload.to_vec(),
    };
    envelope.encode_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_splits_nanoseconds() {
        let ts = Timestamp::from_nanos(1_700_000_000_123_456_789);
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 123_456_789);
        assert_eq!(ts.as_nanos(), 1_700_000_000_123_456_789);
    }

    #[test]
    fn enclose_round_trips() {
        let wire = enclose(b"payload bytes", 42);
        let envelope = Envelope::decode(wire.as_slice()).unwrap();
        assert_eq!(envelope.payload, b"payload bytes");
        assert_eq!(envelope.enclosed_at.unwrap().as_nanos(), 42);
    }
}
