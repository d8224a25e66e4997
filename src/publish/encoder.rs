//! `RawImage` payload construction.

use prost::Message;

use crate::capture::frame::ColorImage;
use crate::publish::payloads::{RawImage, Timestamp};

/// Wire encoding tag for 8-bit BGR pixels.
pub const ENCODING_BGR8: &str = "bgr8";

/// Serialize one image into a `RawImage` payload.
///
/// The row stride is derived from the actual buffer length rather than
/// assumed to be `width * 3`, so padded rows encode faithfully. Image shape
/// is fixed by the capture configuration; a buffer that does not divide
/// evenly into rows is a programmer error.
pub fn encode_raw_image(image: &ColorImage, ingress_ns: u64, frame_id: Option<&str>) -> Vec<u8> {
    assert!(image.height > 0, "image height must be non-zero");
    assert_eq!(
        image.data.len() % image.height as usize,
        0,
        "image buffer of {} bytes does not divide into {} rows",
        image.data.len(),
        image.height
    );
    let step = (image.data.len() / image.height as usize) as u32;

    let payload = RawImage {
        timestamp: Some(Timestamp::from_nanos(ingress_ns)),
        frame_id: frame_id.unwrap_or_default().to_owned(),
        width: image.width,
        height: image.height,
        encoding: ENCODING_BGR8.to_owned(),
        step,
        data: image.data.to_vec(),
    };
    payload.encode_to_vec()
}
