//! False-color rendering of Z16 depth frames.
//!
//! Follows the classic OpenCV recipe: scale the 16-bit depth into 8 bits
//! with a fixed alpha, then map through the JET palette. Output is BGR8 so
//! the colormap goes on the wire with the same encoding as the color stream.

use bytes::Bytes;
use once_cell::sync::Lazy;

use crate::capture::frame::{ColorImage, DepthImage};

/// Scale applied before the 8-bit saturation; full red at roughly 8.5 m.
const DEPTH_SCALE_ALPHA: f32 = 0.03;

/// JET palette, one BGR triple per 8-bit depth value.
static JET_LUT: Lazy<[[u8; 3]; 256]> = Lazy::new(build_jet_lut);

fn build_jet_lut() -> [[u8; 3]; 256] {
    let mut lut = [[0u8; 3]; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let x = i as f32 / 255.0;
        let r = jet_channel(4.0 * x - 3.0);
        let g = jet_channel(4.0 * x - 2.0);
        let b = jet_channel(4.0 * x - 1.0);
        *entry = [b, g, r];
    }
    lut
}

fn jet_channel(v: f32) -> u8 {
    let c = (1.5 - v.abs()).clamp(0.0, 1.0);
    (c * 255.0).round() as u8
}

/// Saturating 16-to-8-bit scale, the `convertScaleAbs` half of the recipe.
fn scale_abs(depth: u16) -> u8 {
    (f32::from(depth) * DEPTH_SCALE_ALPHA).round().min(255.0) as u8
}

/// Render a depth frame as a BGR8 false-color image of the same dimensions.
pub fn colorize(depth: &DepthImage) -> ColorImage {
    let mut data = Vec::with_capacity(depth.data.len() * 3);
    for &d in &depth.data {
        data.extend_from_slice(&JET_LUT[scale_abs(d) as usize]);
    }
    ColorImage::new(Bytes::from(data), depth.width, depth.height)
}
