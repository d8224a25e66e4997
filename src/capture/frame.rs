use bytes::Bytes;

/// BGR8 image with zero-copy semantics
#[derive(Debug, Clone)]
pub struct ColorImage {
    /// Immutable pixel data, 3 bytes per pixel, byte order B-G-R.
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

impl ColorImage {
    pub fn new(data: Bytes, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }
}

/// Z16 depth image, one 16-bit linear depth value per pixel.
#[derive(Debug, Clone)]
pub struct DepthImage {
    pub data: Vec<u16>,
    pub width: u32,
    pub height: u32,
}

/// What the device hands back for one acquisition cycle.
///
/// Either component may be absent when the device delivers an incoherent
/// set; the capture loop discards such cycles whole.
#[derive(Debug, Default)]
pub struct RawFrameSet {
    pub color: Option<ColorImage>,
    pub depth: Option<DepthImage>,
}

/// One captured frame set, ready for publishing.
///
/// Color, colorized depth, and the ingress timestamp always travel together;
/// the type has no partially-filled state.
#[derive(Debug, Clone)]
pub struct FrameSet {
    pub color: ColorImage,
    pub depth_colormap: ColorImage,
    /// Wall-clock nanoseconds at the moment the set left the device.
    pub ingress_ns: u64,
}
