pub mod colorize;
pub mod frame;
#[cfg(feature = "realsense")]
pub mod realsense;
pub mod source;
pub mod worker;

pub use frame::{ColorImage, DepthImage, FrameSet, RawFrameSet};
pub use source::{CaptureError, FrameSource, StreamProfile, SyntheticSource};
