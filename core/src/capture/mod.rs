mod sink;
mod slot;

pub use sink::{AnyFrame, FrameMatcher, FrameSink, PngFrameSink};
pub use slot::ScreenshotSlot;
