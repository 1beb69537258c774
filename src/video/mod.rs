pub mod opencv_reader;

use anyhow::Result;
use opencv::core::Mat;

/// Sequential decode capability for a video container.
pub trait VideoSource: Send {
    /// Source frame dimensions as (width, height).
    fn dimensions(&self) -> (i32, i32);
    fn fps(&self) -> f64;
    /// Frame count reported by the container metadata.
    fn frame_count(&self) -> usize;
    /// Next decoded frame in stream order, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Mat>>;
}
