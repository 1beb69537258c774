// Annotation loop: decode -> detect -> draw -> encode, strictly in stream
// order with no frame dropping.

use crate::pipeline::detector::FrameDetector;
use crate::pipeline::draw::draw_detections;
use crate::pipeline::encoder::VideoSink;
use crate::video::{opencv_reader::OpencvSource, VideoSource};
use anyhow::{anyhow, Context, Result};
use opencv::core::Size;
use std::path::Path;
use std::time::{Duration, Instant};

pub struct AnnotationReport {
    pub frames: usize,
    pub elapsed: Duration,
}

/// Annotate `input` into `output` by running `detector` on every decoded
/// frame. Output dimensions, frame rate, ordering, and frame count follow the
/// source. On mid-stream failure the partial output file remains on disk.
pub fn annotate_video(
    input: &Path,
    output: &Path,
    detector: &mut dyn FrameDetector,
) -> Result<AnnotationReport> {
    let start = Instant::now();

    let input_str = input
        .to_str()
        .ok_or_else(|| anyhow!("Non-UTF-8 input path: {:?}", input))?;
    let mut source = OpencvSource::open(input_str)
        .with_context(|| format!("Error opening video file: {}", input.display()))?;

    let (width, height) = source.dimensions();
    let fps = source.fps();
    let total_frames = source.frame_count();

    let mut sink = VideoSink::open(output, fps, Size::new(width, height))?;

    let mut frames = 0usize;
    let loop_start = Instant::now();

    while let Some(mut frame) = source.next_frame()? {
        let detections = detector.detect(&frame)?;
        draw_detections(&mut frame, &detections)?;
        sink.write(&frame)?;
        frames += 1;

        if frames % 30 == 0 {
            let elapsed = loop_start.elapsed().as_secs_f64();
            let rate = frames as f64 / elapsed.max(f64::EPSILON);
            let progress = if total_frames > 0 {
                frames as f64 / total_frames as f64 * 100.0
            } else {
                0.0
            };
            tracing::info!(
                "Processed {}/{} frames ({:.1}%) at {:.1} fps",
                frames,
                total_frames,
                progress,
                rate
            );
        }
    }

    sink.release()?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Annotation completed: {} frames in {:.1}s (codec {})",
        frames,
        elapsed.as_secs_f64(),
        sink.codec()
    );

    Ok(AnnotationReport { frames, elapsed })
}
