use super::VideoSource;
use anyhow::{anyhow, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{
        VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT,
        CAP_PROP_FRAME_WIDTH,
    },
};

pub struct OpencvSource {
    capture: VideoCapture,
    width: i32,
    height: i32,
    fps: f64,
    total_frames: usize,
}

impl OpencvSource {
    pub fn open(path: &str) -> Result<Self> {
        let capture = VideoCapture::from_file(path, CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(anyhow!("Failed to open video file: {}", path));
        }

        let width = capture.get(CAP_PROP_FRAME_WIDTH)? as i32;
        let height = capture.get(CAP_PROP_FRAME_HEIGHT)? as i32;
        let mut fps = capture.get(CAP_PROP_FPS)?;
        if fps <= 0.0 {
            tracing::warn!("OpencvSource: no FPS in metadata for {}, falling back to 30.0", path);
            fps = 30.0;
        }
        let total_frames = capture.get(CAP_PROP_FRAME_COUNT)? as usize;

        tracing::info!(
            "OpencvSource: opened {}, {}x{} @ {:.2}fps, {} frames",
            path,
            width,
            height,
            fps,
            total_frames
        );

        Ok(Self {
            capture,
            width,
            height,
            fps,
            total_frames,
        })
    }
}

impl VideoSource for OpencvSource {
    fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> usize {
        self.total_frames
    }

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let success = self.capture.read(&mut frame)?;
        if !success || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}
