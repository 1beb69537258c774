use anyhow::{anyhow, Result};
use opencv::core::{Mat, Size};
use opencv::prelude::*;
use opencv::videoio::VideoWriter;
use std::fs;
use std::path::Path;

/// Encoders tried in order until one opens a writable output stream. A fixed
/// choice may silently fail to open depending on the platform's codec
/// availability, so this is a prioritized candidate list, not a preference.
pub const CODEC_PREFERENCE: [&str; 3] = ["avc1", "H264", "mp4v"];

/// Try `open` on each candidate in order, returning the first that yields a
/// value. `Ok(None)` from `open` means "this candidate failed to initialize,
/// advance"; a hard error aborts the scan.
pub fn first_available<T, F>(candidates: &[&'static str], mut open: F) -> Result<Option<(&'static str, T)>>
where
    F: FnMut(&str) -> Result<Option<T>>,
{
    for &candidate in candidates {
        if let Some(value) = open(candidate)? {
            return Ok(Some((candidate, value)));
        }
    }
    Ok(None)
}

/// Writable output stream selected via codec fallback.
pub struct VideoSink {
    writer: VideoWriter,
    codec: &'static str,
}

impl VideoSink {
    /// Open an output stream at `path`, trying `CODEC_PREFERENCE` in order.
    /// If every candidate fails, any partial file left behind by a failed
    /// writer is removed and an error is returned.
    pub fn open(path: &Path, fps: f64, frame_size: Size) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Non-UTF-8 output path: {:?}", path))?;

        let selected = first_available(&CODEC_PREFERENCE, |codec| {
            let fourcc = fourcc_code(codec)?;
            let writer = VideoWriter::new(path_str, fourcc, fps, frame_size, true)?;
            if writer.is_opened()? {
                Ok(Some(writer))
            } else {
                tracing::warn!("Encoder {} failed to open, trying next candidate", codec);
                Ok(None)
            }
        })?;

        match selected {
            Some((codec, writer)) => {
                tracing::info!("Opened video writer with codec: {}", codec);
                Ok(Self { writer, codec })
            }
            None => {
                let _ = fs::remove_file(path);
                Err(anyhow!("Failed to create output video writer with any codec"))
            }
        }
    }

    pub fn codec(&self) -> &'static str {
        self.codec
    }

    pub fn write(&mut self, frame: &Mat) -> Result<()> {
        self.writer.write(frame)?;
        Ok(())
    }

    pub fn release(&mut self) -> Result<()> {
        self.writer.release()?;
        Ok(())
    }
}

fn fourcc_code(codec: &str) -> Result<i32> {
    let chars: Vec<char> = codec.chars().collect();
    if chars.len() != 4 {
        return Err(anyhow!("Invalid fourcc: {}", codec));
    }
    Ok(VideoWriter::fourcc(chars[0], chars[1], chars[2], chars[3])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_candidate_wins_when_it_opens() {
        let mut tried = Vec::new();
        let result = first_available(&CODEC_PREFERENCE, |c| {
            tried.push(c.to_string());
            Ok(Some(c.to_string()))
        })
        .unwrap();
        assert_eq!(result, Some(("avc1", "avc1".to_string())));
        assert_eq!(tried, vec!["avc1"]);
    }

    #[test]
    fn advances_past_failed_candidates() {
        let result = first_available(&CODEC_PREFERENCE, |c| {
            if c == "mp4v" {
                Ok(Some(()))
            } else {
                Ok(None)
            }
        })
        .unwrap();
        assert_eq!(result, Some(("mp4v", ())));
    }

    #[test]
    fn exhausted_list_yields_none() {
        let mut tried = 0;
        let result: Option<(&str, ())> = first_available(&CODEC_PREFERENCE, |_| {
            tried += 1;
            Ok(None)
        })
        .unwrap();
        assert!(result.is_none());
        assert_eq!(tried, CODEC_PREFERENCE.len());
    }

    #[test]
    fn hard_errors_abort_the_scan() {
        let mut tried = 0;
        let result: Result<Option<(&str, ())>> = first_available(&CODEC_PREFERENCE, |_| {
            tried += 1;
            Err(anyhow!("writer backend unavailable"))
        });
        assert!(result.is_err());
        assert_eq!(tried, 1);
    }
}
