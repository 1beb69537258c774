use anyhow::{anyhow, Result};
use image::{DynamicImage, ImageBuffer, Rgb};
use opencv::core::Mat;
use opencv::prelude::*;
use usls::models::RTDETR;
use usls::{Config, Image};

/// Pixel-space bounding box.
#[derive(Debug, Clone, Copy)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// A single detection returned for a frame.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BBox,
    pub label: Option<String>,
    pub confidence: f32,
}

/// Capability contract for the per-frame detection step: accepts a raster
/// frame, returns zero or more boxes with labels/scores.
pub trait FrameDetector: Send {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>>;
}

/// A wrapper around the USLS RT-DETR model that handles BGR-to-RGB conversion
/// and corrects for aspect-ratio padding bugs in the underlying model library.
pub struct ObjectDetector {
    model: RTDETR,
}

impl ObjectDetector {
    /// Load the model once; the handle is shared across requests for the
    /// lifetime of the process.
    pub fn new(model_path: &str) -> Result<Self> {
        let config = Config::default()
            .with_model_file(model_path)
            .with_class_names(&usls::NAMES_COCO_80);

        #[cfg(target_os = "macos")]
        let config = config.with_model_device(usls::Device::CoreMl);

        let config = config.commit()?;
        let model = RTDETR::new(config)?;
        Ok(Self { model })
    }
}

impl FrameDetector for ObjectDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        let dynamic_image = mat_to_dynamic_image(frame)?;

        // Correction factors for the USLS RT-DETR letterboxing bug
        let size = frame.size()?;
        let img_w = size.width as f32;
        let img_h = size.height as f32;
        let (x_corr, y_corr) = if img_w > img_h {
            (img_w / img_h, 1.0)
        } else if img_h > img_w {
            (1.0, img_h / img_w)
        } else {
            (1.0, 1.0)
        };

        let results = self.model.forward(&[Image::from(dynamic_image)])?;

        let detections = results
            .into_iter()
            .next()
            .map(|y| {
                y.hbbs
                    .into_iter()
                    .map(|hbb| Detection {
                        bbox: BBox {
                            x: hbb.xmin() * x_corr,
                            y: hbb.ymin() * y_corr,
                            w: hbb.width() * x_corr,
                            h: hbb.height() * y_corr,
                        },
                        label: hbb.name().map(|n| n.to_string()),
                        confidence: hbb.confidence().unwrap_or(0.0),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(detections)
    }
}

/// Convert an OpenCV Mat (BGR) to an image::DynamicImage (RGB)
fn mat_to_dynamic_image(mat: &Mat) -> Result<DynamicImage> {
    let mut rgb_mat = Mat::default();
    opencv::imgproc::cvt_color_def(mat, &mut rgb_mat, opencv::imgproc::COLOR_BGR2RGB)?;

    let size = rgb_mat.size()?;
    let width = size.width as u32;
    let height = size.height as u32;

    if !rgb_mat.is_continuous() {
        return Err(anyhow!("Mat is not continuous"));
    }

    let data_bytes = rgb_mat.data_bytes()?;
    let buffer = data_bytes.to_vec();

    let img_buffer = ImageBuffer::<Rgb<u8>, _>::from_vec(width, height, buffer)
        .ok_or_else(|| anyhow!("Failed to create ImageBuffer from Mat data"))?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}
