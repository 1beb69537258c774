use crate::pipeline::detector::Detection;
use anyhow::Result;
use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::imgproc::{put_text, rectangle, FONT_HERSHEY_SIMPLEX, LINE_8};

/// Render detection boxes and labels onto a frame in place.
pub fn draw_detections(frame: &mut Mat, detections: &[Detection]) -> Result<()> {
    let color = Scalar::new(0.0, 255.0, 0.0, 0.0); // Green

    for d in detections {
        let rect = Rect::new(
            d.bbox.x as i32,
            d.bbox.y as i32,
            (d.bbox.w as i32).max(1),
            (d.bbox.h as i32).max(1),
        );
        rectangle(frame, rect, color, 2, LINE_8, 0)?;

        let label = match &d.label {
            Some(name) => format!("{} {:.2}", name, d.confidence),
            None => format!("{:.2}", d.confidence),
        };
        put_text(
            frame,
            &label,
            Point::new(rect.x, (rect.y - 10).max(10)),
            FONT_HERSHEY_SIMPLEX,
            0.5,
            color,
            2,
            LINE_8,
            false,
        )?;
    }

    Ok(())
}
