//! Seams to the two model-backed capabilities: finding plates in a frame
//! and reading text from an enhanced plate region.

pub mod ocr;
#[cfg(feature = "yolo")]
pub mod yolo;

use image::RgbImage;

use crate::models::{BoundingBox, Detection, TextCandidate};

/// Finds plate regions in a frame. May block on model inference.
pub trait PlateDetector: Send {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<Detection>>;
}

/// Reads text from an image. Never fails: an engine error or an image with
/// no text both yield an empty list.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &RgbImage) -> Vec<TextCandidate>;
}

/// Reports the whole frame as a single plate. For inputs that are already
/// cropped to one plate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullFrameDetector;

impl PlateDetector for FullFrameDetector {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![Detection {
            bbox: BoundingBox::new(0, 0, width as i32, height as i32),
            confidence: 1.0,
            class_id: 0,
            label: "plate".to_string(),
        }])
    }
}
