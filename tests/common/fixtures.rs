use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use platereader::detection::TextExtractor;
use platereader::models::{BoundingBox, Detection, TextCandidate};
use platereader::runner::{FrameSink, FrameSource};

/// Text extractor that answers with a fixed script, one reply per call.
/// `None` replies (and calls past the end of the script) yield no text.
pub struct ScriptedExtractor {
    replies: Mutex<VecDeque<Option<String>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedExtractor {
    pub fn new(replies: &[Option<&str>]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.map(str::to_string)).collect()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared handle to the call count, still readable after the extractor
    /// has been moved into a pipeline.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl TextExtractor for ScriptedExtractor {
    fn extract_text(&self, _image: &RgbImage) -> Vec<TextCandidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().pop_front().flatten();
        reply
            .map(|text| vec![TextCandidate::new(text, 0.9)])
            .unwrap_or_default()
    }
}

/// Frames served from memory.
pub struct VecSource(pub VecDeque<RgbImage>);

impl VecSource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self(frames.into())
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> anyhow::Result<Option<RgbImage>> {
        Ok(self.0.pop_front())
    }
}

/// Keeps every frame it is given.
#[derive(Clone, Default)]
pub struct CollectingSink(pub Arc<Mutex<Vec<RgbImage>>>);

impl FrameSink for CollectingSink {
    fn write_frame(&mut self, frame: &RgbImage) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(frame.clone());
        Ok(())
    }
}

pub const BACKGROUND: Rgb<u8> = Rgb([90, 90, 90]);

/// Uniform gray frame.
pub fn gray_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, BACKGROUND)
}

/// Light plate with dark vertical strokes, roughly what a cropped plate
/// looks like.
pub fn plate_region(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let border = y < 2 || y + 2 >= height;
        let stroke = (x / 3) % 3 == 1 && !border;
        if stroke {
            Rgb([20, 20, 30])
        } else {
            Rgb([230, 225, 210])
        }
    })
}

pub fn detection(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
    Detection {
        bbox: BoundingBox::new(x1, y1, x2, y2),
        confidence: 0.9,
        class_id: 0,
        label: "plate".to_string(),
    }
}
