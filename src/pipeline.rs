//! Per-frame orchestration: crop each detection, enhance it, read its text,
//! validate, and annotate accepted plates onto the frame.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use image::{DynamicImage, RgbImage};
use tracing::{debug, instrument, trace};

use crate::annotate::{AnnotationStyle, annotate_plate};
use crate::detection::TextExtractor;
use crate::enhance::{EnhancementConfig, Enhancer};
use crate::models::Detection;
use crate::validate::{ValidatedPlate, validate};

/// Where enhanced regions are dumped when debugging.
#[derive(Clone, Debug)]
pub struct DebugConfig {
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// The directory must be empty or non-existent; it is created if absent.
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    fn frame_dir(&self, frame_index: usize) -> PathBuf {
        self.output_dir.join(format!("frame_{:06}", frame_index))
    }
}

pub struct FramePipeline {
    extractor: Box<dyn TextExtractor>,
    enhancer: Enhancer,
    style: AnnotationStyle,
    debug: Option<DebugConfig>,
    frames_seen: AtomicUsize,
}

impl FramePipeline {
    /// Fails if `config` is invalid.
    pub fn new(extractor: Box<dyn TextExtractor>, config: &EnhancementConfig) -> Result<Self> {
        Ok(Self {
            extractor,
            enhancer: Enhancer::new(config)?,
            style: AnnotationStyle::default(),
            debug: None,
            frames_seen: AtomicUsize::new(0),
        })
    }

    pub fn with_style(mut self, style: AnnotationStyle) -> Self {
        self.style = style;
        self
    }

    /// Dump every enhanced region under `output_dir`, one directory per frame.
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.debug = Some(DebugConfig::new(output_dir)?);
        Ok(self)
    }

    /// Number of frames processed so far.
    pub fn frames_processed(&self) -> usize {
        self.frames_seen.load(Ordering::Relaxed)
    }

    /// Process every detection of one frame, in order. Accepted plates are
    /// drawn onto `frame` and returned; rejected ones leave no trace on it.
    #[instrument(skip_all, fields(frame = self.frames_seen.load(Ordering::Relaxed), detections = detections.len()))]
    pub fn process_frame(
        &self,
        frame: &mut RgbImage,
        detections: &[Detection],
    ) -> Result<Vec<ValidatedPlate>> {
        let frame_index = self.frames_seen.fetch_add(1, Ordering::Relaxed);
        let mut accepted = Vec::new();

        for (n, detection) in detections.iter().enumerate() {
            let bbox = detection.bbox.clip_to(frame.width(), frame.height());
            let Some(region) = bbox.crop(frame) else {
                trace!(detection = n, bbox = ?detection.bbox, "Skipping empty region");
                continue;
            };

            let enhanced = match &self.debug {
                Some(debug) => {
                    let dir = debug.frame_dir(frame_index);
                    enhance_with_dump(&self.enhancer, &region, &dir, n + 1)?
                }
                None => self.enhancer.run(&region),
            };

            let candidates = self.extractor.extract_text(&enhanced);
            let raw_text = candidates.first().map(|c| c.text.as_str());

            match validate(raw_text) {
                Ok(plate) => {
                    debug!(detection = n, plate = %plate, format = plate.format(), "Accepted plate");
                    annotate_plate(frame, &bbox, plate.as_str(), &self.style);
                    accepted.push(plate);
                }
                Err(reason) => {
                    debug!(detection = n, %reason, "Rejected region");
                }
            }
        }

        Ok(accepted)
    }
}

/// Run the enhancer, saving each stage to `dir/det_NN/` and the final
/// region to `dir/det_NN.png`.
fn enhance_with_dump(
    enhancer: &Enhancer,
    region: &RgbImage,
    dir: &Path,
    n: usize,
) -> Result<RgbImage> {
    let stage_dir = dir.join(format!("det_{:02}", n));
    std::fs::create_dir_all(&stage_dir)?;

    let mut stages: Vec<(String, DynamicImage)> = Vec::new();
    let enhanced = enhancer.run_inspect(region, |name, image| {
        stages.push((name.to_string(), image.clone()));
    });

    for (idx, (name, image)) in stages.iter().enumerate() {
        let filename = format!("{:02}_{}.png", idx + 1, name.to_lowercase().replace(' ', "_"));
        image
            .save(stage_dir.join(&filename))
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    }

    let output_path = dir.join(format!("det_{:02}.png", n));
    enhanced
        .save(&output_path)
        .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    trace!(path = %output_path.display(), "Saved enhanced region");

    Ok(enhanced)
}
