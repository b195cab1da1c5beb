use std::path::{Path, PathBuf};

use image::RgbImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, warn};

use super::TextExtractor;
use crate::models::TextCandidate;

const DETECTION_MODEL: &str = "text-detection.rten";
const RECOGNITION_MODEL: &str = "text-recognition.rten";

/// `ocrs` only returns text, so every line gets this score.
const UNSCORED_CONFIDENCE: f32 = 0.9;

/// Standard `ocrs` model cache (`~/.cache/ocrs`).
pub fn default_model_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

/// Load the detection and recognition models from `model_dir`.
pub fn init_ocr_engine(model_dir: &Path) -> anyhow::Result<OcrEngine> {
    let detection_model_path = model_dir.join(DETECTION_MODEL);
    let recognition_model_path = model_dir.join(RECOGNITION_MODEL);

    if !detection_model_path.exists() || !recognition_model_path.exists() {
        anyhow::bail!(
            "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
             Expected locations:\n  - {}\n  - {}",
            detection_model_path.display(),
            recognition_model_path.display()
        );
    }

    info!(dir = %model_dir.display(), "Loading OCR models");
    let detection_model = Model::load_file(&detection_model_path)?;
    let recognition_model = Model::load_file(&recognition_model_path)?;

    let engine = OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })?;

    Ok(engine)
}

/// Text extraction backed by the `ocrs` engine. Models are loaded once and
/// reused for every region.
pub struct OcrsExtractor {
    engine: OcrEngine,
}

impl OcrsExtractor {
    pub fn new(engine: OcrEngine) -> Self {
        Self { engine }
    }

    pub fn from_model_dir(model_dir: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(init_ocr_engine(model_dir)?))
    }

    fn read_lines(&self, image: &RgbImage) -> anyhow::Result<Vec<String>> {
        let source = ImageSource::from_bytes(image.as_raw(), image.dimensions())
            .map_err(|e| anyhow::anyhow!("Invalid OCR input: {:?}", e))?;
        let input = self.engine.prepare_input(source)?;
        let text = self.engine.get_text(&input)?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl TextExtractor for OcrsExtractor {
    fn extract_text(&self, image: &RgbImage) -> Vec<TextCandidate> {
        match self.read_lines(image) {
            Ok(lines) => {
                debug!(lines = lines.len(), "OCR finished");
                lines
                    .into_iter()
                    .map(|line| TextCandidate::new(line, UNSCORED_CONFIDENCE))
                    .collect()
            }
            Err(err) => {
                warn!(error = %err, "OCR failed, treating region as unreadable");
                Vec::new()
            }
        }
    }
}
