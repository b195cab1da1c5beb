pub mod annotate;
pub mod detection;
pub mod enhance;
pub mod error;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod runner;
pub mod validate;

pub use detection::{FullFrameDetector, PlateDetector, TextExtractor};
pub use enhance::{EnhancementConfig, Enhancer, enhance};
pub use error::ConfigError;
pub use models::{BoundingBox, Detection, TextCandidate};
pub use pipeline::FramePipeline;
pub use runner::{FrameSink, FrameSource, ImageSequenceSource, PngSequenceSink, RunSummary, Runner};
pub use validate::{Rejection, ValidatedPlate, validate};
