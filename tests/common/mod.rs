mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from platereader for tests
pub use platereader::enhance::{EnhancementConfig, Enhancer};
pub use platereader::models::{BoundingBox, Detection, TextCandidate};
pub use platereader::pipeline::FramePipeline;
pub use platereader::runner::{FrameSink, FrameSource, Runner};
