pub mod extractor;
pub mod vision;

pub use extractor::extract_from_text;
pub use vision::{DetectedElement, ElementLabel, VisionRunner};
