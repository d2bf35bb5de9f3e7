pub mod deskew;
pub mod normalize;
pub mod pipeline;

pub use deskew::{DeskewError, LineSegment};
pub use normalize::NormalizeError;
pub use pipeline::{preprocess_document, PreprocessOptions, VisionError};
