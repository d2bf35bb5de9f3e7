pub mod config;
pub mod fields;
pub mod text;

pub use config::{ConfigError, Decoder, OcrConfig, SkewPolicy};
pub use fields::{ExtractedFields, FieldValue};
pub use text::{BoundingQuad, RecognizedText, TextFragment, WordBox};
