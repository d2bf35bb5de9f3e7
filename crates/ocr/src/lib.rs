pub mod annotate;
pub mod extract;
pub mod pipeline;
pub mod recognizer;

pub use annotate::{draw_word_boxes, word_boxes};
pub use extract::{ExtractError, Extractor, ExtractorOptions};
pub use pipeline::{flatten_line_breaks, DocumentPipeline, DocumentResult, PipelineError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, RecognizeOptions};
