use legible_core::{Decoder, RecognizedText};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available — build with `tesseract` feature")]
    NotAvailable,
}

/// Per-call recognition settings, passed explicitly instead of through any
/// process-wide engine state.
#[derive(Debug, Clone)]
pub struct RecognizeOptions {
    pub languages: Vec<String>,
    pub decoder: Decoder,
}

impl Default for RecognizeOptions {
    fn default() -> Self {
        Self { languages: vec!["en".to_string()], decoder: Decoder::Greedy }
    }
}

/// Abstraction over a text-recognition engine.
///
/// Implementations accept raw PNG/JPEG image bytes and return the recognized
/// text, with per-fragment geometry when the engine reports it (sparse-text
/// engines) and without it otherwise (dense-text engines).
pub trait OcrBackend: Send + Sync {
    fn recognize(
        &self,
        image_bytes: &[u8],
        options: &RecognizeOptions,
    ) -> Result<RecognizedText, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set result — useful for exercising the pipeline and the
/// field extractor without an OCR engine installed.
pub struct MockRecognizer {
    pub result: RecognizedText,
}

impl MockRecognizer {
    pub fn new(result: RecognizedText) -> Self {
        Self { result }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { result: RecognizedText::from_text(text) }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(
        &self,
        _image_bytes: &[u8],
        _options: &RecognizeOptions,
    ) -> Result<RecognizedText, OcrError> {
        Ok(self.result.clone())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, RecognizeOptions};
    use legible_core::RecognizedText;
    use leptess::LepTess;

    /// Dense-text engine: returns the flat text with no fragment geometry.
    pub struct TesseractRecognizer {
        data_path: Option<String>,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>) -> Self {
            Self { data_path }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(
            &self,
            image_bytes: &[u8],
            options: &RecognizeOptions,
        ) -> Result<RecognizedText, OcrError> {
            let lang = options.languages.join("+");
            let mut lt = LepTess::new(self.data_path.as_deref(), &lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            let text = lt
                .get_utf8_text()
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(RecognizedText::from_text(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legible_core::{BoundingQuad, TextFragment};

    #[test]
    fn mock_returns_preset_text() {
        let r = MockRecognizer::from_text("CAFE\nRs. 450");
        let out = r.recognize(b"fake image data", &RecognizeOptions::default()).unwrap();
        assert_eq!(out.text, "CAFE\nRs. 450");
        assert!(out.fragments.is_empty());
    }

    #[test]
    fn mock_preserves_fragments() {
        let quad = BoundingQuad::new([(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]);
        let preset = RecognizedText::from_fragments(vec![TextFragment::new(quad, "CAFE", None)]);
        let r = MockRecognizer::new(preset.clone());
        assert_eq!(r.recognize(b"", &RecognizeOptions::default()).unwrap(), preset);
    }
}
