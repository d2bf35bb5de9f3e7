use std::path::{Path, PathBuf};

use legible_core::{ExtractedFields, OcrConfig, RecognizedText};
use legible_vision::normalize::{self, NormalizeError};
use legible_vision::pipeline::{preprocess_document, PreprocessOptions};
use legible_vision::VisionError;
use thiserror::Error;
use tracing::{debug, info};

use crate::annotate;
use crate::extract::{ExtractError, Extractor, ExtractorOptions};
use crate::recognizer::{OcrBackend, OcrError, RecognizeOptions};

/// Name of the normalized-image artifact the OCR step consumes.
pub const PREPROCESSED_IMAGE_NAME: &str = "preprocessed.png";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image handling failed: {0}")]
    Image(#[from] NormalizeError),
    #[error("Document preprocessing failed: {0}")]
    Preprocess(#[from] VisionError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("Field extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

/// The result of processing one document image.
#[derive(Debug)]
pub struct DocumentResult {
    /// Raw OCR output; dense-text results have their line breaks flattened
    /// unless the config preserves orientation.
    pub text: RecognizedText,
    /// Structured invoice fields; `None` on the dense-text path, where the
    /// engine reported no fragment geometry to anchor the place field.
    pub fields: Option<ExtractedFields>,
    /// Where the normalized image was persisted, when preprocessing ran.
    pub preprocessed_path: Option<PathBuf>,
}

impl DocumentResult {
    /// Persist the word-boxed visualization, drawn on the image the engine
    /// actually saw: the fragment geometry is in the coordinate frame of the
    /// preprocessed artifact when preprocessing ran, and of the original
    /// bytes otherwise.
    pub async fn save_annotated(
        &self,
        original_bytes: &[u8],
        path: &Path,
    ) -> Result<(), PipelineError> {
        let source = match &self.preprocessed_path {
            Some(preprocessed) => tokio::fs::read(preprocessed).await?,
            None => original_bytes.to_vec(),
        };
        save_annotated(&source, &self.text, path).await
    }
}

/// Orchestrates: load → normalize → recognize → extract → persist artifacts.
///
/// Every stage is deterministic and runs at most once per call; a failure
/// aborts with the originating error and no retry. Retry policy for a flaky
/// engine belongs to the [`OcrBackend`] implementation, not here.
pub struct DocumentPipeline<R: OcrBackend> {
    recognizer: R,
    config: OcrConfig,
    extractor: Extractor,
    output_dir: PathBuf,
}

impl<R: OcrBackend> DocumentPipeline<R> {
    pub fn new(recognizer: R, config: OcrConfig, output_dir: PathBuf) -> Self {
        let extractor = Extractor::new(ExtractorOptions {
            extra_currency_marker: config.extra_currency_marker.clone(),
        });
        Self { recognizer, config, extractor, output_dir }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Process an image file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<DocumentResult, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        self.process_bytes(&bytes).await
    }

    /// Process raw image bytes (from camera capture or file read).
    pub async fn process_bytes(&self, data: &[u8]) -> Result<DocumentResult, PipelineError> {
        let image = normalize::load_image_from_bytes(data)?;

        // Photographs get the full normalization pipeline and the normalized
        // image is persisted for the OCR step; clean scans pass through.
        let (ocr_input, preprocessed_path) = if self.config.preprocess {
            let processed = preprocess_document(&image, &PreprocessOptions::from(&self.config))?;
            let png = normalize::encode_png(&processed)?;
            let path = self.output_dir.join(PREPROCESSED_IMAGE_NAME);
            tokio::fs::write(&path, &png).await?;
            info!(path = %path.display(), "normalized image persisted");
            (png, Some(path))
        } else {
            (normalize::encode_dynamic_png(&image)?, None)
        };

        let options = RecognizeOptions {
            languages: self.config.languages.clone(),
            decoder: self.config.decoder,
        };
        let mut recognized = self.recognizer.recognize(&ocr_input, &options)?;

        let fields = if recognized.fragments.is_empty() {
            // Dense-text path: flatten hyphenated line breaks for reading,
            // keeping the engine's layout when the caller asked for it.
            if !self.config.preserve_orientation {
                recognized.text = flatten_line_breaks(&recognized.text);
            }
            None
        } else {
            Some(self.extractor.extract(&recognized)?)
        };

        debug!(
            fragments = recognized.fragments.len(),
            extracted = fields.is_some(),
            "document processed"
        );
        Ok(DocumentResult { text: recognized, fields, preprocessed_path })
    }
}

/// Join words hyphenated across line breaks and flatten the remaining
/// newlines to spaces. Skipped when the caller wants to preserve the
/// original text orientation.
pub fn flatten_line_breaks(text: &str) -> String {
    text.replace("-\n", "").replace('\n', " ")
}

/// Persist the flat transcript to a caller-chosen location.
pub async fn save_transcript(recognized: &RecognizedText, path: &Path) -> std::io::Result<()> {
    tokio::fs::write(path, recognized.text.as_bytes()).await
}

/// Persist the word-boxed visualization next to the transcript.
pub async fn save_annotated(
    image_bytes: &[u8],
    recognized: &RecognizedText,
    path: &Path,
) -> Result<(), PipelineError> {
    let image = normalize::load_image_from_bytes(image_bytes)?;
    let boxes = annotate::word_boxes(recognized);
    let annotated = annotate::draw_word_boxes(&image, &boxes);
    let png = normalize::encode_dynamic_png(&image::DynamicImage::ImageRgba8(annotated))?;
    tokio::fs::write(path, &png).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::MockRecognizer;
    use image::{GrayImage, Luma};
    use legible_core::{BoundingQuad, FieldValue, TextFragment};

    fn tiny_png() -> Vec<u8> {
        let img = GrayImage::from_pixel(32, 32, Luma([220u8]));
        normalize::encode_png(&img).unwrap()
    }

    fn receipt_result() -> RecognizedText {
        let quad = BoundingQuad::new([(0.0, 0.0), (60.0, 0.0), (60.0, 14.0), (0.0, 14.0)]);
        RecognizedText::from_fragments(vec![
            TextFragment::new(quad, "SHARMA STORES", Some(0.97)),
            TextFragment::new(quad, "Order 4521", Some(0.93)),
            TextFragment::new(quad, "Total Rs. 450 Tax Rs. 20", Some(0.91)),
        ])
    }

    #[tokio::test]
    async fn sparse_result_yields_fields() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = DocumentPipeline::new(
            MockRecognizer::new(receipt_result()),
            OcrConfig::default(),
            dir.path().to_path_buf(),
        );

        let result = pipeline.process_bytes(&tiny_png()).await.unwrap();
        let fields = result.fields.expect("sparse path extracts fields");
        assert_eq!(fields.place, "SHARMA STORES");
        assert_eq!(fields.order_number, FieldValue::Integer(4521));
        assert_eq!(fields.price, FieldValue::Number(450.0));
        assert!(result.preprocessed_path.is_none());
    }

    #[tokio::test]
    async fn dense_result_is_flattened_without_fields() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = DocumentPipeline::new(
            MockRecognizer::from_text("the quick bro-\nwn fox\njumps"),
            OcrConfig::default(),
            dir.path().to_path_buf(),
        );

        let result = pipeline.process_bytes(&tiny_png()).await.unwrap();
        assert!(result.fields.is_none());
        assert_eq!(result.text.text, "the quick brown fox jumps");
    }

    #[tokio::test]
    async fn dense_result_keeps_breaks_when_orientation_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig { preserve_orientation: true, ..Default::default() };
        let pipeline = DocumentPipeline::new(
            MockRecognizer::from_text("the quick bro-\nwn fox\njumps"),
            config,
            dir.path().to_path_buf(),
        );

        let result = pipeline.process_bytes(&tiny_png()).await.unwrap();
        assert!(result.fields.is_none());
        assert_eq!(result.text.text, "the quick bro-\nwn fox\njumps");
    }

    #[tokio::test]
    async fn preprocess_writes_intermediate_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig { preprocess: true, ..Default::default() };
        let pipeline = DocumentPipeline::new(
            MockRecognizer::from_text("page text"),
            config,
            dir.path().to_path_buf(),
        );

        let result = pipeline.process_bytes(&tiny_png()).await.unwrap();
        let path = result.preprocessed_path.expect("artifact written");
        assert!(path.ends_with(PREPROCESSED_IMAGE_NAME));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn annotation_draws_on_preprocessed_artifact() {
        use imageproc::drawing::draw_line_segment_mut;
        use legible_vision::deskew::rotate_by_angle;

        // A skewed ruled page: preprocessing rotates it back, expanding the
        // canvas, so the artifact's dimensions differ from the input's.
        let mut page = GrayImage::from_pixel(500, 400, Luma([230]));
        for base in [120u32, 210, 290] {
            for dy in 0..3 {
                draw_line_segment_mut(
                    &mut page,
                    (40.0, (base + dy) as f32),
                    (460.0, (base + dy) as f32),
                    Luma([20]),
                );
            }
        }
        let scanned = normalize::to_scanned_form(&image::DynamicImage::ImageLuma8(page)).unwrap();
        let input = normalize::encode_png(&rotate_by_angle(&scanned, 7.0)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig { preprocess: true, ..Default::default() };
        let pipeline = DocumentPipeline::new(
            MockRecognizer::new(receipt_result()),
            config,
            dir.path().to_path_buf(),
        );
        let result = pipeline.process_bytes(&input).await.unwrap();

        let artifact_bytes =
            tokio::fs::read(result.preprocessed_path.as_ref().unwrap()).await.unwrap();
        let artifact = image::load_from_memory(&artifact_bytes).unwrap();

        let boxed = dir.path().join("boxed.png");
        result.save_annotated(&input, &boxed).await.unwrap();
        let annotated = image::load_from_memory(&tokio::fs::read(&boxed).await.unwrap()).unwrap();
        let original = image::load_from_memory(&input).unwrap();

        assert_eq!((annotated.width(), annotated.height()), (artifact.width(), artifact.height()));
        assert_ne!((annotated.width(), annotated.height()), (original.width(), original.height()));
    }

    #[tokio::test]
    async fn undecodable_input_is_invalid_image() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = DocumentPipeline::new(
            MockRecognizer::from_text("unused"),
            OcrConfig::default(),
            dir.path().to_path_buf(),
        );

        let err = pipeline.process_bytes(b"not an image").await.unwrap_err();
        assert!(matches!(err, PipelineError::Image(_)));
    }

    #[tokio::test]
    async fn transcript_and_annotation_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let recognized = receipt_result();

        let transcript = dir.path().join("output.txt");
        save_transcript(&recognized, &transcript).await.unwrap();
        let saved = tokio::fs::read_to_string(&transcript).await.unwrap();
        assert!(saved.contains("SHARMA STORES"));

        let annotated = dir.path().join("boxed.png");
        save_annotated(&tiny_png(), &recognized, &annotated).await.unwrap();
        assert!(annotated.exists());
    }

    #[test]
    fn flatten_joins_hyphenated_breaks() {
        assert_eq!(flatten_line_breaks("exam-\nple\ntext"), "example text");
        assert_eq!(flatten_line_breaks("plain"), "plain");
    }
}
