use std::path::{Path, PathBuf};

use anyhow::Context;
use legible_core::{BoundingQuad, OcrConfig, RecognizedText, SkewPolicy, TextFragment};
use legible_ocr::pipeline::save_transcript;
use legible_ocr::{DocumentPipeline, Extractor, ExtractorOptions};
use legible_vision::pipeline::{preprocess_document, PreprocessOptions};
use legible_vision::normalize as vision_normalize;
use tracing::info;

pub struct ProcessArgs {
    pub image: PathBuf,
    pub config: Option<PathBuf>,
    pub no_preprocess: bool,
    pub preserve_orientation: bool,
    pub json: bool,
    pub annotate: Option<PathBuf>,
    pub transcript: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

pub async fn process(args: ProcessArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => OcrConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => OcrConfig::default(),
    };
    if args.no_preprocess {
        config.preprocess = false;
    }
    if args.preserve_orientation {
        config.preserve_orientation = true;
    }

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| args.image.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let recognizer = build_recognizer();
    let pipeline = DocumentPipeline::new(recognizer, config, output_dir);

    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("reading {}", args.image.display()))?;
    let result = pipeline.process_bytes(&bytes).await?;

    if let Some(path) = &args.transcript {
        save_transcript(&result.text, path).await?;
        info!(path = %path.display(), "transcript written");
    }
    if let Some(path) = &args.annotate {
        // Boxes are in the coordinate frame of the image the engine saw,
        // which is the preprocessed artifact when preprocessing ran.
        result.save_annotated(&bytes, path).await?;
        info!(path = %path.display(), "annotated image written");
    }

    if args.json {
        let report = serde_json::json!({
            "text": result.text.text,
            "fields": result.fields,
            "preprocessed": result.preprocessed_path,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", result.text.text);
        if let Some(fields) = &result.fields {
            println!();
            println!("price:        {}", fields.price);
            println!("date:         {}", fields.date.join(", "));
            println!("place:        {}", fields.place);
            println!("order number: {}", fields.order_number);
            println!("phone number: {}", fields.phone_number.join(", "));
        }
    }
    Ok(())
}

pub fn normalize(
    image: &Path,
    output: &Path,
    noise_iterations: u32,
    thicken_iterations: u32,
) -> anyhow::Result<()> {
    let img = vision_normalize::load_image(image)
        .with_context(|| format!("loading {}", image.display()))?;
    let options = PreprocessOptions {
        noise_iterations,
        thicken_iterations,
        skew_policy: SkewPolicy::ZeroAngle,
    };
    let processed = preprocess_document(&img, &options)?;
    let png = vision_normalize::encode_png(&processed)?;
    std::fs::write(output, png).with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), "normalized image written");
    Ok(())
}

/// Field extraction over an existing transcript. The first line stands in
/// for the first detected text region when deriving the place field.
pub fn extract(textfile: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(textfile)
        .with_context(|| format!("reading {}", textfile.display()))?;
    let first_line = text.lines().next().unwrap_or_default();
    let recognized = RecognizedText {
        text: text.clone(),
        fragments: vec![TextFragment::new(
            BoundingQuad::new([(0.0, 0.0); 4]),
            first_line,
            None,
        )],
    };

    let extractor = Extractor::new(ExtractorOptions::default());
    let fields = extractor.extract(&recognized)?;
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

#[cfg(feature = "tesseract")]
fn build_recognizer() -> legible_ocr::recognizer::tesseract_backend::TesseractRecognizer {
    legible_ocr::recognizer::tesseract_backend::TesseractRecognizer::new(None)
}

#[cfg(not(feature = "tesseract"))]
fn build_recognizer() -> legible_ocr::MockRecognizer {
    tracing::warn!("no OCR engine compiled in; using the mock recognizer (empty output)");
    legible_ocr::MockRecognizer::from_text("")
}
