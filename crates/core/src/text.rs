use serde::{Deserialize, Serialize};

/// Four corner points of a detected text region, in the order the engine
/// reports them (top-left, top-right, bottom-right, bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingQuad {
    pub points: [(f32, f32); 4],
}

impl BoundingQuad {
    pub fn new(points: [(f32, f32); 4]) -> Self {
        Self { points }
    }

    /// Axis-aligned bounding rectangle as (x, y, width, height).
    pub fn bounding_rect(&self) -> (u32, u32, u32, u32) {
        let xs = self.points.iter().map(|p| p.0);
        let ys = self.points.iter().map(|p| p.1);
        let min_x = xs.clone().fold(f32::INFINITY, f32::min).max(0.0);
        let min_y = ys.clone().fold(f32::INFINITY, f32::min).max(0.0);
        let max_x = xs.fold(f32::NEG_INFINITY, f32::max).max(min_x);
        let max_y = ys.fold(f32::NEG_INFINITY, f32::max).max(min_y);
        (
            min_x as u32,
            min_y as u32,
            (max_x - min_x).ceil() as u32,
            (max_y - min_y).ceil() as u32,
        )
    }
}

/// One recognized text region: geometry, the text itself, and the engine's
/// confidence where available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub quad: BoundingQuad,
    pub text: String,
    pub confidence: Option<f32>,
}

impl TextFragment {
    pub fn new(quad: BoundingQuad, text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self { quad, text: text.into(), confidence }
    }
}

/// The output of one OCR invocation: the flat text plus, when the engine
/// reports geometry, the ordered per-fragment records.
///
/// Dense-text engines (full book pages) typically return only `text`;
/// sparse-text engines (receipts, signboards) also fill `fragments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub text: String,
    pub fragments: Vec<TextFragment>,
}

impl RecognizedText {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into(), fragments: Vec::new() }
    }

    pub fn from_fragments(fragments: Vec<TextFragment>) -> Self {
        let mut out = Self { text: String::new(), fragments };
        out.text = out.joined_from_fragments();
        out
    }

    /// Rebuild the flat text from the fragment list: each fragment's text
    /// preceded by a single space, matching the sparse recognition path.
    pub fn joined_from_fragments(&self) -> String {
        let mut joined = String::new();
        for fragment in &self.fragments {
            joined.push(' ');
            joined.push_str(&fragment.text);
        }
        joined
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// An axis-aligned word rectangle used for visualization output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub word: String,
}
