use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Decoding strategy requested from the recognition engine. `Greedy` is
/// faster; `BeamSearch` trades speed for sentence-level accuracy on
/// documents with many meaningful sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decoder {
    #[default]
    Greedy,
    #[serde(rename = "beamsearch")]
    BeamSearch,
}

impl std::fmt::Display for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decoder::Greedy => write!(f, "greedy"),
            Decoder::BeamSearch => write!(f, "beamsearch"),
        }
    }
}

/// What to do when skew estimation finds no line segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkewPolicy {
    /// Log a warning and rotate by zero degrees.
    #[default]
    ZeroAngle,
    /// Propagate the error and abort the pipeline.
    Fail,
}

/// Caller-facing configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run the document preprocessing pipeline. Set for photographs of real
    /// documents; leave off for already-clean scans, which pass through
    /// unchanged.
    pub preprocess: bool,
    /// Ordered language codes for recognition. Listing languages not present
    /// in the image degrades accuracy.
    pub languages: Vec<String>,
    pub decoder: Decoder,
    /// Keep the engine's line breaks in dense-text transcripts instead of
    /// joining hyphenated breaks and flattening newlines to spaces.
    pub preserve_orientation: bool,
    /// Repetitions of the noise-removal dilate/erode pair. Minimum 1; higher
    /// values trade fine detail for more aggressive speckle removal.
    pub noise_iterations: u32,
    /// Dilation passes when widening character strokes before line detection.
    pub thicken_iterations: u32,
    pub skew_policy: SkewPolicy,
    /// Additional currency marker accepted in front of price amounts, on top
    /// of the built-in `Rs` / `INR` / `₹` set.
    pub extra_currency_marker: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            preprocess: false,
            languages: vec!["en".to_string()],
            decoder: Decoder::Greedy,
            preserve_orientation: false,
            noise_iterations: 1,
            thicken_iterations: 2,
            skew_policy: SkewPolicy::ZeroAngle,
            extra_currency_marker: None,
        }
    }
}

impl OcrConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: OcrConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.noise_iterations == 0 {
            return Err(ConfigError::Invalid(
                "noise_iterations must be at least 1".to_string(),
            ));
        }
        if self.thicken_iterations == 0 {
            return Err(ConfigError::Invalid(
                "thicken_iterations must be at least 1".to_string(),
            ));
        }
        if self.languages.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one language code is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = OcrConfig::default();
        assert!(!c.preprocess);
        assert_eq!(c.languages, vec!["en"]);
        assert_eq!(c.decoder, Decoder::Greedy);
        assert!(!c.preserve_orientation);
        assert_eq!(c.noise_iterations, 1);
        assert_eq!(c.thicken_iterations, 2);
    }

    #[test]
    fn parse_full_toml() {
        let c = OcrConfig::from_toml_str(
            r#"
            preprocess = true
            languages = ["en", "hi"]
            decoder = "beamsearch"
            preserve_orientation = true
            noise_iterations = 2
            thicken_iterations = 3
            skew_policy = "fail"
            extra_currency_marker = "रे"
            "#,
        )
        .unwrap();
        assert!(c.preprocess);
        assert_eq!(c.languages, vec!["en", "hi"]);
        assert_eq!(c.decoder, Decoder::BeamSearch);
        assert!(c.preserve_orientation);
        assert_eq!(c.skew_policy, SkewPolicy::Fail);
        assert_eq!(c.extra_currency_marker.as_deref(), Some("रे"));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let c = OcrConfig::from_toml_str("preprocess = true").unwrap();
        assert!(c.preprocess);
        assert_eq!(c.noise_iterations, 1);
        assert_eq!(c.skew_policy, SkewPolicy::ZeroAngle);
    }

    #[test]
    fn zero_iterations_rejected() {
        let err = OcrConfig::from_toml_str("noise_iterations = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn empty_languages_rejected() {
        let err = OcrConfig::from_toml_str("languages = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
