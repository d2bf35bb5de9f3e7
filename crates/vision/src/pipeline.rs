use image::{DynamicImage, GrayImage};
use legible_core::{OcrConfig, SkewPolicy};
use thiserror::Error;
use tracing::{debug, warn};

use crate::deskew::{self, DeskewError};
use crate::normalize::{self, NormalizeError};

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Image normalization failed: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("Skew estimation failed: {0}")]
    Deskew(#[from] DeskewError),
}

/// Knobs for [`preprocess_document`].
#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    pub noise_iterations: u32,
    pub thicken_iterations: u32,
    pub skew_policy: SkewPolicy,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            noise_iterations: 1,
            thicken_iterations: 2,
            skew_policy: SkewPolicy::ZeroAngle,
        }
    }
}

impl From<&OcrConfig> for PreprocessOptions {
    fn from(config: &OcrConfig) -> Self {
        Self {
            noise_iterations: config.noise_iterations,
            thicken_iterations: config.thicken_iterations,
            skew_policy: config.skew_policy,
        }
    }
}

/// Normalize a photograph of a real document into a clean, deskewed scan.
///
/// Stages, in fixed order: scan conversion, noise removal, font thickening
/// (for line detection only), skew estimation on the thickened copy, rotation
/// of the scanned copy by the correcting angle, and a second noise-removal
/// pass, since rotation interpolation reintroduces speckle at edges.
///
/// Inputs known to be clean scans should skip this function entirely; the
/// `preprocess` gate lives in the caller. A failure at any stage aborts with
/// the originating error and no partial output.
pub fn preprocess_document(
    image: &DynamicImage,
    options: &PreprocessOptions,
) -> Result<GrayImage, VisionError> {
    let scanned = normalize::to_scanned_form(image)?;

    let noise_free = normalize::remove_noise(scanned.clone(), options.noise_iterations)?;
    let thickened = normalize::thicken_font(noise_free, options.thicken_iterations)?;

    let angle = match deskew::estimate_rotation_angle(&thickened) {
        Ok(angle) => angle,
        Err(DeskewError::UnestimableSkew) => match options.skew_policy {
            SkewPolicy::ZeroAngle => {
                warn!("no line segments detected; proceeding without rotation");
                0.0
            }
            SkewPolicy::Fail => return Err(DeskewError::UnestimableSkew.into()),
        },
    };
    debug!(angle, "estimated document skew");

    // Rotate the scanned copy, not the thickened one; thickening exists only
    // to make the Hough lines detectable.
    let rotated = deskew::rotate_by_angle(&scanned, -angle);
    let cleaned = normalize::remove_noise(rotated, options.noise_iterations)?;
    Ok(cleaned)
}
