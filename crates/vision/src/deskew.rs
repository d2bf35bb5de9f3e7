use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use thiserror::Error;
use tracing::debug;

// These thresholds are the one place where wrong parameters silently degrade
// OCR accuracy downstream; change them together with the tests below.
pub const CANNY_LOW: f32 = 100.0;
pub const CANNY_HIGH: f32 = 100.0;
pub const HOUGH_VOTE_THRESHOLD: u32 = 160;
pub const HOUGH_SUPPRESSION_RADIUS: u32 = 8;
pub const MIN_SEGMENT_LENGTH: f64 = 100.0;
pub const MAX_SEGMENT_GAP: f64 = 10.0;

#[derive(Debug, Error)]
pub enum DeskewError {
    #[error("No line segments detected; skew angle is unestimable")]
    UnestimableSkew,
}

/// A detected line segment in pixel coordinates, oriented so that x2 >= x1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl LineSegment {
    pub fn length(&self) -> f32 {
        ((self.x2 - self.x1).powi(2) + (self.y2 - self.y1).powi(2)).sqrt()
    }

    /// Orientation in degrees, measured as `atan2(y2 - y1, x2 - x1)` in
    /// y-down pixel coordinates. In (-90, 90] thanks to the x ordering.
    pub fn angle_degrees(&self) -> f64 {
        ((self.y2 - self.y1) as f64)
            .atan2((self.x2 - self.x1) as f64)
            .to_degrees()
    }
}

/// Detect line segments in an image.
///
/// Canny edges feed a Hough vote accumulator (rho 1 px, theta 1°); each voted
/// line is then walked over the edge map, splitting it into runs separated by
/// gaps larger than [`MAX_SEGMENT_GAP`] and keeping runs of at least
/// [`MIN_SEGMENT_LENGTH`] pixels.
pub fn detect_segments(image: &GrayImage) -> Vec<LineSegment> {
    let edges = canny(image, CANNY_LOW, CANNY_HIGH);
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: HOUGH_VOTE_THRESHOLD,
            suppression_radius: HOUGH_SUPPRESSION_RADIUS,
        },
    );

    let mut segments = Vec::new();
    for line in &lines {
        walk_line(&edges, line, &mut segments);
    }
    debug!(
        lines = lines.len(),
        segments = segments.len(),
        "line segment detection complete"
    );
    segments
}

/// Estimate the document's skew as the median orientation of all detected
/// line segments. The median is robust to outlier segments from non-text
/// edges, where a mean would not be.
///
/// Fails with [`DeskewError::UnestimableSkew`] when no segments are found;
/// callers must decide explicitly what to rotate by in that case.
pub fn estimate_rotation_angle(image: &GrayImage) -> Result<f64, DeskewError> {
    let segments = detect_segments(image);
    if segments.is_empty() {
        return Err(DeskewError::UnestimableSkew);
    }
    let angles: Vec<f64> = segments.iter().map(LineSegment::angle_degrees).collect();
    Ok(median(angles))
}

/// Rotate an image by `degrees` about its center, expanding the canvas so no
/// content is cropped. Bilinear interpolation, black fill.
///
/// Positive angles rotate segment orientations by the same amount as measured
/// by [`LineSegment::angle_degrees`], so correcting a measured skew `a` means
/// rotating by `-a`.
pub fn rotate_by_angle(image: &GrayImage, degrees: f64) -> GrayImage {
    let (w, h) = image.dimensions();
    let rad = degrees.to_radians() as f32;
    let (sin, cos) = (rad.sin().abs(), rad.cos().abs());
    let new_w = (w as f32 * cos + h as f32 * sin).ceil() as u32;
    let new_h = (w as f32 * sin + h as f32 * cos).ceil() as u32;

    let projection = Projection::translate(new_w as f32 / 2.0, new_h as f32 / 2.0)
        * Projection::rotate(rad)
        * Projection::translate(-(w as f32) / 2.0, -(h as f32) / 2.0);

    let mut rotated = GrayImage::new(new_w, new_h);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Luma([0u8]),
        &mut rotated,
    );
    rotated
}

/// Walk the edge map along one voted Hough line, emitting edge-supported runs
/// as segments.
fn walk_line(edges: &GrayImage, line: &PolarLine, out: &mut Vec<LineSegment>) {
    let (w, h) = edges.dimensions();
    let theta = (line.angle_in_degrees as f64).to_radians();
    let (sin, cos) = theta.sin_cos();

    // Closest point to the origin on the line, and the direction along it.
    let (px, py) = (line.r as f64 * cos, line.r as f64 * sin);
    let (dx, dy) = (-sin, cos);

    // Both the foot point and every image pixel are within one diagonal of
    // the origin, so ±2 diagonals covers the whole in-image extent.
    let reach = 2 * (((w * w + h * h) as f64).sqrt().ceil() as i64);

    let mut run_start: Option<f64> = None;
    let mut last_hit = 0.0f64;

    let flush = |start: Option<f64>, end: f64, out: &mut Vec<LineSegment>| {
        if let Some(start) = start {
            if end - start >= MIN_SEGMENT_LENGTH {
                out.push(oriented_segment(
                    (px + start * dx) as f32,
                    (py + start * dy) as f32,
                    (px + end * dx) as f32,
                    (py + end * dy) as f32,
                ));
            }
        }
    };

    for step in -reach..=reach {
        let t = step as f64;
        let x = (px + t * dx).round() as i64;
        let y = (py + t * dy).round() as i64;

        if edge_near(edges, x, y) {
            match run_start {
                None => run_start = Some(t),
                Some(_) if t - last_hit > MAX_SEGMENT_GAP => {
                    flush(run_start.take(), last_hit, out);
                    run_start = Some(t);
                }
                Some(_) => {}
            }
            last_hit = t;
        }
    }
    flush(run_start, last_hit, out);
}

/// Whether any pixel in the 3×3 neighbourhood of (x, y) is an edge pixel.
/// Tolerates the half-pixel quantization of the Hough bins.
fn edge_near(edges: &GrayImage, x: i64, y: i64) -> bool {
    let (w, h) = edges.dimensions();
    for ny in (y - 1)..=(y + 1) {
        for nx in (x - 1)..=(x + 1) {
            if nx >= 0
                && ny >= 0
                && (nx as u32) < w
                && (ny as u32) < h
                && edges.get_pixel(nx as u32, ny as u32)[0] > 0
            {
                return true;
            }
        }
    }
    false
}

fn oriented_segment(x1: f32, y1: f32, x2: f32, y2: f32) -> LineSegment {
    if x2 < x1 || (x2 == x1 && y2 < y1) {
        LineSegment { x1: x2, y1: y2, x2: x1, y2: y1 }
    } else {
        LineSegment { x1, y1, x2, y2 }
    }
}

/// Median of a non-empty list; for even counts, the mean of the two middle
/// values.
fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_line_segment_mut;

    /// A page-like image with several thick horizontal "text baselines".
    fn ruled_page() -> GrayImage {
        let mut img = GrayImage::from_pixel(500, 400, Luma([0]));
        for base in [100u32, 200, 300] {
            for dy in 0..3 {
                draw_line_segment_mut(
                    &mut img,
                    (30.0, (base + dy) as f32),
                    (470.0, (base + dy) as f32),
                    Luma([255]),
                );
            }
        }
        img
    }

    #[test]
    fn horizontal_lines_estimate_near_zero() {
        let angle = estimate_rotation_angle(&ruled_page()).unwrap();
        assert!(angle.abs() < 1.5, "expected ~0°, got {angle}");
    }

    #[test]
    fn detected_segments_meet_minimum_length() {
        let segments = detect_segments(&ruled_page());
        assert!(!segments.is_empty());
        assert!(segments.iter().all(|s| s.length() >= MIN_SEGMENT_LENGTH as f32));
    }

    #[test]
    fn blank_image_is_unestimable() {
        let blank = GrayImage::from_pixel(300, 300, Luma([255]));
        let err = estimate_rotation_angle(&blank).unwrap_err();
        assert!(matches!(err, DeskewError::UnestimableSkew));
    }

    #[test]
    fn known_rotation_is_recovered() {
        let rotated = rotate_by_angle(&ruled_page(), 8.0);
        let angle = estimate_rotation_angle(&rotated).unwrap();
        assert!((angle - 8.0).abs() < 2.0, "expected ~8°, got {angle}");
    }

    #[test]
    fn rotation_round_trip_restores_orientation() {
        let rotated = rotate_by_angle(&ruled_page(), 6.0);
        let measured = estimate_rotation_angle(&rotated).unwrap();
        let restored = rotate_by_angle(&rotated, -measured);
        let back = estimate_rotation_angle(&restored).unwrap();
        assert!(back.abs() < 1.5, "expected ~0° after round trip, got {back}");
    }

    #[test]
    fn rotate_expands_canvas() {
        let img = GrayImage::from_pixel(100, 50, Luma([255]));
        let out = rotate_by_angle(&img, 90.0);
        assert!(out.width() >= 50 && out.width() <= 52);
        assert!(out.height() >= 100 && out.height() <= 102);
    }

    #[test]
    fn rotate_by_zero_keeps_dimensions() {
        let img = GrayImage::from_pixel(80, 60, Luma([128]));
        let out = rotate_by_angle(&img, 0.0);
        assert_eq!(out.dimensions(), (80, 60));
    }

    #[test]
    fn segment_angle_conventions() {
        let flat = LineSegment { x1: 0.0, y1: 0.0, x2: 10.0, y2: 0.0 };
        assert_eq!(flat.angle_degrees(), 0.0);
        let diag = LineSegment { x1: 0.0, y1: 0.0, x2: 10.0, y2: 10.0 };
        assert!((diag.angle_degrees() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(vec![7.0]), 7.0);
    }
}
