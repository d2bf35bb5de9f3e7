use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use legible_core::{RecognizedText, WordBox};

const BOX_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Axis-aligned word rectangles derived from fragment geometry.
pub fn word_boxes(recognized: &RecognizedText) -> Vec<WordBox> {
    recognized
        .fragments
        .iter()
        .map(|fragment| {
            let (x, y, width, height) = fragment.quad.bounding_rect();
            WordBox { x, y, width, height, word: fragment.text.clone() }
        })
        .collect()
}

/// Draw hollow rectangles around every recognized word, for the
/// visualization artifact written next to the transcript.
pub fn draw_word_boxes(image: &DynamicImage, boxes: &[WordBox]) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    for word_box in boxes {
        if word_box.width == 0 || word_box.height == 0 {
            continue;
        }
        let rect = Rect::at(word_box.x as i32, word_box.y as i32)
            .of_size(word_box.width, word_box.height);
        draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use legible_core::{BoundingQuad, TextFragment};

    fn sample() -> RecognizedText {
        RecognizedText::from_fragments(vec![TextFragment::new(
            BoundingQuad::new([(5.0, 3.0), (25.0, 3.0), (25.0, 13.0), (5.0, 13.0)]),
            "CAFE",
            Some(0.95),
        )])
    }

    #[test]
    fn word_boxes_from_quads() {
        let boxes = word_boxes(&sample());
        assert_eq!(boxes.len(), 1);
        let b = &boxes[0];
        assert_eq!((b.x, b.y, b.width, b.height), (5, 3, 20, 10));
        assert_eq!(b.word, "CAFE");
    }

    #[test]
    fn drawing_marks_box_outline() {
        let base = DynamicImage::new_rgba8(40, 30);
        let out = draw_word_boxes(&base, &word_boxes(&sample()));
        assert_eq!(out.dimensions(), (40, 30));
        assert_eq!(*out.get_pixel(5, 3), BOX_COLOR);
        // Interior stays untouched.
        assert_ne!(*out.get_pixel(15, 8), BOX_COLOR);
    }

    #[test]
    fn degenerate_boxes_are_skipped() {
        let r = RecognizedText::from_fragments(vec![TextFragment::new(
            BoundingQuad::new([(2.0, 2.0), (2.0, 2.0), (2.0, 2.0), (2.0, 2.0)]),
            "x",
            None,
        )]);
        let base = DynamicImage::new_rgba8(10, 10);
        let out = draw_word_boxes(&base, &word_boxes(&r));
        assert_eq!(out.dimensions(), (10, 10));
    }
}
