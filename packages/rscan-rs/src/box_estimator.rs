//! Fallback geometry for OCR backends that return text without boxes.
//!
//! The extraction model needs one box per word, so when the OCR stage only
//! produced text the words are laid out on a rough grid: `floor(sqrt(n))`
//! words per line, line height and character width derived from the image
//! dimensions. Best-effort placement, not ground truth; the only guarantees
//! are one box per word and well-formed coordinates.

use rscan_infer::{BoundingBox, Word};

/// Returns one box per word. Words that already carry a backend-supplied
/// box keep it unchanged; only the missing ones are synthesized.
pub fn estimate_boxes(words: &[Word], image_width: u32, image_height: u32) -> Vec<BoundingBox> {
    if words.is_empty() {
        return Vec::new();
    }

    let count = words.len() as u32;
    let words_per_line = ((words.len() as f64).sqrt() as u32).max(1);
    let num_lines = count.div_ceil(words_per_line);
    let line_height = (image_height / num_lines.max(1)).max(1);
    let longest = words
        .iter()
        .map(|w| w.text.chars().count())
        .max()
        .unwrap_or(1)
        .max(1) as u64;
    let char_width = u64::from(image_width) / longest;

    let width = u64::from(image_width.max(1));
    let height = u64::from(image_height.max(1));

    let mut boxes = Vec::with_capacity(words.len());
    for (i, word) in words.iter().enumerate() {
        if let Some(existing) = word.bounding_box {
            boxes.push(existing);
            continue;
        }

        let len = word.text.chars().count().max(1) as u64;
        let line = u64::from(i as u32 / words_per_line);
        let pos_in_line = u64::from(i as u32 % words_per_line);

        // Clamp inside the image while keeping x1 > x0 and y1 > y0.
        let x0 = (pos_in_line * char_width * (len + 1)).min(width - 1);
        let y0 = (line * u64::from(line_height)).min(height - 1);
        let x1 = (x0 + len * char_width).min(width).max(x0 + 1);
        let y1 = (y0 + u64::from(line_height)).min(height).max(y0 + 1);

        boxes.push(BoundingBox::new(x0 as u32, y0 as u32, x1 as u32, y1 as u32));
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unboxed(texts: &[&str]) -> Vec<Word> {
        texts.iter().copied().map(Word::unboxed).collect()
    }

    #[test]
    fn test_one_box_per_word() {
        let words = unboxed(&["CAFE", "88", "TOTAL", "$12.50", "THANK", "YOU"]);
        let boxes = estimate_boxes(&words, 640, 480);
        assert_eq!(boxes.len(), words.len());
    }

    #[test]
    fn test_boxes_are_well_formed_and_inside_image() {
        let words = unboxed(&["CAFE", "88", "TOTAL", "$12.50", "THANK", "YOU", "x"]);
        let boxes = estimate_boxes(&words, 640, 480);
        for b in &boxes {
            assert!(b.is_well_formed(), "{b:?}");
            assert!(b.x0 < b.x1, "{b:?}");
            assert!(b.y0 < b.y1, "{b:?}");
            assert!(b.x1 <= 640 && b.y1 <= 480, "{b:?}");
        }
    }

    #[test]
    fn test_tiny_image_still_yields_valid_boxes() {
        let words = unboxed(&["RECEIPT", "TOTAL", "$1.00"]);
        let boxes = estimate_boxes(&words, 3, 2);
        assert_eq!(boxes.len(), 3);
        for b in &boxes {
            assert!(b.x0 < b.x1 && b.y0 < b.y1, "{b:?}");
            assert!(b.x1 <= 3 && b.y1 <= 2, "{b:?}");
        }
    }

    #[test]
    fn test_existing_boxes_pass_through_unchanged() {
        let supplied = BoundingBox::new(5, 5, 40, 15);
        let words = vec![
            Word::with_box("TOTAL", supplied),
            Word::unboxed("$12.50"),
        ];
        let boxes = estimate_boxes(&words, 640, 480);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0], supplied);
        assert!(boxes[1].is_well_formed());
    }

    #[test]
    fn test_single_word() {
        let boxes = estimate_boxes(&unboxed(&["TOTAL"]), 640, 480);
        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].is_well_formed());
    }

    #[test]
    fn test_empty_input() {
        assert!(estimate_boxes(&[], 640, 480).is_empty());
    }
}
