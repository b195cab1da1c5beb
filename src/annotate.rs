//! Drawing accepted plates onto frames.
//!
//! Text uses a built-in 5x7 bitmap font. Validated plates only contain
//! `A-Z` and `0-9`, so that is all the font covers; anything else leaves a
//! blank cell.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::models::BoundingBox;

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// Row bitmaps, bit 4 is the leftmost column.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        _ => return None,
    };
    Some(rows)
}

/// Colors and sizes for plate annotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub box_color: Rgb<u8>,
    pub text_color: Rgb<u8>,
    /// Outline thickness in pixels
    pub thickness: u32,
    /// Integer magnification of the 5x7 font
    pub text_scale: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            box_color: Rgb([0, 255, 0]),
            text_color: Rgb([0, 0, 0]),
            thickness: 2,
            text_scale: 2,
        }
    }
}

impl AnnotationStyle {
    /// A zero scale draws at 1x.
    fn scale(&self) -> u32 {
        self.text_scale.max(1)
    }

    fn padding(&self) -> u32 {
        self.scale() * 2
    }

    fn label_height(&self) -> u32 {
        GLYPH_H * self.scale() + 2 * self.padding()
    }
}

/// Pixel width of `text` at `scale`, including one column of spacing per
/// character.
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * (GLYPH_W + 1) * scale
}

/// Draw `text` with its top-left corner at `(x, y)`. Pixels falling outside
/// `canvas` are dropped.
pub fn draw_text(canvas: &mut RgbImage, x: i32, y: i32, text: &str, scale: u32, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let advance = ((GLYPH_W + 1) * scale) as i32;

    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else { continue };
        let origin_x = x + i as i32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin_x + (col * scale + dx) as i32;
                        let py = y + (row as u32 * scale + dy) as i32;
                        if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                            canvas.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
    }
}

/// Outline `bbox` and label it with `text` on a filled bar above the box,
/// or below it when there is no room above.
pub fn annotate_plate(frame: &mut RgbImage, bbox: &BoundingBox, text: &str, style: &AnnotationStyle) {
    if bbox.is_empty() {
        return;
    }

    for inset in 0..style.thickness as i32 {
        let w = bbox.width() - 2 * inset;
        let h = bbox.height() - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        draw_hollow_rect_mut(
            frame,
            Rect::at(bbox.x1 + inset, bbox.y1 + inset).of_size(w as u32, h as u32),
            style.box_color,
        );
    }

    let label_h = style.label_height();
    let label_w = text_width(text, style.scale()) + 2 * style.padding();
    let label_y = if bbox.y1 >= label_h as i32 {
        bbox.y1 - label_h as i32
    } else {
        bbox.y2
    };
    draw_filled_rect_mut(
        frame,
        Rect::at(bbox.x1, label_y).of_size(label_w, label_h),
        style.box_color,
    );
    draw_text(
        frame,
        bbox.x1 + style.padding() as i32,
        label_y + style.padding() as i32,
        text,
        style.scale(),
        style.text_color,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgb<u8> = Rgb([50, 50, 50]);

    #[test]
    fn every_plate_character_has_a_glyph() {
        for c in ('A'..='Z').chain('0'..='9') {
            assert!(glyph(c).is_some(), "missing glyph for {}", c);
        }
        assert!(glyph('-').is_none());
    }

    #[test]
    fn draw_text_scales_glyphs() {
        let mut canvas = RgbImage::from_pixel(20, 20, BG);
        draw_text(&mut canvas, 0, 0, "L", 2, Rgb([255, 255, 255]));
        // 'L' is a full left column and a full bottom row.
        assert_eq!(*canvas.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(1, 13), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(9, 13), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(9, 0), BG);
    }

    #[test]
    fn draw_text_clips_at_canvas_edges() {
        let mut canvas = RgbImage::from_pixel(8, 8, BG);
        draw_text(&mut canvas, -3, -3, "88", 3, Rgb([255, 0, 0]));
        assert_eq!(canvas.dimensions(), (8, 8));
    }

    #[test]
    fn annotation_draws_outline_and_label() {
        let mut frame = RgbImage::from_pixel(120, 80, BG);
        let bbox = BoundingBox::new(20, 40, 100, 70);
        let style = AnnotationStyle::default();
        annotate_plate(&mut frame, &bbox, "AB12345", &style);

        assert_eq!(*frame.get_pixel(20, 40), style.box_color);
        assert_eq!(*frame.get_pixel(21, 55), style.box_color);
        assert_eq!(*frame.get_pixel(99, 69), style.box_color);
        // Interior untouched.
        assert_eq!(*frame.get_pixel(60, 55), BG);
        // Label bar sits above the box.
        assert_eq!(*frame.get_pixel(21, 40 - 2), style.box_color);
    }

    #[test]
    fn zero_text_scale_draws_at_unit_scale() {
        let mut frame = RgbImage::from_pixel(80, 60, BG);
        let style = AnnotationStyle {
            text_scale: 0,
            ..AnnotationStyle::default()
        };
        annotate_plate(&mut frame, &BoundingBox::new(10, 30, 70, 50), "A1", &style);
        // Label bar of height 7 + 2 * 2 sits directly above the box.
        assert_eq!(*frame.get_pixel(11, 30 - 11), style.box_color);
        assert_eq!(*frame.get_pixel(11, 30 - 12), BG);
    }

    #[test]
    fn label_moves_below_a_box_at_the_top_edge() {
        let mut frame = RgbImage::from_pixel(120, 80, BG);
        let bbox = BoundingBox::new(10, 0, 60, 20);
        let style = AnnotationStyle::default();
        annotate_plate(&mut frame, &bbox, "A1", &style);
        assert_eq!(*frame.get_pixel(11, 21), style.box_color);
    }
}
