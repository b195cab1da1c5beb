use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_close, grayscale_open};

use super::config::{KernelShape, MorphOp};

/// Binary structuring element anchored at its center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    width: u32,
    height: u32,
    mask: Vec<bool>,
}

impl StructuringElement {
    pub fn new(shape: KernelShape, (width, height): (u32, u32)) -> Self {
        let shape = if width == 1 && height == 1 {
            KernelShape::Rect
        } else {
            shape
        };
        let (anchor_x, anchor_y) = (width / 2, height / 2);
        let radius = (height / 2) as f64;
        let center = (width / 2) as f64;
        let inv_r2 = if radius > 0.0 { 1.0 / (radius * radius) } else { 0.0 };

        let mut mask = vec![false; width as usize * height as usize];
        for row in 0..height {
            let (start, end) = match shape {
                KernelShape::Rect => (0, width),
                KernelShape::Cross if row == anchor_y => (0, width),
                KernelShape::Cross => (anchor_x, anchor_x + 1),
                KernelShape::Ellipse => {
                    let dy = row as f64 - radius;
                    if dy.abs() <= radius {
                        let dx = (center * ((radius * radius - dy * dy) * inv_r2).sqrt()).round();
                        let start = (center - dx).max(0.0) as u32;
                        let end = ((center + dx + 1.0) as u32).min(width);
                        (start, end)
                    } else {
                        (0, 0)
                    }
                }
            };
            for col in start..end {
                mask[row as usize * width as usize + col as usize] = true;
            }
        }

        Self {
            width,
            height,
            mask,
        }
    }

    /// The element as an `imageproc` mask anchored at `(width / 2, height / 2)`.
    /// Sides are capped at 511 by config validation.
    pub fn to_mask(&self) -> Mask {
        let image = GrayImage::from_fn(self.width, self.height, |col, row| {
            if self.mask[(row * self.width + col) as usize] {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        Mask::from_image(&image, (self.width / 2) as u8, (self.height / 2) as u8)
    }

    #[cfg(test)]
    fn rows(&self) -> Vec<String> {
        (0..self.height)
            .map(|row| {
                (0..self.width)
                    .map(|col| {
                        if self.mask[(row * self.width + col) as usize] {
                            '#'
                        } else {
                            '.'
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Neighbours outside the image are ignored by both erosion and dilation.
pub fn apply(image: &GrayImage, op: MorphOp, element: &StructuringElement) -> GrayImage {
    let mask = element.to_mask();
    match op {
        MorphOp::Close => grayscale_close(image, &mask),
        MorphOp::Open => grayscale_open(image, &mask),
        MorphOp::Both => grayscale_close(&grayscale_open(image, &mask), &mask),
    }
}
