use image::RgbImage;

/// Corner-form box in frame pixel coordinates. `x2`/`y2` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// Intersect with a `width` x `height` frame.
    pub fn clip_to(&self, width: u32, height: u32) -> BoundingBox {
        let (w, h) = (width as i32, height as i32);
        BoundingBox {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        }
    }

    /// Intersection over union, used for suppressing overlapping boxes.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = BoundingBox {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        }
        .area();
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            0.0
        } else {
            inter as f32 / union as f32
        }
    }

    /// Crop this box out of `frame`, or `None` if nothing of it lies inside.
    pub fn crop(&self, frame: &RgbImage) -> Option<RgbImage> {
        let clipped = self.clip_to(frame.width(), frame.height());
        if clipped.is_empty() {
            return None;
        }
        Some(
            image::imageops::crop_imm(
                frame,
                clipped.x1 as u32,
                clipped.y1 as u32,
                clipped.width() as u32,
                clipped.height() as u32,
            )
            .to_image(),
        )
    }
}

/// One object reported by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// In `[0, 1]`
    pub confidence: f32,
    pub class_id: usize,
    pub label: String,
}

/// One text result from the text extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCandidate {
    pub text: String,
    pub confidence: f32,
}

impl TextCandidate {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_keeps_inside_boxes() {
        let b = BoundingBox::new(2, 3, 10, 8);
        assert_eq!(b.clip_to(20, 20), b);
        assert_eq!(b.width(), 8);
        assert_eq!(b.height(), 5);
    }

    #[test]
    fn clip_degenerates_outside_the_frame() {
        assert!(BoundingBox::new(-10, 5, -2, 9).clip_to(50, 50).is_empty());
        assert!(BoundingBox::new(45, 5, 80, 9).clip_to(45, 50).is_empty());
        assert!(BoundingBox::new(10, 10, 10, 20).clip_to(50, 50).is_empty());
    }

    #[test]
    fn crop_uses_the_clipped_box() {
        let frame = RgbImage::new(30, 20);
        let crop = BoundingBox::new(25, -5, 40, 6).crop(&frame).unwrap();
        assert_eq!(crop.dimensions(), (5, 6));
        assert!(BoundingBox::new(30, 0, 35, 5).crop(&frame).is_none());
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(5, 0, 15, 10);
        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(a.iou(&BoundingBox::new(20, 20, 30, 30)), 0.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
    }
}
