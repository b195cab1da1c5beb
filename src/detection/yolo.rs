//! YOLO plate detector run with `rten`.
//!
//! Expects a single-input model taking `[1, 3, S, S]` RGB in `0..1` and
//! producing the anchor-free YOLOv8 head, `[1, 4 + classes, anchors]` (or
//! its transpose) with boxes as center/size in input pixels.

use std::path::Path;

use image::RgbImage;
use image::imageops::FilterType;
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;
use tracing::{debug, info};

use super::PlateDetector;
use crate::models::{BoundingBox, Detection};

#[derive(Debug, Clone)]
pub struct YoloParams {
    /// Square model input size, typically 640
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}

pub struct YoloPlateDetector {
    model: Model,
    params: YoloParams,
    class_names: Vec<String>,
}

impl YoloPlateDetector {
    pub fn load(model_path: &Path, params: YoloParams) -> anyhow::Result<Self> {
        info!(model = %model_path.display(), "Loading plate detector");
        let model = Model::load_file(model_path)?;
        Ok(Self {
            model,
            params,
            class_names: vec!["plate".to_string()],
        })
    }

    pub fn with_class_names(mut self, names: Vec<String>) -> Self {
        self.class_names = names;
        self
    }

    /// Planar, normalized `[1, 3, S, S]` input.
    fn prepare_input(&self, frame: &RgbImage) -> NdTensor<f32, 4> {
        let size = self.params.input_size;
        let resized = image::imageops::resize(frame, size, size, FilterType::Triangle);
        let plane = (size * size) as usize;
        let mut data = vec![0f32; 3 * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let offset = (y * size + x) as usize;
            for c in 0..3 {
                data[c * plane + offset] = pixel[c] as f32 / 255.0;
            }
        }
        NdTensor::from_data([1, 3, size as usize, size as usize], data)
    }
}

impl PlateDetector for YoloPlateDetector {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        let input = self.prepare_input(frame);
        let output: NdTensor<f32, 3> = self.model.run_one(input.view().into(), None)?.try_into()?;

        let [_, dim1, dim2] = output.shape();
        let head = YoloHead {
            data: output.to_vec(),
            dim1,
            dim2,
        };
        let scale_x = frame.width() as f32 / self.params.input_size as f32;
        let scale_y = frame.height() as f32 / self.params.input_size as f32;

        let candidates = head.decode(self.params.conf_threshold, scale_x, scale_y);
        let mut kept = non_max_suppression(candidates, self.params.iou_threshold);
        kept.truncate(self.params.max_detections);

        debug!(detections = kept.len(), "Plate detection finished");
        Ok(kept
            .into_iter()
            .map(|raw| Detection {
                bbox: raw.bbox,
                confidence: raw.confidence,
                class_id: raw.class_id,
                label: self
                    .class_names
                    .get(raw.class_id)
                    .cloned()
                    .unwrap_or_else(|| format!("class{}", raw.class_id)),
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct RawDetection {
    bbox: BoundingBox,
    confidence: f32,
    class_id: usize,
}

/// Row-major head output without the batch dimension.
struct YoloHead {
    data: Vec<f32>,
    dim1: usize,
    dim2: usize,
}

impl YoloHead {
    fn decode(&self, conf_threshold: f32, scale_x: f32, scale_y: f32) -> Vec<RawDetection> {
        // More anchors than attributes; pick the orientation from that.
        let transposed = self.dim1 > self.dim2;
        let (attrs, anchors) = if transposed {
            (self.dim2, self.dim1)
        } else {
            (self.dim1, self.dim2)
        };
        if attrs < 5 {
            return Vec::new();
        }
        let at = |attr: usize, anchor: usize| {
            if transposed {
                self.data[anchor * self.dim2 + attr]
            } else {
                self.data[attr * self.dim2 + anchor]
            }
        };

        let mut out = Vec::new();
        for anchor in 0..anchors {
            let (class_id, score) = (4..attrs)
                .map(|attr| (attr - 4, at(attr, anchor)))
                .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
            if score < conf_threshold {
                continue;
            }

            let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
            out.push(RawDetection {
                bbox: BoundingBox::new(
                    ((cx - w / 2.0) * scale_x).round() as i32,
                    ((cy - h / 2.0) * scale_y).round() as i32,
                    ((cx + w / 2.0) * scale_x).round() as i32,
                    ((cy + h / 2.0) * scale_y).round() as i32,
                ),
                confidence: score.clamp(0.0, 1.0),
                class_id,
            });
        }
        out
    }
}

/// Greedy suppression: keep the most confident box, drop everything of the
/// same class overlapping it by more than `iou_threshold`, repeat.
fn non_max_suppression(mut candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        let overlaps = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x1: i32, conf: f32) -> RawDetection {
        RawDetection {
            bbox: BoundingBox::new(x1, 0, x1 + 10, 10),
            confidence: conf,
            class_id: 0,
        }
    }

    #[test]
    fn nms_keeps_best_of_overlapping_boxes() {
        let kept = non_max_suppression(vec![raw(0, 0.6), raw(1, 0.9), raw(50, 0.3)], 0.45);
        assert_eq!(kept, vec![raw(1, 0.9), raw(50, 0.3)]);
    }

    #[test]
    fn decode_reads_attribute_major_layout() {
        // Two anchors, one class: [cx, cy, w, h, score] per anchor.
        let head = YoloHead {
            data: vec![
                20.0, 100.0, // cx
                10.0, 50.0, // cy
                8.0, 4.0, // w
                4.0, 2.0, // h
                0.8, 0.1, // score
            ],
            dim1: 5,
            dim2: 2,
        };
        let dets = head.decode(0.25, 2.0, 1.0);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox, BoundingBox::new(32, 8, 48, 12));
        assert_eq!(dets[0].class_id, 0);
    }

    #[test]
    fn decode_reads_anchor_major_layout() {
        // Seven anchors of [cx, cy, w, h, score0, score1]; only the first
        // one scores.
        let mut data = vec![0.0; 7 * 6];
        data[..6].copy_from_slice(&[30.0, 30.0, 10.0, 10.0, 0.1, 0.7]);
        let head = YoloHead {
            data,
            dim1: 7,
            dim2: 6,
        };
        let dets = head.decode(0.5, 1.0, 1.0);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert_eq!(dets[0].bbox, BoundingBox::new(25, 25, 35, 35));
    }
}
