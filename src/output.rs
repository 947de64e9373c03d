//! Packed detection outputs.
//!
//! The run produces four parallel arrays per image, each `keep_top_k` long
//! and padded beyond the valid count: boxes and scores pad with zeros, class
//! ids with `-1`. Only the per-image count marks which entries are real;
//! downstream consumers must not interpret padding as detections.

use crate::bbox::CornerBox;
use crate::candidate::Detection;
use crate::util::{NmsError, NmsResult};

/// Class id written into padding slots.
pub const PAD_CLASS_ID: i32 = -1;

/// Mutable views over the caller's four output buffers.
pub struct DetectionOutputs<'a> {
    /// Valid detection count per image, `batch` long.
    pub num_detections: &'a mut [i32],
    /// Kept boxes, `batch * keep_top_k * 4` floats.
    pub boxes: &'a mut [f32],
    /// Kept scores, `batch * keep_top_k` floats.
    pub scores: &'a mut [f32],
    /// Kept class ids, `batch * keep_top_k` values.
    pub classes: &'a mut [i32],
}

impl DetectionOutputs<'_> {
    pub(crate) fn check_run(&self, batch: usize, keep_top_k: usize) -> NmsResult<()> {
        let checks = [
            ("num_detections", batch, self.num_detections.len()),
            ("out_boxes", batch * keep_top_k * 4, self.boxes.len()),
            ("out_scores", batch * keep_top_k, self.scores.len()),
            ("out_classes", batch * keep_top_k, self.classes.len()),
        ];
        for (context, needed, got) in checks {
            if got < needed {
                return Err(NmsError::BufferTooSmall {
                    context,
                    needed,
                    got,
                });
            }
        }
        Ok(())
    }

    /// Splits the buffers into disjoint per-image lanes.
    pub(crate) fn image_lanes(&mut self, batch: usize, keep_top_k: usize) -> Vec<ImageOutputs<'_>> {
        self.num_detections
            .iter_mut()
            .zip(self.boxes.chunks_mut(keep_top_k * 4))
            .zip(self.scores.chunks_mut(keep_top_k))
            .zip(self.classes.chunks_mut(keep_top_k))
            .take(batch)
            .map(|(((num_detections, boxes), scores), classes)| ImageOutputs {
                num_detections,
                boxes,
                scores,
                classes,
            })
            .collect()
    }
}

/// One image's slice of the output buffers.
pub(crate) struct ImageOutputs<'a> {
    pub num_detections: &'a mut i32,
    pub boxes: &'a mut [f32],
    pub scores: &'a mut [f32],
    pub classes: &'a mut [i32],
}

/// Owned output buffers sized for a batch, convenient for callers that do not
/// manage their own tensor memory.
pub struct OwnedDetectionOutputs {
    keep_top_k: usize,
    num_detections: Vec<i32>,
    boxes: Vec<f32>,
    scores: Vec<f32>,
    classes: Vec<i32>,
}

impl OwnedDetectionOutputs {
    /// Allocates zeroed buffers for `batch` images of `keep_top_k` slots.
    pub fn new(batch: usize, keep_top_k: usize) -> Self {
        Self {
            keep_top_k,
            num_detections: vec![0; batch],
            boxes: vec![0.0; batch * keep_top_k * 4],
            scores: vec![0.0; batch * keep_top_k],
            classes: vec![PAD_CLASS_ID; batch * keep_top_k],
        }
    }

    /// Mutable views suitable for `enqueue`.
    pub fn views(&mut self) -> DetectionOutputs<'_> {
        DetectionOutputs {
            num_detections: &mut self.num_detections,
            boxes: &mut self.boxes,
            scores: &mut self.scores,
            classes: &mut self.classes,
        }
    }

    /// Valid detection count of one image.
    pub fn num_detections(&self, image: usize) -> usize {
        self.num_detections[image] as usize
    }

    /// Unpacks the valid detections of one image.
    pub fn detections(&self, image: usize) -> Vec<Detection> {
        let count = self.num_detections(image);
        let box_base = image * self.keep_top_k * 4;
        let base = image * self.keep_top_k;
        (0..count)
            .map(|idx| Detection {
                bbox: CornerBox::new(
                    self.boxes[box_base + idx * 4],
                    self.boxes[box_base + idx * 4 + 1],
                    self.boxes[box_base + idx * 4 + 2],
                    self.boxes[box_base + idx * 4 + 3],
                ),
                score: self.scores[base + idx],
                class_id: self.classes[base + idx],
            })
            .collect()
    }

    /// Raw score slot, including padding, for one image.
    pub fn score_slot(&self, image: usize, slot: usize) -> f32 {
        self.scores[image * self.keep_top_k + slot]
    }

    /// Raw class slot, including padding, for one image.
    pub fn class_slot(&self, image: usize, slot: usize) -> i32 {
        self.classes[image * self.keep_top_k + slot]
    }
}
