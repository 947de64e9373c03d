//! Greedy IoU suppression over a sorted candidate list.

use crate::bbox::CornerBox;

use super::Candidate;

/// Suppresses one class's candidates in place.
///
/// `entries[..count]` must be sorted descending; `boxes` holds the decoded
/// (and clipped) box for each entry at the same index. Survivors are
/// compacted to the front of both slices, preserving score order, and the
/// kept count is returned. A candidate is dropped iff its IoU against any
/// already-kept box reaches `iou_threshold`.
///
/// Re-running on the compacted survivors is a no-op: no kept pair overlaps
/// at or above the threshold.
pub(crate) fn suppress_class(
    entries: &mut [Candidate],
    boxes: &mut [CornerBox],
    count: usize,
    iou_threshold: f32,
    extent_offset: f32,
) -> usize {
    let mut kept = 0usize;
    for idx in 0..count {
        let candidate_box = boxes[idx];
        let mut overlapping = false;
        for kept_box in boxes[..kept].iter() {
            if candidate_box.iou(kept_box, extent_offset) >= iou_threshold {
                overlapping = true;
                break;
            }
        }
        if !overlapping {
            entries[kept] = entries[idx];
            boxes[kept] = candidate_box;
            kept += 1;
        }
    }
    kept
}
