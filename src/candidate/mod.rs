//! Candidate selection and pruning.
//!
//! A candidate is a scored `(box, class, prior)` tuple flowing through the
//! per-class pipeline. Ordering is fully deterministic: descending by the
//! (possibly quantized) sorting key, ties broken by ascending class id, then
//! ascending prior index.

pub(crate) mod suppress;
pub(crate) mod topk;

use std::cmp::Ordering;

use crate::bbox::CornerBox;

/// Scored candidate tracked through selection, suppression and merge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Candidate {
    /// Sorting key: the score after optional quantization.
    pub key: f32,
    /// Class the score belongs to.
    pub class_id: i32,
    /// Index of the prior the candidate came from.
    pub prior: u32,
}

impl Default for Candidate {
    fn default() -> Self {
        Self {
            key: f32::NEG_INFINITY,
            class_id: -1,
            prior: 0,
        }
    }
}

pub(crate) fn candidate_cmp_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.key
        .total_cmp(&a.key)
        .then_with(|| a.class_id.cmp(&b.class_id))
        .then_with(|| a.prior.cmp(&b.prior))
}

/// Snaps a score to `bits` fractional bits over `[0, 1]`.
///
/// `bits == 0` keeps full precision; otherwise the score is clamped into the
/// unit interval and truncated to a multiple of `2^-bits`, trading score
/// resolution for cheaper sort keys.
pub fn quantize_score(score: f32, bits: u32) -> f32 {
    if bits == 0 {
        return score;
    }
    let scale = (1u32 << bits) as f32;
    (score.clamp(0.0, 1.0) * scale).floor() / scale
}

/// Final detection, unpacked from the output arrays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Box in corner form, after decoding and optional clipping.
    pub bbox: CornerBox,
    /// Confidence score, quantized when `score_bits` is active.
    pub score: f32,
    /// Class the detection belongs to.
    pub class_id: i32,
}
