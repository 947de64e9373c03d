//! NMS configuration and eager validation.
//!
//! All parameter checking happens here, at construction or configure time.
//! The run path assumes a validated configuration and never re-checks
//! individual fields mid-computation.

use crate::bbox::BoxCoding;
use crate::util::{NmsError, NmsResult};

/// Upper bound on per-class pre-NMS candidates.
pub const MAX_TOP_K: usize = 4096;

/// Largest meaningful score quantization width; `0` disables quantization.
pub const MAX_SCORE_BITS: u32 = 10;

/// Core NMS parameter block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmsParameters {
    /// All classes share one box per prior when `true`; otherwise each class
    /// has its own box coordinates.
    pub share_location: bool,
    /// Class id excluded from suppression and output, `-1` for none.
    pub background_label_id: i32,
    /// Number of classes scored per prior.
    pub num_classes: usize,
    /// Pre-NMS candidates retained per class.
    pub top_k: usize,
    /// Final detections retained per image after the cross-class merge.
    pub keep_top_k: usize,
    /// Candidates below this score never enter suppression.
    pub score_threshold: f32,
    /// Overlap at or above this threshold suppresses the lower-scored box.
    pub iou_threshold: f32,
    /// Whether box coordinates are normalized to `[0, 1]`.
    pub is_normalized: bool,
    /// Clamp box coordinates into the unit range before suppression.
    pub clip_boxes: bool,
}

impl Default for NmsParameters {
    fn default() -> Self {
        Self {
            share_location: true,
            background_label_id: -1,
            num_classes: 1,
            top_k: 200,
            keep_top_k: 200,
            score_threshold: 0.0,
            iou_threshold: 0.5,
            is_normalized: true,
            clip_boxes: true,
        }
    }
}

impl NmsParameters {
    /// Validates the parameter block, rejecting bad combinations eagerly.
    pub fn validate(&self) -> NmsResult<()> {
        if self.num_classes == 0 {
            return Err(NmsError::InvalidConfiguration {
                field: "num_classes",
                reason: "must be positive",
            });
        }
        if self.top_k == 0 {
            return Err(NmsError::InvalidConfiguration {
                field: "top_k",
                reason: "must be positive",
            });
        }
        if self.top_k > MAX_TOP_K {
            return Err(NmsError::InvalidConfiguration {
                field: "top_k",
                reason: "exceeds the per-class sorting limit",
            });
        }
        if self.keep_top_k == 0 {
            return Err(NmsError::InvalidConfiguration {
                field: "keep_top_k",
                reason: "must be positive",
            });
        }
        if self.keep_top_k > self.top_k {
            return Err(NmsError::InvalidConfiguration {
                field: "keep_top_k",
                reason: "must not exceed top_k",
            });
        }
        if self.background_label_id < -1 {
            return Err(NmsError::InvalidConfiguration {
                field: "background_label_id",
                reason: "must be -1 or a valid class id",
            });
        }
        if self.background_label_id >= 0 && self.background_label_id as usize >= self.num_classes {
            return Err(NmsError::InvalidConfiguration {
                field: "background_label_id",
                reason: "must be less than num_classes",
            });
        }
        if !self.score_threshold.is_finite() || self.score_threshold < 0.0 {
            return Err(NmsError::InvalidConfiguration {
                field: "score_threshold",
                reason: "must be finite and non-negative",
            });
        }
        if !self.iou_threshold.is_finite() || self.iou_threshold <= 0.0 || self.iou_threshold > 1.0
        {
            return Err(NmsError::InvalidConfiguration {
                field: "iou_threshold",
                reason: "must lie in (0, 1]",
            });
        }
        Ok(())
    }

    /// Number of distinct box slots per prior.
    pub fn num_loc_classes(&self) -> usize {
        if self.share_location {
            1
        } else {
            self.num_classes
        }
    }
}

/// Full plugin configuration: the parameter block, the tunable extras, and
/// the scalars derived from the input shapes at configure time.
///
/// The derived scalars are zero until [`NmsConfig::with_input_shape`] fixes
/// them; serialization carries them so a deserialized plugin is immediately
/// runnable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmsConfig {
    pub params: NmsParameters,
    /// Coordinate coding of raw tensor boxes.
    pub box_coding: BoxCoding,
    /// Score quantization width for sorting keys and packed output scores;
    /// `0` keeps full precision.
    pub score_bits: u32,
    /// Inclusive-pixel extent convention for IoU on unnormalized boxes.
    pub caffe_semantics: bool,
    /// Per-image box tensor volume, derived from the input shapes.
    pub boxes_size: usize,
    /// Per-image score tensor volume, derived from the input shapes.
    pub scores_size: usize,
    /// Number of candidate priors per image, derived from the input shapes.
    pub num_priors: usize,
}

impl NmsConfig {
    /// Wraps a validated parameter block with default extras.
    pub fn new(params: NmsParameters) -> NmsResult<Self> {
        let config = Self {
            params,
            box_coding: BoxCoding::Corner,
            score_bits: 0,
            caffe_semantics: true,
            boxes_size: 0,
            scores_size: 0,
            num_priors: 0,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the parameters, the extras, and (once derived) the shape
    /// scalars against each other.
    pub fn validate(&self) -> NmsResult<()> {
        self.params.validate()?;
        if self.score_bits > MAX_SCORE_BITS {
            return Err(NmsError::InvalidConfiguration {
                field: "score_bits",
                reason: "must be 0 or in 1..=10",
            });
        }
        if self.num_priors > 0 {
            let expected_boxes = self.num_priors * self.params.num_loc_classes() * 4;
            let expected_scores = self.num_priors * self.params.num_classes;
            if self.boxes_size != expected_boxes {
                return Err(NmsError::InvalidConfiguration {
                    field: "boxes_size",
                    reason: "inconsistent with num_priors and share_location",
                });
            }
            if self.scores_size != expected_scores {
                return Err(NmsError::InvalidConfiguration {
                    field: "scores_size",
                    reason: "inconsistent with num_priors and num_classes",
                });
            }
        }
        Ok(())
    }

    /// Returns a configuration with the derived scalars fixed from a per-image
    /// prior count.
    pub fn with_input_shape(mut self, num_priors: usize) -> NmsResult<Self> {
        if num_priors == 0 {
            return Err(NmsError::InvalidDimensions {
                context: "num_priors",
                dims: vec![0],
            });
        }
        self.num_priors = num_priors;
        self.boxes_size = num_priors * self.params.num_loc_classes() * 4;
        self.scores_size = num_priors * self.params.num_classes;
        self.validate()?;
        Ok(self)
    }

    /// Returns a configuration with box clipping toggled.
    pub fn with_clip_boxes(mut self, clip: bool) -> Self {
        self.params.clip_boxes = clip;
        self
    }

    /// Returns a configuration with the given score quantization width.
    pub fn with_score_bits(mut self, score_bits: u32) -> NmsResult<Self> {
        self.score_bits = score_bits;
        self.validate()?;
        Ok(self)
    }

    /// Returns a configuration with the extent convention toggled.
    pub fn with_caffe_semantics(mut self, caffe_semantics: bool) -> Self {
        self.caffe_semantics = caffe_semantics;
        self
    }

    /// Returns a configuration with the given raw box coding.
    pub fn with_box_coding(mut self, coding: BoxCoding) -> Self {
        self.box_coding = coding;
        self
    }

    /// Whether the derived shape scalars have been fixed.
    pub fn is_configured(&self) -> bool {
        self.num_priors > 0
    }
}
