//! Borrowed, validated views over the raw input tensors.
//!
//! `BoxesView` and `ScoresView` wrap the flat f32 buffers the caller hands to
//! `enqueue` and expose per-image subviews so the batch can be processed in
//! parallel without copying. Construction validates buffer length against the
//! declared shape; accessors after that are plain index arithmetic.

use crate::util::{NmsError, NmsResult};

/// Borrowed view over the box tensor.
///
/// Layout: `batch x num_priors x num_loc_classes x 4`, where
/// `num_loc_classes` is 1 when locations are shared across classes.
#[derive(Copy, Clone, Debug)]
pub struct BoxesView<'a> {
    data: &'a [f32],
    num_priors: usize,
    num_loc_classes: usize,
}

impl<'a> BoxesView<'a> {
    /// Creates a view, checking the buffer against the declared shape.
    pub fn new(
        data: &'a [f32],
        batch: usize,
        num_priors: usize,
        num_loc_classes: usize,
    ) -> NmsResult<Self> {
        if batch == 0 || num_priors == 0 || num_loc_classes == 0 {
            return Err(NmsError::InvalidDimensions {
                context: "boxes",
                dims: vec![batch, num_priors, num_loc_classes, 4],
            });
        }
        let needed = batch * num_priors * num_loc_classes * 4;
        if data.len() < needed {
            return Err(NmsError::BufferTooSmall {
                context: "boxes",
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            num_priors,
            num_loc_classes,
        })
    }

    /// Per-image subview for image `index`.
    pub fn image(&self, index: usize) -> ImageBoxes<'a> {
        let stride = self.num_priors * self.num_loc_classes * 4;
        ImageBoxes {
            data: &self.data[index * stride..(index + 1) * stride],
            num_loc_classes: self.num_loc_classes,
        }
    }
}

/// Box coordinates of a single image.
#[derive(Copy, Clone)]
pub struct ImageBoxes<'a> {
    data: &'a [f32],
    num_loc_classes: usize,
}

impl ImageBoxes<'_> {
    /// Raw 4-float entry for `(prior, class)`; the class collapses to slot 0
    /// when locations are shared.
    pub fn raw_box(&self, prior: usize, class: usize) -> [f32; 4] {
        let loc_class = if self.num_loc_classes == 1 { 0 } else { class };
        let base = (prior * self.num_loc_classes + loc_class) * 4;
        [
            self.data[base],
            self.data[base + 1],
            self.data[base + 2],
            self.data[base + 3],
        ]
    }
}

/// Borrowed view over the score tensor.
///
/// Layout: `batch x num_priors x num_classes`.
#[derive(Copy, Clone)]
pub struct ScoresView<'a> {
    data: &'a [f32],
    num_priors: usize,
    num_classes: usize,
}

impl<'a> ScoresView<'a> {
    /// Creates a view, checking the buffer against the declared shape.
    pub fn new(
        data: &'a [f32],
        batch: usize,
        num_priors: usize,
        num_classes: usize,
    ) -> NmsResult<Self> {
        if batch == 0 || num_priors == 0 || num_classes == 0 {
            return Err(NmsError::InvalidDimensions {
                context: "scores",
                dims: vec![batch, num_priors, num_classes],
            });
        }
        let needed = batch * num_priors * num_classes;
        if data.len() < needed {
            return Err(NmsError::BufferTooSmall {
                context: "scores",
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            num_priors,
            num_classes,
        })
    }

    /// Per-image subview for image `index`.
    pub fn image(&self, index: usize) -> ImageScores<'a> {
        let stride = self.num_priors * self.num_classes;
        ImageScores {
            data: &self.data[index * stride..(index + 1) * stride],
            num_classes: self.num_classes,
        }
    }
}

/// Scores of a single image.
#[derive(Copy, Clone)]
pub struct ImageScores<'a> {
    data: &'a [f32],
    num_classes: usize,
}

impl ImageScores<'_> {
    /// Confidence of `(prior, class)`.
    pub fn score(&self, prior: usize, class: usize) -> f32 {
        self.data[prior * self.num_classes + class]
    }
}

#[cfg(test)]
mod tests {
    use super::{BoxesView, ScoresView};
    use crate::util::NmsError;

    #[test]
    fn boxes_view_rejects_short_buffer() {
        let data = [0.0f32; 7];
        let err = BoxesView::new(&data, 1, 2, 1).unwrap_err();
        assert_eq!(
            err,
            NmsError::BufferTooSmall {
                context: "boxes",
                needed: 8,
                got: 7,
            }
        );
    }

    #[test]
    fn boxes_view_rejects_zero_dimensions() {
        let data = [0.0f32; 8];
        let err = BoxesView::new(&data, 0, 2, 1).unwrap_err();
        assert_eq!(
            err,
            NmsError::InvalidDimensions {
                context: "boxes",
                dims: vec![0, 2, 1, 4],
            }
        );
    }

    #[test]
    fn shared_location_collapses_class_slot() {
        // One image, two priors, shared locations.
        let data: Vec<f32> = (0..8).map(|v| v as f32).collect();
        let view = BoxesView::new(&data, 1, 2, 1).unwrap();
        let image = view.image(0);
        assert_eq!(image.raw_box(1, 0), [4.0, 5.0, 6.0, 7.0]);
        assert_eq!(image.raw_box(1, 5), [4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn per_class_boxes_index_by_class() {
        // One image, one prior, two location classes.
        let data: Vec<f32> = (0..8).map(|v| v as f32).collect();
        let view = BoxesView::new(&data, 1, 1, 2).unwrap();
        let image = view.image(0);
        assert_eq!(image.raw_box(0, 0), [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(image.raw_box(0, 1), [4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn scores_index_prior_major() {
        let data = [0.1f32, 0.2, 0.3, 0.4, 0.5, 0.6];
        let view = ScoresView::new(&data, 1, 3, 2).unwrap();
        let image = view.image(0);
        assert_eq!(image.score(0, 1), 0.2);
        assert_eq!(image.score(2, 0), 0.5);
    }
}
