//! Axis-aligned boxes and the overlap metric used for suppression.
//!
//! Boxes arrive from the raw tensor in one of two codings and are normalized
//! to corner form before clipping or IoU. Under Caffe semantics with
//! unnormalized coordinates the box extents are inclusive, so width and
//! height gain `+1` pixel when measuring overlap.

/// Raw coordinate coding of a box in the input tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxCoding {
    /// `[x1, y1, x2, y2]` corner coordinates.
    Corner,
    /// `[cx, cy, w, h]` center plus size.
    CenterSize,
}

/// Axis-aligned box in corner form.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CornerBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl CornerBox {
    /// Creates a box from corner coordinates.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Normalizes a raw 4-float tensor entry to corner form.
    pub fn decode(raw: [f32; 4], coding: BoxCoding) -> Self {
        match coding {
            BoxCoding::Corner => Self::new(raw[0], raw[1], raw[2], raw[3]),
            BoxCoding::CenterSize => {
                let [cx, cy, w, h] = raw;
                Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
            }
        }
    }

    /// Clamps all coordinates into `[0, 1]`.
    pub fn clip_unit(self) -> Self {
        Self {
            x1: self.x1.clamp(0.0, 1.0),
            y1: self.y1.clamp(0.0, 1.0),
            x2: self.x2.clamp(0.0, 1.0),
            y2: self.y2.clamp(0.0, 1.0),
        }
    }

    /// Box area under the given extent offset; degenerate boxes have zero area.
    pub fn area(&self, extent_offset: f32) -> f32 {
        let w = (self.x2 - self.x1 + extent_offset).max(0.0);
        let h = (self.y2 - self.y1 + extent_offset).max(0.0);
        w * h
    }

    /// Intersection-over-union of two boxes.
    ///
    /// `extent_offset` is `1.0` under the inclusive-pixel (Caffe) convention
    /// with unnormalized coordinates, `0.0` otherwise. Non-overlapping or
    /// degenerate pairs score `0.0`.
    pub fn iou(&self, other: &Self, extent_offset: f32) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let iw = (ix2 - ix1 + extent_offset).max(0.0);
        let ih = (iy2 - iy1 + extent_offset).max(0.0);
        let intersection = iw * ih;
        if intersection <= 0.0 {
            return 0.0;
        }

        let union = self.area(extent_offset) + other.area(extent_offset) - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// Extent offset for the configured coordinate convention.
pub(crate) fn extent_offset(caffe_semantics: bool, is_normalized: bool) -> f32 {
    if caffe_semantics && !is_normalized {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{extent_offset, BoxCoding, CornerBox};

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let b = CornerBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((b.iou(&b, 0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = CornerBox::new(0.0, 0.0, 10.0, 10.0);
        let b = CornerBox::new(50.0, 50.0, 60.0, 60.0);
        assert_eq!(a.iou(&b, 0.0), 0.0);
    }

    #[test]
    fn iou_of_shifted_boxes_matches_closed_form() {
        // 10x10 boxes shifted by (1,1): intersection 81, union 119.
        let a = CornerBox::new(0.0, 0.0, 10.0, 10.0);
        let b = CornerBox::new(1.0, 1.0, 11.0, 11.0);
        assert!((a.iou(&b, 0.0) - 81.0 / 119.0).abs() < 1e-6);
    }

    #[test]
    fn inclusive_extent_changes_overlap() {
        let a = CornerBox::new(0.0, 0.0, 9.0, 9.0);
        let b = CornerBox::new(5.0, 5.0, 14.0, 14.0);
        let exclusive = a.iou(&b, 0.0);
        let inclusive = a.iou(&b, 1.0);
        assert!(inclusive > exclusive);
    }

    #[test]
    fn degenerate_box_scores_zero() {
        let a = CornerBox::new(3.0, 3.0, 3.0, 3.0);
        let b = CornerBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.iou(&b, 0.0), 0.0);
        assert_eq!(a.area(0.0), 0.0);
    }

    #[test]
    fn center_size_decodes_to_corners() {
        let b = CornerBox::decode([5.0, 5.0, 10.0, 4.0], BoxCoding::CenterSize);
        assert_eq!(b, CornerBox::new(0.0, 3.0, 10.0, 7.0));
    }

    #[test]
    fn clip_clamps_into_unit_square() {
        let b = CornerBox::new(-0.2, 0.5, 1.3, 0.9).clip_unit();
        assert_eq!(b, CornerBox::new(0.0, 0.5, 1.0, 0.9));
    }

    #[test]
    fn extent_offset_only_for_unnormalized_caffe() {
        assert_eq!(extent_offset(true, false), 1.0);
        assert_eq!(extent_offset(true, true), 0.0);
        assert_eq!(extent_offset(false, false), 0.0);
    }
}
