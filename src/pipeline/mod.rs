//! The batched suppression pass: candidate prep, per-class greedy
//! suppression, cross-class merge, and output packing.
//!
//! Each image is independent; within an image each class's selection and
//! suppression is independent, with the cross-class merge as the only
//! synchronization point. The whole pass is stateless across invocations
//! and deterministic for fixed inputs regardless of execution order.

#[cfg(feature = "rayon")]
pub mod rayon;

use crate::bbox::{extent_offset, CornerBox};
use crate::candidate::suppress::suppress_class;
use crate::candidate::topk::TopK;
use crate::candidate::{candidate_cmp_desc, quantize_score, Candidate};
use crate::config::NmsConfig;
use crate::output::{DetectionOutputs, ImageOutputs, PAD_CLASS_ID};
use crate::tensor::{BoxesView, ImageBoxes, ImageScores, ScoresView};
use crate::trace::{trace_event, trace_span};
use crate::util::NmsResult;
use crate::workspace::{ImageLane, NmsWorkspace};

/// Runs the full pass over `batch` images, one image at a time.
///
/// `boxes` and `scores` are the raw input tensors laid out as the
/// configuration declares; `workspace` must have been sized for this
/// configuration; `outputs` receives the packed results.
pub fn run_batch(
    config: &NmsConfig,
    batch: usize,
    boxes: &[f32],
    scores: &[f32],
    workspace: &mut NmsWorkspace,
    outputs: &mut DetectionOutputs<'_>,
) -> NmsResult<()> {
    let (boxes_view, scores_view) = check_inputs(config, batch, boxes, scores)?;
    workspace.check_run(config, batch)?;
    outputs.check_run(batch, config.params.keep_top_k)?;

    let _span = trace_span!("nms_batch", batch = batch).entered();

    let out_lanes = outputs.image_lanes(batch, config.params.keep_top_k);
    let lanes = workspace.image_lanes(batch);
    for (image, (mut lane, mut out)) in lanes.into_iter().zip(out_lanes).enumerate() {
        run_image(
            config,
            boxes_view.image(image),
            scores_view.image(image),
            &mut lane,
            &mut out,
        );
    }
    Ok(())
}

/// Validates the raw input buffers against the configured shapes.
pub(crate) fn check_inputs<'a>(
    config: &NmsConfig,
    batch: usize,
    boxes: &'a [f32],
    scores: &'a [f32],
) -> NmsResult<(BoxesView<'a>, ScoresView<'a>)> {
    let boxes_view = BoxesView::new(
        boxes,
        batch,
        config.num_priors,
        config.params.num_loc_classes(),
    )?;
    let scores_view = ScoresView::new(scores, batch, config.num_priors, config.params.num_classes)?;
    Ok((boxes_view, scores_view))
}

/// Runs selection, suppression, merge and packing for one image.
pub(crate) fn run_image(
    config: &NmsConfig,
    boxes: ImageBoxes<'_>,
    scores: ImageScores<'_>,
    lane: &mut ImageLane<'_>,
    out: &mut ImageOutputs<'_>,
) {
    let params = &config.params;
    let slots = params.top_k.min(config.num_priors);
    let offset = extent_offset(config.caffe_semantics, params.is_normalized);

    // 1) Per-class candidate selection and greedy suppression.
    for class in 0..params.num_classes {
        if class as i32 == params.background_label_id {
            lane.counts[class] = 0;
            continue;
        }
        let segment = class * slots..(class + 1) * slots;

        let mut topk = TopK::new(&mut lane.entries[segment.clone()]);
        for prior in 0..config.num_priors {
            let raw = scores.score(prior, class);
            // NaN scores sort last and never pass a non-negative threshold.
            let score = if raw.is_nan() { f32::NEG_INFINITY } else { raw };
            if score < params.score_threshold {
                continue;
            }
            topk.push(Candidate {
                key: quantize_score(score, config.score_bits),
                class_id: class as i32,
                prior: prior as u32,
            });
        }
        let selected = topk.finish();

        for slot in 0..selected {
            let entry = lane.entries[class * slots + slot];
            let mut decoded =
                CornerBox::decode(boxes.raw_box(entry.prior as usize, class), config.box_coding);
            if params.clip_boxes {
                decoded = decoded.clip_unit();
            }
            lane.boxes[class * slots + slot] = decoded;
        }

        let kept = suppress_class(
            &mut lane.entries[segment.clone()],
            &mut lane.boxes[segment],
            selected,
            params.iou_threshold,
            offset,
        );
        lane.counts[class] = kept as u32;
    }

    // 2) Cross-class merge: pool the kept candidates and take the best.
    let mut pooled = 0usize;
    for class in 0..params.num_classes {
        for slot in 0..lane.counts[class] as usize {
            lane.merge[pooled] = (class * slots + slot) as u32;
            pooled += 1;
        }
    }
    let entries = &*lane.entries;
    lane.merge[..pooled].sort_unstable_by(|&a, &b| {
        candidate_cmp_desc(&entries[a as usize], &entries[b as usize])
    });
    let num_detections = pooled.min(params.keep_top_k);

    trace_event!("nms_image", pooled = pooled, kept = num_detections);

    // 3) Pack the parallel output arrays, padding beyond the valid count.
    *out.num_detections = num_detections as i32;
    for slot in 0..params.keep_top_k {
        if slot < num_detections {
            let index = lane.merge[slot] as usize;
            let entry = lane.entries[index];
            let bbox = lane.boxes[index];
            out.boxes[slot * 4] = bbox.x1;
            out.boxes[slot * 4 + 1] = bbox.y1;
            out.boxes[slot * 4 + 2] = bbox.x2;
            out.boxes[slot * 4 + 3] = bbox.y2;
            out.scores[slot] = entry.key;
            out.classes[slot] = entry.class_id;
        } else {
            out.boxes[slot * 4..slot * 4 + 4].fill(0.0);
            out.scores[slot] = 0.0;
            out.classes[slot] = PAD_CLASS_ID;
        }
    }
}
