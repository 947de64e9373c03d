//! Batch-parallel suppression pass (feature-gated).
//!
//! Images are independent, so the batch distributes over the rayon pool with
//! one workspace lane and one output lane per image. Results are written to
//! disjoint slices, so the output is bit-identical to the scalar path.

use rayon::prelude::*;

use crate::config::NmsConfig;
use crate::output::DetectionOutputs;
use crate::pipeline::{check_inputs, run_image};
use crate::trace::{trace_event, trace_span};
use crate::util::NmsResult;
use crate::workspace::NmsWorkspace;

/// Runs the full pass with images distributed over the rayon pool.
pub fn run_batch_par(
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

    let _span = trace_span!("nms_batch", batch = batch, parallel = true).entered();

    let out_lanes = outputs.image_lanes(batch, config.params.keep_top_k);
    let lanes = workspace.image_lanes(batch);
    lanes
        .into_par_iter()
        .zip(out_lanes)
        .enumerate()
        .for_each(|(image, (mut lane, mut out))| {
            run_image(
                config,
                boxes_view.image(image),
                scores_view.image(image),
                &mut lane,
                &mut out,
            );
        });

    trace_event!("nms_batch_done", batch = batch);
    Ok(())
}
