#![cfg(feature = "rayon")]

//! The parallel batch path must be bit-identical to the scalar one.

use batched_nms::pipeline;
use batched_nms::{NmsConfig, NmsParameters, NmsWorkspace, OwnedDetectionOutputs};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_inputs(
    rng: &mut StdRng,
    batch: usize,
    num_priors: usize,
    num_classes: usize,
) -> (Vec<f32>, Vec<f32>) {
    let mut boxes = Vec::with_capacity(batch * num_priors * 4);
    for _ in 0..batch * num_priors {
        let x1: f32 = rng.random_range(0.0..90.0);
        let y1: f32 = rng.random_range(0.0..90.0);
        let w: f32 = rng.random_range(2.0..25.0);
        let h: f32 = rng.random_range(2.0..25.0);
        boxes.extend_from_slice(&[x1, y1, x1 + w, y1 + h]);
    }
    let scores = (0..batch * num_priors * num_classes)
        .map(|_| rng.random_range(0.0..1.0))
        .collect();
    (boxes, scores)
}

#[test]
fn parallel_batches_match_the_scalar_path_exactly() {
    let mut rng = StdRng::seed_from_u64(77);
    let batch = 6;
    let num_priors = 128;
    let num_classes = 4;

    let params = NmsParameters {
        share_location: true,
        background_label_id: 0,
        num_classes,
        top_k: 48,
        keep_top_k: 24,
        score_threshold: 0.3,
        iou_threshold: 0.5,
        is_normalized: false,
        clip_boxes: false,
    };
    let config = NmsConfig::new(params)
        .unwrap()
        .with_caffe_semantics(false)
        .with_input_shape(num_priors)
        .unwrap();

    for round in 0..4 {
        let (boxes, scores) = random_inputs(&mut rng, batch, num_priors, num_classes);

        let mut workspace = NmsWorkspace::for_config(&config, batch).unwrap();
        let mut scalar = OwnedDetectionOutputs::new(batch, params.keep_top_k);
        pipeline::run_batch(
            &config,
            batch,
            &boxes,
            &scores,
            &mut workspace,
            &mut scalar.views(),
        )
        .unwrap();

        let mut workspace = NmsWorkspace::for_config(&config, batch).unwrap();
        let mut parallel = OwnedDetectionOutputs::new(batch, params.keep_top_k);
        pipeline::rayon::run_batch_par(
            &config,
            batch,
            &boxes,
            &scores,
            &mut workspace,
            &mut parallel.views(),
        )
        .unwrap();

        for image in 0..batch {
            assert_eq!(
                scalar.num_detections(image),
                parallel.num_detections(image),
                "count diverged for image {image} in round {round}"
            );
            assert_eq!(
                scalar.detections(image),
                parallel.detections(image),
                "detections diverged for image {image} in round {round}"
            );
        }
    }
}

#[test]
fn quantized_keys_stay_identical_across_paths() {
    let mut rng = StdRng::seed_from_u64(78);
    let batch = 3;
    let num_priors = 64;
    let num_classes = 2;

    let params = NmsParameters {
        share_location: true,
        background_label_id: -1,
        num_classes,
        top_k: 32,
        keep_top_k: 16,
        score_threshold: 0.1,
        iou_threshold: 0.6,
        is_normalized: false,
        clip_boxes: false,
    };
    let config = NmsConfig::new(params)
        .unwrap()
        .with_caffe_semantics(false)
        .with_score_bits(4)
        .unwrap()
        .with_input_shape(num_priors)
        .unwrap();

    let (boxes, scores) = random_inputs(&mut rng, batch, num_priors, num_classes);

    let mut workspace = NmsWorkspace::for_config(&config, batch).unwrap();
    let mut scalar = OwnedDetectionOutputs::new(batch, params.keep_top_k);
    pipeline::run_batch(
        &config,
        batch,
        &boxes,
        &scores,
        &mut workspace,
        &mut scalar.views(),
    )
    .unwrap();

    let mut workspace = NmsWorkspace::for_config(&config, batch).unwrap();
    let mut parallel = OwnedDetectionOutputs::new(batch, params.keep_top_k);
    pipeline::rayon::run_batch_par(
        &config,
        batch,
        &boxes,
        &scores,
        &mut workspace,
        &mut parallel.views(),
    )
    .unwrap();

    for image in 0..batch {
        for slot in 0..params.keep_top_k {
            assert_eq!(
                scalar.score_slot(image, slot).to_bits(),
                parallel.score_slot(image, slot).to_bits()
            );
        }
    }
}
