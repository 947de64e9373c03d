use batched_nms::{
    BatchedNmsPlugin, ConfigureInfo, NmsConfig, NmsParameters, NmsPlugin, OwnedDetectionOutputs,
    TensorShape,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn make_boxes(num_priors: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(num_priors * 4);
    for prior in 0..num_priors {
        let x = ((prior * 37) % 900) as f32;
        let y = ((prior * 61) % 900) as f32;
        let w = 20.0 + ((prior * 13) % 60) as f32;
        let h = 20.0 + ((prior * 7) % 60) as f32;
        data.extend_from_slice(&[x, y, x + w, y + h]);
    }
    data
}

fn make_scores(batch: usize, num_priors: usize, num_classes: usize) -> Vec<f32> {
    let total = batch * num_priors * num_classes;
    (0..total)
        .map(|i| (((i * 2654435761) >> 8) & 0x3FF) as f32 / 1024.0)
        .collect()
}

fn configured_plugin(num_priors: usize, num_classes: usize, max_batch: usize) -> BatchedNmsPlugin {
    let params = NmsParameters {
        share_location: true,
        background_label_id: 0,
        num_classes,
        top_k: 200,
        keep_top_k: 100,
        score_threshold: 0.4,
        iou_threshold: 0.5,
        is_normalized: false,
        clip_boxes: false,
    };
    let config = NmsConfig::new(params).unwrap().with_caffe_semantics(false);
    let mut plugin = BatchedNmsPlugin::from_config(config).unwrap();
    plugin
        .configure(&ConfigureInfo {
            boxes_shape: TensorShape::new(vec![num_priors, 1, 4]),
            scores_shape: TensorShape::new(vec![num_priors, num_classes]),
            max_batch_size: max_batch,
        })
        .unwrap();
    plugin
}

fn bench_batched_nms(c: &mut Criterion) {
    let num_priors = 4096;
    let num_classes = 16;

    let single_boxes = make_boxes(num_priors);
    let single_scores = make_scores(1, num_priors, num_classes);
    let plugin = configured_plugin(num_priors, num_classes, 1);
    let mut workspace = plugin.create_workspace(1).unwrap();
    let mut outputs = OwnedDetectionOutputs::new(1, 100);

    c.bench_function("nms_4096_priors_16_classes", |b| {
        b.iter(|| {
            plugin
                .enqueue(
                    1,
                    black_box(&single_boxes),
                    black_box(&single_scores),
                    &mut workspace,
                    &mut outputs.views(),
                )
                .unwrap();
            black_box(outputs.num_detections(0))
        });
    });

    let batch = 8;
    let batch_boxes: Vec<f32> = (0..batch).flat_map(|_| make_boxes(num_priors)).collect();
    let batch_scores = make_scores(batch, num_priors, num_classes);
    let plugin = configured_plugin(num_priors, num_classes, batch);
    let mut workspace = plugin.create_workspace(batch).unwrap();
    let mut outputs = OwnedDetectionOutputs::new(batch, 100);

    let name = if cfg!(feature = "rayon") {
        "nms_batch8_parallel"
    } else {
        "nms_batch8"
    };
    c.bench_function(name, |b| {
        b.iter(|| {
            plugin
                .enqueue(
                    batch,
                    black_box(&batch_boxes),
                    black_box(&batch_scores),
                    &mut workspace,
                    &mut outputs.views(),
                )
                .unwrap();
            black_box(outputs.num_detections(0))
        });
    });
}

criterion_group!(benches, bench_batched_nms);
criterion_main!(benches);
