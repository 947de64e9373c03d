use batched_nms::plugin::serialize::SERIALIZED_SIZE;
use batched_nms::{
    BatchedNmsDynamicPlugin, BatchedNmsPlugin, ConfigureInfo, NmsError, NmsParameters, NmsPlugin,
    OwnedDetectionOutputs, TensorShape,
};

fn configured_plugin() -> BatchedNmsPlugin {
    let params = NmsParameters {
        share_location: true,
        background_label_id: -1,
        num_classes: 2,
        top_k: 8,
        keep_top_k: 4,
        score_threshold: 0.2,
        iou_threshold: 0.45,
        is_normalized: false,
        clip_boxes: false,
    };
    let mut plugin = BatchedNmsPlugin::new(params).unwrap();
    plugin.set_score_bits(6).unwrap();
    plugin.set_caffe_semantics(false);
    plugin
        .configure(&ConfigureInfo {
            boxes_shape: TensorShape::new(vec![16, 1, 4]),
            scores_shape: TensorShape::new(vec![16, 2]),
            max_batch_size: 2,
        })
        .unwrap();
    plugin
}

#[test]
fn round_trip_preserves_the_configured_state() {
    let plugin = configured_plugin();
    let bytes = plugin.serialize();
    assert_eq!(bytes.len(), SERIALIZED_SIZE);

    let restored = BatchedNmsPlugin::deserialize(&bytes).unwrap();
    assert_eq!(restored.config(), plugin.config());
    assert_eq!(restored.config().num_priors, 16);
    assert!(restored.config().is_configured());
    assert_eq!(restored.serialize(), bytes);
}

#[test]
fn dynamic_plugin_shares_the_wire_layout() {
    let plugin = configured_plugin();
    let bytes = plugin.serialize();

    let restored = BatchedNmsDynamicPlugin::deserialize(&bytes).unwrap();
    assert_eq!(restored.config(), plugin.config());
    assert_eq!(restored.serialize(), bytes);
}

#[test]
fn truncated_and_padded_buffers_are_rejected() {
    let bytes = configured_plugin().serialize();

    assert_eq!(
        BatchedNmsPlugin::deserialize(&bytes[..bytes.len() - 1]).unwrap_err(),
        NmsError::SerializedLengthMismatch {
            expected: SERIALIZED_SIZE,
            got: SERIALIZED_SIZE - 1,
        }
    );

    let mut padded = bytes.clone();
    padded.push(0);
    assert_eq!(
        BatchedNmsPlugin::deserialize(&padded).unwrap_err(),
        NmsError::SerializedLengthMismatch {
            expected: SERIALIZED_SIZE,
            got: SERIALIZED_SIZE + 1,
        }
    );
}

#[test]
fn corrupted_fields_never_build_a_plugin() {
    let bytes = configured_plugin().serialize();

    // share_location carries a non-canonical bool byte.
    let mut corrupt = bytes.clone();
    corrupt[0] = 7;
    assert_eq!(
        BatchedNmsPlugin::deserialize(&corrupt).unwrap_err(),
        NmsError::SerializedValueInvalid { offset: 0 }
    );

    // iou_threshold lands outside (0, 1].
    let mut corrupt = bytes.clone();
    corrupt[33..37].copy_from_slice(&2.0f32.to_le_bytes());
    assert!(matches!(
        BatchedNmsPlugin::deserialize(&corrupt).unwrap_err(),
        NmsError::InvalidConfiguration {
            field: "iou_threshold",
            ..
        }
    ));
}

#[test]
fn restored_plugin_runs_without_reconfiguring() {
    let plugin = configured_plugin();
    let restored = BatchedNmsPlugin::deserialize(&plugin.serialize()).unwrap();

    let num_priors = restored.config().num_priors;
    let mut boxes = vec![0.0f32; num_priors * 4];
    let mut scores = vec![0.0f32; num_priors * 2];
    for prior in 0..num_priors {
        let offset = prior as f32 * 20.0;
        boxes[prior * 4..prior * 4 + 4]
            .copy_from_slice(&[offset, 0.0, offset + 10.0, 10.0]);
    }
    scores[0] = 0.9; // prior 0, class 0
    scores[3] = 0.8; // prior 1, class 1

    let mut workspace = restored.create_workspace(1).unwrap();
    let mut outputs = OwnedDetectionOutputs::new(1, 4);
    restored
        .enqueue(1, &boxes, &scores, &mut workspace, &mut outputs.views())
        .unwrap();

    assert_eq!(outputs.num_detections(0), 2);
    let classes: Vec<i32> = outputs.detections(0).iter().map(|d| d.class_id).collect();
    assert_eq!(classes, vec![0, 1]);
}
