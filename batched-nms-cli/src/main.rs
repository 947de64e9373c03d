use batched_nms::{
    BatchedNmsPlugin, BoxCoding, ConfigureInfo, NmsConfig, NmsParameters, NmsPlugin,
    OwnedDetectionOutputs, TensorShape,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Batched NMS CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BoxCodingConfig {
    Corner,
    CenterSize,
}

impl From<BoxCodingConfig> for BoxCoding {
    fn from(value: BoxCodingConfig) -> Self {
        match value {
            BoxCodingConfig::Corner => BoxCoding::Corner,
            BoxCodingConfig::CenterSize => BoxCoding::CenterSize,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ParamsJson {
    share_location: bool,
    background_label_id: i32,
    num_classes: usize,
    top_k: usize,
    keep_top_k: usize,
    score_threshold: f32,
    iou_threshold: f32,
    is_normalized: bool,
    clip_boxes: bool,
}

impl Default for ParamsJson {
    fn default() -> Self {
        let params = NmsParameters::default();
        Self {
            share_location: params.share_location,
            background_label_id: params.background_label_id,
            num_classes: params.num_classes,
            top_k: params.top_k,
            keep_top_k: params.keep_top_k,
            score_threshold: params.score_threshold,
            iou_threshold: params.iou_threshold,
            is_normalized: params.is_normalized,
            clip_boxes: params.clip_boxes,
        }
    }
}

impl From<&ParamsJson> for NmsParameters {
    fn from(value: &ParamsJson) -> Self {
        Self {
            share_location: value.share_location,
            background_label_id: value.background_label_id,
            num_classes: value.num_classes,
            top_k: value.top_k,
            keep_top_k: value.keep_top_k,
            score_threshold: value.score_threshold,
            iou_threshold: value.iou_threshold,
            is_normalized: value.is_normalized,
            clip_boxes: value.clip_boxes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageJson {
    /// One 4-tuple per `(prior, location class)` pair, prior-major.
    boxes: Vec<[f32; 4]>,
    /// One row per prior, one column per class.
    scores: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    params: ParamsJson,
    box_coding: BoxCodingConfig,
    score_bits: u32,
    caffe_semantics: bool,
    output_path: Option<String>,
    images: Vec<ImageJson>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            params: ParamsJson::default(),
            box_coding: BoxCodingConfig::Corner,
            score_bits: 0,
            caffe_semantics: true,
            output_path: None,
            images: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    class_id: i32,
}

#[derive(Debug, Serialize)]
struct ImageOutput {
    num_detections: usize,
    detections: Vec<DetectionRecord>,
}

#[derive(Debug, Serialize)]
struct Output {
    images: Vec<ImageOutput>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("batched_nms=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.images.is_empty() {
        return Err("images must contain at least one entry".into());
    }

    let params = NmsParameters::from(&config.params);
    let num_loc_classes = params.num_loc_classes();
    let num_classes = params.num_classes;
    let keep_top_k = params.keep_top_k;

    let first = &config.images[0];
    if first.boxes.len() % num_loc_classes != 0 {
        return Err("boxes length must be a multiple of the location class count".into());
    }
    let num_priors = first.boxes.len() / num_loc_classes;

    let mut boxes = Vec::with_capacity(config.images.len() * num_priors * num_loc_classes * 4);
    let mut scores = Vec::with_capacity(config.images.len() * num_priors * num_classes);
    for (index, image) in config.images.iter().enumerate() {
        if image.boxes.len() != num_priors * num_loc_classes {
            return Err(format!("image {index}: every image must share the prior count").into());
        }
        if image.scores.len() != num_priors
            || image.scores.iter().any(|row| row.len() != num_classes)
        {
            return Err(
                format!("image {index}: scores must be num_priors rows of num_classes").into(),
            );
        }
        boxes.extend(image.boxes.iter().flatten());
        scores.extend(image.scores.iter().flatten());
    }

    let nms_config = NmsConfig::new(params)?
        .with_box_coding(config.box_coding.into())
        .with_score_bits(config.score_bits)?
        .with_caffe_semantics(config.caffe_semantics);
    let mut plugin = BatchedNmsPlugin::from_config(nms_config)?;

    let batch = config.images.len();
    plugin.configure(&ConfigureInfo {
        boxes_shape: TensorShape::new(vec![num_priors, num_loc_classes, 4]),
        scores_shape: TensorShape::new(vec![num_priors, num_classes]),
        max_batch_size: batch,
    })?;

    let mut workspace = plugin.create_workspace(batch)?;
    let mut outputs = OwnedDetectionOutputs::new(batch, keep_top_k);
    plugin.enqueue(batch, &boxes, &scores, &mut workspace, &mut outputs.views())?;

    let images = (0..batch)
        .map(|image| ImageOutput {
            num_detections: outputs.num_detections(image),
            detections: outputs
                .detections(image)
                .into_iter()
                .map(|d| DetectionRecord {
                    x1: d.bbox.x1,
                    y1: d.bbox.y1,
                    x2: d.bbox.x2,
                    y2: d.bbox.y2,
                    score: d.score,
                    class_id: d.class_id,
                })
                .collect(),
        })
        .collect();
    let json = serde_json::to_string_pretty(&Output { images })?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
