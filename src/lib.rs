//! Batched, class-aware non-maximum suppression.
//!
//! This crate runs greedy IoU suppression over per-image, per-class candidate
//! boxes and scores, keeping up to `keep_top_k` detections per image. It
//! models the full plugin surface of an inference-engine NMS layer — shape
//! inference, format negotiation, configuration validation, binary
//! serialization, workspace sizing — around a deterministic CPU pipeline,
//! with optional batch parallelism via the `rayon` feature.

pub mod bbox;
mod candidate;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod plugin;
pub mod tensor;
mod trace;
pub mod util;
pub mod workspace;

pub use bbox::{BoxCoding, CornerBox};
pub use candidate::{quantize_score, Detection};
pub use config::{NmsConfig, NmsParameters, MAX_SCORE_BITS, MAX_TOP_K};
pub use output::{DetectionOutputs, OwnedDetectionOutputs, PAD_CLASS_ID};
pub use plugin::{
    validate_io_format, BatchedNmsDynamicPlugin, BatchedNmsPlugin, ConfigureInfo, DataType,
    NmsPlugin, TensorFormat, TensorShape, NUM_OUTPUTS,
};
pub use tensor::{BoxesView, ScoresView};
pub use util::{NmsError, NmsResult};
pub use workspace::{workspace_size, NmsWorkspace, WorkspaceLayout};
