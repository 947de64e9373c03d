//! The plugin adapter surface: shape inference, format negotiation,
//! configuration, workspace sizing, serialization and the run entry point.
//!
//! Two variants implement one interface, mirroring the fixed-shape and
//! dynamic-shape dispatch modes of the host runtime: [`BatchedNmsPlugin`]
//! treats the batch dimension as implicit (shapes are per image, the batch
//! bound arrives at configure time), [`BatchedNmsDynamicPlugin`] carries the
//! batch dimension explicitly in every shape.

mod dynamic;
pub mod serialize;
mod static_batch;

pub use dynamic::BatchedNmsDynamicPlugin;
pub use static_batch::BatchedNmsPlugin;

use crate::config::NmsConfig;
use crate::output::DetectionOutputs;
use crate::util::{NmsError, NmsResult};
use crate::workspace::NmsWorkspace;

/// Number of output tensors: count, boxes, scores, classes.
pub const NUM_OUTPUTS: usize = 4;

/// Flat io indices used by format negotiation, inputs first.
pub mod io_index {
    pub const IN_BOXES: usize = 0;
    pub const IN_SCORES: usize = 1;
    pub const OUT_NUM_DETECTIONS: usize = 2;
    pub const OUT_BOXES: usize = 3;
    pub const OUT_SCORES: usize = 4;
    pub const OUT_CLASSES: usize = 5;
}

/// Element type of a tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Float32,
    Float16,
    Int32,
}

/// Memory layout of a tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorFormat {
    /// Dense row-major layout.
    Linear,
    /// Channel-vectorized layouts, not supported by this implementation.
    Vectorized,
}

/// Tensor extents, without element type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorShape {
    pub dims: Vec<usize>,
}

impl TensorShape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self { dims: dims.into() }
    }

    /// Product of all extents.
    pub fn volume(&self) -> usize {
        self.dims.iter().product()
    }
}

impl From<Vec<usize>> for TensorShape {
    fn from(dims: Vec<usize>) -> Self {
        Self { dims }
    }
}

/// Input description handed to `configure`.
///
/// For the implicit-batch variant the shapes are per image and
/// `max_batch_size` carries the batch bound; for the dynamic variant the
/// shapes carry the batch dimension and `max_batch_size` is ignored.
#[derive(Clone, Debug)]
pub struct ConfigureInfo {
    pub boxes_shape: TensorShape,
    pub scores_shape: TensorShape,
    pub max_batch_size: usize,
}

/// The host-dispatch surface both plugin variants implement.
pub trait NmsPlugin {
    /// The effective configuration consumed by the next run.
    fn config(&self) -> &NmsConfig;

    /// Fixes the derived shape scalars from the input shapes. Fails without
    /// creating partial state.
    fn configure(&mut self, info: &ConfigureInfo) -> NmsResult<()>;

    /// Shape of output `index`.
    fn output_shape(&self, index: usize) -> NmsResult<TensorShape>;

    /// Whether the tensor at `io_index` may use the given type and layout.
    fn supports_format(&self, io_index: usize, data_type: DataType, format: TensorFormat) -> bool;

    /// Scratch bytes a run needs, without executing the algorithm.
    fn workspace_size(&self) -> NmsResult<usize>;

    /// Runs batched NMS over the raw input tensors.
    fn enqueue(
        &self,
        batch_size: usize,
        boxes: &[f32],
        scores: &[f32],
        workspace: &mut NmsWorkspace,
        outputs: &mut DetectionOutputs<'_>,
    ) -> NmsResult<()>;
}

/// Format support shared by both variants: everything is dense, inputs and
/// box/score outputs are f32, the detection count is i32.
pub(crate) fn supports_io_format(
    io_index: usize,
    data_type: DataType,
    format: TensorFormat,
) -> bool {
    if format != TensorFormat::Linear {
        return false;
    }
    match io_index {
        io_index::OUT_NUM_DETECTIONS | io_index::OUT_CLASSES => data_type == DataType::Int32,
        io_index::IN_BOXES | io_index::IN_SCORES | io_index::OUT_BOXES | io_index::OUT_SCORES => {
            data_type == DataType::Float32
        }
        _ => false,
    }
}

/// Fallible form of the format check, for hosts that treat a rejected
/// combination as an error rather than a fallback trigger.
pub fn validate_io_format(
    io_index: usize,
    data_type: DataType,
    format: TensorFormat,
) -> NmsResult<()> {
    if supports_io_format(io_index, data_type, format) {
        Ok(())
    } else {
        Err(NmsError::UnsupportedFormat {
            io_index,
            data_type,
            format,
        })
    }
}

/// Validates the tensor layout `configure` received and derives the prior
/// count. `shapes` are per image (batch dimension already stripped).
pub(crate) fn derive_priors(
    config: &NmsConfig,
    boxes_dims: &[usize],
    scores_dims: &[usize],
) -> NmsResult<usize> {
    let loc = config.params.num_loc_classes();
    match *boxes_dims {
        [num_priors, got_loc, 4] if got_loc == loc && num_priors > 0 => {
            let expected_scores = [num_priors, config.params.num_classes];
            if scores_dims != expected_scores.as_slice() {
                return Err(NmsError::ShapeMismatch {
                    context: "scores",
                    expected: expected_scores.to_vec(),
                    got: scores_dims.to_vec(),
                });
            }
            Ok(num_priors)
        }
        _ => Err(NmsError::ShapeMismatch {
            context: "boxes",
            expected: vec![0, loc, 4],
            got: boxes_dims.to_vec(),
        }),
    }
}

/// Run dispatch shared by both variants: parallel over images when the
/// `rayon` feature is enabled, scalar otherwise.
pub(crate) fn run_configured(
    config: &NmsConfig,
    batch_size: usize,
    boxes: &[f32],
    scores: &[f32],
    workspace: &mut NmsWorkspace,
    outputs: &mut DetectionOutputs<'_>,
) -> NmsResult<()> {
    if !config.is_configured() {
        return Err(NmsError::NotConfigured("enqueue needs the input shapes"));
    }
    #[cfg(feature = "rayon")]
    {
        crate::pipeline::rayon::run_batch_par(config, batch_size, boxes, scores, workspace, outputs)
    }
    #[cfg(not(feature = "rayon"))]
    {
        crate::pipeline::run_batch(config, batch_size, boxes, scores, workspace, outputs)
    }
}
