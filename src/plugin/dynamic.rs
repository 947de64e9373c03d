//! Explicit-batch plugin variant.
//!
//! Every shape carries the batch dimension in front; `configure` receives
//! the maximum shapes the plugin must support and the runtime batch of each
//! `enqueue` may be anything up to that bound.

use crate::config::{NmsConfig, NmsParameters};
use crate::output::DetectionOutputs;
use crate::plugin::{
    derive_priors, run_configured, serialize, supports_io_format, ConfigureInfo, DataType,
    NmsPlugin, TensorFormat, TensorShape,
};
use crate::util::{NmsError, NmsResult};
use crate::workspace::{NmsWorkspace, WorkspaceLayout};

/// Batched NMS over explicit-batch shapes.
#[derive(Clone, Debug)]
pub struct BatchedNmsDynamicPlugin {
    config: NmsConfig,
    max_batch: usize,
}

impl BatchedNmsDynamicPlugin {
    /// Creates a plugin from a parameter block, validating eagerly.
    pub fn new(params: NmsParameters) -> NmsResult<Self> {
        Ok(Self {
            config: NmsConfig::new(params)?,
            max_batch: 0,
        })
    }

    /// Creates a plugin from a full, validated configuration.
    pub fn from_config(config: NmsConfig) -> NmsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            max_batch: 0,
        })
    }

    /// Restores a plugin from its serialized configuration.
    pub fn deserialize(data: &[u8]) -> NmsResult<Self> {
        Ok(Self {
            config: serialize::decode(data)?,
            max_batch: 0,
        })
    }

    /// Serializes the configuration and derived scalars.
    pub fn serialize(&self) -> Vec<u8> {
        serialize::encode(&self.config)
    }

    /// Replaces the effective clipping flag for subsequent runs.
    pub fn set_clip_param(&mut self, clip: bool) {
        self.config = self.config.with_clip_boxes(clip);
    }

    /// Replaces the effective score quantization width for subsequent runs.
    pub fn set_score_bits(&mut self, score_bits: u32) -> NmsResult<()> {
        self.config = self.config.with_score_bits(score_bits)?;
        Ok(())
    }

    /// Replaces the effective extent convention for subsequent runs.
    pub fn set_caffe_semantics(&mut self, caffe_semantics: bool) {
        self.config = self.config.with_caffe_semantics(caffe_semantics);
    }

    /// Allocates a workspace matching this plugin's configured batch bound.
    pub fn create_workspace(&self) -> NmsResult<NmsWorkspace> {
        if self.max_batch == 0 {
            return Err(NmsError::NotConfigured(
                "workspace allocation needs the configured shapes",
            ));
        }
        NmsWorkspace::for_config(&self.config, self.max_batch)
    }
}

impl NmsPlugin for BatchedNmsDynamicPlugin {
    fn config(&self) -> &NmsConfig {
        &self.config
    }

    fn configure(&mut self, info: &ConfigureInfo) -> NmsResult<()> {
        let (batch, boxes_dims) = match info.boxes_shape.dims.split_first() {
            Some((&batch, rest)) if batch > 0 => (batch, rest),
            _ => {
                return Err(NmsError::InvalidDimensions {
                    context: "boxes",
                    dims: info.boxes_shape.dims.clone(),
                })
            }
        };
        let scores_dims = match info.scores_shape.dims.split_first() {
            Some((&scores_batch, rest)) if scores_batch == batch => rest,
            _ => {
                return Err(NmsError::ShapeMismatch {
                    context: "scores",
                    expected: info.boxes_shape.dims[..1].to_vec(),
                    got: info.scores_shape.dims.clone(),
                })
            }
        };
        let num_priors = derive_priors(&self.config, boxes_dims, scores_dims)?;
        self.config = self.config.with_input_shape(num_priors)?;
        self.max_batch = batch;
        Ok(())
    }

    fn output_shape(&self, index: usize) -> NmsResult<TensorShape> {
        if self.max_batch == 0 {
            return Err(NmsError::NotConfigured(
                "output shapes need the configured batch dimension",
            ));
        }
        let batch = self.max_batch;
        let keep = self.config.params.keep_top_k;
        match index {
            0 => Ok(TensorShape::new(vec![batch, 1])),
            1 => Ok(TensorShape::new(vec![batch, keep, 4])),
            2 | 3 => Ok(TensorShape::new(vec![batch, keep])),
            _ => Err(NmsError::OutputIndexOutOfRange {
                index,
                count: super::NUM_OUTPUTS,
            }),
        }
    }

    fn supports_format(&self, io_index: usize, data_type: DataType, format: TensorFormat) -> bool {
        supports_io_format(io_index, data_type, format)
    }

    fn workspace_size(&self) -> NmsResult<usize> {
        if self.max_batch == 0 {
            return Err(NmsError::NotConfigured(
                "workspace query needs the configured shapes",
            ));
        }
        Ok(WorkspaceLayout::from_config(&self.config, self.max_batch)?.byte_size())
    }

    fn enqueue(
        &self,
        batch_size: usize,
        boxes: &[f32],
        scores: &[f32],
        workspace: &mut NmsWorkspace,
        outputs: &mut DetectionOutputs<'_>,
    ) -> NmsResult<()> {
        if self.max_batch > 0 && batch_size > self.max_batch {
            return Err(NmsError::BatchTooLarge {
                got: batch_size,
                max: self.max_batch,
            });
        }
        run_configured(&self.config, batch_size, boxes, scores, workspace, outputs)
    }
}
