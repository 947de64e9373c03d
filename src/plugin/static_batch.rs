//! Implicit-batch plugin variant.
//!
//! Shapes exclude the batch dimension; the batch bound arrives with
//! `configure` and the runtime batch is passed to `enqueue`.

use crate::config::{NmsConfig, NmsParameters};
use crate::output::DetectionOutputs;
use crate::plugin::{
    derive_priors, run_configured, serialize, supports_io_format, ConfigureInfo, DataType,
    NmsPlugin, TensorFormat, TensorShape,
};
use crate::util::{NmsError, NmsResult};
use crate::workspace::{NmsWorkspace, WorkspaceLayout};

/// Batched NMS over fixed, per-image shapes.
#[derive(Clone, Debug)]
pub struct BatchedNmsPlugin {
    config: NmsConfig,
    max_batch: usize,
}

impl BatchedNmsPlugin {
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

    /// Scratch bytes needed for a run of up to `max_batch` images, mirroring
    /// the host query that passes the batch bound explicitly.
    pub fn workspace_size_for_batch(&self, max_batch: usize) -> NmsResult<usize> {
        Ok(WorkspaceLayout::from_config(&self.config, max_batch)?.byte_size())
    }

    /// Allocates a workspace matching this plugin's configuration.
    pub fn create_workspace(&self, max_batch: usize) -> NmsResult<NmsWorkspace> {
        NmsWorkspace::for_config(&self.config, max_batch)
    }
}

impl NmsPlugin for BatchedNmsPlugin {
    fn config(&self) -> &NmsConfig {
        &self.config
    }

    fn configure(&mut self, info: &ConfigureInfo) -> NmsResult<()> {
        if info.max_batch_size == 0 {
            return Err(NmsError::InvalidDimensions {
                context: "max_batch",
                dims: vec![0],
            });
        }
        let num_priors = derive_priors(
            &self.config,
            &info.boxes_shape.dims,
            &info.scores_shape.dims,
        )?;
        // Only commit once the whole combination validates.
        self.config = self.config.with_input_shape(num_priors)?;
        self.max_batch = info.max_batch_size;
        Ok(())
    }

    fn output_shape(&self, index: usize) -> NmsResult<TensorShape> {
        let keep = self.config.params.keep_top_k;
        match index {
            0 => Ok(TensorShape::new(vec![1])),
            1 => Ok(TensorShape::new(vec![keep, 4])),
            2 | 3 => Ok(TensorShape::new(vec![keep])),
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
                "workspace query needs the batch bound from configure",
            ));
        }
        self.workspace_size_for_batch(self.max_batch)
    }

    fn enqueue(
        &self,
        batch_size: usize,
        boxes: &[f32],
        scores: &[f32],
        workspace: &mut NmsWorkspace,
        outputs: &mut DetectionOutputs<'_>,
    ) -> NmsResult<()> {
        run_configured(&self.config, batch_size, boxes, scores, workspace, outputs)
    }
}
