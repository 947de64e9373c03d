//! Error types for batched-nms.

use thiserror::Error;

/// Result alias for batched-nms operations.
pub type NmsResult<T> = std::result::Result<T, NmsError>;

/// Errors that can occur when configuring or running batched NMS.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NmsError {
    /// A configuration field has an invalid value or combination.
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfiguration {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
    /// A tensor shape does not match what the configuration expects.
    #[error("invalid shape for {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// A tensor dimension is zero where a positive extent is required.
    #[error("invalid dimensions for {context}: {dims:?}")]
    InvalidDimensions {
        context: &'static str,
        dims: Vec<usize>,
    },
    /// A caller-provided buffer is shorter than the declared shape requires.
    #[error("buffer too small for {context}: needed {needed} elements, got {got}")]
    BufferTooSmall {
        context: &'static str,
        needed: usize,
        got: usize,
    },
    /// The requested data type / layout combination is not supported.
    #[error("unsupported format for tensor {io_index}: {data_type:?} / {format:?}")]
    UnsupportedFormat {
        io_index: usize,
        data_type: crate::plugin::DataType,
        format: crate::plugin::TensorFormat,
    },
    /// A serialized buffer has the wrong length.
    #[error("serialized buffer length mismatch: expected {expected} bytes, got {got}")]
    SerializedLengthMismatch { expected: usize, got: usize },
    /// A serialized buffer holds a value outside its encoding.
    #[error("invalid serialized value at byte offset {offset}")]
    SerializedValueInvalid { offset: usize },
    /// An output index outside the plugin's output range was requested.
    #[error("output index out of range: {index} (plugin has {count} outputs)")]
    OutputIndexOutOfRange { index: usize, count: usize },
    /// A query or run was issued before `configure` fixed the input shapes.
    #[error("plugin is not configured: {0}")]
    NotConfigured(&'static str),
    /// The runtime batch exceeds the batch the plugin was configured for.
    #[error("batch size {got} exceeds configured maximum {max}")]
    BatchTooLarge { got: usize, max: usize },
    /// The caller-provided workspace does not match the configured layout.
    #[error("workspace mismatch: run needs {needed} bytes, workspace holds {got}")]
    WorkspaceMismatch { needed: usize, got: usize },
}
