//! Pipeline error types with proper context preservation
//!
//! All four error kinds are fatal to the current job invocation: nothing is
//! retried internally and partial output is never rolled back. Retries, if
//! any, are an external scheduling concern operating at the granularity of
//! "re-run this physical job on this partition from scratch".
//!
//! A fusion attempt that finds no applicable merge rule is *not* an error;
//! [`MapReduceJob::try_merge`](crate::fusestream::pipeline::job::MapReduceJob::try_merge)
//! reports it as `None`.

use crate::fusestream::pipeline::job::Phase;

/// Error type for job construction, fusion-time validation, codec work and
/// stage execution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// Malformed job or codec construction, e.g. a job with no phase
    /// declared or a separator that cannot be escaped.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The runner was asked to execute a phase the job does not declare.
    #[error("job does not declare the {phase} phase (declared: {declared:?})")]
    UnsupportedPhase {
        /// Phase the caller requested
        phase: Phase,
        /// Phases the job actually declares
        declared: Vec<Phase>,
    },

    /// Malformed or truncated wire data: escape-sequence corruption,
    /// unparseable primitive tokens, or an arity mismatch between the
    /// declared schema and the stream content.
    #[error("codec error: {message}")]
    CodecError { message: String },

    /// A user-supplied map/combine/reduce function failed during execution.
    #[error("transformation failed: {message}")]
    TransformationError { message: String },
}

impl PipelineError {
    /// Helper to create an InvalidConfiguration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        PipelineError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Helper to create an UnsupportedPhase error
    pub fn unsupported_phase(phase: Phase, declared: Vec<Phase>) -> Self {
        PipelineError::UnsupportedPhase { phase, declared }
    }

    /// Helper to create a CodecError
    pub fn codec(message: impl Into<String>) -> Self {
        PipelineError::CodecError {
            message: message.into(),
        }
    }

    /// Helper to create a TransformationError
    pub fn transformation(message: impl Into<String>) -> Self {
        PipelineError::TransformationError {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        // Stream failures surface as truncated or unwritable wire data.
        PipelineError::CodecError {
            message: format!("stream I/O failure: {}", err),
        }
    }
}

/// Convenient result alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
