// Pipeline module for fusestream
// Job model, fusion engine, operator lowering and stage execution

pub mod config;
pub mod error;
pub mod execution;
pub mod fusion;
pub mod job;
pub mod lower;

// Re-export main API
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use execution::runner::StageRunner;
pub use fusion::fuse;
pub use job::{MapReduceJob, Phase, Transform};
pub use lower::{plan, AggregateFunction, Operator};
