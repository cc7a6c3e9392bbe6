//! # fusestream
//!
//! A batch-pipeline compiler and runner: declarative query operators (select,
//! filter, group, join, take, aggregate, distinct) are lowered into Map /
//! Combine / Reduce stages, adjacent stages are fused into the minimum number
//! of physical jobs, and each job is executed against key-sorted record
//! streams framed with an order-preserving text encoding.
//!
//! ## Features
//!
//! - **Stage Fusion**: merges adjacent pipeline stages into one physical job
//!   whenever no phase reordering occurs, including folding a trailing
//!   map-only stage back into a preceding reduce
//! - **Order-Preserving Keys**: escaped key bytes sort exactly like the
//!   original keys, so external sort-based shuffles can operate on the wire
//!   form directly
//! - **Streaming Groups**: contiguous key groups are rebuilt lazily from the
//!   sorted record stream, one group at a time
//! - **Schema-Driven Records**: structured values are flattened to and from
//!   separator-delimited primitive tokens by a cached schema descriptor
//!
//! ## Quick Start
//!
//! ```rust
//! use fusestream::fusestream::pipeline::execution::types::FieldValue;
//! use fusestream::fusestream::pipeline::lower::{plan, AggregateFunction, Operator};
//!
//! // Lower a filter + aggregate chain and fuse it into physical jobs.
//! let operators = vec![
//!     Operator::filter(|(_, value)| {
//!         Ok(!matches!(value, FieldValue::Null))
//!     }),
//!     Operator::Aggregate(AggregateFunction::Sum),
//! ];
//! let jobs = plan(&operators).expect("lowering failed");
//! assert_eq!(jobs.len(), 1);
//! ```

pub mod fusestream;

// Re-export the primary API at the crate root.
pub use crate::fusestream::pipeline::config::PipelineConfig;
pub use crate::fusestream::pipeline::error::{PipelineError, PipelineResult};
pub use crate::fusestream::pipeline::execution::grouping::{Group, GroupIterator};
pub use crate::fusestream::pipeline::execution::runner::StageRunner;
pub use crate::fusestream::pipeline::execution::types::{FieldValue, Pair};
pub use crate::fusestream::pipeline::fusion::fuse;
pub use crate::fusestream::pipeline::job::{MapReduceJob, Phase, Transform};
pub use crate::fusestream::serialization::schema::{Schema, SchemaRegistry};
pub use crate::fusestream::serialization::text::TextEscaper;
