// Batch pipeline compiler and runner for fusestream
// Lowers query operators to Map/Combine/Reduce jobs and executes them

pub mod pipeline;
pub mod serialization;

// Version and feature info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const FEATURES: &[&str] = &[
    "stage_fusion",        // sequential phase-range merge + map-after-reduce pushback
    "order_preserving_keys", // escaped keys sort identically to their originals
    "streaming_groups",    // lazy contiguous-key group reconstruction
    "schema_records",      // schema-driven primitive token framing
    "operator_lowering",   // select, filter, group, join, take, aggregate, distinct
];
