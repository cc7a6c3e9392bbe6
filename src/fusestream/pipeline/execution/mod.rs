//! Stage execution internals
//!
//! This module contains the pieces the stage runner drives:
//! - record value types shared by every transformation slot
//! - lazy group reconstruction for combine/reduce input
//! - the runner itself

pub mod grouping;
pub mod runner;
pub mod types;

pub use grouping::{Group, GroupIterator};
pub use runner::StageRunner;
pub use types::{FieldValue, Pair};
