//! Wire serialization for fusestream
//!
//! Two layers: the order-preserving text codec that escapes individual key
//! and value tokens, and the schema-driven record codec that flattens
//! structured values into token sequences and back.

pub mod record;
pub mod schema;
pub mod text;

pub use record::RecordCodec;
pub use schema::{PrimitiveType, Schema, SchemaRegistry, StructField};
pub use text::{TextDecoder, TextEncoder, TextEscaper, TokenRole, DEFAULT_SEPARATOR};
