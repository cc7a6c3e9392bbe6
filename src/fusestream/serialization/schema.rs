//! Schema descriptors for the record codec.
//!
//! A [`Schema`] is the stable, deterministic encode/decode plan for one value
//! shape: derived (or registered) once, cached in a [`SchemaRegistry`], and
//! reused for every record of that shape within a process. Registries are
//! explicit, injectable and thread-confined; they are populated on first use
//! and never invalidated.

use crate::fusestream::pipeline::error::{PipelineError, PipelineResult};
use crate::fusestream::pipeline::execution::types::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Wire-level primitive types, each encoded as one token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Integer,
    Float,
    String,
    Timestamp,
}

/// One named field of a struct schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub schema: Schema,
}

/// Encode/decode plan for one value shape.
///
/// Struct fields carry a fixed order; lists are framed as a count token
/// followed by that many element encodings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Schema {
    Primitive(PrimitiveType),
    Struct(Vec<StructField>),
    List(Box<Schema>),
}

impl Schema {
    pub fn primitive(primitive: PrimitiveType) -> Self {
        Schema::Primitive(primitive)
    }

    /// Derive a schema from a sample value.
    ///
    /// Struct fields are ordered by name so repeated derivations from equal
    /// shapes produce identical plans. Null and empty arrays carry no shape
    /// to derive from and are rejected.
    pub fn of_value(value: &FieldValue) -> PipelineResult<Schema> {
        match value {
            FieldValue::Boolean(_) => Ok(Schema::Primitive(PrimitiveType::Boolean)),
            FieldValue::Integer(_) => Ok(Schema::Primitive(PrimitiveType::Integer)),
            FieldValue::Float(_) => Ok(Schema::Primitive(PrimitiveType::Float)),
            FieldValue::String(_) => Ok(Schema::Primitive(PrimitiveType::String)),
            FieldValue::Timestamp(_) => Ok(Schema::Primitive(PrimitiveType::Timestamp)),
            FieldValue::Array(elements) => {
                let first = elements.first().ok_or_else(|| {
                    PipelineError::invalid_configuration(
                        "cannot derive an element schema from an empty array",
                    )
                })?;
                Ok(Schema::List(Box::new(Schema::of_value(first)?)))
            }
            FieldValue::Struct(fields) => {
                let mut names: Vec<&String> = fields.keys().collect();
                names.sort();
                let mut struct_fields = Vec::with_capacity(names.len());
                for name in names {
                    let field_value = &fields[name];
                    struct_fields.push(StructField {
                        name: name.clone(),
                        schema: Schema::of_value(field_value)?,
                    });
                }
                Ok(Schema::Struct(struct_fields))
            }
            FieldValue::Null => Err(PipelineError::invalid_configuration(
                "cannot derive a schema from a null value",
            )),
        }
    }

    /// Serialize the plan to JSON, the interchange form used when a schema
    /// is shipped to another process instead of derived locally.
    pub fn to_json(&self) -> PipelineResult<String> {
        serde_json::to_string(self).map_err(|e| {
            PipelineError::invalid_configuration(format!("cannot serialize schema: {}", e))
        })
    }

    pub fn from_json(json: &str) -> PipelineResult<Schema> {
        serde_json::from_str(json).map_err(|e| {
            PipelineError::invalid_configuration(format!("malformed schema JSON: {}", e))
        })
    }
}

/// Process-wide cache of schemas keyed by type name.
///
/// Owned by the runtime context rather than ambient static state, matching
/// the crate's single-threaded execution model.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry {
            schemas: HashMap::new(),
        }
    }

    /// Register an explicit schema under a type name, replacing any previous
    /// registration for that name.
    pub fn register(&mut self, type_name: impl Into<String>, schema: Schema) -> Arc<Schema> {
        let type_name = type_name.into();
        let schema = Arc::new(schema);
        self.schemas.insert(type_name, Arc::clone(&schema));
        schema
    }

    /// Look up a previously registered or derived schema.
    pub fn get(&self, type_name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(type_name).cloned()
    }

    /// Return the cached schema for `type_name`, deriving it from `sample`
    /// on first use.
    pub fn derive_or_get(
        &mut self,
        type_name: &str,
        sample: &FieldValue,
    ) -> PipelineResult<Arc<Schema>> {
        if let Some(schema) = self.schemas.get(type_name) {
            return Ok(Arc::clone(schema));
        }
        let derived = Schema::of_value(sample)?;
        log::debug!("derived schema for type '{}': {:?}", type_name, derived);
        Ok(self.register(type_name.to_string(), derived))
    }
}
