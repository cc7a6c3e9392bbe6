//! Schema-driven record codec.
//!
//! A record on the wire is one line: the key's primitive tokens, then the
//! value's primitive tokens, all separated by the configured separator and
//! terminated by a newline. The decoder walks the declared schemas and
//! consumes exactly the tokens they dictate; a shortfall or leftover token is
//! an arity mismatch between schema and stream, reported as a codec error.
//!
//! Collection fields are framed as an integer count token followed by that
//! many repetitions of the element encoding, with no separators beyond those
//! inherent in the elements themselves.

use crate::fusestream::pipeline::error::{PipelineError, PipelineResult};
use crate::fusestream::pipeline::execution::types::{FieldValue, Pair};
use crate::fusestream::serialization::schema::{PrimitiveType, Schema};
use crate::fusestream::serialization::text::{
    Terminator, TextDecoder, TextEncoder, TextEscaper, TokenRole,
};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::io::{BufRead, Write};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Encodes and decodes key/value pairs against a fixed schema plan.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    key_schema: Schema,
    value_schema: Schema,
}

impl RecordCodec {
    pub fn new(key_schema: Schema, value_schema: Schema) -> Self {
        RecordCodec {
            key_schema,
            value_schema,
        }
    }

    pub fn key_schema(&self) -> &Schema {
        &self.key_schema
    }

    pub fn value_schema(&self) -> &Schema {
        &self.value_schema
    }

    /// Decode the next record, or `None` on clean end of input.
    pub fn read_pair<R: BufRead>(
        &self,
        decoder: &mut TextDecoder<R>,
    ) -> PipelineResult<Option<Pair>> {
        let tokens = match read_record_tokens(decoder)? {
            Some(tokens) => tokens,
            None => return Ok(None),
        };

        let escaper = decoder.escaper().clone();
        let mut cursor = tokens.iter();
        let key = decode_node(&self.key_schema, &mut cursor, TokenRole::Key, &escaper)?;
        let value = decode_node(&self.value_schema, &mut cursor, TokenRole::Value, &escaper)?;
        if cursor.next().is_some() {
            return Err(PipelineError::codec(format!(
                "record carries more fields than its schema declares ({} tokens)",
                tokens.len()
            )));
        }
        Ok(Some((key, value)))
    }

    /// Encode one record: key tokens, value tokens, newline.
    pub fn write_pair<W: Write>(
        &self,
        encoder: &mut TextEncoder<W>,
        pair: &Pair,
    ) -> PipelineResult<()> {
        let mut tokens: Vec<(String, TokenRole)> = Vec::new();
        encode_node(&self.key_schema, &pair.0, TokenRole::Key, &mut tokens)?;
        encode_node(&self.value_schema, &pair.1, TokenRole::Value, &mut tokens)?;

        for (i, (token, role)) in tokens.iter().enumerate() {
            if i > 0 {
                encoder.write_separator()?;
            }
            encoder.write_token(token, *role)?;
        }
        encoder.end_record()
    }
}

/// Pull all raw tokens of the next record (one line). A record ends at the
/// first newline- or EOF-terminated token; end of input after a separator
/// reads as one final empty token, matching a read-until-delimiter decoder.
fn read_record_tokens<R: BufRead>(
    decoder: &mut TextDecoder<R>,
) -> PipelineResult<Option<Vec<String>>> {
    let mut tokens = Vec::new();
    loop {
        match decoder.read_token(TokenRole::Raw)? {
            None => {
                if tokens.is_empty() {
                    return Ok(None);
                }
                tokens.push(String::new());
                return Ok(Some(tokens));
            }
            Some((token, Terminator::Separator)) => tokens.push(token),
            Some((token, _)) => {
                tokens.push(token);
                return Ok(Some(tokens));
            }
        }
    }
}

fn unescape(raw: &str, role: TokenRole, escaper: &TextEscaper) -> String {
    match role {
        TokenRole::Key => escaper.unescape_key(raw),
        TokenRole::Value => escaper.unescape_value(raw),
        TokenRole::Raw => raw.to_string(),
    }
}

fn next_token<'a>(
    cursor: &mut std::slice::Iter<'a, String>,
    wanted: &str,
) -> PipelineResult<&'a String> {
    cursor.next().ok_or_else(|| {
        PipelineError::codec(format!(
            "record ended before its schema was satisfied (expected {})",
            wanted
        ))
    })
}

fn decode_node(
    schema: &Schema,
    cursor: &mut std::slice::Iter<'_, String>,
    role: TokenRole,
    escaper: &TextEscaper,
) -> PipelineResult<FieldValue> {
    match schema {
        Schema::Primitive(primitive) => {
            let raw = next_token(cursor, "a primitive field")?;
            decode_primitive(*primitive, &unescape(raw, role, escaper))
        }
        Schema::Struct(fields) => {
            let mut decoded = HashMap::with_capacity(fields.len());
            for field in fields {
                let value = decode_node(&field.schema, cursor, role, escaper)?;
                decoded.insert(field.name.clone(), value);
            }
            Ok(FieldValue::Struct(decoded))
        }
        Schema::List(element) => {
            let raw = next_token(cursor, "a collection count")?;
            let count: usize = unescape(raw, role, escaper).parse().map_err(|_| {
                PipelineError::codec(format!("malformed collection count '{}'", raw))
            })?;
            let mut elements = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                elements.push(decode_node(element, cursor, role, escaper)?);
            }
            Ok(FieldValue::Array(elements))
        }
    }
}

fn decode_primitive(primitive: PrimitiveType, raw: &str) -> PipelineResult<FieldValue> {
    match primitive {
        PrimitiveType::Boolean => match raw {
            "true" => Ok(FieldValue::Boolean(true)),
            "false" => Ok(FieldValue::Boolean(false)),
            _ => Err(PipelineError::codec(format!(
                "malformed boolean token '{}'",
                raw
            ))),
        },
        PrimitiveType::Integer => raw
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| PipelineError::codec(format!("malformed integer token '{}'", raw))),
        PrimitiveType::Float => raw
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| PipelineError::codec(format!("malformed float token '{}'", raw))),
        PrimitiveType::String => Ok(FieldValue::String(raw.to_string())),
        PrimitiveType::Timestamp => NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .map(FieldValue::Timestamp)
            .map_err(|_| PipelineError::codec(format!("malformed timestamp token '{}'", raw))),
    }
}

fn encode_node(
    schema: &Schema,
    value: &FieldValue,
    role: TokenRole,
    tokens: &mut Vec<(String, TokenRole)>,
) -> PipelineResult<()> {
    match (schema, value) {
        (Schema::Primitive(primitive), _) => {
            tokens.push((encode_primitive(*primitive, value)?, role));
            Ok(())
        }
        (Schema::Struct(fields), FieldValue::Struct(map)) => {
            for field in fields {
                let field_value = map.get(&field.name).ok_or_else(|| {
                    PipelineError::codec(format!(
                        "value is missing declared field '{}'",
                        field.name
                    ))
                })?;
                encode_node(&field.schema, field_value, role, tokens)?;
            }
            Ok(())
        }
        (Schema::List(element), FieldValue::Array(elements)) => {
            tokens.push((elements.len().to_string(), role));
            for item in elements {
                encode_node(element, item, role, tokens)?;
            }
            Ok(())
        }
        (schema, value) => Err(PipelineError::codec(format!(
            "value of type {} does not match declared schema {:?}",
            value.type_name(),
            schema
        ))),
    }
}

fn encode_primitive(primitive: PrimitiveType, value: &FieldValue) -> PipelineResult<String> {
    match (primitive, value) {
        (PrimitiveType::Boolean, FieldValue::Boolean(b)) => Ok(b.to_string()),
        (PrimitiveType::Integer, FieldValue::Integer(i)) => Ok(i.to_string()),
        (PrimitiveType::Float, FieldValue::Float(f)) => Ok(f.to_string()),
        (PrimitiveType::String, FieldValue::String(s)) => Ok(s.clone()),
        (PrimitiveType::Timestamp, FieldValue::Timestamp(t)) => {
            Ok(t.format(TIMESTAMP_FORMAT).to_string())
        }
        (primitive, value) => Err(PipelineError::codec(format!(
            "value of type {} does not match declared primitive {:?}",
            value.type_name(),
            primitive
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusestream::serialization::schema::StructField;

    fn codec(key: Schema, value: Schema) -> RecordCodec {
        RecordCodec::new(key, value)
    }

    fn round_trip(codec: &RecordCodec, pair: Pair) -> Pair {
        let mut wire = Vec::new();
        let mut encoder = TextEncoder::new(&mut wire, TextEscaper::default());
        codec.write_pair(&mut encoder, &pair).expect("encode");
        encoder.flush().expect("flush");

        let mut decoder = TextDecoder::new(wire.as_slice(), TextEscaper::default());
        codec
            .read_pair(&mut decoder)
            .expect("decode")
            .expect("one record")
    }

    #[test]
    fn scalar_pair_round_trips() {
        let codec = codec(
            Schema::Primitive(PrimitiveType::String),
            Schema::Primitive(PrimitiveType::Integer),
        );
        let pair = (
            FieldValue::String("with\tseparator".to_string()),
            FieldValue::Integer(-42),
        );
        assert_eq!(round_trip(&codec, pair.clone()), pair);
    }

    #[test]
    fn list_value_is_count_prefixed() {
        let codec = codec(
            Schema::Primitive(PrimitiveType::String),
            Schema::List(Box::new(Schema::Primitive(PrimitiveType::Integer))),
        );
        let pair = (
            FieldValue::String("k".to_string()),
            FieldValue::Array(vec![FieldValue::Integer(1), FieldValue::Integer(2)]),
        );

        let mut wire = Vec::new();
        let mut encoder = TextEncoder::new(&mut wire, TextEscaper::default());
        codec.write_pair(&mut encoder, &pair).expect("encode");
        assert_eq!(String::from_utf8(wire).expect("utf8"), "k\t2\t1\t2\n");
    }

    #[test]
    fn struct_fields_follow_schema_order() {
        let schema = Schema::Struct(vec![
            StructField {
                name: "id".to_string(),
                schema: Schema::Primitive(PrimitiveType::Integer),
            },
            StructField {
                name: "name".to_string(),
                schema: Schema::Primitive(PrimitiveType::String),
            },
        ]);
        let codec = codec(Schema::Primitive(PrimitiveType::String), schema);
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), FieldValue::Integer(7));
        fields.insert("name".to_string(), FieldValue::String("ada".to_string()));
        let pair = (
            FieldValue::String("k".to_string()),
            FieldValue::Struct(fields),
        );
        assert_eq!(round_trip(&codec, pair.clone()), pair);
    }

    #[test]
    fn missing_field_token_is_an_arity_error() {
        let codec = codec(
            Schema::Primitive(PrimitiveType::String),
            Schema::Primitive(PrimitiveType::Integer),
        );
        let mut decoder = TextDecoder::new("lonely-key\n".as_bytes(), TextEscaper::default());
        let result = codec.read_pair(&mut decoder);
        assert!(matches!(result, Err(PipelineError::CodecError { .. })));
    }

    #[test]
    fn trailing_token_is_an_arity_error() {
        let codec = codec(
            Schema::Primitive(PrimitiveType::String),
            Schema::Primitive(PrimitiveType::Integer),
        );
        let mut decoder = TextDecoder::new("k\t1\textra\n".as_bytes(), TextEscaper::default());
        let result = codec.read_pair(&mut decoder);
        assert!(matches!(result, Err(PipelineError::CodecError { .. })));
    }

    #[test]
    fn malformed_integer_is_a_codec_error() {
        let codec = codec(
            Schema::Primitive(PrimitiveType::String),
            Schema::Primitive(PrimitiveType::Integer),
        );
        let mut decoder = TextDecoder::new("k\tnot-a-number\n".as_bytes(), TextEscaper::default());
        let result = codec.read_pair(&mut decoder);
        assert!(matches!(result, Err(PipelineError::CodecError { .. })));
    }
}
