//! Conversion between [`LogicalValue`](super::LogicalValue) (JSON) and Avro
//! datum values.
//!
//! Encoding is strict: every mismatch is reported with the JSON path of the
//! offending value. Decoding is total, since the datum was already validated
//! by whoever wrote it.

use crate::{Error, Result};
use apache_avro::schema::{Name, Schema};
use apache_avro::types::Value;
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;

/// Named types a schema defines, used to resolve `Schema::Ref`.
pub(crate) type NamedTypes<'s> = HashMap<Name, &'s Schema>;

pub(crate) fn json_to_avro(
    value: &JsonValue,
    schema: &Schema,
    names: &NamedTypes<'_>,
    path: &str,
) -> Result<Value> {
    match (schema, value) {
        (Schema::Null, JsonValue::Null) => Ok(Value::Null),
        (Schema::Boolean, JsonValue::Bool(b)) => Ok(Value::Boolean(*b)),
        (Schema::Int, JsonValue::Number(n)) => int_of(n, path).map(Value::Int),
        (Schema::Long, JsonValue::Number(n)) => long_of(n, path).map(Value::Long),
        (Schema::Float, JsonValue::Number(n)) => float32_of(n, path).map(Value::Float),
        (Schema::Double, JsonValue::Number(n)) => float_of(n, path).map(Value::Double),
        (Schema::String, JsonValue::String(s)) => Ok(Value::String(s.clone())),
        (Schema::Bytes, JsonValue::String(s)) => latin1_bytes(s, path).map(Value::Bytes),
        (Schema::Fixed(fixed), JsonValue::String(s)) => {
            let bytes = latin1_bytes(s, path)?;
            if bytes.len() != fixed.size {
                return Err(Error::mismatch(
                    path,
                    format!("fixed of size {} got {} bytes", fixed.size, bytes.len()),
                ));
            }
            Ok(Value::Fixed(fixed.size, bytes))
        }
        (Schema::Enum(enum_schema), JsonValue::String(s)) => {
            match enum_schema.symbols.iter().position(|sym| sym == s) {
                Some(index) => Ok(Value::Enum(index as u32, s.clone())),
                None => Err(Error::mismatch(
                    path,
                    format!("'{}' is not one of {:?}", s, enum_schema.symbols),
                )),
            }
        }
        (Schema::Uuid, JsonValue::String(s)) => uuid::Uuid::parse_str(s)
            .map(Value::Uuid)
            .map_err(|e| Error::mismatch(path, format!("invalid uuid: {e}"))),
        (Schema::Date, JsonValue::Number(n)) => int_of(n, path).map(Value::Date),
        (Schema::TimeMillis, JsonValue::Number(n)) => int_of(n, path).map(Value::TimeMillis),
        (Schema::TimeMicros, JsonValue::Number(n)) => long_of(n, path).map(Value::TimeMicros),
        (Schema::TimestampMillis, JsonValue::Number(n)) => {
            long_of(n, path).map(Value::TimestampMillis)
        }
        (Schema::TimestampMicros, JsonValue::Number(n)) => {
            long_of(n, path).map(Value::TimestampMicros)
        }
        (Schema::TimestampNanos, JsonValue::Number(n)) => {
            long_of(n, path).map(Value::TimestampNanos)
        }
        (Schema::LocalTimestampMillis, JsonValue::Number(n)) => {
            long_of(n, path).map(Value::LocalTimestampMillis)
        }
        (Schema::LocalTimestampMicros, JsonValue::Number(n)) => {
            long_of(n, path).map(Value::LocalTimestampMicros)
        }
        (Schema::LocalTimestampNanos, JsonValue::Number(n)) => {
            long_of(n, path).map(Value::LocalTimestampNanos)
        }
        (Schema::Array(array), JsonValue::Array(items)) => {
            let avro_items = items
                .iter()
                .enumerate()
                .map(|(i, item)| json_to_avro(item, &array.items, names, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(avro_items))
        }
        (Schema::Map(map), JsonValue::Object(entries)) => {
            let mut avro_entries = HashMap::with_capacity(entries.len());
            for (key, item) in entries {
                let avro_item = json_to_avro(item, &map.types, names, &format!("{path}.{key}"))?;
                avro_entries.insert(key.clone(), avro_item);
            }
            Ok(Value::Map(avro_entries))
        }
        (Schema::Record(record), JsonValue::Object(entries)) => {
            if let Some(unknown) = entries
                .keys()
                .find(|key| !record.fields.iter().any(|f| &f.name == *key))
            {
                return Err(Error::mismatch(
                    path,
                    format!("field '{}' is not declared by record {}", unknown, record.name),
                ));
            }

            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                let field_path = format!("{path}.{}", field.name);
                let field_value = match (entries.get(&field.name), &field.default) {
                    (Some(v), _) => json_to_avro(v, &field.schema, names, &field_path)?,
                    (None, Some(default)) => {
                        json_to_avro(default, &field.schema, names, &field_path)?
                    }
                    (None, None) => {
                        return Err(Error::mismatch(&field_path, "required field is missing"));
                    }
                };
                fields.push((field.name.clone(), field_value));
            }
            Ok(Value::Record(fields))
        }
        (Schema::Union(union), value) => {
            for (index, variant) in union.variants().iter().enumerate() {
                if let Ok(v) = json_to_avro(value, variant, names, path) {
                    return Ok(Value::Union(index as u32, Box::new(v)));
                }
            }
            Err(Error::mismatch(
                path,
                format!("no union branch accepts {}", describe(value)),
            ))
        }
        (Schema::Ref { name }, value) => match names.get(name) {
            Some(resolved) => json_to_avro(value, resolved, names, path),
            None => Err(Error::mismatch(path, format!("unknown named type {name}"))),
        },
        (Schema::Decimal(_) | Schema::BigDecimal | Schema::Duration, _) => Err(Error::mismatch(
            path,
            "decimal and duration types cannot be written from JSON values",
        )),
        (schema, value) => Err(Error::mismatch(
            path,
            format!("expected {}, got {}", schema_kind(schema), describe(value)),
        )),
    }
}

pub(crate) fn avro_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => JsonValue::from(*i),
        Value::Long(l)
        | Value::TimeMicros(l)
        | Value::TimestampMillis(l)
        | Value::TimestampMicros(l)
        | Value::TimestampNanos(l)
        | Value::LocalTimestampMillis(l)
        | Value::LocalTimestampMicros(l)
        | Value::LocalTimestampNanos(l) => JsonValue::from(*l),
        // Going through the shortest decimal form keeps 0.1f32 as 0.1.
        Value::Float(f) => f
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or(JsonValue::Null, JsonValue::Number),
        Value::Double(d) => Number::from_f64(*d).map_or(JsonValue::Null, JsonValue::Number),
        Value::Bytes(b) | Value::Fixed(_, b) => JsonValue::String(latin1_string(b)),
        Value::String(s) | Value::Enum(_, s) => JsonValue::String(s.clone()),
        Value::Uuid(u) => JsonValue::String(u.to_string()),
        Value::Union(_, inner) => avro_to_json(inner),
        Value::Array(items) => JsonValue::Array(items.iter().map(avro_to_json).collect()),
        Value::Map(entries) => JsonValue::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), avro_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Record(fields) => JsonValue::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), avro_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Decimal(d) => {
            let bytes: Vec<u8> = d.try_into().unwrap_or_default();
            JsonValue::String(latin1_string(&bytes))
        }
        Value::BigDecimal(d) => JsonValue::String(d.to_string()),
        Value::Duration(_) => JsonValue::Null,
    }
}

fn int_of(n: &Number, path: &str) -> Result<i32> {
    n.as_i64()
        .and_then(|i| i32::try_from(i).ok())
        .ok_or_else(|| Error::mismatch(path, format!("{n} is not a 32-bit integer")))
}

fn long_of(n: &Number, path: &str) -> Result<i64> {
    n.as_i64()
        .ok_or_else(|| Error::mismatch(path, format!("{n} is not a 64-bit integer")))
}

fn float_of(n: &Number, path: &str) -> Result<f64> {
    n.as_f64()
        .ok_or_else(|| Error::mismatch(path, format!("{n} is not representable as a float")))
}

fn float32_of(n: &Number, path: &str) -> Result<f32> {
    let narrowed = float_of(n, path)? as f32;
    if !narrowed.is_finite() {
        return Err(Error::mismatch(path, format!("{n} is out of range for float")));
    }
    Ok(narrowed)
}

/// Avro's JSON convention for bytes: one char per byte, code points 0-255.
fn latin1_bytes(s: &str, path: &str) -> Result<Vec<u8>> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| Error::mismatch(path, "bytes string holds a char above U+00FF"))
}

fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn describe(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => format!("boolean {b}"),
        JsonValue::Number(n) => format!("number {n}"),
        JsonValue::String(s) => format!("string \"{s}\""),
        JsonValue::Array(_) => "array".to_string(),
        JsonValue::Object(_) => "object".to_string(),
    }
}

fn schema_kind(schema: &Schema) -> String {
    match schema {
        Schema::Record(record) => format!("record {}", record.name),
        Schema::Enum(e) => format!("enum {}", e.name),
        Schema::Fixed(f) => format!("fixed {}", f.name),
        other => format!("{:?}", apache_avro::schema::SchemaKind::from(other)).to_lowercase(),
    }
}
