use super::*;
use crate::Error;
use apache_avro::types::Value;
use apache_avro::Writer;
use serde_json::json;

const NAME_SCHEMA: &str =
    r#"{"type":"record","name":"R","fields":[{"name":"name","type":"string"}]}"#;

fn parse(text: &str) -> Schema {
    SchemaSource::Literal(text.to_string()).load().unwrap()
}

#[test]
fn test_record_round_trip() {
    let schema = parse(NAME_SCHEMA);
    let value = json!({"name": "a"});

    let encoded = encode(&schema, &value).unwrap();
    assert!(encoded.as_bytes().starts_with(CONTAINER_MAGIC));
    assert_eq!(decode(encoded.as_bytes()).unwrap(), value);
}

#[test]
fn test_string_key_round_trip() {
    let schema = SchemaSource::default_key().load().unwrap();
    let key = json!("0b6f5a5e-3d4c-4b0a-9d8e-2f1a7c6b5e4d");

    let encoded = encode(&schema, &key).unwrap();
    assert_eq!(decode(encoded.as_bytes()).unwrap(), key);
}

#[test]
fn test_nested_round_trip() {
    let schema = parse(
        r#"{
            "type": "record",
            "name": "Order",
            "namespace": "shop",
            "fields": [
                {"name": "id", "type": "long"},
                {"name": "amount", "type": "double"},
                {"name": "paid", "type": "boolean"},
                {"name": "note", "type": ["null", "string"]},
                {"name": "status", "type": {"type": "enum", "name": "Status", "symbols": ["NEW", "DONE"]}},
                {"name": "tags", "type": {"type": "array", "items": "string"}},
                {"name": "attrs", "type": {"type": "map", "values": "int"}},
                {"name": "customer", "type": {
                    "type": "record",
                    "name": "Customer",
                    "fields": [{"name": "email", "type": "string"}]
                }}
            ]
        }"#,
    );
    let value = json!({
        "id": 9_000_000_000i64,
        "amount": 12.75,
        "paid": true,
        "note": null,
        "status": "DONE",
        "tags": ["a", "b"],
        "attrs": {"x": 1, "y": -2},
        "customer": {"email": "user@example.com"}
    });

    let encoded = encode(&schema, &value).unwrap();
    assert_eq!(decode(encoded.as_bytes()).unwrap(), value);
}

#[test]
fn test_recursive_named_type_round_trip() {
    let schema = parse(
        r#"{
            "type": "record",
            "name": "Node",
            "fields": [
                {"name": "value", "type": "int"},
                {"name": "next", "type": ["null", "Node"]}
            ]
        }"#,
    );
    let value = json!({"value": 1, "next": {"value": 2, "next": null}});

    let encoded = encode(&schema, &value).unwrap();
    assert_eq!(decode(encoded.as_bytes()).unwrap(), value);
}

#[test]
fn test_floating_fields_round_trip_numerically() {
    let schema = parse(
        r#"{"type":"record","name":"M","fields":[
            {"name":"d","type":"double"},
            {"name":"f","type":"float"}
        ]}"#,
    );
    let value = json!({"d": 5, "f": 2});

    let decoded = decode(encode(&schema, &value).unwrap().as_bytes()).unwrap();
    // Floating fields always come back in floating form.
    assert_eq!(decoded, json!({"d": 5.0, "f": 2.0}));
    assert_eq!(decoded["d"].as_f64(), value["d"].as_f64());
    assert_eq!(decoded["f"].as_f64(), value["f"].as_f64());
}

#[test]
fn test_out_of_range_float_is_rejected() {
    let err = encode(&parse(r#""float""#), &json!(1e40)).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }), "got {err}");
}

#[test]
fn test_decode_needs_no_schema() {
    let encoded = encode(&parse(NAME_SCHEMA), &json!({"name": "b"})).unwrap();

    // Only the bytes travel; the header carries the schema.
    let copy = encoded.as_bytes().to_vec();
    assert_eq!(inspect(&copy).unwrap(), parse(NAME_SCHEMA));
    assert_eq!(decode(&copy).unwrap(), json!({"name": "b"}));
}

#[test]
fn test_mismatch_rejected() {
    let schema = parse(r#"{"type":"record","name":"R","fields":[{"name":"x","type":"int"}]}"#);

    let err = encode(&schema, &json!({"x": "not-an-int"})).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { ref path, .. } if path == "$.x"));

    let err = encode(&schema, &json!("flat string")).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));

    let err = encode(&schema, &json!({})).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));
}

#[test]
fn test_primitive_mismatch_rejected() {
    let err = encode(&Schema::String, &json!({"name": "a"})).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));
}

#[test]
fn test_only_first_record_is_returned() {
    let schema = parse(NAME_SCHEMA);
    let mut writer = Writer::new(&schema, Vec::new());
    writer
        .append(Value::Record(vec![(
            "name".to_string(),
            Value::String("first".to_string()),
        )]))
        .unwrap();
    writer
        .append(Value::Record(vec![(
            "name".to_string(),
            Value::String("second".to_string()),
        )]))
        .unwrap();
    let bytes = writer.into_inner().unwrap();

    assert_eq!(decode(&bytes).unwrap(), json!({"name": "first"}));
}

#[test]
fn test_not_a_container_is_malformed() {
    let err = decode(b"definitely not avro").unwrap_err();
    assert!(matches!(err, Error::MalformedContainer(_)));

    let err = decode(b"x").unwrap_err();
    assert!(matches!(err, Error::MalformedContainer(_)));
}

#[test]
fn test_unparseable_embedded_schema_is_malformed() {
    let mut bytes = CONTAINER_MAGIC.to_vec();
    bytes.push(0x02); // one metadata entry
    bytes.push(22); // key length 11
    bytes.extend_from_slice(b"avro.schema");
    bytes.push(8); // value length 4
    bytes.extend_from_slice(b"nope");
    bytes.push(0x00); // end of metadata
    bytes.extend_from_slice(&[0u8; 16]);

    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, Error::MalformedContainer(_)), "got {err}");
}

#[test]
fn test_short_input_is_truncated() {
    let err = decode(b"Ob").unwrap_err();
    assert!(matches!(err, Error::TruncatedData(_)));

    let encoded = encode(&parse(NAME_SCHEMA), &json!({"name": "a"})).unwrap();
    let bytes = encoded.as_bytes();

    // Cut inside the header metadata.
    let err = decode(&bytes[..20]).unwrap_err();
    assert!(matches!(err, Error::TruncatedData(_)), "got {err}");
}

#[test]
fn test_cut_record_block_is_truncated() {
    let long_name = "n".repeat(200);
    let encoded = encode(&parse(NAME_SCHEMA), &json!({ "name": long_name })).unwrap();
    let bytes = encoded.as_bytes();

    // Drop the trailing sync marker and part of the datum.
    let err = decode(&bytes[..bytes.len() - 60]).unwrap_err();
    assert!(matches!(err, Error::TruncatedData(_)), "got {err}");
}

#[test]
fn test_header_without_records_is_truncated() {
    let schema = parse(NAME_SCHEMA);
    let writer = Writer::new(&schema, Vec::new());
    let header_only = writer.into_inner().unwrap();

    let err = decode(&header_only).unwrap_err();
    assert!(matches!(err, Error::TruncatedData(_)), "got {err}");
}

#[test]
fn test_each_encode_is_a_fresh_container() {
    let schema = parse(NAME_SCHEMA);
    let value = json!({"name": "a"});

    let first = encode(&schema, &value).unwrap();
    let second = encode(&schema, &value).unwrap();

    // Sync markers are random per container.
    assert_ne!(first, second);
    assert_eq!(decode(first.as_bytes()).unwrap(), decode(second.as_bytes()).unwrap());
}
