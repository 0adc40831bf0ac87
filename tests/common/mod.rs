#![allow(dead_code)]

use avro_kafka::codec::{self, Schema, SchemaSource};
use avro_kafka::config::{Config, KafkaConfig};
use avro_kafka::kafka::BrokerMessage;
use serde_json::Value;
use std::env;

pub const NAME_SCHEMA: &str =
    r#"{"type":"record","name":"R","fields":[{"name":"name","type":"string"}]}"#;

/// Get test configuration from environment variables
pub fn get_test_config() -> Config {
    let kafka = KafkaConfig {
        brokers: env::var("TEST_KAFKA_BROKERS")
            .unwrap_or_else(|_| "localhost:9092".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect(),
        ..KafkaConfig::default()
    };

    Config {
        kafka,
        ..Config::default()
    }
}

pub fn name_schema() -> Schema {
    SchemaSource::Literal(NAME_SCHEMA.to_string()).load().unwrap()
}

/// A broker message whose key and value are both encoded containers.
pub fn encoded_message(topic: &str, offset: i64, key: &str, value: &Value) -> BrokerMessage {
    let key = codec::encode(&Schema::String, &Value::String(key.to_string())).unwrap();
    let value = codec::encode(&name_schema(), value).unwrap();
    BrokerMessage::new(topic, Some(key.into()), Some(value.into())).at(0, offset)
}

pub fn unique_topic(prefix: &str) -> String {
    format!("{}_{}_{}", prefix, std::process::id(), uuid::Uuid::new_v4().simple())
}
