mod common;

use avro_kafka::codec::{self, SchemaSource};
use avro_kafka::config::{ConsumerConfig, ProducerConfig};
use avro_kafka::kafka::{AckMode, DeliveryOutcome, MemoryConsumer, MemoryProducer};
use avro_kafka::{ConsumerState, ProduceRequest, RecordConsumer, RecordProducer};
use common::{name_schema, NAME_SCHEMA};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

#[test]
fn test_produced_record_is_consumed_back() {
    let broker = MemoryProducer::new(AckMode::Ack);
    let producer = RecordProducer::new(broker.clone(), &ProducerConfig::default());

    let outcome = producer
        .produce(ProduceRequest::new("t1", name_schema(), json!({"name": "a"})))
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::Success);

    let token = CancellationToken::new();
    let source = MemoryConsumer::new().cancel_when_drained(token.clone());
    for message in broker.published() {
        source.push_message(message);
    }

    let mut consumer =
        RecordConsumer::subscribe(source.clone(), "t1", &ConsumerConfig::default()).unwrap();
    let mut received = Vec::new();
    let stats = consumer.run(&token, |record| received.push(record)).unwrap();

    assert_eq!(stats.consumed, 1);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].topic, "t1");
    assert_eq!(received[0].value, json!({"name": "a"}));
    assert!(received[0].key.is_string());
    assert_eq!(consumer.state(), ConsumerState::Stopped);
    assert!(source.is_closed());
}

#[test]
fn test_schema_file_drives_encoding() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(NAME_SCHEMA.as_bytes()).unwrap();

    let schema = SchemaSource::FilePath(file.path().to_path_buf()).load().unwrap();
    let broker = MemoryProducer::new(AckMode::Ack);
    let producer = RecordProducer::new(broker.clone(), &ProducerConfig::default());

    producer
        .produce(
            ProduceRequest::new("t1", schema, json!({"name": "from-file"}))
                .with_key(json!("k-1")),
        )
        .unwrap();

    let published = broker.published();
    let key = codec::decode(published[0].key.as_deref().unwrap()).unwrap();
    let value = codec::decode(published[0].payload.as_deref().unwrap()).unwrap();
    assert_eq!(key, json!("k-1"));
    assert_eq!(value, json!({"name": "from-file"}));
}

#[test]
fn test_records_are_emitted_in_poll_order() {
    let token = CancellationToken::new();
    let source = MemoryConsumer::new().cancel_when_drained(token.clone());
    for (offset, name) in ["first", "second", "third"].iter().enumerate() {
        source.push_message(common::encoded_message(
            "t1",
            offset as i64,
            name,
            &json!({ "name": name }),
        ));
        source.push_idle();
    }

    let mut consumer =
        RecordConsumer::subscribe(source, "t1", &ConsumerConfig::default()).unwrap();
    let mut offsets = Vec::new();
    let mut names = Vec::new();
    consumer
        .run(&token, |record| {
            offsets.push(record.offset);
            names.push(record.value["name"].as_str().unwrap().to_string());
        })
        .unwrap();

    assert_eq!(offsets, vec![0, 1, 2]);
    assert_eq!(names, vec!["first", "second", "third"]);
}
