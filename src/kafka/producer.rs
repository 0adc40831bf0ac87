use super::client::{BrokerProducer, DeliveryCallback, DeliveryOutcome};
use crate::{config::KafkaConfig, Error, Result};
use rdkafka::client::ClientContext;
use rdkafka::producer::{BaseProducer, BaseRecord, DeliveryResult, Producer, ProducerContext};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, warn};

/// Routes librdkafka delivery reports to the callback attached to each record.
pub struct DeliveryReporter;

impl ClientContext for DeliveryReporter {}

impl ProducerContext for DeliveryReporter {
    type DeliveryOpaque = Box<DeliveryCallback>;

    fn delivery(&self, result: &DeliveryResult<'_>, on_ack: Self::DeliveryOpaque) {
        let outcome = match result {
            Ok(_) => DeliveryOutcome::Success,
            Err((e, _)) => DeliveryOutcome::failure(e.to_string()),
        };
        (*on_ack)(outcome);
    }
}

pub struct KafkaProducer {
    producer: BaseProducer<DeliveryReporter>,
}

impl KafkaProducer {
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let producer: BaseProducer<DeliveryReporter> = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers())
            .create_with_context(DeliveryReporter)
            .map_err(|e| Error::BrokerConnect(e.to_string()))?;

        debug!(brokers = %config.bootstrap_servers(), "Created Kafka producer");
        Ok(Self { producer })
    }
}

impl BrokerProducer for KafkaProducer {
    fn publish(&self, topic: &str, key: &[u8], value: &[u8], on_ack: DeliveryCallback) -> Result<()> {
        let record = BaseRecord::with_opaque_to(topic, Box::new(on_ack))
            .key(key)
            .payload(value);

        self.producer
            .send(record)
            .map_err(|(e, _)| Error::Kafka(e))
    }

    fn poll(&self, timeout: Duration) {
        self.producer.poll(timeout);
    }

    fn flush(&self, timeout: Duration) -> usize {
        if let Err(e) = self.producer.flush(timeout) {
            warn!("Flush did not complete: {}", e);
        }
        self.producer.in_flight_count().max(0) as usize
    }
}
