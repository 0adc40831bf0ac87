//! Producer path: encode key and value, publish once, wait for the broker's
//! answer within bounded time.

use crate::codec::{self, LogicalValue, Schema};
use crate::config::{Config, ProducerConfig};
use crate::kafka::{BrokerProducer, DeliveryFailure, DeliveryOutcome, KafkaProducer};
use crate::Result;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// One record to publish.
#[derive(Debug, Clone)]
pub struct ProduceRequest {
    pub topic: String,
    /// Defaults to a freshly generated UUID string.
    pub key: Option<LogicalValue>,
    pub value: LogicalValue,
    /// Defaults to the bare string schema.
    pub key_schema: Option<Schema>,
    pub value_schema: Schema,
}

impl ProduceRequest {
    pub fn new(topic: impl Into<String>, value_schema: Schema, value: LogicalValue) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            value,
            key_schema: None,
            value_schema,
        }
    }

    pub fn with_key(mut self, key: LogicalValue) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_key_schema(mut self, schema: Schema) -> Self {
        self.key_schema = Some(schema);
        self
    }
}

/// A fresh random key, used when the caller supplies none.
pub fn generate_key() -> LogicalValue {
    LogicalValue::String(uuid::Uuid::new_v4().to_string())
}

/// Publishes records through a [`BrokerProducer`], one attempt each.
pub struct RecordProducer<P> {
    client: P,
    poll_timeout: Duration,
    flush_timeout: Duration,
}

impl<P: BrokerProducer> RecordProducer<P> {
    pub fn new(client: P, config: &ProducerConfig) -> Self {
        Self {
            client,
            poll_timeout: config.poll_timeout(),
            flush_timeout: config.flush_timeout(),
        }
    }

    /// Encodes, publishes and waits for the delivery report of one record.
    ///
    /// Nothing is published unless both key and value encode. The returned
    /// outcome comes from the delivery callback; if the callback has not
    /// fired once the flush bound elapses the outcome is
    /// `Failure(Timeout)`. Failures are logged and never retried.
    ///
    /// # Errors
    ///
    /// Returns `Err` for encoding failures and for records the client
    /// refuses to queue. Broker-side delivery failures are not errors; they
    /// come back as [`DeliveryOutcome::Failure`].
    #[instrument(skip_all, fields(topic = %request.topic))]
    pub fn produce(&self, request: ProduceRequest) -> Result<DeliveryOutcome> {
        let key_schema = request.key_schema.unwrap_or(Schema::String);
        let key = request.key.unwrap_or_else(generate_key);

        info!("Producing: {}: {}", key, request.value);

        let key_bytes = codec::encode(&key_schema, &key)?;
        let value_bytes = codec::encode(&request.value_schema, &request.value)?;

        let slot: Arc<Mutex<Option<DeliveryOutcome>>> = Arc::default();
        let on_ack = {
            let slot = Arc::clone(&slot);
            let topic = request.topic.clone();
            let key = key.to_string();
            let value = request.value.to_string();
            Box::new(move |outcome: DeliveryOutcome| {
                match &outcome {
                    DeliveryOutcome::Failure(reason) => {
                        error!(topic = %topic, "Failed to produce: {}: {}, {}", key, value, reason)
                    }
                    DeliveryOutcome::Success => {
                        debug!(topic = %topic, "Produced: {}: {}", key, value)
                    }
                }
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
            })
        };

        self.client.publish(
            &request.topic,
            key_bytes.as_bytes(),
            value_bytes.as_bytes(),
            on_ack,
        )?;

        self.client.poll(self.poll_timeout);
        let unanswered = self.client.flush(self.flush_timeout);

        let reported = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        let outcome = match reported {
            Some(outcome) => outcome,
            None => {
                warn!(
                    topic = %request.topic,
                    unanswered,
                    timeout_ms = self.flush_timeout.as_millis() as u64,
                    "Delivery not acknowledged before flush timeout: {}: {}",
                    key,
                    request.value
                );
                DeliveryOutcome::Failure(DeliveryFailure::Timeout)
            }
        };

        Ok(outcome)
    }

    pub fn client(&self) -> &P {
        &self.client
    }
}

/// Connects to the configured brokers and publishes `request`.
pub fn produce(config: &Config, request: ProduceRequest) -> Result<DeliveryOutcome> {
    let client = KafkaProducer::new(&config.kafka)?;
    RecordProducer::new(client, &config.producer).produce(request)
}
