use super::client::{BrokerConsumer, BrokerMessage, Polled};
use crate::{config::KafkaConfig, Error, Result};
use chrono::DateTime;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::{ClientConfig, Message};
use std::time::Duration;
use tracing::{debug, info};

pub struct KafkaConsumer {
    consumer: Option<BaseConsumer>,
}

impl KafkaConsumer {
    pub fn new(config: &KafkaConfig, group_id: &str, client_id: &str) -> Result<Self> {
        let consumer: BaseConsumer = client_config(config, group_id, client_id)
            .create()
            .map_err(|e| Error::BrokerConnect(e.to_string()))?;

        debug!(
            brokers = %config.bootstrap_servers(),
            group_id = %group_id,
            client_id = %client_id,
            "Created Kafka consumer"
        );
        Ok(Self {
            consumer: Some(consumer),
        })
    }
}

pub(crate) fn client_config(config: &KafkaConfig, group_id: &str, client_id: &str) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", config.bootstrap_servers())
        .set("group.id", group_id)
        .set("client.id", client_id)
        .set("enable.auto.commit", config.enable_auto_commit.to_string())
        .set("session.timeout.ms", config.session_timeout_ms.to_string())
        .set("auto.offset.reset", &config.auto_offset_reset);
    client
}

impl BrokerConsumer for KafkaConsumer {
    fn subscribe(&mut self, topics: &[&str]) -> Result<()> {
        let consumer = self
            .consumer
            .as_ref()
            .ok_or_else(|| Error::BrokerConnect("consumer already closed".to_string()))?;

        consumer
            .subscribe(topics)
            .map_err(|e| Error::BrokerConnect(e.to_string()))
    }

    fn poll(&mut self, timeout: Duration) -> Option<Polled> {
        let consumer = self.consumer.as_ref()?;

        match consumer.poll(timeout)? {
            Ok(msg) => Some(Polled::Message(BrokerMessage {
                topic: msg.topic().to_string(),
                partition: msg.partition(),
                offset: msg.offset(),
                key: msg.key().map(<[u8]>::to_vec),
                payload: msg.payload().map(<[u8]>::to_vec),
                timestamp: msg
                    .timestamp()
                    .to_millis()
                    .and_then(DateTime::from_timestamp_millis),
            })),
            Err(e) => Some(Polled::Error(e.to_string())),
        }
    }

    fn close(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.unsubscribe();
            // Dropping the handle leaves the group and closes the connection.
            drop(consumer);
            info!("Kafka consumer closed");
        }
    }
}

impl Drop for KafkaConsumer {
    fn drop(&mut self) {
        self.close();
    }
}
