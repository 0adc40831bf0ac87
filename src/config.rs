use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub kafka: KafkaConfig,
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub enable_auto_commit: bool,
    pub session_timeout_ms: u32,
    pub auto_offset_reset: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// How long to drive the client event loop right after publishing.
    pub poll_timeout_ms: u64,
    /// Upper bound on the blocking flush.
    pub flush_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub poll_timeout_ms: u64,
    pub on_decode_error: DecodeErrorPolicy,
}

/// What the consumer loop does when a record's key or value cannot be decoded.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecodeErrorPolicy {
    /// Propagate the error and stop the loop.
    #[default]
    Stop,
    /// Log the error, count the record as skipped and keep polling.
    Skip,
}

impl Config {
    /// Loads configuration from an optional file layered under `AVRO_KAFKA_*`
    /// environment variables. Every field has a default, so both sources may
    /// be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("AVRO_KAFKA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }
}

impl KafkaConfig {
    /// The `bootstrap.servers` value handed to the client.
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

impl ProducerConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

impl ConsumerConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            enable_auto_commit: true,
            session_timeout_ms: default_session_timeout_ms(),
            auto_offset_reset: default_auto_offset_reset(),
        }
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_producer_poll_ms(),
            flush_timeout_ms: default_flush_timeout_ms(),
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_consumer_poll_ms(),
            on_decode_error: DecodeErrorPolicy::default(),
        }
    }
}

fn default_brokers() -> Vec<String> {
    vec!["localhost:9092".to_string()]
}

fn default_session_timeout_ms() -> u32 {
    6000
}

fn default_auto_offset_reset() -> String {
    "smallest".to_string()
}

fn default_producer_poll_ms() -> u64 {
    500
}

fn default_flush_timeout_ms() -> u64 {
    30_000
}

fn default_consumer_poll_ms() -> u64 {
    100
}
