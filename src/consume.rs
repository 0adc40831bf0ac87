//! Consumer path: subscribe, poll, decode, emit, until cancelled.

use crate::codec::{self, LogicalValue};
use crate::config::{Config, ConsumerConfig, DecodeErrorPolicy};
use crate::kafka::{BrokerConsumer, BrokerMessage, KafkaConsumer, Polled};
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Subscribed,
    Polling,
    Stopped,
}

/// A record with its key and value decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: Option<DateTime<Utc>>,
    pub key: LogicalValue,
    pub value: LogicalValue,
}

/// What one iteration of the loop saw.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Nothing arrived within the poll timeout.
    Idle,
    Record(ConsumedRecord),
    /// The broker reported an error; the loop carries on.
    BrokerError(String),
    /// A record could not be decoded and was dropped under
    /// [`DecodeErrorPolicy::Skip`].
    Skipped(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    pub consumed: u64,
    pub broker_errors: u64,
    pub skipped: u64,
}

/// Owns a subscribed broker client for its whole lifetime and releases it
/// when stopped or dropped.
pub struct RecordConsumer<C: BrokerConsumer> {
    client: C,
    topic: String,
    poll_timeout: Duration,
    on_decode_error: DecodeErrorPolicy,
    state: ConsumerState,
    stats: ConsumeStats,
}

impl<C: BrokerConsumer> RecordConsumer<C> {
    /// Subscribes `client` to `topic`. The client is closed if the
    /// subscription fails.
    pub fn subscribe(mut client: C, topic: &str, config: &ConsumerConfig) -> Result<Self> {
        if let Err(e) = client.subscribe(&[topic]) {
            error!(topic = %topic, "Failed to subscribe: {}", e);
            client.close();
            return Err(e);
        }

        info!(topic = %topic, "Subscribed");
        Ok(Self {
            client,
            topic: topic.to_string(),
            poll_timeout: config.poll_timeout(),
            on_decode_error: config.on_decode_error,
            state: ConsumerState::Subscribed,
            stats: ConsumeStats::default(),
        })
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn stats(&self) -> ConsumeStats {
        self.stats
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs one poll iteration.
    ///
    /// # Errors
    ///
    /// Returns the decode error of a record under [`DecodeErrorPolicy::Stop`].
    /// The consumer stays open; [`run`](Self::run) is what stops it.
    pub fn poll_once(&mut self) -> Result<PollEvent> {
        if self.state == ConsumerState::Stopped {
            return Ok(PollEvent::Idle);
        }
        self.state = ConsumerState::Polling;

        let message = match self.client.poll(self.poll_timeout) {
            None => return Ok(PollEvent::Idle),
            Some(Polled::Error(reason)) => {
                error!(topic = %self.topic, "Failed to consume: {}", reason);
                self.stats.broker_errors += 1;
                return Ok(PollEvent::BrokerError(reason));
            }
            Some(Polled::Message(message)) => message,
        };

        match decode_message(message) {
            Ok(record) => {
                self.stats.consumed += 1;
                Ok(PollEvent::Record(record))
            }
            Err(e) => match self.on_decode_error {
                DecodeErrorPolicy::Stop => Err(e),
                DecodeErrorPolicy::Skip => {
                    warn!(topic = %self.topic, "Skipping undecodable record: {}", e);
                    self.stats.skipped += 1;
                    Ok(PollEvent::Skipped(e.to_string()))
                }
            },
        }
    }

    /// Polls until `token` is cancelled, handing every decoded record to
    /// `sink`. The client is closed on return, whatever the outcome.
    pub fn run<F>(&mut self, token: &CancellationToken, mut sink: F) -> Result<ConsumeStats>
    where
        F: FnMut(ConsumedRecord),
    {
        let result = self.poll_until_cancelled(token, &mut sink);
        if let Err(e) = &result {
            error!(topic = %self.topic, "Consumer loop stopped: {}", e);
        }
        self.close();
        result.map(|()| self.stats)
    }

    fn poll_until_cancelled<F>(&mut self, token: &CancellationToken, sink: &mut F) -> Result<()>
    where
        F: FnMut(ConsumedRecord),
    {
        while !token.is_cancelled() {
            if let PollEvent::Record(record) = self.poll_once()? {
                sink(record);
            }
        }
        debug!(topic = %self.topic, "Cancellation requested");
        Ok(())
    }

    /// Releases the client. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.state != ConsumerState::Stopped {
            self.client.close();
            self.state = ConsumerState::Stopped;
            info!(
                topic = %self.topic,
                consumed = self.stats.consumed,
                broker_errors = self.stats.broker_errors,
                skipped = self.stats.skipped,
                "Consumer stopped"
            );
        }
    }
}

impl<C: BrokerConsumer> Drop for RecordConsumer<C> {
    fn drop(&mut self) {
        self.close();
    }
}

fn decode_message(message: BrokerMessage) -> Result<ConsumedRecord> {
    let context = format!(
        "{}[{}]@{}",
        message.topic, message.partition, message.offset
    );
    let key_bytes = message
        .key
        .ok_or_else(|| Error::MalformedContainer(format!("{context}: record has no key")))?;
    let value_bytes = message
        .payload
        .ok_or_else(|| Error::MalformedContainer(format!("{context}: record has no value")))?;

    debug!(
        "Consumed not deserialized: {}: {}",
        BASE64.encode(&key_bytes),
        BASE64.encode(&value_bytes)
    );

    let key = codec::decode(&key_bytes).map_err(|e| with_context(e, &context, "key"))?;
    let value = codec::decode(&value_bytes).map_err(|e| with_context(e, &context, "value"))?;

    Ok(ConsumedRecord {
        topic: message.topic,
        partition: message.partition,
        offset: message.offset,
        timestamp: message.timestamp,
        key,
        value,
    })
}

fn with_context(e: Error, context: &str, part: &str) -> Error {
    match e {
        Error::MalformedContainer(msg) => {
            Error::MalformedContainer(format!("{context} {part}: {msg}"))
        }
        Error::TruncatedData(msg) => Error::TruncatedData(format!("{context} {part}: {msg}")),
        other => other,
    }
}

/// Connects to the configured brokers and consumes `topic` until `token` is
/// cancelled.
pub fn consume(
    config: &Config,
    topic: &str,
    group_id: &str,
    client_id: &str,
    token: &CancellationToken,
) -> Result<ConsumeStats> {
    let client = KafkaConsumer::new(&config.kafka, group_id, client_id)?;
    let mut consumer = RecordConsumer::subscribe(client, topic, &config.consumer)?;
    consumer.run(token, |record| {
        info!(
            partition = record.partition,
            offset = record.offset,
            "Consumed: {}: {}",
            record.key,
            record.value
        );
    })
}
