//! The broker capabilities the producer and consumer paths rely on.

use crate::Result;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Result of publishing one record, as reported by the delivery callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    Failure(DeliveryFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The broker rejected the record; carries the broker's description.
    Broker(String),
    /// The flush bound elapsed before the broker acknowledged the record.
    Timeout,
}

impl DeliveryOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        DeliveryOutcome::Failure(DeliveryFailure::Broker(reason.into()))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Success => write!(f, "delivered"),
            DeliveryOutcome::Failure(DeliveryFailure::Broker(reason)) => {
                write!(f, "failed: {reason}")
            }
            DeliveryOutcome::Failure(failure) => write!(f, "unknown: {failure}"),
        }
    }
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryFailure::Broker(reason) => f.write_str(reason),
            DeliveryFailure::Timeout => {
                write!(f, "not acknowledged before the flush timeout")
            }
        }
    }
}

/// Invoked once per published record with its outcome.
pub type DeliveryCallback = Box<dyn FnOnce(DeliveryOutcome) + Send + Sync + 'static>;

/// A record as handed over by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl BrokerMessage {
    pub fn new(topic: impl Into<String>, key: Option<Vec<u8>>, payload: Option<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            partition: 0,
            offset: 0,
            key,
            payload,
            timestamp: None,
        }
    }

    pub fn at(mut self, partition: i32, offset: i64) -> Self {
        self.partition = partition;
        self.offset = offset;
        self
    }
}

/// What a single poll produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled {
    Message(BrokerMessage),
    /// The broker reported an error in place of a message.
    Error(String),
}

/// Publishing side of a broker client.
pub trait BrokerProducer {
    /// Queues one record. `on_ack` fires from within [`poll`](Self::poll) or
    /// [`flush`](Self::flush) once the broker answers.
    fn publish(&self, topic: &str, key: &[u8], value: &[u8], on_ack: DeliveryCallback) -> Result<()>;

    /// Serves queued delivery callbacks for up to `timeout`.
    fn poll(&self, timeout: Duration);

    /// Blocks until every queued record is answered or `timeout` elapses.
    /// Returns the number of records still unanswered.
    fn flush(&self, timeout: Duration) -> usize;
}

/// Consuming side of a broker client.
pub trait BrokerConsumer {
    fn subscribe(&mut self, topics: &[&str]) -> Result<()>;

    /// Waits up to `timeout` for the next record. `None` means nothing arrived.
    fn poll(&mut self, timeout: Duration) -> Option<Polled>;

    /// Leaves the group and releases the connection. Safe to call twice.
    fn close(&mut self);
}
