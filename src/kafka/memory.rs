//! In-memory broker client used to drive the producer and consumer paths
//! without a running Kafka cluster.

use super::client::{
    BrokerConsumer, BrokerMessage, BrokerProducer, DeliveryCallback, DeliveryOutcome, Polled,
};
use crate::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How the fake broker answers published records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AckMode {
    /// Acknowledge on the next poll or flush.
    #[default]
    Ack,
    /// Report the given error on the next poll or flush.
    Fail(String),
    /// Never answer, as if the broker were unreachable.
    Silent,
    /// Refuse the record at publish time.
    Reject(String),
}

struct Pending {
    callback: DeliveryCallback,
}

#[derive(Default)]
struct ProducerState {
    published: Vec<BrokerMessage>,
    pending: Vec<Pending>,
    polls: usize,
    flushes: usize,
}

/// Producer half of the fake broker. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryProducer {
    mode: AckMode,
    state: Arc<Mutex<ProducerState>>,
}

impl MemoryProducer {
    pub fn new(mode: AckMode) -> Self {
        Self {
            mode,
            state: Arc::default(),
        }
    }

    /// Records published so far, in publish order.
    pub fn published(&self) -> Vec<BrokerMessage> {
        self.lock().published.clone()
    }

    /// Number of (poll, flush) calls served.
    pub fn calls(&self) -> (usize, usize) {
        let state = self.lock();
        (state.polls, state.flushes)
    }

    fn lock(&self) -> MutexGuard<'_, ProducerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer_pending(&self) -> usize {
        let pending = {
            let mut state = self.lock();
            match self.mode {
                AckMode::Silent => return state.pending.len(),
                _ => std::mem::take(&mut state.pending),
            }
        };

        for entry in pending {
            let outcome = match &self.mode {
                AckMode::Fail(reason) => DeliveryOutcome::failure(reason.clone()),
                _ => DeliveryOutcome::Success,
            };
            (entry.callback)(outcome);
        }
        0
    }
}

impl BrokerProducer for MemoryProducer {
    fn publish(&self, topic: &str, key: &[u8], value: &[u8], on_ack: DeliveryCallback) -> Result<()> {
        if let AckMode::Reject(reason) = &self.mode {
            return Err(Error::BrokerDelivery(reason.clone()));
        }

        let mut state = self.lock();
        let offset = state.published.len() as i64;
        state.published.push(
            BrokerMessage::new(topic, Some(key.to_vec()), Some(value.to_vec())).at(0, offset),
        );
        state.pending.push(Pending { callback: on_ack });
        Ok(())
    }

    fn poll(&self, _timeout: Duration) {
        self.lock().polls += 1;
        self.answer_pending();
    }

    fn flush(&self, _timeout: Duration) -> usize {
        self.lock().flushes += 1;
        self.answer_pending()
    }
}

#[derive(Default)]
struct ConsumerState {
    script: VecDeque<Option<Polled>>,
    subscriptions: Vec<String>,
    polls: usize,
    closed: bool,
    close_calls: usize,
}

/// Consumer half of the fake broker: replays a scripted sequence of poll
/// results, then idles. Clones share state so tests can inspect it after the
/// consumer has been moved into a loop.
#[derive(Clone, Default)]
pub struct MemoryConsumer {
    state: Arc<Mutex<ConsumerState>>,
    cancel_when_drained: Option<CancellationToken>,
    fail_subscribe: bool,
}

impl MemoryConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a delivered record.
    pub fn push_message(&self, message: BrokerMessage) -> &Self {
        self.lock().script.push_back(Some(Polled::Message(message)));
        self
    }

    /// Queues a broker-reported error.
    pub fn push_error(&self, reason: impl Into<String>) -> &Self {
        self.lock().script.push_back(Some(Polled::Error(reason.into())));
        self
    }

    /// Queues an empty poll.
    pub fn push_idle(&self) -> &Self {
        self.lock().script.push_back(None);
        self
    }

    /// Cancels `token` on the first poll after the script runs out.
    pub fn cancel_when_drained(mut self, token: CancellationToken) -> Self {
        self.cancel_when_drained = Some(token);
        self
    }

    /// Makes `subscribe` fail as if no broker were reachable.
    pub fn unreachable(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.lock().subscriptions.clone()
    }

    pub fn polls(&self) -> usize {
        self.lock().polls
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, ConsumerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BrokerConsumer for MemoryConsumer {
    fn subscribe(&mut self, topics: &[&str]) -> Result<()> {
        if self.fail_subscribe {
            return Err(Error::BrokerConnect(
                "no configured broker is reachable".to_string(),
            ));
        }
        self.lock()
            .subscriptions
            .extend(topics.iter().map(|t| t.to_string()));
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Option<Polled> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        state.polls += 1;
        match state.script.pop_front() {
            Some(next) => next,
            None => {
                if let Some(token) = &self.cancel_when_drained {
                    token.cancel();
                }
                None
            }
        }
    }

    fn close(&mut self) {
        let mut state = self.lock();
        state.close_calls += 1;
        state.closed = true;
    }
}
