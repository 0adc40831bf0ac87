pub mod client;
pub mod consumer;
pub mod memory;
pub mod producer;


pub use client::{
    BrokerConsumer, BrokerMessage, BrokerProducer, DeliveryCallback, DeliveryFailure,
    DeliveryOutcome, Polled,
};
pub use consumer::KafkaConsumer;
pub use memory::{AckMode, MemoryConsumer, MemoryProducer};
pub use producer::KafkaProducer;
