pub mod codec;
pub mod config;
pub mod consume;
pub mod error;
pub mod produce;

pub mod kafka;

pub use config::Config;
pub use consume::{ConsumeStats, ConsumedRecord, ConsumerState, RecordConsumer};
pub use error::{Error, Result};
pub use produce::{ProduceRequest, RecordProducer};
