//! Error types and result handling for avro-kafka.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! # Example
//!
//! ```rust
//! use avro_kafka::{Error, Result};
//!
//! fn check_container(bytes: &[u8]) -> Result<()> {
//!     if bytes.len() < 4 {
//!         return Err(Error::TruncatedData("missing container magic".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! match check_container(b"Ob") {
//!     Ok(()) => println!("looks fine"),
//!     Err(Error::TruncatedData(msg)) => eprintln!("truncated: {}", msg),
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for avro-kafka operations.
///
/// Schema and container errors are fatal to the record (or invocation) that
/// raised them. Per-record broker errors are reported through
/// [`DeliveryOutcome`](crate::kafka::DeliveryOutcome) on the producer side and
/// logged by the consumer loop; they only show up here when a caller asks for
/// them explicitly.
#[derive(Error, Debug)]
pub enum Error {
    /// A schema literal or schema file could not be read or parsed.
    #[error("Schema parse error ({source_desc}): {reason}")]
    SchemaParse {
        /// Where the schema came from (`literal` or the file path)
        source_desc: String,
        /// Underlying I/O or parser message
        reason: String,
    },

    /// A value does not conform to the schema it is encoded against.
    #[error("Value does not match schema at {path}: {message}")]
    SchemaMismatch {
        /// JSON-path style location of the offending value, e.g. `$.x`
        path: String,
        /// What was expected versus what was found
        message: String,
    },

    /// The bytes are not an Avro object container, or its header is unusable.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// The container ends before the data its header announces.
    #[error("Truncated container data: {0}")]
    TruncatedData(String),

    /// The encoder could not finalize its output buffer.
    #[error("Container write fault: {0}")]
    IoFault(String),

    /// No configured broker could be reached, or the client could not be set up.
    #[error("Broker connection error: {0}")]
    BrokerConnect(String),

    /// The broker reported a failure for a single message.
    #[error("Broker delivery error: {0}")]
    BrokerDelivery(String),

    /// Kafka client error not covered by a more specific variant.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Configuration error from the config file or environment.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value given on the command line is not valid JSON.
    #[error("Invalid value: {0}")]
    InvalidValue(#[from] serde_json::Error),

    /// I/O error outside the codec.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking worker task panicked or was aborted.
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn mismatch(path: &str, message: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

/// A convenient Result type alias for avro-kafka operations.
///
/// This is equivalent to `std::result::Result<T, avro_kafka::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
