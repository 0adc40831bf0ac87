//! Avro object container codec for single records.
//!
//! [`encode`] writes a container carrying the schema text plus exactly one
//! record; [`decode`] reads the schema back out of the header and returns the
//! first record. Neither side needs anything but the bytes.

mod container;
mod convert;
pub mod schema;

#[cfg(test)]
mod tests;

pub use apache_avro::Schema;
pub use container::{decode, encode, inspect, EncodedRecord, CONTAINER_MAGIC};
pub use schema::{is_string_like, SchemaSource, DEFAULT_KEY_SCHEMA};

/// Application-side value encoded into, or decoded from, a container.
pub type LogicalValue = serde_json::Value;
