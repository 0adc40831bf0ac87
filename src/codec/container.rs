use super::convert::{avro_to_json, json_to_avro, NamedTypes};
use super::LogicalValue;
use crate::{Error, Result};
use apache_avro::schema::ResolvedSchema;
use apache_avro::{Reader, Schema, Writer};
use bytes::Bytes;
use std::error::Error as StdError;
use std::io;
use tracing::trace;

/// Magic bytes opening every Avro object container.
pub const CONTAINER_MAGIC: &[u8; 4] = b"Obj\x01";

/// One Avro object container holding exactly one record, with the writer
/// schema embedded in its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord(Bytes);

impl EncodedRecord {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl AsRef<[u8]> for EncodedRecord {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<EncodedRecord> for Vec<u8> {
    fn from(record: EncodedRecord) -> Self {
        record.0.to_vec()
    }
}

/// Encodes `value` as a single-record container.
///
/// # Errors
///
/// - [`Error::SchemaMismatch`] when `value` does not conform to `schema`
/// - [`Error::IoFault`] when the container cannot be finalized
pub fn encode(schema: &Schema, value: &LogicalValue) -> Result<EncodedRecord> {
    let resolved = ResolvedSchema::try_from(schema)
        .map_err(|e| Error::mismatch("$", format!("schema names do not resolve: {e}")))?;
    let names: NamedTypes<'_> = resolved
        .get_names()
        .iter()
        .map(|(name, schema)| (name.clone(), *schema))
        .collect();

    let datum = json_to_avro(value, schema, &names, "$")?;

    let mut writer = Writer::new(schema, Vec::new());
    writer
        .append(datum)
        .map_err(|e| Error::mismatch("$", e.to_string()))?;
    let buf = writer
        .into_inner()
        .map_err(|e| Error::IoFault(e.to_string()))?;

    trace!(bytes = buf.len(), "Encoded container");
    Ok(EncodedRecord(Bytes::from(buf)))
}

/// Decodes the first record of a container using the schema in its header.
///
/// Any further records in the container are ignored.
///
/// # Errors
///
/// - [`Error::MalformedContainer`] when the header is missing or invalid
/// - [`Error::TruncatedData`] when the bytes stop before the first record
///   is complete
pub fn decode(bytes: &[u8]) -> Result<LogicalValue> {
    let mut reader = open(bytes)?;

    match reader.next() {
        Some(Ok(value)) => Ok(avro_to_json(&value)),
        Some(Err(e)) => Err(classify(e, "reading first record")),
        None => Err(Error::TruncatedData(
            "no record block follows the container header".to_string(),
        )),
    }
}

/// Returns the writer schema embedded in a container without reading records.
pub fn inspect(bytes: &[u8]) -> Result<Schema> {
    open(bytes).map(|reader| reader.writer_schema().clone())
}

fn open(bytes: &[u8]) -> Result<Reader<'_, &[u8]>> {
    if bytes.len() < CONTAINER_MAGIC.len() {
        if CONTAINER_MAGIC.starts_with(bytes) {
            return Err(Error::TruncatedData(format!(
                "{} bytes is shorter than the container magic",
                bytes.len()
            )));
        }
        return Err(Error::MalformedContainer(
            "bytes do not start with the container magic".to_string(),
        ));
    }
    if !bytes.starts_with(CONTAINER_MAGIC) {
        return Err(Error::MalformedContainer(
            "bytes do not start with the container magic".to_string(),
        ));
    }

    Reader::new(bytes).map_err(|e| classify(e, "reading container header"))
}

/// Short reads surface as an `UnexpectedEof` somewhere in the error chain;
/// everything else is a structurally bad container.
fn classify(e: apache_avro::Error, stage: &str) -> Error {
    let mut cause: Option<&(dyn StdError + 'static)> = Some(&e);
    while let Some(err) = cause {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::UnexpectedEof {
                return Error::TruncatedData(format!("{stage}: {e}"));
            }
        }
        cause = err.source();
    }
    // Some reader errors only carry the io::Error in their message.
    if e.to_string().contains("failed to fill whole buffer") {
        return Error::TruncatedData(format!("{stage}: {e}"));
    }
    Error::MalformedContainer(format!("{stage}: {e}"))
}
