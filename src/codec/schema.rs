use crate::{Error, Result};
use apache_avro::Schema;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// The bare string schema used for keys when none is supplied.
pub const DEFAULT_KEY_SCHEMA: &str = r#"{"type": "string"}"#;

/// Where a schema comes from.
///
/// Callers pick the variant explicitly; the codec only ever sees the parsed
/// [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// Schema JSON given inline.
    Literal(String),
    /// Path to a file holding schema JSON.
    FilePath(PathBuf),
}

impl SchemaSource {
    pub fn default_key() -> Self {
        SchemaSource::Literal(DEFAULT_KEY_SCHEMA.to_string())
    }

    /// Reads (if needed) and parses the schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaParse`] when the file cannot be read or the text
    /// is not a valid Avro schema. The error names the source so it can be
    /// traced back to a CLI argument.
    pub fn load(&self) -> Result<Schema> {
        let text = match self {
            SchemaSource::Literal(text) => text.clone(),
            SchemaSource::FilePath(path) => {
                std::fs::read_to_string(path).map_err(|e| Error::SchemaParse {
                    source_desc: self.to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        let schema = Schema::parse_str(&text).map_err(|e| Error::SchemaParse {
            source_desc: self.to_string(),
            reason: e.to_string(),
        })?;

        debug!(source = %self, "Parsed schema");
        Ok(schema)
    }
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSource::Literal(_) => write!(f, "literal"),
            SchemaSource::FilePath(path) => write!(f, "{}", path.display()),
        }
    }
}

/// True for schemas whose values are naturally written as bare text on a
/// command line.
pub fn is_string_like(schema: &Schema) -> bool {
    matches!(schema, Schema::String | Schema::Uuid | Schema::Enum(_))
}
