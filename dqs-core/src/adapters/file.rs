//! Delimited-text file adapter.
//!
//! The first record is the header row. Column types are inferred from the
//! data (see [`super::inference`]); ragged rows and undecodable bytes are
//! fatal `ParseError`s.

use std::fmt;
use std::path::Path;

use super::config::IngestConfig;
use super::inference::build_text_frame;
use crate::error::{DqsError, Result};
use crate::frame::{Frame, SourceKind};

/// Raw delimited-text input.
#[derive(Clone, PartialEq, Eq)]
pub struct FileSource {
    /// File contents
    pub bytes: Vec<u8>,
    /// Declared text encoding; UTF-8 when absent
    pub declared_encoding: Option<String>,
    /// Field delimiter
    pub delimiter: u8,
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSource")
            .field("len", &self.bytes.len())
            .field("declared_encoding", &self.declared_encoding)
            .field("delimiter", &char::from(self.delimiter))
            .finish()
    }
}

impl FileSource {
    /// Creates a comma-delimited UTF-8 source from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            declared_encoding: None,
            delimiter: b',',
        }
    }

    /// Reads a file from disk.
    ///
    /// # Errors
    /// Returns `DqsError::Io` if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DqsError::io(format!("Failed to read '{}'", path.display()), e))?;
        Ok(Self::new(bytes))
    }

    /// Builder method to declare the text encoding.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.declared_encoding = Some(encoding.into());
        self
    }

    /// Builder method to set the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Decodes bytes according to the declared encoding.
///
/// Supported: `utf-8` (leading BOM stripped), `ascii`, and
/// `latin-1`/`iso-8859-1`.
fn decode(bytes: &[u8], encoding: Option<&str>) -> Result<String> {
    let normalized = encoding
        .unwrap_or("utf-8")
        .to_ascii_lowercase()
        .replace(['-', '_'], "");

    match normalized.as_str() {
        "utf8" => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            String::from_utf8(bytes.to_vec()).map_err(|e| {
                DqsError::parse(format!(
                    "input is not valid UTF-8 (invalid byte at offset {})",
                    e.utf8_error().valid_up_to()
                ))
            })
        }
        "ascii" | "usascii" => {
            if let Some(offset) = bytes.iter().position(|b| !b.is_ascii()) {
                return Err(DqsError::parse(format!(
                    "input is not valid ASCII (non-ASCII byte at offset {})",
                    offset
                )));
            }
            Ok(bytes.iter().map(|b| char::from(*b)).collect())
        }
        "latin1" | "iso88591" => Ok(bytes.iter().map(|b| char::from(*b)).collect()),
        _ => Err(DqsError::parse(format!(
            "unsupported encoding '{}'",
            encoding.unwrap_or_default()
        ))),
    }
}

/// Parses a delimited-text source into a frame.
pub(crate) fn load_file(source: &FileSource, config: &IngestConfig) -> Result<Frame> {
    let text = decode(&source.bytes, source.declared_encoding.as_deref())?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(source.delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DqsError::parse(format!("unreadable header row: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(DqsError::parse("input has no header row"));
    }
    for (index, header) in headers.iter().enumerate() {
        if header.is_empty() {
            return Err(DqsError::parse(format!(
                "header column {} has an empty name",
                index + 1
            )));
        }
        if headers[..index].contains(header) {
            return Err(DqsError::parse(format!(
                "duplicate header name '{}'",
                header
            )));
        }
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DqsError::parse(format!("malformed row: {}", e)))?;
        records.push(
            record
                .iter()
                .map(|cell| {
                    let cell = cell.trim();
                    if config.is_null_marker(cell) {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect(),
        );
    }

    tracing::debug!(
        "Parsed delimited input: {} columns, {} rows",
        headers.len(),
        records.len()
    );

    build_text_frame(headers, records, config, SourceKind::File)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ColumnKind, Value};

    fn load(bytes: &[u8]) -> Result<Frame> {
        load_file(&FileSource::new(bytes.to_vec()), &IngestConfig::default())
    }

    #[test]
    fn test_infers_column_kinds() {
        let frame = load(
            b"customer_id,amount,currency,txn_timestamp\n\
              C1,10.5,INR,2024-01-01T10:00:00Z\n\
              C2,-3,inr,2024-01-02 08:00:00\n",
        )
        .unwrap();

        let kinds: Vec<ColumnKind> = frame.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::String,
                ColumnKind::Number,
                ColumnKind::String,
                ColumnKind::Timestamp
            ]
        );
        assert_eq!(frame.rows()[1][1], Value::Number(-3.0));
    }

    #[test]
    fn test_empty_cells_and_markers_are_null() {
        let frame = load(b"a,b\n,NULL\n  ,N/A\n1,x\n").unwrap();

        assert_eq!(frame.rows()[0], vec![Value::Null, Value::Null]);
        assert_eq!(frame.rows()[1], vec![Value::Null, Value::Null]);
        assert_eq!(frame.columns()[0].kind, ColumnKind::Number);
    }

    #[test]
    fn test_ragged_rows_are_parse_errors() {
        let result = load(b"a,b\n1,2\n3\n");
        assert!(matches!(result, Err(DqsError::Parse { .. })));
    }

    #[test]
    fn test_header_only_input() {
        let frame = load(b"a,b\n").unwrap();
        assert_eq!(frame.column_count(), 2);
        assert_eq!(frame.row_count(), 0);
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        assert!(matches!(load(b""), Err(DqsError::Parse { .. })));
    }

    #[test]
    fn test_duplicate_headers_are_parse_errors() {
        assert!(matches!(load(b"a,a\n1,2\n"), Err(DqsError::Parse { .. })));
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let frame = load(b"\xEF\xBB\xBFname\nx\n").unwrap();
        assert_eq!(frame.columns()[0].name, "name");
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        assert!(matches!(load(b"name\n\xFF\xFE\n"), Err(DqsError::Parse { .. })));
    }

    #[test]
    fn test_latin1_decoding() {
        let source = FileSource::new(b"city\nM\xFCnchen\n".to_vec()).with_encoding("ISO-8859-1");
        let frame = load_file(&source, &IngestConfig::default()).unwrap();
        assert_eq!(frame.rows()[0][0], Value::from("München"));
    }

    #[test]
    fn test_unknown_encoding_is_parse_error() {
        let source = FileSource::new(b"a\n1\n".to_vec()).with_encoding("shift-jis");
        let result = load_file(&source, &IngestConfig::default());
        assert!(matches!(result, Err(DqsError::Parse { .. })));
    }

    #[test]
    fn test_custom_delimiter() {
        let source = FileSource::new(b"a;b\n1;2\n".to_vec()).with_delimiter(b';');
        let frame = load_file(&source, &IngestConfig::default()).unwrap();
        assert_eq!(frame.column_count(), 2);
    }
}
