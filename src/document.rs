//! Raw upload bytes to a parsed JSON document

use crate::error::ImportError;
use serde_json::Value;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// How the uploaded bytes are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// One JSON value for the whole file
    #[default]
    Json,

    /// Newline-delimited JSON, one value per non-blank line
    Ndjson,
}

/// Parse the uploaded bytes according to `format`.
pub fn parse(bytes: &mut [u8], format: DocumentFormat) -> Result<Value, ImportError> {
    match format {
        DocumentFormat::Json => parse_document(bytes),
        DocumentFormat::Ndjson => parse_ndjson(bytes),
    }
}

/// Parse a single JSON document. The buffer is used as scratch space.
pub fn parse_document(bytes: &mut [u8]) -> Result<Value, ImportError> {
    let bytes = strip_bom(bytes);
    simd_json::serde::from_slice::<Value>(bytes).map_err(|e| ImportError::Parse {
        line: None,
        source: e,
    })
}

/// Parse newline-delimited JSON into an array of the line values.
pub fn parse_ndjson(bytes: &mut [u8]) -> Result<Value, ImportError> {
    let bytes = strip_bom(bytes);
    let mut values = Vec::new();

    for (idx, line) in bytes.split_mut(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let value = simd_json::serde::from_slice::<Value>(line).map_err(|e| ImportError::Parse {
            line: Some(idx + 1),
            source: e,
        })?;
        values.push(value);
    }

    tracing::debug!(lines = values.len(), "Parsed NDJSON document");
    Ok(Value::Array(values))
}

fn strip_bom(bytes: &mut [u8]) -> &mut [u8] {
    if bytes.starts_with(UTF8_BOM) {
        &mut bytes[UTF8_BOM.len()..]
    } else {
        bytes
    }
}
