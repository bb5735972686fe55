//! Import: turn a newline-delimited text file into an ordered value list.
//!
//! The contract is deliberately forgiving: files exported from Notepad or a
//! spreadsheet may use `\r\n`, `\n` or bare `\r`, contain blank lines, and pad
//! values with spaces. Every run of line-break characters splits, every
//! segment is trimmed, and empty segments are dropped. Duplicates survive and
//! order is the file's line order.

use crate::error::QrSheetError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

static LINE_BREAKS: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"[\r\n]+").expect("static regex"));

const BOM: char = '\u{FEFF}';

/// A single trimmed, non-empty value read from the source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportedValue(String);

impl ImportedValue {
    /// Build a value from arbitrary text; `None` when it is blank after trimming.
    ///
    /// A byte-order mark counts as whitespace, so a file saved with one
    /// does not leak U+FEFF into its first value.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == BOM);
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for ImportedValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImportedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split raw file content into clean values, preserving line order.
pub fn parse_content(content: &str) -> Vec<ImportedValue> {
    LINE_BREAKS
        .split(content)
        .filter_map(ImportedValue::new)
        .collect()
}

/// Read the source file as text.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected, so a
/// Latin-1 export with the odd accented character still imports.
///
/// # Errors
/// * [`QrSheetError::NoFileSelected`] when `source` is `None`
/// * [`QrSheetError::ReadFailed`] when the file cannot be read
pub async fn read_source(source: Option<&Path>) -> Result<String, QrSheetError> {
    let path = source.ok_or(QrSheetError::NoFileSelected)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| QrSheetError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Read and parse the source file in one step.
pub async fn import_file(source: Option<&Path>) -> Result<Vec<ImportedValue>, QrSheetError> {
    let content = read_source(source).await?;
    let values = parse_content(&content);
    info!("Imported {} values", values.len());
    Ok(values)
}
