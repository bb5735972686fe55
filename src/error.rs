//! Error types for the qrsheet library.
//!
//! A single fatal error type, [`QrSheetError`], covers the four failure
//! families of the workflow:
//!
//! * **User input**: no source file was chosen.
//! * **I/O**: the source could not be read, or the PDF could not be written.
//! * **Preconditions**: export requested with nothing rendered, or while
//!   another export is still running.
//! * **Collaborators**: the symbol encoder, page rasteriser or document
//!   builder reported a failure.
//!
//! Every variant is surfaced to the caller; none is retried. The export path
//! guarantees its cleanup (staging area removed, control re-enabled) before
//! the error is returned.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the qrsheet library.
#[derive(Debug, Error)]
pub enum QrSheetError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Import was triggered without a source file.
    #[error("Please select a file.")]
    NoFileSelected,

    /// The source file exists but could not be read.
    #[error("Error reading file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Precondition errors ───────────────────────────────────────────────
    /// Export requested while the view holds no items.
    #[error("Please import data and generate QR codes first.")]
    NothingToExport,

    /// Export requested while a previous export is still in flight.
    #[error("An export is already in progress")]
    ExportInProgress,

    // ── Collaborator errors ───────────────────────────────────────────────
    /// The symbol encoder rejected a value (usually: too long for any QR version).
    #[error("Could not encode item {index}: {detail}")]
    EncodeFailed { index: usize, detail: String },

    /// The page rasteriser failed to capture the staging area.
    #[error("Snapshot of page {page} failed: {detail}")]
    SnapshotFailed { page: usize, detail: String },

    /// The document builder failed while adding or finishing a page.
    #[error("PDF assembly failed at page {page}: {detail}")]
    DocumentFailed { page: usize, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QrSheetError {
    /// True for errors the user caused and can fix by acting differently
    /// (choose a file, import first, wait for the running export).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            QrSheetError::NoFileSelected
                | QrSheetError::NothingToExport
                | QrSheetError::ExportInProgress
        )
    }
}
