//! The session: explicit context for one user working with one sheet.
//!
//! Everything the workflow mutates lives here instead of in process-wide
//! state: the current [`ResultsView`], the import status line, the staging
//! slot used during export, and the [`ExportControl`]. Collaborators (symbol
//! encoder, page rasteriser, document backend) are injected, defaulting to
//! the QR, tile and PDF implementations.
//!
//! ```rust,no_run
//! use qrsheet::{ExportConfig, Session};
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(ExportConfig::default());
//! session.import(Some(Path::new("values.txt"))).await?;
//! let output = session.export().await?;
//! println!("{} pages → {}", output.stats.total_pages, output.path.display());
//! # Ok(())
//! # }
//! ```

use crate::config::ExportConfig;
use crate::control::ExportControl;
use crate::error::QrSheetError;
use crate::export;
use crate::output::{ExportOutput, StatusMessage};
use crate::pipeline::document::{DocumentBackend, PdfBackend};
use crate::pipeline::encode::{QrEncoder, SymbolEncoder};
use crate::pipeline::import::{self, ImportedValue};
use crate::pipeline::render::{self, ResultsView};
use crate::pipeline::snapshot::{PageRasterizer, StagingArea, TileRasterizer};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Status text for a successful import of `n` items.
pub fn imported_status(n: usize) -> String {
    format!("Successfully imported {n} items.")
}

/// Status text when the source could not be read.
pub const READ_ERROR_STATUS: &str = "Error reading file!";

/// State and collaborators of one import/export workflow.
pub struct Session {
    config: ExportConfig,
    encoder: Arc<dyn SymbolEncoder>,
    rasterizer: Arc<dyn PageRasterizer>,
    backend: Arc<dyn DocumentBackend>,
    view: ResultsView,
    status: Option<StatusMessage>,
    staging: Mutex<Option<StagingArea>>,
    control: ExportControl,
}

impl Session {
    /// A session with the default collaborators and an empty view (count 0).
    pub fn new(config: ExportConfig) -> Self {
        let mut session = Self {
            config,
            encoder: Arc::new(QrEncoder),
            rasterizer: Arc::new(TileRasterizer),
            backend: Arc::new(PdfBackend),
            view: ResultsView::default(),
            status: None,
            staging: Mutex::new(None),
            control: ExportControl::new(),
        };
        session.reset();
        session
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn SymbolEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn DocumentBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Read, parse and render the source file.
    ///
    /// On success the status reads "Successfully imported N items." and the
    /// item count is returned. A missing selection or unreadable file sets an
    /// error status and leaves the current view untouched.
    pub async fn import(&mut self, source: Option<&Path>) -> Result<usize, QrSheetError> {
        let values = match import::import_file(source).await {
            Ok(values) => values,
            Err(e) => {
                let text = match e {
                    QrSheetError::NoFileSelected => e.to_string(),
                    _ => READ_ERROR_STATUS.to_string(),
                };
                warn!("Import failed: {}", e);
                self.status = Some(StatusMessage::error(text));
                return Err(e);
            }
        };
        self.apply_import(values)
    }

    /// Parse and render in-memory content, as if it had been read from a file.
    pub fn import_text(&mut self, content: &str) -> Result<usize, QrSheetError> {
        self.apply_import(import::parse_content(content))
    }

    fn apply_import(&mut self, values: Vec<ImportedValue>) -> Result<usize, QrSheetError> {
        match self.render(values) {
            Ok(n) => {
                info!("{}", imported_status(n));
                self.status = Some(StatusMessage::success(imported_status(n)));
                Ok(n)
            }
            Err(e) => {
                self.status = Some(StatusMessage::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Replace the view with `values`, returning the new count.
    ///
    /// If any value fails to encode the view is cleared, so the count never
    /// disagrees with the rendered items.
    pub fn render(&mut self, values: Vec<ImportedValue>) -> Result<usize, QrSheetError> {
        match render::render(values, self.encoder.as_ref(), &self.config) {
            Ok(view) => {
                self.view = view;
                Ok(self.view.count())
            }
            Err(e) => {
                self.view = ResultsView::default();
                Err(e)
            }
        }
    }

    /// Clear the table and grid; count becomes 0.
    pub fn reset(&mut self) {
        self.view = ResultsView::default();
    }

    /// Export the grid to a date-stamped PDF. See [`export::export`].
    pub async fn export(&self) -> Result<ExportOutput, QrSheetError> {
        export::export(self).await
    }

    pub fn view(&self) -> &ResultsView {
        &self.view
    }

    /// The displayed item count.
    pub fn count(&self) -> usize {
        self.view.count()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn control(&self) -> &ExportControl {
        &self.control
    }

    /// True while an export has its staging area attached.
    pub fn has_staging_area(&self) -> bool {
        self.staging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn staging_slot(&self) -> &Mutex<Option<StagingArea>> {
        &self.staging
    }

    pub(crate) fn rasterizer(&self) -> &Arc<dyn PageRasterizer> {
        &self.rasterizer
    }

    pub(crate) fn backend(&self) -> &dyn DocumentBackend {
        self.backend.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::StatusLevel;

    #[test]
    fn new_session_starts_empty() {
        let session = Session::new(ExportConfig::default());
        assert_eq!(session.count(), 0);
        assert!(session.status().is_none());
        assert!(session.control().is_enabled());
        assert!(!session.has_staging_area());
    }

    #[test]
    fn import_text_sets_count_and_status() {
        let mut session = Session::new(ExportConfig::default());
        let n = session.import_text("A\nB\n\n  C  \n").unwrap();
        assert_eq!(n, 3);
        assert_eq!(session.count(), 3);
        let status = session.status().unwrap();
        assert_eq!(status.text, "Successfully imported 3 items.");
        assert_eq!(status.level, StatusLevel::Success);
    }

    #[test]
    fn reimport_replaces_view_wholesale() {
        let mut session = Session::new(ExportConfig::default());
        session.import_text("1\n2\n3\n4").unwrap();
        session.import_text("x").unwrap();
        assert_eq!(session.count(), 1);
        assert_eq!(session.view().rows()[0].index, 1);
        assert_eq!(session.view().rows()[0].value, "x");
    }

    #[test]
    fn encode_failure_clears_view() {
        let mut session = Session::new(ExportConfig::default());
        session.import_text("ok").unwrap();
        let huge = "x".repeat(5000);
        assert!(session.import_text(&huge).is_err());
        assert_eq!(session.count(), 0);
        assert!(session.status().unwrap().is_error());
    }

    #[tokio::test]
    async fn missing_file_keeps_previous_view() {
        let mut session = Session::new(ExportConfig::default());
        session.import_text("keep me").unwrap();

        let err = session.import(None).await.unwrap_err();
        assert!(matches!(err, QrSheetError::NoFileSelected));
        assert_eq!(session.status().unwrap().text, "Please select a file.");
        assert_eq!(session.count(), 1);

        let err = session
            .import(Some(Path::new("/no/such/values.txt")))
            .await
            .unwrap_err();
        assert!(matches!(err, QrSheetError::ReadFailed { .. }));
        assert_eq!(session.status().unwrap().text, READ_ERROR_STATUS);
        assert_eq!(session.count(), 1);
    }

    #[test]
    fn blank_file_imports_zero_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.txt");
        std::fs::write(&path, "\n  \r\n\n").unwrap();

        let mut session = Session::new(ExportConfig::default());
        let n = tokio_test::block_on(session.import(Some(&path))).unwrap();
        assert_eq!(n, 0);
        assert_eq!(session.status().unwrap().text, imported_status(0));
        assert!(!session.status().unwrap().is_error());
    }
}
