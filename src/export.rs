//! Paginated export of the rendered grid to a PDF file.
//!
//! The loop is strictly sequential: one page is staged, rasterised on a
//! blocking thread, awaited, and appended to the document before the next
//! page starts, because every page reuses the same staging area.
//!
//! Cleanup is tied to scope. The [`crate::control::ExportGuard`] re-enables the control and
//! the staging slot is emptied when the run ends, whether it finished, failed
//! on a collaborator, or panicked. A failed run writes nothing: the partially
//! assembled document is discarded.

use crate::config::ExportConfig;
use crate::error::QrSheetError;
use crate::output::{ExportOutput, ExportStats, PageReport};
use crate::pipeline::document::{margin_pt, DocumentError, Placement};
use crate::pipeline::paginate::{page_count, paginate, Page};
use crate::pipeline::snapshot::StagingArea;
use crate::session::Session;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Export every grid item of `session` to a date-stamped PDF.
///
/// # Errors
/// * [`QrSheetError::NothingToExport`] when nothing has been rendered
/// * [`QrSheetError::ExportInProgress`] when another export holds the control
/// * [`QrSheetError::SnapshotFailed`] / [`QrSheetError::DocumentFailed`]
///   when a collaborator fails; no file is written
/// * [`QrSheetError::OutputWriteFailed`] when the PDF cannot be saved
pub async fn export(session: &Session) -> Result<ExportOutput, QrSheetError> {
    let today = chrono::Utc::now().date_naive();
    export_dated(session, today).await
}

/// [`export`] with an explicit date for the filename stamp.
pub async fn export_dated(
    session: &Session,
    date: NaiveDate,
) -> Result<ExportOutput, QrSheetError> {
    let total_start = Instant::now();
    let view = session.view();
    let config = session.config();

    // ── Guard ────────────────────────────────────────────────────────────
    if view.count() == 0 || view.grid().is_empty() {
        warn!("Export requested with nothing to export");
        return Err(QrSheetError::NothingToExport);
    }
    let control = session
        .control()
        .begin(config.progress_callback.clone())?;
    let staging = StagingSlot::attach(
        session.staging_slot(),
        StagingArea::new(config.layout, config.grid_style.size),
    );

    let items = view.grid();
    let total_pages = page_count(items.len(), config.items_per_page);
    info!(
        "Exporting {} items on {} pages",
        items.len(),
        total_pages
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_export_start(total_pages, items.len());
    }

    // ── Page loop ────────────────────────────────────────────────────────
    let mut builder = session.backend().create(config);
    let (page_w, page_h) = builder.page_size();
    let margin = margin_pt(config);
    let mut reports = Vec::with_capacity(total_pages);
    let mut snapshot_ms = 0u64;

    for page in paginate(items, config.items_per_page) {
        let page_num = page.number();
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, total_pages);
        }
        control.page(page_num, total_pages);

        let staged = staging.stage(&page);
        let rasterizer = Arc::clone(session.rasterizer());
        let scale = config.snapshot_scale;
        let snap_start = Instant::now();
        let snapshot = tokio::task::spawn_blocking(move || rasterizer.capture(&staged, scale))
            .await
            .map_err(|e| {
                page_failed(
                    config,
                    page_num,
                    total_pages,
                    QrSheetError::Internal(format!("Snapshot task panicked: {e}")),
                )
            })?
            .map_err(|e| {
                page_failed(
                    config,
                    page_num,
                    total_pages,
                    QrSheetError::SnapshotFailed {
                        page: page_num,
                        detail: e.to_string(),
                    },
                )
            })?;
        snapshot_ms += snap_start.elapsed().as_millis() as u64;

        let document_failed = |e: DocumentError| {
            page_failed(
                config,
                page_num,
                total_pages,
                QrSheetError::DocumentFailed {
                    page: page_num,
                    detail: e.to_string(),
                },
            )
        };
        if page.index > 0 {
            builder.add_page().map_err(document_failed)?;
        }
        let placement = Placement::fit(
            snapshot.width(),
            snapshot.height(),
            page_w,
            page_h,
            margin,
        );
        builder
            .add_image(&snapshot, placement)
            .map_err(document_failed)?;

        debug!(
            "Page {}/{}: items {}–{}",
            page_num,
            total_pages,
            page.items[0].index,
            page.items[page.len() - 1].index
        );
        reports.push(PageReport {
            page_num,
            first_index: page.items[0].index,
            last_index: page.items[page.len() - 1].index,
            width_px: snapshot.width(),
            height_px: snapshot.height(),
        });
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page_num, total_pages, page.len());
        }
    }

    // ── Finalise ─────────────────────────────────────────────────────────
    let bytes = builder.finish().map_err(|e| QrSheetError::DocumentFailed {
        page: total_pages,
        detail: e.to_string(),
    })?;
    let path = output_path(config, date);
    write_atomic(&path, &bytes).await?;

    drop(staging);
    drop(control);

    let stats = ExportStats {
        total_items: items.len(),
        total_pages,
        bytes_written: bytes.len() as u64,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        snapshot_duration_ms: snapshot_ms,
    };
    info!(
        "Export complete: {} pages, {} bytes → {}",
        total_pages,
        stats.bytes_written,
        path.display()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_export_complete(total_pages, &path);
    }

    Ok(ExportOutput {
        path,
        pages: reports,
        stats,
    })
}

/// `<prefix><YYYYMMDD>.pdf`
pub fn output_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}{}.pdf", date.format("%Y%m%d"))
}

fn page_failed(
    config: &ExportConfig,
    page_num: usize,
    total_pages: usize,
    err: QrSheetError,
) -> QrSheetError {
    warn!("Export aborted on page {}: {}", page_num, err);
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_error(page_num, total_pages, &err.to_string());
    }
    err
}

/// Atomic write: write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), QrSheetError> {
    let write_failed = |source| QrSheetError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)
}

/// The session's staging slot, occupied for the lifetime of one export.
struct StagingSlot<'a> {
    slot: &'a Mutex<Option<StagingArea>>,
    blank: StagingArea,
}

impl<'a> StagingSlot<'a> {
    fn attach(slot: &'a Mutex<Option<StagingArea>>, area: StagingArea) -> Self {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(area.clone());
        Self { slot, blank: area }
    }

    /// Refill the staging area with `page` and return a copy for the rasteriser.
    fn stage(&self, page: &Page<'_>) -> StagingArea {
        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let area = guard.get_or_insert_with(|| self.blank.clone());
        area.stage(page);
        area.clone()
    }
}

impl Drop for StagingSlot<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Where the PDF for `config` would be written on `date`.
pub fn output_path(config: &ExportConfig, date: NaiveDate) -> PathBuf {
    config.output_dir.join(output_filename(&config.file_prefix, date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_embeds_compact_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            output_filename("generatedQrCode_", date),
            "generatedQrCode_20240307.pdf"
        );
    }

    #[test]
    fn output_path_joins_directory() {
        let config = ExportConfig::builder().output_dir("labels").build().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(
            output_path(&config, date),
            PathBuf::from("labels/generatedQrCode_20251231.pdf")
        );
    }
}
