//! Progress-callback trait for per-page export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::ExportConfigBuilder::progress_callback`] to receive
//! events as the exporter works through the pages. The same label that the
//! [`crate::control::ExportControl`] shows is forwarded through
//! [`ExportProgressCallback::on_control_changed`], so a host can mirror the
//! export button in its own UI.
//!
//! # Example
//!
//! ```rust
//! use qrsheet::{ExportConfig, ExportProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     done: AtomicUsize,
//! }
//!
//! impl ExportProgressCallback for PageCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, items: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {items} codes");
//!     }
//! }
//!
//! let config = ExportConfig::builder()
//!     .progress_callback(Arc::new(PageCounter { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the exporter as it assembles each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Pages are exported strictly one after another, but
/// the rasterisation of a page runs on a blocking thread, so implementations
/// must be `Send + Sync`.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once after the guard checks pass, before the first page.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages the document will have
    /// * `total_items` — number of grid items being exported
    fn on_export_start(&self, total_pages: usize, total_items: usize) {
        let _ = (total_pages, total_items);
    }

    /// Called whenever the export control changes label or enabled state.
    fn on_control_changed(&self, label: &str, enabled: bool) {
        let _ = (label, enabled);
    }

    /// Called just before a page is staged and rasterised.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been added to the document.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages
    /// * `items`       — grid items placed on this page
    fn on_page_complete(&self, page_num: usize, total_pages: usize, items: usize) {
        let _ = (page_num, total_pages, items);
    }

    /// Called when a page fails; the export aborts right after.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the document has been written.
    fn on_export_complete(&self, total_pages: usize, path: &Path) {
        let _ = (total_pages, path);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExportConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        labels: Mutex<Vec<String>>,
    }

    impl ExportProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _items: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_control_changed(&self, label: &str, _enabled: bool) {
            self.labels.lock().unwrap().push(label.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_export_start(2, 60);
        cb.on_control_changed("busy", false);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, 50);
        cb.on_page_error(2, 2, "boom");
        cb.on_export_complete(2, Path::new("out.pdf"));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 50);
        tracker.on_page_start(2, 2);
        tracker.on_control_changed("idle", true);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.labels.lock().unwrap().as_slice(), ["idle"]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_export_start(1, 1);
        cb.on_page_complete(1, 1, 1);
    }
}
