//! The export control: label, enabled state and the busy flag.
//!
//! ```text
//!   Idle ──begin()──▶ Preparing ──page()──▶ Exporting{page,total} ─┐
//!    ▲                                                              │
//!    └────────────────────── guard dropped ◀───────────────────────┘
//! ```
//!
//! [`ExportControl::begin`] flips the busy flag and hands out an
//! [`ExportGuard`]. Dropping the guard, on success, error or panic, puts the
//! control back to `Idle` with its original label. A second `begin` while a
//! guard is alive fails with [`QrSheetError::ExportInProgress`].

use crate::error::QrSheetError;
use crate::pipeline::paginate::percent_complete;
use crate::progress::ProgressCallback;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Label shown while the control is idle.
pub const IDLE_LABEL: &str = "\u{2b07}\u{fe0f} Download All QR Codes as PDF";

/// Label shown between the click and the first page.
pub const PREPARING_LABEL: &str = "Generating PDF... Please Wait...";

/// What the export control currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    #[default]
    Idle,
    Preparing,
    /// Working on 1-based `page` of `total`.
    Exporting { page: usize, total: usize },
}

impl ControlState {
    pub fn label(&self) -> String {
        match *self {
            ControlState::Idle => IDLE_LABEL.to_string(),
            ControlState::Preparing => PREPARING_LABEL.to_string(),
            ControlState::Exporting { page, total } => format!(
                "Generating PDF... {}% Complete (Page {} of {})",
                percent_complete(page, total),
                page,
                total
            ),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, ControlState::Idle)
    }
}

/// Export button state shared between the session and its observers.
#[derive(Default)]
pub struct ExportControl {
    busy: AtomicBool,
    state: Mutex<ControlState>,
}

impl ExportControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControlState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn label(&self) -> String {
        self.state().label()
    }

    pub fn is_enabled(&self) -> bool {
        self.state().is_enabled()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Disable the control for an export run.
    ///
    /// # Errors
    /// [`QrSheetError::ExportInProgress`] if another run holds the control.
    pub fn begin(&self, observer: Option<ProgressCallback>) -> Result<ExportGuard<'_>, QrSheetError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(QrSheetError::ExportInProgress);
        }
        let guard = ExportGuard {
            control: self,
            observer,
        };
        guard.set(ControlState::Preparing);
        Ok(guard)
    }
}

/// Held for the duration of one export; resets the control on drop.
pub struct ExportGuard<'a> {
    control: &'a ExportControl,
    observer: Option<ProgressCallback>,
}

impl ExportGuard<'_> {
    /// Relabel the control for 1-based `page` of `total`.
    pub fn page(&self, page: usize, total: usize) {
        self.set(ControlState::Exporting { page, total });
    }

    fn set(&self, state: ControlState) {
        *self
            .control
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = state;
        if let Some(ref cb) = self.observer {
            cb.on_control_changed(&state.label(), state.is_enabled());
        }
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.set(ControlState::Idle);
        self.control.busy.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ExportProgressCallback;
    use std::sync::Arc;

    #[derive(Default)]
    struct Labels(Mutex<Vec<(String, bool)>>);

    impl ExportProgressCallback for Labels {
        fn on_control_changed(&self, label: &str, enabled: bool) {
            self.0.lock().unwrap().push((label.to_string(), enabled));
        }
    }

    #[test]
    fn labels_per_state() {
        assert_eq!(ControlState::Idle.label(), "⬇️ Download All QR Codes as PDF");
        assert_eq!(
            ControlState::Exporting { page: 1, total: 3 }.label(),
            "Generating PDF... 33% Complete (Page 1 of 3)"
        );
        assert_eq!(
            ControlState::Exporting { page: 3, total: 3 }.label(),
            "Generating PDF... 100% Complete (Page 3 of 3)"
        );
    }

    #[test]
    fn guard_disables_then_restores() {
        let control = ExportControl::new();
        assert!(control.is_enabled());
        {
            let guard = control.begin(None).unwrap();
            assert!(!control.is_enabled());
            assert!(control.is_busy());
            assert_eq!(control.label(), PREPARING_LABEL);
            guard.page(2, 4);
            assert_eq!(control.state(), ControlState::Exporting { page: 2, total: 4 });
        }
        assert!(control.is_enabled());
        assert!(!control.is_busy());
        assert_eq!(control.label(), IDLE_LABEL);
    }

    #[test]
    fn second_begin_is_rejected_while_busy() {
        let control = ExportControl::new();
        let _guard = control.begin(None).unwrap();
        assert!(matches!(
            control.begin(None),
            Err(QrSheetError::ExportInProgress)
        ));
    }

    #[test]
    fn observer_sees_every_transition() {
        let control = ExportControl::new();
        let labels = Arc::new(Labels::default());
        {
            let guard = control.begin(Some(labels.clone() as ProgressCallback)).unwrap();
            guard.page(1, 1);
        }
        let seen = labels.0.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], (PREPARING_LABEL.to_string(), false));
        assert_eq!(seen[2], (IDLE_LABEL.to_string(), true));
    }
}
