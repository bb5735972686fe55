//! Result types of an export run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What an export produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOutput {
    /// Where the PDF was written.
    pub path: PathBuf,
    /// One entry per PDF page, in page order.
    pub pages: Vec<PageReport>,
    pub stats: ExportStats,
}

/// The items that went onto one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-based page number.
    pub page_num: usize,
    /// 1-based index of the first item on the page.
    pub first_index: usize,
    /// 1-based index of the last item on the page.
    pub last_index: usize,
    /// Raster size before placement.
    pub width_px: u32,
    pub height_px: u32,
}

impl PageReport {
    pub fn item_count(&self) -> usize {
        self.last_index + 1 - self.first_index
    }
}

/// Counters and timings of an export run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportStats {
    pub total_items: usize,
    pub total_pages: usize,
    pub bytes_written: u64,
    pub total_duration_ms: u64,
    /// Time spent rasterising pages.
    pub snapshot_duration_ms: u64,
}

/// Level of a user-visible status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Success,
    Error,
}

/// The import status text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: StatusLevel::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: StatusLevel::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}
