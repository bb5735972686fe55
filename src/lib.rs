//! # qrsheet
//!
//! Turn a newline-delimited list of values into QR codes and export them as
//! a printable, paginated PDF sheet.
//!
//! ## Pipeline Overview
//!
//! ```text
//! values.txt
//!  │
//!  ├─ 1. Import    split lines, trim, drop blanks
//!  ├─ 2. Render    two symbols per value: inline (EC L) and grid (EC M)
//!  ├─ 3. Paginate  50 grid tiles per page
//!  ├─ 4. Snapshot  rasterise each page's staging area (spawn_blocking)
//!  ├─ 5. Document  one PDF page per snapshot, captions as real text
//!  └─ 6. Output    generatedQrCode_YYYYMMDD.pdf + per-page report
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qrsheet::{ExportConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExportConfig::builder().output_dir("out").build()?;
//!     let mut session = Session::new(config);
//!     session.import_text("SKU-0001\nSKU-0002\nSKU-0003\n")?;
//!     let output = session.export().await?;
//!     eprintln!("{} codes on {} pages → {}",
//!         output.stats.total_items,
//!         output.stats.total_pages,
//!         output.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `qrsheet` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! qrsheet = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod control;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    EcLevel, EncoderStyle, ExportConfig, ExportConfigBuilder, GridLayout, HexColor, PageFormat,
};
pub use control::{ControlState, ExportControl};
pub use error::QrSheetError;
pub use export::{export, export_dated, output_filename};
pub use output::{ExportOutput, ExportStats, PageReport, StatusLevel, StatusMessage};
pub use pipeline::import::{parse_content, ImportedValue};
pub use pipeline::paginate::page_count;
pub use pipeline::render::{truncate_label, ResultsView};
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::Session;
