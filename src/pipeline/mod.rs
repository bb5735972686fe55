//! Pipeline stages from text file to PDF.
//!
//! Each submodule implements exactly one step, so each is testable alone and
//! a collaborator can be swapped without touching its neighbours.
//!
//! ## Data Flow
//!
//! ```text
//! import ──▶ encode/render ──▶ paginate ──▶ snapshot ──▶ document
//! (lines)    (QR symbols)      (pages)      (raster)     (PDF)
//! ```
//!
//! 1. [`import`]   — split newline-delimited text into trimmed values
//! 2. [`encode`]   — the symbol encoder collaborator (QR via `qrcode`)
//! 3. [`render`]   — results table and grid, both encodings per value
//! 4. [`paginate`] — fixed-capacity pages over the grid
//! 5. [`snapshot`] — staging area and page rasteriser; runs in
//!    `spawn_blocking` because it is CPU-bound
//! 6. [`document`] — multi-page PDF assembly via `lopdf`

pub mod document;
pub mod encode;
pub mod import;
pub mod paginate;
pub mod render;
pub mod snapshot;
