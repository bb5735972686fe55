//! Staging and rasterisation of one page of grid tiles.
//!
//! The [`StagingArea`] is an off-screen copy of the visible grid, exactly as
//! wide, holding one page worth of cloned tiles at a time. The exporter
//! refills it for every page and hands it to a [`PageRasterizer`], which
//! produces a [`PageSnapshot`]: an RGB raster of the tiles plus the positions
//! of their captions. Captions travel next to the raster instead of being
//! burnt into it, so the PDF builder can set them as selectable text.
//!
//! Rasterisation is CPU-bound; the exporter runs it through
//! `tokio::task::spawn_blocking`, which is why the trait is `Send + Sync` and
//! the staging area is cheap to clone (tiles share their symbols via `Arc`).

use crate::config::GridLayout;
use crate::pipeline::paginate::Page;
use crate::pipeline::render::GridItem;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::debug;

const BACKGROUND: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const BORDER: Rgb<u8> = Rgb([0xdd, 0xdd, 0xdd]);

/// Caption glyph height relative to the caption strip.
const CAPTION_FONT_RATIO: f32 = 0.6;

/// Off-screen container for one page of tiles.
#[derive(Debug, Clone)]
pub struct StagingArea {
    layout: GridLayout,
    symbol_size: u32,
    page_index: usize,
    items: Vec<GridItem>,
}

impl StagingArea {
    /// An empty staging area matching a grid of `symbol_size` px symbols.
    pub fn new(layout: GridLayout, symbol_size: u32) -> Self {
        Self {
            layout,
            symbol_size,
            page_index: 0,
            items: Vec::new(),
        }
    }

    /// Replace the content with clones of `page`'s tiles.
    pub fn stage(&mut self, page: &Page<'_>) {
        self.items.clear();
        self.items.extend_from_slice(page.items);
        self.page_index = page.index;
    }

    pub fn items(&self) -> &[GridItem] {
        &self.items
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn symbol_size(&self) -> u32 {
        self.symbol_size
    }

    /// Same width as the visible grid.
    pub fn width_px(&self) -> u32 {
        self.layout.grid_width(self.symbol_size)
    }

    /// Height of the staged rows; 0 when nothing is staged.
    pub fn height_px(&self) -> u32 {
        let rows = self.rows();
        if rows == 0 {
            return 0;
        }
        rows * self.layout.tile_height(self.symbol_size) + (rows - 1) * self.layout.gap
    }

    fn rows(&self) -> u32 {
        (self.items.len() as u32).div_ceil(self.layout.columns)
    }

    /// Top-left corner of tile `slot`, unscaled.
    fn tile_origin(&self, slot: usize) -> (u32, u32) {
        let col = slot as u32 % self.layout.columns;
        let row = slot as u32 / self.layout.columns;
        (
            col * (self.layout.tile_width(self.symbol_size) + self.layout.gap),
            row * (self.layout.tile_height(self.symbol_size) + self.layout.gap),
        )
    }
}

/// Text positioned on a snapshot, in snapshot pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    /// Left edge of the text.
    pub x: f32,
    /// Baseline, measured from the top of the raster.
    pub baseline: f32,
    pub font_px: f32,
}

/// A rasterised page.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub image: RgbImage,
    pub captions: Vec<Caption>,
}

impl PageSnapshot {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Why a capture failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SnapshotError(pub String);

/// Captures a staging area as a raster image.
pub trait PageRasterizer: Send + Sync {
    fn capture(&self, staging: &StagingArea, scale: f32) -> Result<PageSnapshot, SnapshotError>;
}

/// Draws bordered tiles with their grid symbols on a white canvas.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileRasterizer;

impl PageRasterizer for TileRasterizer {
    fn capture(&self, staging: &StagingArea, scale: f32) -> Result<PageSnapshot, SnapshotError> {
        if staging.items().is_empty() {
            return Err(SnapshotError("staging area is empty".into()));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(SnapshotError(format!("invalid scale factor {scale}")));
        }

        let px = |v: u32| (v as f32 * scale).round() as u32;
        let layout = staging.layout();
        let width = px(staging.width_px()).max(1);
        let height = px(staging.height_px()).max(1);
        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

        let tile_w = px(layout.tile_width(staging.symbol_size()));
        let tile_h = px(layout.tile_height(staging.symbol_size()));
        let symbol_px = px(staging.symbol_size()).max(1);
        let border = px(1).max(1);
        let font_px = layout.caption_height as f32 * CAPTION_FONT_RATIO * scale;

        let mut captions = Vec::with_capacity(staging.items().len());
        for (slot, item) in staging.items().iter().enumerate() {
            let (ox, oy) = staging.tile_origin(slot);
            let (x0, y0) = (px(ox), px(oy));

            draw_frame(&mut canvas, x0, y0, tile_w, tile_h, border);

            let symbol = imageops::resize(
                item.symbol.image(),
                symbol_px,
                symbol_px,
                FilterType::Nearest,
            );
            let sx = px(ox + layout.padding);
            let sy = px(oy + layout.padding);
            imageops::overlay(&mut canvas, &symbol, i64::from(sx), i64::from(sy));

            let strip_bottom = oy
                + layout.padding
                + staging.symbol_size()
                + layout.caption_gap
                + layout.caption_height;
            captions.push(Caption {
                text: item.label.clone(),
                x: sx as f32,
                baseline: strip_bottom as f32 * scale - font_px * 0.25,
                font_px,
            });
        }

        debug!(
            "Captured page {} → {}x{} px, {} tiles",
            staging.page_index() + 1,
            width,
            height,
            captions.len()
        );
        Ok(PageSnapshot {
            image: canvas,
            captions,
        })
    }
}

/// Outline a `w × h` rectangle at `(x, y)` with a `t` pixel stroke, clipped to the canvas.
fn draw_frame(canvas: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, t: u32) {
    let (cw, ch) = canvas.dimensions();
    let x_end = (x + w).min(cw);
    let y_end = (y + h).min(ch);
    for py in y..y_end {
        for pxl in x..x_end {
            let on_edge = pxl < x + t || pxl + t >= x + w || py < y + t || py + t >= y + h;
            if on_edge {
                canvas.put_pixel(pxl, py, BORDER);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderStyle;
    use crate::pipeline::encode::{QrEncoder, SymbolEncoder};
    use crate::pipeline::paginate::paginate;
    use std::sync::Arc;

    fn grid(n: usize) -> Vec<GridItem> {
        let symbol = Arc::new(QrEncoder.encode("tile", &EncoderStyle::grid()).unwrap());
        (1..=n)
            .map(|index| GridItem {
                index,
                label: format!("item-{index}"),
                symbol: Arc::clone(&symbol),
            })
            .collect()
    }

    #[test]
    fn snapshot_error_displays_detail() {
        let err: Box<dyn std::error::Error> = Box::new(SnapshotError("canvas unavailable".into()));
        assert_eq!(err.to_string(), "canvas unavailable");
    }

    #[test]
    fn staging_matches_grid_width() {
        let layout = GridLayout::default();
        let staging = StagingArea::new(layout, 70);
        assert_eq!(staging.width_px(), layout.grid_width(70));
        assert_eq!(staging.height_px(), 0);
    }

    #[test]
    fn staging_is_refilled_per_page() {
        let items = grid(12);
        let mut staging = StagingArea::new(GridLayout::default(), 70);
        let pages: Vec<_> = paginate(&items, 10).collect();

        staging.stage(&pages[0]);
        assert_eq!(staging.items().len(), 10);
        staging.stage(&pages[1]);
        assert_eq!(staging.items().len(), 2);
        assert_eq!(staging.page_index(), 1);
        assert_eq!(staging.items()[0].index, 11);
    }

    #[test]
    fn full_page_is_ten_rows() {
        let items = grid(50);
        let mut staging = StagingArea::new(GridLayout::default(), 70);
        staging.stage(&paginate(&items, 50).next().unwrap());
        let layout = GridLayout::default();
        assert_eq!(
            staging.height_px(),
            10 * layout.tile_height(70) + 9 * layout.gap
        );
    }

    #[test]
    fn capture_scales_canvas_and_places_captions() {
        let items = grid(7);
        let mut staging = StagingArea::new(GridLayout::default(), 70);
        staging.stage(&paginate(&items, 50).next().unwrap());

        let snap = TileRasterizer.capture(&staging, 1.5).unwrap();
        assert_eq!(snap.width(), (staging.width_px() as f32 * 1.5).round() as u32);
        assert_eq!(snap.height(), (staging.height_px() as f32 * 1.5).round() as u32);
        assert_eq!(snap.captions.len(), 7);
        assert_eq!(snap.captions[6].text, "item-7");
        // Second row starts below the first.
        assert!(snap.captions[5].baseline > snap.captions[0].baseline);
        assert!(snap.captions.iter().all(|c| c.baseline < snap.height() as f32));
    }

    #[test]
    fn capture_draws_symbol_and_border() {
        let items = grid(1);
        let mut staging = StagingArea::new(GridLayout::default(), 70);
        staging.stage(&paginate(&items, 50).next().unwrap());

        let snap = TileRasterizer.capture(&staging, 1.0).unwrap();
        assert_eq!(snap.image.get_pixel(0, 0), &BORDER);
        // Top-left finder module of the symbol, just inside the padding.
        let pad = GridLayout::default().padding;
        assert_eq!(snap.image.get_pixel(pad, pad).0, EncoderStyle::grid().dark.0);
    }

    #[test]
    fn empty_staging_is_an_error() {
        let staging = StagingArea::new(GridLayout::default(), 70);
        assert!(TileRasterizer.capture(&staging, 1.0).is_err());
    }
}
