//! Configuration types for rendering and exporting QR sheets.
//!
//! All behaviour is controlled through [`ExportConfig`], built via its
//! [`ExportConfigBuilder`]. The defaults reproduce the classic sheet: two
//! 70 px symbols per value (EC level L inline, M in the grid), 50 items per
//! A4 page in a 5-column grid, 5 mm margins, and files named
//! `generatedQrCode_YYYYMMDD.pdf`.

use crate::error::QrSheetError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Millimetres to PDF points.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Configuration for rendering symbols and exporting the grid to PDF.
///
/// Built via [`ExportConfig::builder()`] or using
/// [`ExportConfig::default()`].
///
/// # Example
/// ```rust
/// use qrsheet::ExportConfig;
///
/// let config = ExportConfig::builder()
///     .items_per_page(40)
///     .columns(4)
///     .output_dir("out")
///     .build()
///     .unwrap();
/// assert_eq!(config.items_per_page, 40);
/// ```
#[derive(Clone)]
pub struct ExportConfig {
    /// Grid items per PDF page. Default: 50 (10 rows × 5 columns).
    pub items_per_page: usize,

    /// Style of the symbol shown in the results table. Default: 70 px, EC level L, black on white.
    pub inline_style: EncoderStyle,

    /// Style of the symbol tiled into the printable grid. Default: 70 px, EC level M, #2c3e50 on white.
    pub grid_style: EncoderStyle,

    /// Grid labels longer than this many characters are truncated. Default: 20.
    pub label_max_chars: usize,

    /// Tile geometry of the staging area.
    pub layout: GridLayout,

    /// Scale factor applied when rasterising the staging area. Default: 1.5.
    ///
    /// Higher values give crisper symbols in the PDF at the cost of larger
    /// embedded images.
    pub snapshot_scale: f32,

    /// JPEG quality (1–100) of the embedded page rasters. Default: 90.
    pub jpeg_quality: u8,

    /// Target page size. Default: A4 portrait.
    pub page_format: PageFormat,

    /// Margin on every side of the page, in millimetres. Default: 5.
    pub margin_mm: f32,

    /// Output filename prefix; the UTC date (`YYYYMMDD`) and `.pdf` follow. Default: `generatedQrCode_`.
    pub file_prefix: String,

    /// Directory the PDF is written to. Default: current directory.
    pub output_dir: PathBuf,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            items_per_page: 50,
            inline_style: EncoderStyle::inline(),
            grid_style: EncoderStyle::grid(),
            label_max_chars: 20,
            layout: GridLayout::default(),
            snapshot_scale: 1.5,
            jpeg_quality: 90,
            page_format: PageFormat::default(),
            margin_mm: 5.0,
            file_prefix: "generatedQrCode_".to_string(),
            output_dir: PathBuf::from("."),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("items_per_page", &self.items_per_page)
            .field("inline_style", &self.inline_style)
            .field("grid_style", &self.grid_style)
            .field("label_max_chars", &self.label_max_chars)
            .field("layout", &self.layout)
            .field("snapshot_scale", &self.snapshot_scale)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("page_format", &self.page_format)
            .field("margin_mm", &self.margin_mm)
            .field("file_prefix", &self.file_prefix)
            .field("output_dir", &self.output_dir)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn items_per_page(mut self, n: usize) -> Self {
        self.config.items_per_page = n.max(1);
        self
    }

    pub fn columns(mut self, n: u32) -> Self {
        self.config.layout.columns = n.max(1);
        self
    }

    pub fn inline_style(mut self, style: EncoderStyle) -> Self {
        self.config.inline_style = style;
        self
    }

    pub fn grid_style(mut self, style: EncoderStyle) -> Self {
        self.config.grid_style = style;
        self
    }

    pub fn label_max_chars(mut self, n: usize) -> Self {
        self.config.label_max_chars = n;
        self
    }

    pub fn layout(mut self, layout: GridLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn snapshot_scale(mut self, scale: f32) -> Self {
        self.config.snapshot_scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn page_format(mut self, format: PageFormat) -> Self {
        self.config.page_format = format;
        self
    }

    pub fn margin_mm(mut self, mm: f32) -> Self {
        self.config.margin_mm = mm.max(0.0);
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExportConfig, QrSheetError> {
        let c = &self.config;
        if c.items_per_page == 0 {
            return Err(QrSheetError::InvalidConfig(
                "Items per page must be ≥ 1".into(),
            ));
        }
        if c.layout.columns == 0 {
            return Err(QrSheetError::InvalidConfig(
                "Grid columns must be ≥ 1".into(),
            ));
        }
        if c.label_max_chars < 4 {
            return Err(QrSheetError::InvalidConfig(format!(
                "Label limit must leave room for the ellipsis (≥ 4), got {}",
                c.label_max_chars
            )));
        }
        for (name, style) in [("inline", &c.inline_style), ("grid", &c.grid_style)] {
            if style.size == 0 {
                return Err(QrSheetError::InvalidConfig(format!(
                    "The {name} symbol size must be > 0"
                )));
            }
        }
        let (w, h) = c.page_format.size_mm();
        if c.margin_mm * 2.0 >= w.min(h) {
            return Err(QrSheetError::InvalidConfig(format!(
                "Margin of {}mm leaves no printable area on a {w}×{h}mm page",
                c.margin_mm
            )));
        }
        if c.file_prefix.contains(['/', '\\']) {
            return Err(QrSheetError::InvalidConfig(format!(
                "File prefix must not contain path separators, got '{}'",
                c.file_prefix
            )));
        }
        Ok(self.config)
    }
}

// ── Symbol style ─────────────────────────────────────────────────────────

/// Rendering parameters handed to the symbol encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderStyle {
    /// Edge length of the rendered symbol in pixels.
    pub size: u32,
    pub dark: HexColor,
    pub light: HexColor,
    pub ec_level: EcLevel,
}

impl EncoderStyle {
    /// Results-table symbol: black on white, low error correction.
    pub fn inline() -> Self {
        Self {
            size: 70,
            dark: HexColor([0x00, 0x00, 0x00]),
            light: HexColor([0xff, 0xff, 0xff]),
            ec_level: EcLevel::L,
        }
    }

    /// Printable grid symbol: slate on white, medium error correction.
    pub fn grid() -> Self {
        Self {
            size: 70,
            dark: HexColor([0x2c, 0x3e, 0x50]),
            light: HexColor([0xff, 0xff, 0xff]),
            ec_level: EcLevel::M,
        }
    }
}

/// QR error-correction strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EcLevel {
    /// ~7 % recovery.
    L,
    /// ~15 % recovery. (default)
    #[default]
    M,
    /// ~25 % recovery.
    Q,
    /// ~30 % recovery.
    H,
}

/// An sRGB colour written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexColor(pub [u8; 3]);

impl FromStr for HexColor {
    type Err = QrSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(QrSheetError::InvalidConfig(format!(
                "Colour must look like #rrggbb, got '{s}'"
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| {
                QrSheetError::InvalidConfig(format!("Colour must look like #rrggbb, got '{s}'"))
            })
        };
        Ok(HexColor([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

// ── Page geometry ────────────────────────────────────────────────────────

/// Physical page size of the exported document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageFormat {
    /// 210 × 297 mm. (default)
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
}

impl PageFormat {
    /// Width and height in millimetres (portrait).
    pub fn size_mm(&self) -> (f32, f32) {
        match self {
            PageFormat::A4 => (210.0, 297.0),
            PageFormat::Letter => (215.9, 279.4),
        }
    }

    /// Width and height in PDF points (portrait).
    pub fn size_pt(&self) -> (f32, f32) {
        let (w, h) = self.size_mm();
        (w * PT_PER_MM, h * PT_PER_MM)
    }
}

/// Tile geometry of the printable grid, in unscaled pixels.
///
/// A tile is `padding | symbol | padding` wide and
/// `padding | symbol | caption_gap | caption | padding` tall, surrounded by a
/// one-pixel border. Tiles are separated by `gap` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub columns: u32,
    pub padding: u32,
    pub gap: u32,
    pub caption_gap: u32,
    pub caption_height: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            columns: 5,
            padding: 8,
            gap: 6,
            caption_gap: 4,
            caption_height: 12,
        }
    }
}

impl GridLayout {
    /// Tile width for a symbol of `symbol_size` pixels.
    pub fn tile_width(&self, symbol_size: u32) -> u32 {
        symbol_size + 2 * self.padding
    }

    /// Tile height for a symbol of `symbol_size` pixels.
    pub fn tile_height(&self, symbol_size: u32) -> u32 {
        symbol_size + 2 * self.padding + self.caption_gap + self.caption_height
    }

    /// Width of the whole grid: the visible container the staging area copies.
    pub fn grid_width(&self, symbol_size: u32) -> u32 {
        self.columns * self.tile_width(symbol_size) + self.columns.saturating_sub(1) * self.gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_sheet() {
        let c = ExportConfig::default();
        assert_eq!(c.items_per_page, 50);
        assert_eq!(c.layout.columns, 5);
        assert_eq!(c.inline_style.ec_level, EcLevel::L);
        assert_eq!(c.grid_style.ec_level, EcLevel::M);
        assert_eq!(c.grid_style.dark.to_string(), "#2c3e50");
        assert_eq!(c.inline_style.size, 70);
        assert_eq!(c.margin_mm, 5.0);
    }

    #[test]
    fn builder_clamps_values() {
        let c = ExportConfig::builder()
            .items_per_page(0)
            .columns(0)
            .jpeg_quality(0)
            .snapshot_scale(100.0)
            .build()
            .unwrap();
        assert_eq!(c.items_per_page, 1);
        assert_eq!(c.layout.columns, 1);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.snapshot_scale, 4.0);
    }

    #[test]
    fn builder_rejects_oversized_margin() {
        let err = ExportConfig::builder().margin_mm(120.0).build().unwrap_err();
        assert!(matches!(err, QrSheetError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_prefix_with_separator() {
        let err = ExportConfig::builder()
            .file_prefix("../evil_")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("path separators"));
    }

    #[test]
    fn builder_rejects_tiny_label_limit() {
        assert!(ExportConfig::builder().label_max_chars(3).build().is_err());
    }

    #[test]
    fn builder_rejects_zero_column_layout() {
        let layout = GridLayout {
            columns: 0,
            ..GridLayout::default()
        };
        let err = ExportConfig::builder().layout(layout).build().unwrap_err();
        assert!(matches!(err, QrSheetError::InvalidConfig(_)));
        assert_eq!(layout.grid_width(70), 0);
    }

    #[test]
    fn hex_color_parsing() {
        assert_eq!("#2c3e50".parse::<HexColor>().unwrap().0, [0x2c, 0x3e, 0x50]);
        assert_eq!("FFFFFF".parse::<HexColor>().unwrap().0, [255, 255, 255]);
        assert!("#12345".parse::<HexColor>().is_err());
        assert!("#zzzzzz".parse::<HexColor>().is_err());
    }

    #[test]
    fn grid_geometry() {
        let l = GridLayout::default();
        assert_eq!(l.tile_width(70), 86);
        assert_eq!(l.tile_height(70), 102);
        assert_eq!(l.grid_width(70), 5 * 86 + 4 * 6);
    }

    #[test]
    fn a4_in_points() {
        let (w, h) = PageFormat::A4.size_pt();
        assert!((w - 595.28).abs() < 0.1);
        assert!((h - 841.89).abs() < 0.1);
    }
}
