//! Symbol encoding: text → QR module matrix → `size × size` raster.
//!
//! The encoder is a collaborator behind the [`SymbolEncoder`] trait so the
//! renderer can be exercised with a stub and hosts can swap in a different
//! symbology. The default [`QrEncoder`] delegates the matrix to the `qrcode`
//! crate and scales it with nearest-neighbour sampling onto an exact
//! `size × size` canvas without a quiet zone; the tile padding provides the
//! white border.

use crate::config::{EcLevel, EncoderStyle};
use image::{Rgb, RgbImage};
use qrcode::render::{unicode, Renderer};
use qrcode::QrCode;
use tracing::debug;

/// Why the encoder rejected a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EncodeError(pub String);

/// Produces a rendered symbol for a text payload.
pub trait SymbolEncoder: Send + Sync {
    fn encode(&self, text: &str, style: &EncoderStyle) -> Result<Symbol, EncodeError>;
}

/// An encoded matrix barcode together with its raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Modules per side.
    width: usize,
    /// Row-major module matrix, `true` for dark.
    modules: Vec<bool>,
    style: EncoderStyle,
    image: RgbImage,
}

impl Symbol {
    /// Build a symbol from a square module matrix and rasterise it.
    ///
    /// Returns `None` if `modules` is not `width × width`.
    pub fn from_modules(width: usize, modules: Vec<bool>, style: EncoderStyle) -> Option<Self> {
        if width == 0 || modules.len() != width * width {
            return None;
        }
        let image = rasterise(width, &modules, &style);
        Some(Self {
            width,
            modules,
            style,
            image,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }

    pub fn style(&self) -> &EncoderStyle {
        &self.style
    }

    /// The `size × size` raster (larger only if the matrix has more modules than pixels).
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Render with half-block characters for a terminal, light-on-dark.
    pub fn to_terminal(&self) -> String {
        let colors: Vec<qrcode::Color> = self
            .modules
            .iter()
            .map(|&dark| {
                if dark {
                    qrcode::Color::Dark
                } else {
                    qrcode::Color::Light
                }
            })
            .collect();
        Renderer::<unicode::Dense1x2>::new(&colors, self.width, 2)
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build()
    }
}

/// Nearest-neighbour scale of the module matrix onto the target canvas.
fn rasterise(width: usize, modules: &[bool], style: &EncoderStyle) -> RgbImage {
    let size = style.size.max(width as u32);
    let dark = Rgb(style.dark.0);
    let light = Rgb(style.light.0);
    RgbImage::from_fn(size, size, |x, y| {
        let mx = x as usize * width / size as usize;
        let my = y as usize * width / size as usize;
        if modules[my * width + mx] {
            dark
        } else {
            light
        }
    })
}

/// QR Code Model 2 encoder backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrEncoder;

impl SymbolEncoder for QrEncoder {
    fn encode(&self, text: &str, style: &EncoderStyle) -> Result<Symbol, EncodeError> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), ec_level(style.ec_level))
            .map_err(|e| EncodeError(e.to_string()))?;

        let width = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();
        debug!("Encoded {} bytes → {}×{} modules", text.len(), width, width);

        Symbol::from_modules(width, modules, *style)
            .ok_or_else(|| EncodeError(format!("encoder returned a malformed {width}-wide matrix")))
    }
}

fn ec_level(level: EcLevel) -> qrcode::EcLevel {
    match level {
        EcLevel::L => qrcode::EcLevel::L,
        EcLevel::M => qrcode::EcLevel::M,
        EcLevel::Q => qrcode::EcLevel::Q,
        EcLevel::H => qrcode::EcLevel::H,
    }
}
