//! PDF assembly: one page per snapshot, raster plus caption text.
//!
//! The exporter talks to a stateful [`DocumentBuilder`]: the document starts
//! with one blank page, [`DocumentBuilder::add_page`] appends another, and
//! [`DocumentBuilder::add_image`] draws a snapshot onto the current page. The
//! default [`PdfBackend`] writes with `lopdf`:
//!
//! * rasters are embedded as baseline JPEG (`DCTDecode`), so no re-encoding
//!   happens at save time;
//! * captions are set in the standard Helvetica font (WinAnsi encoding) on
//!   top of the raster, which keeps labels searchable and sharp at any zoom.

use crate::config::{ExportConfig, PT_PER_MM};
use crate::pipeline::snapshot::PageSnapshot;
use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

/// Why the document builder failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DocumentError(pub String);

/// Where a snapshot lands on the page, in PDF points (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    /// Fit an `image_w × image_h` raster to the page width minus `margin` on
    /// each side, keeping its aspect ratio and anchoring it at the top margin.
    ///
    /// If the raster would then run past the bottom margin it is scaled to the
    /// printable height instead and centred horizontally.
    pub fn fit(image_w: u32, image_h: u32, page_w: f32, page_h: f32, margin: f32) -> Self {
        let avail_w = (page_w - 2.0 * margin).max(1.0);
        let avail_h = (page_h - 2.0 * margin).max(1.0);
        let (iw, ih) = (image_w.max(1) as f32, image_h.max(1) as f32);

        let mut width = avail_w;
        let mut height = ih * width / iw;
        let mut x = margin;
        if height > avail_h {
            height = avail_h;
            width = iw * height / ih;
            x = (page_w - width) / 2.0;
        }
        Self {
            x,
            y: page_h - margin - height,
            width,
            height,
        }
    }
}

/// Stateful document assembly, one export run per builder.
pub trait DocumentBuilder: Send {
    /// Start a new page; subsequent images go there.
    fn add_page(&mut self) -> Result<(), DocumentError>;

    /// Draw `snapshot` on the current page at `placement`.
    fn add_image(&mut self, snapshot: &PageSnapshot, placement: Placement)
        -> Result<(), DocumentError>;

    /// Pages in the document so far.
    fn page_count(&self) -> usize;

    /// Page size in points.
    fn page_size(&self) -> (f32, f32);

    /// Serialise the finished document.
    fn finish(self: Box<Self>) -> Result<Vec<u8>, DocumentError>;
}

/// Creates a fresh [`DocumentBuilder`] for each export.
pub trait DocumentBackend: Send + Sync {
    fn create(&self, config: &ExportConfig) -> Box<dyn DocumentBuilder>;
}

/// PDF output through `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfBackend;

impl DocumentBackend for PdfBackend {
    fn create(&self, config: &ExportConfig) -> Box<dyn DocumentBuilder> {
        Box::new(PdfBuilder::new(config))
    }
}

/// Margin helper for callers that work in millimetres.
pub fn margin_pt(config: &ExportConfig) -> f32 {
    config.margin_mm * PT_PER_MM
}

#[derive(Default)]
struct PendingPage {
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

/// `lopdf`-backed builder; pages are kept pending until [`DocumentBuilder::finish`].
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_w: f32,
    page_h: f32,
    jpeg_quality: u8,
    pages: Vec<PendingPage>,
    images: usize,
}

impl PdfBuilder {
    pub fn new(config: &ExportConfig) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let (page_w, page_h) = config.page_format.size_pt();
        Self {
            doc,
            pages_id,
            font_id,
            page_w,
            page_h,
            jpeg_quality: config.jpeg_quality,
            pages: vec![PendingPage::default()],
            images: 0,
        }
    }

    fn current(&mut self) -> &mut PendingPage {
        if self.pages.is_empty() {
            self.pages.push(PendingPage::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }
}

impl DocumentBuilder for PdfBuilder {
    fn add_page(&mut self) -> Result<(), DocumentError> {
        self.pages.push(PendingPage::default());
        Ok(())
    }

    fn add_image(
        &mut self,
        snapshot: &PageSnapshot,
        placement: Placement,
    ) -> Result<(), DocumentError> {
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality)
            .encode_image(&snapshot.image)
            .map_err(|e| DocumentError(format!("JPEG encoding failed: {e}")))?;

        let image_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(snapshot.width()),
                "Height" => i64::from(snapshot.height()),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        ));
        self.images += 1;
        let name = format!("Im{}", self.images);

        let k = placement.width / snapshot.width().max(1) as f32;
        let top = placement.y + placement.height;

        let page = self.current();
        page.xobjects.set(name.as_bytes().to_vec(), image_id);
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    placement.width.into(),
                    0.into(),
                    0.into(),
                    placement.height.into(),
                    placement.x.into(),
                    placement.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);

        if !snapshot.captions.is_empty() {
            page.operations.push(Operation::new("BT", vec![]));
            for caption in &snapshot.captions {
                let size = (caption.font_px * k).max(1.0);
                let x = placement.x + caption.x * k;
                let y = top - caption.baseline * k;
                page.operations.extend([
                    Operation::new("Tf", vec!["F1".into(), size.into()]),
                    Operation::new(
                        "Tm",
                        vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
                    ),
                    Operation::new(
                        "Tj",
                        vec![Object::String(win_ansi(&caption.text), StringFormat::Literal)],
                    ),
                ]);
            }
            page.operations.push(Operation::new("ET", vec![]));
        }

        debug!(
            "Placed {}x{} px raster at ({:.1}, {:.1}) size {:.1}x{:.1} pt",
            snapshot.width(),
            snapshot.height(),
            placement.x,
            placement.y,
            placement.width,
            placement.height
        );
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self) -> (f32, f32) {
        (self.page_w, self.page_h)
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, DocumentError> {
        let PdfBuilder {
            mut doc,
            pages_id,
            font_id,
            page_w,
            page_h,
            pages,
            ..
        } = *self;

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            let content = Content {
                operations: page.operations,
            };
            let bytes = content
                .encode()
                .map_err(|e| DocumentError(format!("content stream: {e}")))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => page.xobjects,
                },
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| DocumentError(format!("serialising PDF: {e}")))?;
        Ok(out)
    }
}

/// Encode text for a WinAnsi Type1 font; characters outside Latin-1 become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            0x20..=0x7e | 0xa0..=0xff => u32::from(c) as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageFormat;
    use crate::pipeline::snapshot::Caption;
    use image::{Rgb, RgbImage};

    fn snapshot(w: u32, h: u32, label: &str) -> PageSnapshot {
        PageSnapshot {
            image: RgbImage::from_pixel(w, h, Rgb([200, 10, 10])),
            captions: vec![Caption {
                text: label.to_string(),
                x: 4.0,
                baseline: 20.0,
                font_px: 8.0,
            }],
        }
    }

    #[test]
    fn document_error_displays_detail() {
        let err: Box<dyn std::error::Error> = Box::new(DocumentError("page tree broken".into()));
        assert_eq!(err.to_string(), "page tree broken");
    }

    #[test]
    fn placement_fills_width_for_wide_images() {
        let (pw, ph) = PageFormat::A4.size_pt();
        let m = 5.0 * PT_PER_MM;
        let p = Placement::fit(1000, 500, pw, ph, m);
        assert!((p.width - (pw - 2.0 * m)).abs() < 0.01);
        assert!((p.height - p.width / 2.0).abs() < 0.01);
        assert!((p.x - m).abs() < 0.01);
        assert!((p.y + p.height - (ph - m)).abs() < 0.01);
    }

    #[test]
    fn placement_fits_height_for_tall_images() {
        let (pw, ph) = PageFormat::A4.size_pt();
        let m = 5.0 * PT_PER_MM;
        let p = Placement::fit(454, 1074, pw, ph, m);
        assert!((p.height - (ph - 2.0 * m)).abs() < 0.01);
        assert!((p.width / p.height - 454.0 / 1074.0).abs() < 0.001);
        assert!((p.x + p.width / 2.0 - pw / 2.0).abs() < 0.01);
        assert!((p.y - m).abs() < 0.01);
    }

    #[test]
    fn win_ansi_replaces_unmappable_chars() {
        assert_eq!(win_ansi("A-z"), b"A-z");
        assert_eq!(win_ansi("café"), vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(win_ansi("日本"), b"??");
    }

    #[test]
    fn builder_starts_with_one_page() {
        let builder = PdfBuilder::new(&ExportConfig::default());
        assert_eq!(builder.page_count(), 1);
    }

    #[test]
    fn finished_pdf_has_every_page_and_caption() {
        let config = ExportConfig::default();
        let mut builder: Box<dyn DocumentBuilder> = PdfBackend.create(&config);
        let (pw, ph) = builder.page_size();
        let margin = margin_pt(&config);

        for (i, label) in ["first", "second", "third"].into_iter().enumerate() {
            if i > 0 {
                builder.add_page().unwrap();
            }
            let snap = snapshot(60, 40, label);
            let placement = Placement::fit(snap.width(), snap.height(), pw, ph, margin);
            builder.add_image(&snap, placement).unwrap();
        }
        assert_eq!(builder.page_count(), 3);

        let bytes = builder.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 3);
        let last = doc.get_page_content(pages[&3]).unwrap();
        assert!(String::from_utf8_lossy(&last).contains("third"));
    }
}
