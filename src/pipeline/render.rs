//! Rendering: turn imported values into the results table and the grid.
//!
//! Each value is encoded twice with the same payload: once in the inline
//! style shown next to the raw value in the results table, and once in the
//! grid style tiled into the printable sheet. The grid tile carries a short
//! label; long values are cut so that labels stay on one line under a 70 px
//! symbol.
//!
//! The view is rebuilt wholesale on every call; there is no incremental
//! update. An empty input yields an empty view with count 0.

use crate::config::{EncoderStyle, ExportConfig};
use crate::error::QrSheetError;
use crate::pipeline::encode::{Symbol, SymbolEncoder};
use crate::pipeline::import::ImportedValue;
use std::sync::Arc;
use tracing::debug;

/// Marker appended to truncated labels.
pub const ELLIPSIS: &str = "...";

/// One rendered value: index, raw value and both artifacts.
#[derive(Debug, Clone)]
pub struct EncodedItem {
    /// 1-based position in the imported sequence.
    pub index: usize,
    pub value: ImportedValue,
    pub inline: Arc<Symbol>,
    pub grid: Arc<Symbol>,
}

/// A row of the results table.
#[derive(Debug, Clone)]
pub struct TableRow {
    pub index: usize,
    pub value: String,
    pub symbol: Arc<Symbol>,
}

/// A tile of the printable grid.
#[derive(Debug, Clone)]
pub struct GridItem {
    pub index: usize,
    pub label: String,
    pub symbol: Arc<Symbol>,
}

/// Everything the user sees after an import.
#[derive(Debug, Clone, Default)]
pub struct ResultsView {
    rows: Vec<TableRow>,
    grid: Vec<GridItem>,
}

impl ResultsView {
    /// The displayed item count.
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn grid(&self) -> &[GridItem] {
        &self.grid
    }

    fn push(&mut self, item: EncodedItem, label_max_chars: usize) {
        self.rows.push(TableRow {
            index: item.index,
            value: item.value.as_str().to_string(),
            symbol: item.inline,
        });
        self.grid.push(GridItem {
            index: item.index,
            label: truncate_label(item.value.as_str(), label_max_chars),
            symbol: item.grid,
        });
    }
}

/// Shorten a grid label to at most `max_chars` characters.
///
/// Values longer than `max_chars` keep their first `max_chars - 3`
/// characters followed by [`ELLIPSIS`]; shorter values are returned as-is.
pub fn truncate_label(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut label: String = value.chars().take(keep).collect();
    label.push_str(ELLIPSIS);
    label
}

/// Encode one value in both display contexts.
pub fn encode_item(
    index: usize,
    value: ImportedValue,
    encoder: &dyn SymbolEncoder,
    config: &ExportConfig,
) -> Result<EncodedItem, QrSheetError> {
    let encode = |style: &EncoderStyle| {
        encoder
            .encode(value.as_str(), style)
            .map(Arc::new)
            .map_err(|e| QrSheetError::EncodeFailed {
                index,
                detail: e.to_string(),
            })
    };
    let inline = encode(&config.inline_style)?;
    let grid = encode(&config.grid_style)?;
    Ok(EncodedItem {
        index,
        value,
        inline,
        grid,
    })
}

/// Build a fresh view from `values`, numbering items from 1.
pub fn render(
    values: Vec<ImportedValue>,
    encoder: &dyn SymbolEncoder,
    config: &ExportConfig,
) -> Result<ResultsView, QrSheetError> {
    let mut view = ResultsView {
        rows: Vec::with_capacity(values.len()),
        grid: Vec::with_capacity(values.len()),
    };
    for (pos, value) in values.into_iter().enumerate() {
        let item = encode_item(pos + 1, value, encoder, config)?;
        view.push(item, config.label_max_chars);
    }
    debug!("Rendered {} items", view.count());
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EcLevel;
    use crate::pipeline::encode::{EncodeError, QrEncoder};
    use crate::pipeline::import::parse_content;
    use std::sync::Mutex;

    /// Records every call and returns a 1×1 symbol.
    #[derive(Default)]
    struct RecordingEncoder {
        calls: Mutex<Vec<(String, EcLevel)>>,
    }

    impl SymbolEncoder for RecordingEncoder {
        fn encode(&self, text: &str, style: &EncoderStyle) -> Result<Symbol, EncodeError> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), style.ec_level));
            Ok(Symbol::from_modules(1, vec![true], *style).unwrap())
        }
    }

    struct RejectingEncoder;

    impl SymbolEncoder for RejectingEncoder {
        fn encode(&self, text: &str, _style: &EncoderStyle) -> Result<Symbol, EncodeError> {
            Err(EncodeError(format!("refused '{text}'")))
        }
    }

    #[test]
    fn short_labels_are_unchanged() {
        assert_eq!(truncate_label("ABC", 20), "ABC");
        let twenty = "a".repeat(20);
        assert_eq!(truncate_label(&twenty, 20), twenty);
    }

    #[test]
    fn long_labels_are_cut_to_twenty() {
        let label = truncate_label("ABCDEFGHIJKLMNOPQRSTU", 20);
        assert_eq!(label, "ABCDEFGHIJKLMNOPQ...");
        assert_eq!(label.chars().count(), 20);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let value = "é".repeat(25);
        let label = truncate_label(&value, 20);
        assert_eq!(label.chars().count(), 20);
        assert!(label.starts_with(&"é".repeat(17)));
    }

    #[test]
    fn indexes_are_contiguous_from_one() {
        let encoder = RecordingEncoder::default();
        let view = render(
            parse_content("A\nB\n\n  C  \n"),
            &encoder,
            &ExportConfig::default(),
        )
        .unwrap();

        assert_eq!(view.count(), 3);
        let indexes: Vec<usize> = view.rows().iter().map(|r| r.index).collect();
        assert_eq!(indexes, [1, 2, 3]);
        let labels: Vec<&str> = view.grid().iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["A", "B", "C"]);
    }

    #[test]
    fn each_value_is_encoded_inline_then_grid() {
        let encoder = RecordingEncoder::default();
        render(parse_content("x\ny"), &encoder, &ExportConfig::default()).unwrap();

        let calls = encoder.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            [
                ("x".to_string(), EcLevel::L),
                ("x".to_string(), EcLevel::M),
                ("y".to_string(), EcLevel::L),
                ("y".to_string(), EcLevel::M),
            ]
        );
    }

    #[test]
    fn empty_input_resets_view() {
        let view = render(Vec::new(), &QrEncoder, &ExportConfig::default()).unwrap();
        assert_eq!(view.count(), 0);
        assert!(view.grid().is_empty());
    }

    #[test]
    fn table_keeps_full_value() {
        let long = "https://example.com/a/very/long/path/to/an/asset";
        let view = render(parse_content(long), &QrEncoder, &ExportConfig::default()).unwrap();
        assert_eq!(view.rows()[0].value, long);
        assert_eq!(view.grid()[0].label, "https://example.c...");
        assert_eq!(view.rows()[0].symbol.style().ec_level, EcLevel::L);
        assert_eq!(view.grid()[0].symbol.style().ec_level, EcLevel::M);
    }

    #[test]
    fn encoder_failure_names_the_item() {
        let err = render(parse_content("ok"), &RejectingEncoder, &ExportConfig::default())
            .unwrap_err();
        match err {
            QrSheetError::EncodeFailed { index, detail } => {
                assert_eq!(index, 1);
                assert!(detail.contains("ok"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
