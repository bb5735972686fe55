//! CLI binary for qrsheet.
//!
//! A thin shim over the library crate: the positional argument plays the
//! file picker, the results table goes to stdout, and the export runs right
//! after a successful import.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use qrsheet::{
    EncoderStyle, ExportConfig, ExportProgressCallback, HexColor, PageFormat, ProgressCallback,
    Session, StatusMessage,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal stand-in for the export button: the bar's message is the
/// control's label, and every finished page gets a log line.
///
/// The bar stays hidden until the control leaves `Idle`, and is cleared when
/// the control returns to `Idle`, so runs that never start an export or stop
/// before the first page leave nothing behind on stderr.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        // Length set in on_export_start; drawn once the control is disabled.
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden());

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn reveal(&self) {
        if self.bar.is_hidden() && !self.bar.is_finished() {
            self.bar.set_draw_target(ProgressDrawTarget::stderr());
            self.bar.enable_steady_tick(Duration::from_millis(80));
        }
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Exporting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0) as f64
            / 1000.0
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_export_start(&self, total_pages: usize, total_items: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Exporting {total_items} codes on {total_pages} pages…"
            ))
        ));
    }

    fn on_control_changed(&self, label: &str, enabled: bool) {
        if enabled {
            // Back to Idle: success, failure or an early exit.
            if !self.bar.is_finished() {
                self.bar.finish_and_clear();
            }
            return;
        }
        self.reveal();
        self.bar.set_message(label.to_string());
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page_num, Instant::now());
    }

    fn on_page_complete(&self, page_num: usize, total: usize, items: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{items:>3} codes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_export_complete(&self, total_pages: usize, path: &Path) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages written to {}",
            green("✔"),
            bold(&total_pages.to_string()),
            bold(&path.display().to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Import values and export the PDF to the current directory
  qrsheet values.txt

  # Show the results table with terminal-rendered codes, no PDF
  qrsheet --codes --skip-export values.txt

  # Letter paper, 40 codes per page in 4 columns, into ./labels
  qrsheet --page-format letter --per-page 40 --columns 4 -o labels values.txt

  # Machine-readable summary
  qrsheet --json values.txt > summary.json

INPUT FORMAT:
  One value per line. Blank lines and surrounding whitespace are ignored;
  CRLF, LF and CR line endings are all accepted. Duplicates are kept.

OUTPUT:
  <prefix><YYYYMMDD>.pdf (UTC date), default prefix "generatedQrCode_".
  Each page holds up to --per-page codes, labelled with the value
  (values longer than 20 characters are shortened with "...").
"#;

/// Generate QR codes for every line of a text file and export them as a PDF sheet.
#[derive(Parser, Debug)]
#[command(
    name = "qrsheet",
    version,
    about = "Generate QR codes for every line of a text file and export them as a PDF sheet",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Text file with one value per line.
    input: Option<PathBuf>,

    /// Directory the PDF is written to.
    #[arg(short, long, env = "QRSHEET_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Output filename prefix (the date and .pdf are appended).
    #[arg(long, env = "QRSHEET_PREFIX", default_value = "generatedQrCode_")]
    prefix: String,

    /// Codes per PDF page.
    #[arg(long, env = "QRSHEET_PER_PAGE", default_value_t = 50,
          value_parser = clap::value_parser!(u32).range(1..))]
    per_page: u32,

    /// Codes per grid row.
    #[arg(long, env = "QRSHEET_COLUMNS", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..=20))]
    columns: u32,

    /// Paper size.
    #[arg(long, env = "QRSHEET_PAGE_FORMAT", value_enum, default_value = "a4")]
    page_format: PageFormatArg,

    /// Page margin in millimetres.
    #[arg(long, env = "QRSHEET_MARGIN", default_value_t = 5.0)]
    margin: f32,

    /// Rasterisation scale factor (0.5–4.0).
    #[arg(long, env = "QRSHEET_SCALE", default_value_t = 1.5)]
    scale: f32,

    /// JPEG quality of the page images (1–100).
    #[arg(long, env = "QRSHEET_JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Dark colour of the grid codes, #rrggbb.
    #[arg(long, env = "QRSHEET_GRID_DARK")]
    grid_dark: Option<String>,

    /// Dark colour of the table codes, #rrggbb.
    #[arg(long, env = "QRSHEET_INLINE_DARK")]
    inline_dark: Option<String>,

    /// Print the results table (index and value) to stdout.
    #[arg(long)]
    table: bool,

    /// Print the results table with each code rendered in the terminal.
    #[arg(long)]
    codes: bool,

    /// Import and render only; do not write a PDF.
    #[arg(long)]
    skip_export: bool,

    /// Output a JSON summary instead of human-readable text.
    #[arg(long, env = "QRSHEET_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "QRSHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "QRSHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "QRSHEET_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PageFormatArg {
    A4,
    Letter,
}

impl From<PageFormatArg> for PageFormat {
    fn from(v: PageFormatArg) -> Self {
        match v {
            PageFormatArg::A4 => PageFormat::A4,
            PageFormatArg::Letter => PageFormat::Letter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.skip_export;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ExportProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Import ───────────────────────────────────────────────────────────
    let mut session = Session::new(config);
    let imported = session.import(cli.input.as_deref()).await;
    if !cli.quiet && !cli.json {
        if let Some(status) = session.status() {
            print_status(status);
        }
    }
    imported.context("Import failed")?;

    if cli.table || cli.codes {
        print_table(&session, cli.codes).context("Failed to write to stdout")?;
    }

    // ── Export ───────────────────────────────────────────────────────────
    let output = if cli.skip_export {
        None
    } else {
        Some(session.export().await.context("Export failed")?)
    };

    if cli.json {
        let summary = serde_json::json!({
            "status": session.status(),
            "count": session.count(),
            "items": session
                .view()
                .rows()
                .iter()
                .map(|r| serde_json::json!({ "index": r.index, "value": r.value }))
                .collect::<Vec<_>>(),
            "export": output,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if let Some(ref out) = output {
        // The progress callback already printed the final line.
        if !cli.quiet && !show_progress {
            eprintln!(
                "{}  {} codes  {} pages  {}ms  →  {}",
                green("✔"),
                out.stats.total_items,
                out.stats.total_pages,
                out.stats.total_duration_ms,
                bold(&out.path.display().to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ExportConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExportConfig> {
    let mut grid_style = EncoderStyle::grid();
    if let Some(ref hex) = cli.grid_dark {
        grid_style.dark = hex.parse::<HexColor>().context("Invalid --grid-dark")?;
    }
    let mut inline_style = EncoderStyle::inline();
    if let Some(ref hex) = cli.inline_dark {
        inline_style.dark = hex.parse::<HexColor>().context("Invalid --inline-dark")?;
    }

    let mut builder = ExportConfig::builder()
        .items_per_page(cli.per_page as usize)
        .columns(cli.columns)
        .page_format(cli.page_format.clone().into())
        .margin_mm(cli.margin)
        .snapshot_scale(cli.scale)
        .jpeg_quality(cli.jpeg_quality)
        .grid_style(grid_style)
        .inline_style(inline_style)
        .file_prefix(cli.prefix.clone())
        .output_dir(cli.output_dir.clone());

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_status(status: &StatusMessage) {
    if status.is_error() {
        eprintln!("{} {}", red("✘"), red(&status.text));
    } else {
        eprintln!("{} {}", green("✔"), green(&status.text));
    }
}

/// Results table: index, value and optionally the inline code.
fn print_table(session: &Session, with_codes: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let width = session.count().to_string().len().max(1);

    writeln!(out, "{}", bold(&format!("{:>width$}  Value", "#")))?;
    for row in session.view().rows() {
        writeln!(out, "{:>width$}  {}", row.index, row.value)?;
        if with_codes {
            for line in row.symbol.to_terminal().lines() {
                writeln!(out, "{:>width$}  {}", "", line)?;
            }
        }
    }
    writeln!(out, "{}", dim(&format!("{} items", session.count())))?;
    Ok(())
}
