//! CLI binary for edgequake-pdf2xlsx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig`, shows progress and previews, and writes the sheet.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2xlsx::{
    extract, inspect_with_config, save_records, ExtractionConfig, ExtractionProgressCallback,
    PageSelection, PageText, PersonRecord, ProgressCallback, DEFAULT_FILE_NAME, HEADERS,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Characters of OCR text shown per page with `--preview`.
const PAGE_PREVIEW_CHARS: usize = 500;
/// Rows shown in the result table.
const TABLE_PREVIEW_ROWS: usize = 50;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page, and
/// optionally each page's OCR text as soon as it is recognised.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    preview: bool,
}

impl CliProgressCallback {
    /// Spinner until `on_extraction_start` reports the page count.
    fn new_dynamic(preview: bool) -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER_TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            preview,
        })
    }

    /// No bar, page previews only.
    fn previews_only() -> Arc<Self> {
        Arc::new(Self {
            bar: ProgressBar::hidden(),
            start_times: Mutex::new(HashMap::new()),
            preview: true,
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering and recognising {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_text(&self, page: &PageText) {
        if self.preview {
            let text = format_page_preview(page);
            self.bar.suspend(|| eprintln!("{text}"));
        }
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        let msg: String = if error.chars().count() > 80 {
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
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, record_count: usize) {
        if self.bar.is_hidden() {
            return;
        }
        self.bar.finish_and_clear();
        let mark = if record_count == 0 {
            yellow("⚠")
        } else {
            green("✔")
        };
        eprintln!(
            "{} {} pages recognised, {} records matched",
            mark,
            bold(&total_pages.to_string()),
            bold(&record_count.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract to extracted_data.xlsx in the current directory
  pdf2xlsx roll.pdf

  # Choose the output file
  pdf2xlsx roll.pdf -o ward-4.xlsx

  # Show the first 500 characters of OCR text per page
  pdf2xlsx --preview roll.pdf

  # Only pages 3 to 10, keep the raw transcript for inspection
  pdf2xlsx --pages 3-10 --transcript roll.txt roll.pdf

  # Mixed Nepali/English rolls, lighter threshold for faded scans
  pdf2xlsx --lang nep+eng --threshold 180 roll.pdf

  # Extract from a URL
  pdf2xlsx https://example.org/rolls/ward-4.pdf

  # Inspect PDF metadata (no OCR)
  pdf2xlsx --inspect-only roll.pdf

  # JSON output (records, pages, transcript, stats)
  pdf2xlsx --json roll.pdf > roll.json

OUTPUT COLUMNS:
  नाम     name: text before the age
  उमेर    age: integer
  लिङ्ग    sex: पुरुष or महिला
  जाति    caste: last word of the name

ENVIRONMENT VARIABLES:
  TESSERACT_CMD      Path to the tesseract executable
  PDFIUM_LIB_PATH    Path to an existing libpdfium
  PDF2XLSX_*         Every flag, e.g. PDF2XLSX_DPI=300, PDF2XLSX_LANG=nep+eng
  RUST_LOG           Log filter, overrides -v/-q

SETUP:
  1. Install tesseract with Nepali data:  apt install tesseract-ocr tesseract-ocr-nep
  2. Place libpdfium next to the binary or set PDFIUM_LIB_PATH.
     Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases
"#;

/// Extract Nepali person records from scanned PDFs into an Excel sheet.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2xlsx",
    version,
    about = "Extract Nepali person records from scanned PDFs into an Excel sheet",
    long_about = "OCR scanned Nepali PDFs (voter and census rolls) with Tesseract, pick out \
rows of the form '<name> <age> वर्ष / <पुरुष|महिला> ...', and export them as a four-column \
.xlsx sheet: नाम, उमेर, लिङ्ग, जाति.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Spreadsheet to write.
    #[arg(short, long, env = "PDF2XLSX_OUTPUT", default_value = DEFAULT_FILE_NAME)]
    output: PathBuf,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDF2XLSX_DPI", default_value_t = edgequake_pdf2xlsx::DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Binarisation threshold (0–255). Darker pixels become black.
    #[arg(long, env = "PDF2XLSX_THRESHOLD", default_value_t = edgequake_pdf2xlsx::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Tesseract language(s), e.g. nep or nep+eng.
    #[arg(long = "lang", env = "PDF2XLSX_LANG", default_value = edgequake_pdf2xlsx::DEFAULT_LANGUAGE)]
    language: String,

    /// Path to the tesseract executable.
    #[arg(long, env = "TESSERACT_CMD")]
    tesseract_cmd: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2XLSX_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2XLSX_PASSWORD")]
    password: Option<String>,

    /// Pages OCR'd in parallel (one tesseract process each).
    #[arg(short, long, env = "PDF2XLSX_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Also write the page-headed OCR transcript to this file.
    #[arg(long, env = "PDF2XLSX_TRANSCRIPT")]
    transcript: Option<PathBuf>,

    /// Print structured JSON (ExtractionOutput) to stdout.
    #[arg(long, env = "PDF2XLSX_JSON")]
    json: bool,

    /// Print the first 500 characters of OCR text for each page.
    #[arg(long, env = "PDF2XLSX_PREVIEW")]
    preview: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2XLSX_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no OCR.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2XLSX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2XLSX_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2XLSX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would fight with the progress bar for the terminal.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let meta = inspect_with_config(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let preview = cli.preview && !cli.quiet;
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic(preview) as Arc<dyn ExtractionProgressCallback>)
    } else if preview {
        Some(CliProgressCallback::previews_only() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract(&cli.input, &config)
        .await
        .context("Extraction failed")?;

    if let Some(ref path) = cli.transcript {
        tokio::fs::write(path, &output.transcript)
            .await
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !output.is_empty() && !cli.quiet && !cli.json {
        print_table(&output.records);
    }

    let written = save_records(&output, &cli.output).context("Failed to write spreadsheet")?;
    if !written {
        if !cli.quiet {
            eprintln!(
                "{} {}",
                yellow("⚠"),
                bold("No data matched the expected pattern. No spreadsheet was written.")
            );
        }
        return Ok(());
    }

    if !cli.quiet {
        eprintln!(
            "{}  {} records  {}/{} pages  {}ms  →  {}",
            green("✔"),
            output.stats.record_count,
            output.stats.processed_pages,
            output.stats.total_pages,
            output.stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .threshold(cli.threshold)
        .language(cli.language.clone())
        .pages(pages)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref cmd) = cli.tesseract_cmd {
        builder = builder.tesseract_cmd(cmd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Heading plus the first [`PAGE_PREVIEW_CHARS`] characters of a page's OCR text.
fn format_page_preview(page: &PageText) -> String {
    let preview = page.preview(PAGE_PREVIEW_CHARS);
    let more = if preview.len() < page.text.len() {
        dim("…")
    } else {
        String::new()
    };
    format!(
        "{}\n{}{}\n",
        cyan(&format!("── Page {} ──", page.page_num)),
        preview.trim_end(),
        more
    )
}

/// Aligned preview of the first [`TABLE_PREVIEW_ROWS`] records.
fn print_table(records: &[PersonRecord]) {
    let shown = &records[..records.len().min(TABLE_PREVIEW_ROWS)];
    let rows: Vec<[String; 4]> = shown
        .iter()
        .map(|r| {
            [
                r.name.clone(),
                r.age.to_string(),
                r.sex.to_string(),
                r.caste.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: [&str; 4]| -> String {
        cells
            .iter()
            .zip(widths)
            .map(|(c, w)| pad(c, w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    eprintln!("{}", bold(&line(HEADERS)));
    for row in &rows {
        eprintln!("{}", line([row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()]));
    }
    if records.len() > shown.len() {
        eprintln!(
            "{}",
            dim(&format!("… {} more rows in the spreadsheet", records.len() - shown.len()))
        );
    }
}

/// Left-align `s` in `width` characters.
fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.chars().count());
    format!("{s}{}", " ".repeat(fill))
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
