//! # edgequake-pdf2xlsx
//!
//! Extract person records from scanned Nepali PDFs with OCR and export them
//! to an Excel workbook.
//!
//! ## Why this crate?
//!
//! Voter and census rolls are published as scanned PDFs with no text layer.
//! This crate rasterises each page, binarises it, runs Tesseract with the
//! Nepali (`nep`) model, and picks rows of the form
//! `<name> <age> वर्ष / <पुरुष|महिला> ...` out of the recognised text. The
//! rows become a four-column sheet: नाम, उमेर, लिङ्ग, जाति.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       resolve local file, download URL, or spill bytes
//!  ├─ 2. Render      rasterise pages via pdfium at 383 DPI (spawn_blocking)
//!  ├─ 3. Preprocess  grayscale + fixed threshold at 200
//!  ├─ 4. OCR         tesseract -l nep, one subprocess per page
//!  ├─ 5. Transcript  "Page N:" headed concatenation
//!  ├─ 6. Records     regex match into name / age / sex / caste
//!  └─ 7. Export      single-sheet .xlsx
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2xlsx::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let output = extract("roll.pdf", &config).await?;
//!     for r in &output.records {
//!         println!("{} | {} | {} | {}", r.name, r.age, r.sex, r.caste);
//!     }
//!     std::fs::write("extracted_data.xlsx", output.to_xlsx()?)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2xlsx` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2xlsx = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! * a pdfium shared library (see [`pipeline::render::bind_pdfium`])
//! * `tesseract` on `PATH` with the `nep` language pack, unless a custom
//!   [`OcrEngine`] is injected through [`ExtractionConfigBuilder::engine`]

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, PageSelection, DEFAULT_DPI, DEFAULT_LANGUAGE,
    DEFAULT_THRESHOLD,
};
pub use convert::{
    extract, extract_from_bytes, extract_images, extract_sync, extract_to_file, inspect,
    inspect_with_config, save_records,
};
pub use error::{OcrError, Pdf2XlsxError};
pub use output::{
    DocumentMetadata, ExtractionOutput, ExtractionStats, PageText, PersonRecord, Sex,
};
pub use pipeline::export::{DEFAULT_FILE_NAME, HEADERS, SHEET_NAME, XLSX_MIME_TYPE};
pub use pipeline::ocr::{OcrEngine, TesseractEngine};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{ocr_stream, ocr_stream_from_bytes, ocr_stream_images, PageStream};
