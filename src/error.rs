//! Error types for the edgequake-pdf2xlsx library.
//!
//! Two error types, one per layer:
//!
//! * [`Pdf2XlsxError`] is **fatal**: the extraction cannot proceed (bad input
//!   file, wrong password, OCR engine missing, a page failed to OCR). Every
//!   stage failure ends the run; there is no partial-result recovery.
//!
//! * [`OcrError`] is raised by an [`crate::pipeline::ocr::OcrEngine`]. The
//!   pipeline wraps it into [`Pdf2XlsxError::OcrFailed`] together with the
//!   page number, or into [`Pdf2XlsxError::OcrEngineUnavailable`] when the
//!   engine cannot run at all.
//!
//! Finding zero records is deliberately *not* an error. It is reported by an
//! empty [`crate::output::ExtractionOutput::records`] and a logged warning.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2xlsx library.
#[derive(Debug, Error)]
pub enum Pdf2XlsxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine cannot run at all (binary or language data missing).
    #[error("OCR engine '{engine}' is not available: {hint}")]
    OcrEngineUnavailable { engine: String, hint: String },

    /// The OCR engine ran but failed on one page.
    #[error("OCR failed on page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// rust_xlsxwriter could not build the workbook.
    #[error("Spreadsheet generation failed: {0}")]
    SpreadsheetFailed(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide, or\n\
set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by an OCR engine implementation.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Language data '{language}' is not installed for {engine}")]
    LanguageMissing { engine: String, language: String },

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl OcrError {
    /// Wrap an engine error into the fatal error for `page`.
    ///
    /// Availability problems keep their own variant so callers can print an
    /// installation hint instead of a per-page failure.
    pub fn into_fatal(self, engine: &str, page: usize) -> Pdf2XlsxError {
        match self {
            OcrError::BackendNotAvailable(hint) => Pdf2XlsxError::OcrEngineUnavailable {
                engine: engine.to_string(),
                hint,
            },
            OcrError::LanguageMissing { engine, language } => {
                Pdf2XlsxError::OcrEngineUnavailable {
                    hint: format!(
                        "language '{language}' is not installed \
                         (Debian/Ubuntu: apt install tesseract-ocr-{language})"
                    ),
                    engine,
                }
            }
            other => Pdf2XlsxError::OcrFailed {
                page,
                detail: other.to_string(),
            },
        }
    }
}
