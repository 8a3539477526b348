//! Pipeline stages for PDF-to-spreadsheet extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ preprocess ──▶ ocr ──▶ transcript ──▶ records ──▶ export
//! (URL/path) (pdfium)  (gray+binary)  (tesseract) (Page N:)    (regex)    (xlsx)
//! ```
//!
//! 1. [`input`]     : canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]    : rasterise selected pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`preprocess`]: grayscale conversion and fixed-threshold binarisation
//! 4. [`ocr`]       : the OCR engine seam and the Tesseract implementation
//! 5. [`transcript`]: join page texts under `Page N:` headers
//! 6. [`records`]   : the record regex and field mapping
//! 7. [`export`]    : the `.xlsx` writer

pub mod export;
pub mod input;
pub mod ocr;
pub mod preprocess;
pub mod records;
pub mod render;
pub mod transcript;
