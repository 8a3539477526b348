//! Configuration types for PDF-to-spreadsheet extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The defaults reproduce the settings the
//! scanned Nepali voter and census rolls were tuned against: 383 DPI, a
//! binarisation threshold of 200, and the `nep` Tesseract model.

use crate::error::Pdf2XlsxError;
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default rendering resolution.
pub const DEFAULT_DPI: u32 = 383;

/// Default luma threshold: pixels darker than this become black.
pub const DEFAULT_THRESHOLD: u8 = 200;

/// Default Tesseract language model.
pub const DEFAULT_LANGUAGE: &str = "nep";

/// Configuration for an extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2xlsx::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .threshold(180)
///     .language("nep+eng")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 383.
    ///
    /// Devanagari conjuncts and the matra line lose detail below ~300 DPI on
    /// typical scanned rolls; 383 is what the extraction pattern was tuned on.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 8000.
    ///
    /// Caps memory for oversized pages independently of `dpi`. An A4 page at
    /// 383 DPI is about 3200 × 4500 px and stays well below the cap.
    pub max_rendered_pixels: u32,

    /// Binarisation threshold. Luma values below it become black. Default: 200.
    pub threshold: u8,

    /// Tesseract language model(s), e.g. `"nep"` or `"nep+eng"`. Default: `"nep"`.
    pub language: String,

    /// Path to the `tesseract` executable. `None` searches `PATH`.
    pub tesseract_cmd: Option<PathBuf>,

    /// Pre-constructed OCR engine. Takes precedence over `tesseract_cmd`.
    pub engine: Option<Arc<dyn OcrEngine>>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Number of pages OCR'd at the same time. Default: 1.
    ///
    /// Each page runs its own `tesseract` process, so this is bounded by CPU
    /// cores rather than I/O. Page order in the transcript is preserved
    /// regardless of the value.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Explicit path to the pdfium shared library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            max_rendered_pixels: 8000,
            threshold: DEFAULT_THRESHOLD,
            language: DEFAULT_LANGUAGE.to_string(),
            tesseract_cmd: None,
            engine: None,
            password: None,
            pages: PageSelection::default(),
            concurrency: 1,
            download_timeout_secs: 120,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("threshold", &self.threshold)
            .field("language", &self.language)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field("pages", &self.pages)
            .field("concurrency", &self.concurrency)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = Some(cmd.into());
        self
    }

    pub fn engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Pdf2XlsxError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(Pdf2XlsxError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.language.trim().is_empty() {
            return Err(Pdf2XlsxError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(Pdf2XlsxError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Process all pages (default).
    #[default]
    All,
    /// Process a single page (1-indexed).
    Single(usize),
    /// Process a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Process specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
