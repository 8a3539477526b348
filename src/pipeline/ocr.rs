//! OCR: the engine seam and the Tesseract implementation.
//!
//! [`OcrEngine`] is synchronous. Engines are expected to block (Tesseract
//! runs as a subprocess), so [`process_page`] always calls them from
//! `spawn_blocking`. Callers can inject their own engine through
//! [`crate::config::ExtractionConfig::engine`]; tests use this to feed canned
//! text through the pipeline.

use crate::config::ExtractionConfig;
use crate::error::{OcrError, Pdf2XlsxError};
use crate::output::PageText;
use crate::pipeline::preprocess;
use image::{DynamicImage, GrayImage};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::debug;

/// A text recogniser for a single binarised page.
pub trait OcrEngine: Send + Sync {
    /// Short engine name used in logs and errors.
    fn name(&self) -> &str;

    /// Recognise the text on `image` using `language` (Tesseract syntax,
    /// e.g. `"nep"` or `"nep+eng"`).
    fn recognize(&self, image: &GrayImage, language: &str) -> Result<String, OcrError>;
}

/// Tesseract via its command-line binary.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: PathBuf,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractEngine {
    /// Use the executable at `command` (a bare name is looked up on `PATH`).
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Check that the binary runs and every `+`-joined language in
    /// `language` is installed.
    pub fn probe(&self, language: &str) -> Result<(), OcrError> {
        let output = self.run(|cmd| cmd.arg("--list-langs"))?;
        // Older releases print the list on stderr.
        let listing = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let installed = parse_language_list(&listing);

        for wanted in language.split('+').map(str::trim).filter(|l| !l.is_empty()) {
            if !installed.iter().any(|l| l == wanted) {
                return Err(OcrError::LanguageMissing {
                    engine: self.name().to_string(),
                    language: wanted.to_string(),
                });
            }
        }
        debug!("tesseract at {} has {:?}", self.command.display(), installed);
        Ok(())
    }

    fn run(
        &self,
        configure: impl FnOnce(&mut Command) -> &mut Command,
    ) -> Result<std::process::Output, OcrError> {
        let mut cmd = Command::new(&self.command);
        configure(&mut cmd);
        match cmd.output() {
            Ok(output) => Ok(output),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(format!(
                    "'{}' not found (install tesseract-ocr or pass --tesseract-cmd)",
                    self.command.display()
                )))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage, language: &str) -> Result<String, OcrError> {
        let dir = TempDir::with_prefix("tesseract")?;
        let input_path = dir.path().join("page.png");
        std::fs::write(&input_path, preprocess::encode_png(image)?)?;

        let output = self.run(|cmd| {
            cmd.arg(&input_path)
                .arg("stdout")
                .args(["-l", language])
        })?;

        if !output.status.success() {
            return Err(OcrError::OcrFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse `tesseract --list-langs` output: one code per line after a
/// `List of available languages ...` header.
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.contains(' ') && !l.ends_with(':'))
        .map(str::to_string)
        .collect()
}

/// Pick the engine for a run: the injected one, else Tesseract.
///
/// Tesseract is probed before any page is rendered so a missing binary or
/// language pack fails fast instead of after minutes of rasterisation.
pub async fn resolve_engine(config: &ExtractionConfig) -> Result<Arc<dyn OcrEngine>, Pdf2XlsxError> {
    if let Some(ref engine) = config.engine {
        return Ok(Arc::clone(engine));
    }

    let engine = TesseractEngine::new(
        config
            .tesseract_cmd
            .clone()
            .unwrap_or_else(|| PathBuf::from("tesseract")),
    );
    let language = config.language.clone();
    let probe_engine = engine.clone();

    tokio::task::spawn_blocking(move || probe_engine.probe(&language))
        .await
        .map_err(|e| Pdf2XlsxError::Internal(format!("OCR probe panicked: {}", e)))?
        .map_err(|e| e.into_fatal("tesseract", 0))?;

    Ok(Arc::new(engine))
}

/// Binarise and recognise one page on a blocking thread.
pub async fn process_page(
    engine: &Arc<dyn OcrEngine>,
    page_num: usize,
    image: DynamicImage,
    config: &ExtractionConfig,
) -> Result<PageText, Pdf2XlsxError> {
    let engine = Arc::clone(engine);
    let threshold = config.threshold;
    let language = config.language.clone();
    let start = Instant::now();

    let text = tokio::task::spawn_blocking(move || {
        let binary = preprocess::prepare_page(&image, threshold);
        engine
            .recognize(&binary, &language)
            .map_err(|e| e.into_fatal(engine.name(), page_num))
    })
    .await
    .map_err(|e| Pdf2XlsxError::Internal(format!("OCR task panicked: {}", e)))??;

    let duration_ms = start.elapsed().as_millis() as u64;
    debug!(
        "Page {}: {} chars in {}ms",
        page_num,
        text.chars().count(),
        duration_ms
    );

    Ok(PageText {
        page_num,
        text,
        duration_ms,
    })
}
