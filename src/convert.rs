//! Eager (full-document) extraction entry points.
//!
//! These functions wait for every selected page, then return the records,
//! per-page text, and transcript together. Use [`crate::stream::ocr_stream`]
//! instead when pages should be shown as they finish.
//!
//! Any stage failure ends the run. Finding zero records does not: the output
//! simply has an empty `records` vector and a warning is logged.

use crate::config::ExtractionConfig;
use crate::error::Pdf2XlsxError;
use crate::output::{DocumentMetadata, ExtractionOutput, ExtractionStats, PageText};
use crate::pipeline::{export, input, ocr, records, render, transcript};
use futures::stream::{self, StreamExt, TryStreamExt};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract records from a PDF file or URL.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_str`: Local file path or HTTP/HTTPS URL to a PDF
/// * `config`: Extraction configuration
///
/// # Errors
/// Every failure is fatal: unreadable input, a PDF pdfium cannot open, a
/// missing OCR engine, or a page that fails to render or recognise.
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2XlsxError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    extract_pdf(resolved.path(), config, total_start).await
}

/// Extract records from PDF bytes held in memory.
///
/// The bytes are spilled to a managed temp file (pdfium opens by path) that
/// is removed when this function returns.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2xlsx::{extract_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("roll.pdf")?;
/// let output = extract_from_bytes(&bytes, &ExtractionConfig::default()).await?;
/// println!("{} records", output.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2XlsxError> {
    let total_start = Instant::now();
    let resolved = input::resolve_bytes(bytes)?;
    extract_pdf(resolved.path(), config, total_start).await
}

/// Run OCR and record extraction on pages that are already images.
///
/// Pages are numbered from 1 in the order given. `config.pages` is ignored;
/// pass only the images to process.
pub async fn extract_images(
    images: Vec<DynamicImage>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2XlsxError> {
    let total_start = Instant::now();
    let total_pages = images.len();
    if total_pages == 0 {
        return Err(Pdf2XlsxError::InvalidInput {
            input: "<no images>".to_string(),
        });
    }

    let engine = ocr::resolve_engine(config).await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(total_pages);
    }

    let indexed = images.into_iter().enumerate().collect();
    let ocr_start = Instant::now();
    let pages = ocr_pages(&engine, indexed, total_pages, config).await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    Ok(finish(
        pages,
        None,
        total_pages,
        0,
        ocr_duration_ms,
        total_start,
        config,
    ))
}

/// Extract records and write them to an `.xlsx` file.
///
/// When nothing matches, a warning is logged and no file is written; the
/// returned stats then show `record_count == 0`.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, Pdf2XlsxError> {
    let output = extract(input_str, config).await?;
    save_records(&output, output_path)?;
    Ok(output.stats)
}

/// Write `output.records` to an `.xlsx` file, unless there are none.
///
/// Returns `true` when the file was written. With zero records a warning is
/// logged and nothing at `path` is created or touched.
pub fn save_records(
    output: &ExtractionOutput,
    path: impl AsRef<Path>,
) -> Result<bool, Pdf2XlsxError> {
    let path = path.as_ref();
    if output.is_empty() {
        warn!("No records matched; not writing {}", path.display());
        return Ok(false);
    }

    export::write_xlsx(&output.records, path)?;
    info!("Wrote {} records to {}", output.records.len(), path.display());
    Ok(true)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2XlsxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2XlsxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Read PDF metadata without rendering or OCR.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, Pdf2XlsxError> {
    inspect_with_config(input_str, &ExtractionConfig::default()).await
}

/// [`inspect`] honouring the password, download timeout, and pdfium path
/// from `config`.
pub async fn inspect_with_config(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<DocumentMetadata, Pdf2XlsxError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    render::extract_metadata(
        resolved.path(),
        config.password.as_deref(),
        config.pdfium_lib_path.as_deref(),
    )
    .await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn extract_pdf(
    pdf_path: &Path,
    config: &ExtractionConfig,
    total_start: Instant,
) -> Result<ExtractionOutput, Pdf2XlsxError> {
    // Probe OCR first: a missing tesseract should not cost a full render.
    let engine = ocr::resolve_engine(config).await?;

    let metadata = render::extract_metadata(
        pdf_path,
        config.password.as_deref(),
        config.pdfium_lib_path.as_deref(),
    )
    .await?;
    let total_pages = metadata.page_count;
    info!("PDF has {} pages", total_pages);

    let page_indices = selected_indices(config, total_pages)?;
    debug!("Selected {} pages for OCR", page_indices.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(page_indices.len());
    }

    let render_start = Instant::now();
    let rendered = render::render_pages(pdf_path, config, &page_indices).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rendered {} pages in {}ms",
        rendered.len(),
        render_duration_ms
    );

    let ocr_start = Instant::now();
    let pages = ocr_pages(&engine, rendered, total_pages, config).await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    Ok(finish(
        pages,
        Some(metadata),
        total_pages,
        render_duration_ms,
        ocr_duration_ms,
        total_start,
        config,
    ))
}

/// Resolve the page selection, rejecting one that selects nothing.
pub(crate) fn selected_indices(
    config: &ExtractionConfig,
    total_pages: usize,
) -> Result<Vec<usize>, Pdf2XlsxError> {
    let indices = config.pages.to_indices(total_pages);
    if indices.is_empty() {
        return Err(Pdf2XlsxError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }
    Ok(indices)
}

/// OCR `(page_index_0based, image)` pairs, up to `config.concurrency` at a
/// time, returning pages in input order. Stops at the first failure.
///
/// Page events carry the document page number and `total`, the document's
/// page count, so a partial selection reports e.g. "5/12".
async fn ocr_pages(
    engine: &Arc<dyn ocr::OcrEngine>,
    rendered: Vec<(usize, DynamicImage)>,
    total: usize,
    config: &ExtractionConfig,
) -> Result<Vec<PageText>, Pdf2XlsxError> {
    stream::iter(rendered.into_iter().map(|(idx, image)| {
        let engine = Arc::clone(engine);
        async move {
            let page_num = idx + 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_start(page_num, total);
            }
            let result = ocr::process_page(&engine, page_num, image, config).await;
            if let Some(ref cb) = config.progress_callback {
                match &result {
                    Ok(page) => {
                        cb.on_page_complete(page_num, total, page.char_count());
                        cb.on_page_text(page);
                    }
                    Err(e) => cb.on_page_error(page_num, total, &e.to_string()),
                }
            }
            result
        }
    }))
    .buffered(config.concurrency.max(1))
    .try_collect()
    .await
}

/// Assemble the transcript, match records, and compute stats.
fn finish(
    pages: Vec<PageText>,
    metadata: Option<DocumentMetadata>,
    total_pages: usize,
    render_duration_ms: u64,
    ocr_duration_ms: u64,
    total_start: Instant,
    config: &ExtractionConfig,
) -> ExtractionOutput {
    let transcript = transcript::assemble_transcript(&pages);
    let records = records::extract_records(&transcript);

    if records.is_empty() {
        warn!(
            "No records matched across {} pages; check the scan quality or OCR language",
            pages.len()
        );
    }

    let stats = ExtractionStats {
        total_pages,
        processed_pages: pages.len(),
        record_count: records.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        ocr_duration_ms,
    };

    info!(
        "Extraction complete: {} records from {} pages, {}ms total",
        stats.record_count, stats.processed_pages, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(pages.len(), records.len());
    }

    ExtractionOutput {
        records,
        pages,
        transcript,
        metadata,
        stats,
    }
}
