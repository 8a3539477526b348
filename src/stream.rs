//! Streaming OCR API: emit page text as each page is recognised.
//!
//! Large rolls take minutes. [`ocr_stream`] lets callers show per-page text
//! as soon as it is ready instead of waiting for [`crate::extract`]. Pages are
//! rendered up front, then OCR'd with up to `config.concurrency` pages in
//! flight; items are yielded in page order.
//!
//! The stream yields page text only. Record extraction needs the whole
//! transcript, so collect the pages and run
//! [`crate::pipeline::transcript::assemble_transcript`] and
//! [`crate::pipeline::records::extract_records`] once the stream ends.

use crate::config::ExtractionConfig;
use crate::convert::selected_indices;
use crate::error::Pdf2XlsxError;
use crate::output::PageText;
use crate::pipeline::{input, ocr, render};
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of recognised pages.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageText, Pdf2XlsxError>> + Send>>;

/// OCR a PDF, streaming page text as it is ready.
///
/// # Returns
/// - `Ok(PageStream)`: one item per selected page, in page order
/// - `Err(Pdf2XlsxError)`: the input, OCR engine, or rasterisation failed
///   before any page reached OCR
pub async fn ocr_stream(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<PageStream, Pdf2XlsxError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming OCR: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    let engine = ocr::resolve_engine(config).await?;

    let metadata = render::extract_metadata(
        &pdf_path,
        config.password.as_deref(),
        config.pdfium_lib_path.as_deref(),
    )
    .await?;
    let page_indices = selected_indices(config, metadata.page_count)?;

    // Rendering is done before returning, so the resolved input (and any
    // temp file behind it) can be dropped here.
    let rendered = render::render_pages(&pdf_path, config, &page_indices).await?;
    drop(resolved);

    Ok(page_stream(engine, rendered, config))
}

/// [`ocr_stream`] for pages that are already images, numbered from 1.
pub async fn ocr_stream_images(
    images: Vec<DynamicImage>,
    config: &ExtractionConfig,
) -> Result<PageStream, Pdf2XlsxError> {
    let engine = ocr::resolve_engine(config).await?;
    Ok(page_stream(
        engine,
        images.into_iter().enumerate().collect(),
        config,
    ))
}

fn page_stream(
    engine: Arc<dyn ocr::OcrEngine>,
    rendered: Vec<(usize, DynamicImage)>,
    config: &ExtractionConfig,
) -> PageStream {
    let concurrency = config.concurrency.max(1);
    let config = config.clone();

    let s = stream::iter(rendered.into_iter().map(move |(idx, image)| {
        let engine = Arc::clone(&engine);
        let cfg = config.clone();
        async move { ocr::process_page(&engine, idx + 1, image, &cfg).await }
    }))
    .buffered(concurrency);

    Box::pin(s)
}

/// [`ocr_stream`] for PDF bytes held in memory.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2xlsx::{ocr_stream_from_bytes, ExtractionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("roll.pdf")?;
/// let mut pages = ocr_stream_from_bytes(&bytes, &ExtractionConfig::default()).await?;
/// while let Some(page) = pages.next().await {
///     let page = page?;
///     println!("Page {}: {} chars", page.page_num, page.char_count());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn ocr_stream_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<PageStream, Pdf2XlsxError> {
    let resolved = input::resolve_bytes(bytes)?;
    let path = resolved.path().to_string_lossy().to_string();
    let stream = ocr_stream(&path, config).await?;
    drop(resolved);
    Ok(stream)
}
