//! PDF rasterisation: render selected pages to `DynamicImage` via pdfium.
//!
//! pdfium keeps thread-local state and blocks for the whole render, so all
//! calls run inside `tokio::task::spawn_blocking`. Pages are scaled by
//! `dpi / 72` (PDF user space is 72 units per inch) and clamped to
//! `max_rendered_pixels` on both edges.

use crate::config::ExtractionConfig;
use crate::error::Pdf2XlsxError;
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Bind to a pdfium library.
///
/// Lookup order: `lib_path` if given, then `PDFIUM_LIB_PATH`, then a library
/// next to the working directory, then the system library search path.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, Pdf2XlsxError> {
    let explicit: Option<PathBuf> = lib_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = match explicit {
        Some(path) => Pdfium::bind_to_library(&path).map_err(|e| {
            Pdf2XlsxError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
        })?,
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| Pdf2XlsxError::PdfiumBindingFailed(e.to_string()))?,
    };

    Ok(Pdfium::new(bindings))
}

/// Rasterise selected pages of a PDF.
///
/// # Returns
/// `(page_index_0based, DynamicImage)` tuples in ascending page order.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ExtractionConfig,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, Pdf2XlsxError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();
    let lib_path = config.pdfium_lib_path.clone();
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium(lib_path.as_deref())?;
        render_pages_blocking(&pdfium, &path, dpi, max_pixels, password.as_deref(), &indices)
    })
    .await
    .map_err(|e| Pdf2XlsxError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pages_blocking(
    pdfium: &Pdfium,
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, Pdf2XlsxError> {
    let document = open_document(pdfium, pdf_path, password)?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages, rendering at {} DPI", total_pages, dpi);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / PDF_POINTS_PER_INCH)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total_pages {
            warn!(
                "Skipping page {} (out of range, total={})",
                idx + 1,
                total_pages
            );
            continue;
        }

        let rasterisation_failed = |e: PdfiumError| Pdf2XlsxError::RasterisationFailed {
            page: idx + 1,
            detail: format!("{:?}", e),
        };

        let page = pages.get(idx as u16).map_err(rasterisation_failed)?;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(rasterisation_failed)?;
        let image = bitmap.as_image();

        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push((idx, image));
    }

    Ok(results)
}

/// Open a document, classifying password failures.
fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2XlsxError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.to_lowercase().contains("password") {
            if password.is_some() {
                Pdf2XlsxError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Pdf2XlsxError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Pdf2XlsxError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail,
            }
        }
    })
}

/// Read document metadata without rendering pages.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<DocumentMetadata, Pdf2XlsxError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);
    let lib = lib_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium(lib.as_deref())?;
        extract_metadata_blocking(&pdfium, &path, pwd.as_deref())
    })
    .await
    .map_err(|e| Pdf2XlsxError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_metadata_blocking(
    pdfium: &Pdfium,
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2XlsxError> {
    let document = open_document(pdfium, pdf_path, password)?;
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}
