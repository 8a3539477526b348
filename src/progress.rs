//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline OCRs each page. The CLI drives its progress bar
//! from these events; other hosts can forward them to a channel, a
//! WebSocket, or a log.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2xlsx::{ExtractionProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} OCR'd ({} chars)", page_num, total_pages, text_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::PageText;
use std::sync::Arc;

/// Called by the extraction pipeline as it processes each page.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the page
/// events arrive from several tasks at once. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first page is OCR'd.
    ///
    /// # Arguments
    /// * `total_pages`: number of pages selected for processing
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is binarised and sent to the OCR engine.
    ///
    /// `page_num` is the 1-indexed page in the document and `total_pages` the
    /// document's page count, which exceeds the selection when only some
    /// pages are processed.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been OCR'd.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: pages in the document
    /// * `text_len`   : number of characters recognised on the page
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called right after [`Self::on_page_complete`] with the recognised text.
    fn on_page_text(&self, page: &PageText) {
        let _ = page;
    }

    /// Called when a page fails. The run stops after this event.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after record extraction.
    ///
    /// # Arguments
    /// * `total_pages` : pages processed
    /// * `record_count`: rows matched across the whole transcript
    fn on_extraction_complete(&self, total_pages: usize, record_count: usize) {
        let _ = (total_pages, record_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
