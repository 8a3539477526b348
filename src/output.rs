//! Output types produced by an extraction run.

use crate::error::Pdf2XlsxError;
use crate::pipeline::export;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sex as printed on the rolls. Only these two tokens are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "पुरुष")]
    Male,
    #[serde(rename = "महिला")]
    Female,
}

impl Sex {
    /// The literal Nepali token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "पुरुष",
            Sex::Female => "महिला",
        }
    }

    /// Parse the literal token; anything else is `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "पुरुष" => Some(Sex::Male),
            "महिला" => Some(Sex::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the extracted table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    /// नाम: the name-like text before the age, trimmed.
    pub name: String,
    /// उमेर
    pub age: u32,
    /// लिङ्ग
    pub sex: Sex,
    /// जाति: last whitespace-delimited token of `name`.
    ///
    /// This is a surname heuristic, not a real field. Rolls that print the
    /// caste after the sex token keep it in `remainder` instead.
    pub caste: String,
    /// Text following the sex token up to the end of the line. Not exported
    /// to the spreadsheet.
    pub remainder: String,
}

/// OCR text of a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Raw text returned by the OCR engine.
    pub text: String,
    /// Wall-clock time spent binarising and recognising the page.
    pub duration_ms: u64,
}

impl PageText {
    /// First `max_chars` characters of the text (not bytes: Devanagari is
    /// multi-byte in UTF-8).
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => &self.text[..byte_idx],
            None => &self.text,
        }
    }

    /// Number of recognised characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Document-level metadata read from the PDF info dictionary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Timing and count summary of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the document (or images supplied).
    pub total_pages: usize,
    /// Pages that were rendered and OCR'd.
    pub processed_pages: usize,
    /// Rows matched across the transcript.
    pub record_count: usize,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
}

/// Everything produced by [`crate::extract`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Extracted rows in transcript order.
    pub records: Vec<PersonRecord>,
    /// Per-page OCR text in page order.
    pub pages: Vec<PageText>,
    /// Concatenated, page-headed OCR text the records were matched against.
    pub transcript: String,
    /// `None` when the input was a set of images rather than a PDF.
    pub metadata: Option<DocumentMetadata>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// `true` when the pattern matched nothing.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialise the records as an `.xlsx` workbook in memory.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, Pdf2XlsxError> {
        export::records_to_xlsx(&self.records)
    }
}
