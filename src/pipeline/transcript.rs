//! Join per-page OCR text into one transcript.
//!
//! Every page is written as `Page {n}:\n{text}\n\n`. The header line sits
//! between pages, so a record that starts at the bottom of one page and ends
//! at the top of the next never matches the record pattern. That limitation
//! is accepted: rolls print each person on a single line.

use crate::output::PageText;

/// Header line preceding page `page_num`.
pub fn page_header(page_num: usize) -> String {
    format!("Page {}:\n", page_num)
}

/// Concatenate pages in ascending page order under their headers.
pub fn assemble_transcript(pages: &[PageText]) -> String {
    let mut ordered: Vec<&PageText> = pages.iter().collect();
    ordered.sort_by_key(|p| p.page_num);

    let capacity = ordered.iter().map(|p| p.text.len() + 16).sum();
    let mut out = String::with_capacity(capacity);
    for page in ordered {
        out.push_str(&page_header(page.page_num));
        out.push_str(&page.text);
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page_num: usize, text: &str) -> PageText {
        PageText {
            page_num,
            text: text.to_string(),
            duration_ms: 0,
        }
    }

    #[test]
    fn pages_get_headers_in_order() {
        let transcript = assemble_transcript(&[page(2, "दोस्रो"), page(1, "पहिलो")]);
        assert_eq!(transcript, "Page 1:\nपहिलो\n\nPage 2:\nदोस्रो\n\n");
    }

    #[test]
    fn empty_page_still_gets_header() {
        assert_eq!(assemble_transcript(&[page(3, "")]), "Page 3:\n\n\n");
    }

    #[test]
    fn no_pages_is_empty() {
        assert_eq!(assemble_transcript(&[]), "");
    }
}
