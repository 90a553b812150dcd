//! Turns an uploaded file into a single text string.
//!
//! PDFs are read page by page with `lopdf`; pages that yield no text
//! (scanned images, empty pages) are skipped silently. Everything else is
//! decoded as strict UTF-8.

use thiserror::Error;
use tracing::{debug, info};

use crate::types::Document;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextExtractionError {
    #[error("could not read PDF: {0}")]
    UnreadablePdf(String),

    #[error("PDF has no extractable text on any of its {pages} page(s); scanned documents are not supported")]
    NoExtractableText { pages: usize },

    #[error("file is not valid UTF-8 text (invalid byte at offset {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },
}

const UTF8_BOM: &str = "\u{feff}";

pub fn is_pdf_name(declared_name: &str) -> bool {
    declared_name.to_ascii_lowercase().ends_with(".pdf")
}

/// Extract text from an upload, branching on the declared file name only.
pub fn extract_text(bytes: &[u8], declared_name: &str) -> Result<Document, TextExtractionError> {
    let (text, page_count) = if is_pdf_name(declared_name) {
        let (text, pages) = extract_pdf(bytes)?;
        (text, Some(pages))
    } else {
        (decode_plain(bytes)?, None)
    };

    info!(
        file = %declared_name,
        bytes = bytes.len(),
        chars = text.chars().count(),
        pages = ?page_count,
        "text extracted"
    );

    Ok(Document {
        declared_filename: declared_name.to_string(),
        text,
        page_count,
    })
}

fn extract_pdf(bytes: &[u8]) -> Result<(String, usize), TextExtractionError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| TextExtractionError::UnreadablePdf(e.to_string()))?;

    let pages = doc.get_pages();
    let page_count = pages.len();

    let page_texts = pages.keys().map(|&number| match doc.extract_text(&[number]) {
        Ok(text) => Some(text),
        Err(e) => {
            debug!(page = number, "page text extraction failed, skipping: {e}");
            None
        },
    });
    let text = join_pages(page_texts);

    if text.is_empty() {
        return Err(TextExtractionError::NoExtractableText { pages: page_count });
    }
    Ok((text, page_count))
}

/// Join per-page text with newlines, dropping pages with no usable text.
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    pages
        .into_iter()
        .flatten()
        .map(|p| p.trim_end().to_string())
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_plain(bytes: &[u8]) -> Result<String, TextExtractionError> {
    let text = std::str::from_utf8(bytes).map_err(|e| TextExtractionError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })?;
    Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text).to_string())
}

/// First `limit` characters, with `...` appended when the text is longer.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_suffix_is_case_insensitive() {
        assert!(is_pdf_name("contract.pdf"));
        assert!(is_pdf_name("CONTRACT.PDF"));
        assert!(is_pdf_name("lease.Pdf"));
        assert!(!is_pdf_name("notes.txt"));
        assert!(!is_pdf_name("pdf"));
        assert!(!is_pdf_name("report.pdf.txt"));
    }

    #[test]
    fn plain_text_is_decoded() {
        let doc = extract_text("Payment is due.".as_bytes(), "nda.txt").unwrap();
        assert_eq!(doc.text, "Payment is due.");
        assert_eq!(doc.page_count, None);
        assert_eq!(doc.declared_filename, "nda.txt");
    }

    #[test]
    fn bom_is_stripped() {
        let doc = extract_text("\u{feff}Hello".as_bytes(), "a.txt").unwrap();
        assert_eq!(doc.text, "Hello");
    }

    #[test]
    fn empty_plain_text_is_allowed() {
        let doc = extract_text(b"", "empty.txt").unwrap();
        assert!(doc.text.is_empty());
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let err = extract_text(&[b'o', b'k', 0xff, 0xfe], "bad.txt").unwrap_err();
        assert_eq!(err, TextExtractionError::InvalidUtf8 { valid_up_to: 2 });
    }

    #[test]
    fn garbage_pdf_is_an_error() {
        let err = extract_text(b"definitely not a pdf", "scan.pdf").unwrap_err();
        assert!(matches!(err, TextExtractionError::UnreadablePdf(_)));
    }

    #[test]
    fn join_pages_skips_empty_and_failed_pages() {
        let pages = vec![
            Some("Page one text.\n".to_string()),
            None,
            Some("   \n".to_string()),
            Some(String::new()),
            Some("Page four.".to_string()),
        ];
        assert_eq!(join_pages(pages), "Page one text.\nPage four.");
    }

    #[test]
    fn join_pages_all_empty() {
        assert_eq!(join_pages(vec![None, Some(" ".to_string())]), "");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 500), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("ééééé", 2), "éé...");
        assert_eq!(preview("abc", 3), "abc");
    }
}
