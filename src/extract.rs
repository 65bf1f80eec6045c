//! PDF text extraction for knowledge ingestion.
//!
//! Extraction is an administrative concern: `ops kb add --file` and
//! `ops kb import` call it to turn uploaded documents into matchable plain
//! text. The query path never extracts anything.
//!
//! Failures never propagate — a document that cannot be parsed yields the
//! fixed [`EXTRACTION_FAILED`] placeholder so the admin flow continues and
//! the operator can paste the content manually.

use std::path::Path;

/// Placeholder content stored when extraction fails.
pub const EXTRACTION_FAILED: &str = "[text extraction failed - enter content manually]";

/// Marker inserted between pages of extracted PDF text.
pub const PAGE_DELIMITER: &str = "\n\n--- page break ---\n\n";

/// Extract plain text from PDF bytes, joining pages with
/// [`PAGE_DELIMITER`]. Returns [`EXTRACTION_FAILED`] on any parse failure
/// or when the document contains no extractable text.
pub fn extract_pdf_text(bytes: &[u8]) -> String {
    match pdf_extract::extract_text_from_mem_by_pages(bytes) {
        Ok(pages) => {
            let joined = pages
                .iter()
                .map(|p| p.trim())
                .collect::<Vec<_>>()
                .join(PAGE_DELIMITER);
            if joined.trim().is_empty() {
                EXTRACTION_FAILED.to_string()
            } else {
                joined
            }
        }
        Err(_) => EXTRACTION_FAILED.to_string(),
    }
}

/// Guess the attachment MIME type from a file extension.
///
/// Returns `None` for types the generation service cannot accept inline;
/// callers skip the attachment in that case, which is what keeps every
/// stored payload tagged with a type.
pub fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
