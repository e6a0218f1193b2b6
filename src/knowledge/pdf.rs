//! PDF text extraction.

use crate::error::{GuardianError, Result};
use std::path::Path;
use tracing::debug;

/// Extract the text of every page, one page per line block.
///
/// Pages whose text cannot be decoded are skipped.
pub fn load_pdf_text(path: &Path) -> Result<String> {
    let _span = tracing::info_span!("knowledge.pdf", path = %path.display()).entered();

    let doc = lopdf::Document::load(path)
        .map_err(|e| GuardianError::Pdf(format!("Failed to load {}: {}", path.display(), e)))?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => debug!("Skipping page {}: {}", page_num, e),
        }
    }

    Ok(text)
}
