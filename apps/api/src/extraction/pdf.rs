use std::path::Path;

use super::ExtractionError;

/// Extracts per-page text from the PDF at `path`, trims each page, and joins the
/// non-empty pages with newlines.
pub fn extract(path: &Path) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed documents instead of returning an error.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
        .map_err(|_| {
            ExtractionError::Pdf("parser aborted on a malformed document".to_string())
        })?
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    Ok(join_pages(pages))
}

/// Trims leading and trailing whitespace from each page, drops pages left empty,
/// and joins the rest in page order.
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    pages
        .into_iter()
        .map(|page| page.trim().to_string())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
