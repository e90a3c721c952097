//! Text Extractor: turns an uploaded PDF, DOCX or plain-text document into a string.
//!
//! Uploaded bytes are staged in a scoped temporary file while the format-specific
//! parser runs. The file is removed on every exit path, including parser panics
//! (RAII drop of `NamedTempFile`).

use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

pub mod docx;
pub mod pdf;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported file type '{0}'")]
    UnsupportedFormat(String),

    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("file is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("extraction task failed: {0}")]
    Task(String),
}

/// The document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    /// Resolves a (lower-cased) file extension. Returns `None` for anything unsupported.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

/// A named byte blob received from the client. Lives for one request.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub data: Bytes,
}

impl UploadedDocument {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    /// Declared extension: text after the last `.`, lower-cased. Empty when there is none.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// Extracts the plain text of `doc`, dispatching on its declared extension.
pub fn extract_text(doc: &UploadedDocument) -> Result<String, ExtractionError> {
    let ext = doc.extension();
    let format =
        DocumentFormat::from_extension(&ext).ok_or(ExtractionError::UnsupportedFormat(ext))?;

    debug!(
        file_name = %doc.file_name,
        format = format.extension(),
        bytes = doc.data.len(),
        "Extracting document text"
    );

    let text = with_temp_file(&doc.data, format.extension(), |path| match format {
        DocumentFormat::Pdf => pdf::extract(path),
        DocumentFormat::Docx => docx::extract(path),
        DocumentFormat::Txt => read_utf8(path),
    })?;

    debug!(file_name = %doc.file_name, chars = text.chars().count(), "Extraction complete");
    Ok(text)
}

/// Runs [`extract_text`] on the blocking pool; parsing is synchronous and file-bound.
pub async fn extract_text_blocking(doc: UploadedDocument) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_text(&doc))
        .await
        .map_err(|e| ExtractionError::Task(e.to_string()))?
}

/// Writes `data` to a temporary file with the given suffix, hands its path to `parse`,
/// and removes the file before returning whatever `parse` produced.
pub(crate) fn with_temp_file<T>(
    data: &[u8],
    suffix: &str,
    parse: impl FnOnce(&Path) -> Result<T, ExtractionError>,
) -> Result<T, ExtractionError> {
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!(".{suffix}"))
        .tempfile()?;
    file.write_all(data)?;
    file.flush()?;

    let result = parse(file.path());

    if let Err(e) = file.close() {
        warn!("Failed to remove temporary upload file: {e}");
    }
    result
}

fn read_utf8(path: &Path) -> Result<String, ExtractionError> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| ExtractionError::Encoding(e.utf8_error().to_string()))
}
