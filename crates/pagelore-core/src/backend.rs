use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF page extraction backends.
///
/// Implementors provide the low-level per-page text step; the analysis
/// pipeline (prompting, response parsing, knowledge accumulation) lives in
/// [`crate::reader`].
pub trait PageSource: Send + Sync {
    /// Extract the text of every page of a PDF file, in document order.
    ///
    /// Blank pages are returned as empty (or whitespace-only) strings so
    /// page numbering stays aligned with the document.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError>;
}
