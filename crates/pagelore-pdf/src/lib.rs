use std::path::{Path, PathBuf};

use pagelore_core::{BackendError, PageSource};

/// pdf-extract based implementation of [`PageSource`].
///
/// Pure Rust, so it needs no system libraries. The whole file is read
/// into memory and split into per-page text. Scanned books without a
/// text layer come back as blank pages, which the reader skips without
/// spending an API call.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractSource;

impl PdfExtractSource {
    pub fn new() -> Self {
        Self
    }
}

impl PageSource for PdfExtractSource {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let bytes = std::fs::read(path).map_err(|e| BackendError::OpenError(e.to_string()))?;
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))
    }
}

/// List the PDF files directly under `dir`, sorted by file name.
///
/// The extension match is case-insensitive. Subdirectories are not
/// descended into.
pub fn find_books(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut books = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            books.push(path);
        }
    }
    books.sort();
    Ok(books)
}
