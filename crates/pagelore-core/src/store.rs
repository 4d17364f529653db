//! Knowledge base persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::response::point_text;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid knowledge base: {0}")]
    Json(#[from] serde_json::Error),
}

/// Accumulated knowledge for one book: one JSON document, rewritten in full
/// after every page.
///
/// `pages_processed` is the resume cursor, the number of leading pages
/// already folded into `knowledge`. Both extra fields default so older
/// files carrying only `{"knowledge": [...]}` still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub book: String,
    #[serde(default)]
    pub pages_processed: usize,
    #[serde(default, deserialize_with = "points_lenient")]
    pub knowledge: Vec<String>,
}

impl KnowledgeBase {
    pub fn new(book: &str) -> Self {
        Self {
            book: book.to_string(),
            pages_processed: 0,
            knowledge: Vec::new(),
        }
    }

    /// Append newly extracted points, preserving arrival order.
    pub fn append(&mut self, points: Vec<String>) {
        self.knowledge.extend(points);
    }
}

/// Entries may be objects (`{"point": ..}` / `{"text": ..}`) where the model
/// ignored the schema on an earlier run; flatten them to strings on load.
fn points_lenient<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(point_text).collect())
}

/// Book file name without its `.pdf` extension.
pub fn book_stem(book: &str) -> &str {
    let path = Path::new(book);
    if path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
    {
        path.file_stem().and_then(|s| s.to_str()).unwrap_or(book)
    } else {
        book
    }
}

/// `<dir>/<stem>_knowledge.json` for a book file name.
pub fn kb_path(dir: &Path, book: &str) -> PathBuf {
    dir.join(format!("{}_knowledge.json", book_stem(book)))
}

/// Load a knowledge base. `Ok(None)` if the file doesn't exist. A file that
/// exists but cannot be read or parsed is an error, so accumulated knowledge
/// is never silently overwritten.
pub fn load(path: &Path) -> Result<Option<KnowledgeBase>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let kb: KnowledgeBase = serde_json::from_str(&content)?;
    Ok(Some(kb))
}

/// Rewrite the whole file. Called after every page.
pub fn save(kb: &KnowledgeBase, path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(kb)?;
    std::fs::write(path, content)?;
    Ok(())
}
