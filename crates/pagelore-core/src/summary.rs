//! Summary synthesis and markdown output files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use tracing::warn;

use crate::model::{ModelBackend, ModelError};
use crate::store;
use crate::{AnalysisLayout, Config, CoreError, SummaryKind, prompts, response};

/// Drop points longer than `max_words` words. Oversized points crowd the
/// rest of the summary input out; they stay in the knowledge base untouched.
pub fn filter_points(points: &[String], max_words: usize) -> Vec<String> {
    points
        .iter()
        .filter(|p| p.split_whitespace().count() <= max_words)
        .cloned()
        .collect()
}

/// Generate a markdown summary of `points`.
///
/// Small point sets take one model call. Larger sets are split into chunks
/// of `max_points_per_call`, summarized chunk by chunk, and merged with one
/// final call. A failed merge falls back to joining the chunk summaries
/// with rules, so a long run still ends with a usable document.
pub async fn generate_summary(
    model: &dyn ModelBackend,
    client: &reqwest::Client,
    timeout: Duration,
    points: &[String],
    max_points_per_call: usize,
) -> Result<String, ModelError> {
    let chunk_size = max_points_per_call.max(1);
    if points.len() <= chunk_size {
        let reply = model
            .generate(&prompts::summary(points), client, timeout)
            .await?;
        return Ok(response::clean_summary(&reply));
    }

    let mut sections = Vec::new();
    for chunk in points.chunks(chunk_size) {
        let reply = model
            .generate(&prompts::summary(chunk), client, timeout)
            .await?;
        sections.push(response::clean_summary(&reply));
    }

    match model.generate(&prompts::merge(&sections), client, timeout).await {
        Ok(merged) => Ok(response::clean_summary(&merged)),
        Err(e) => {
            warn!(sections = sections.len(), error = %e, "merge call failed, joining section summaries");
            Ok(sections.join("\n\n---\n\n"))
        }
    }
}

/// Next output path for a summary: `<stem>_<tag>_NNN.md`, numbered one past
/// the files already present. Interval and final sequences are independent.
pub fn next_summary_path(dir: &Path, book: &str, kind: SummaryKind) -> std::io::Result<PathBuf> {
    let prefix = format!("{}_{}_", store::book_stem(book), kind.tag());
    let mut existing = 0;
    if dir.exists() {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(".md") {
                existing += 1;
            }
        }
    }
    Ok(dir.join(format!("{}{:03}.md", prefix, existing + 1)))
}

/// Wrap the model's markdown in the output document and write it.
pub fn write_summary(
    dir: &Path,
    book: &str,
    kind: SummaryKind,
    body: &str,
) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = next_summary_path(dir, book, kind)?;
    let content = format!(
        "# Book Analysis: {}\nGenerated on: {}\n\n{}\n\n---\n*Analysis generated using AI Book Analysis Tool*\n",
        book,
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        body
    );
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Regenerate a final summary from an existing knowledge base, without
/// touching the PDF.
pub async fn summarize_book(
    book: &str,
    layout: &AnalysisLayout,
    model: &dyn ModelBackend,
    config: &Config,
) -> Result<PathBuf, CoreError> {
    let kb_path = store::kb_path(&layout.knowledge_dir, book);
    let kb = store::load(&kb_path)?.ok_or_else(|| CoreError::NoKnowledge(book.to_string()))?;

    let filtered = filter_points(&kb.knowledge, config.max_point_words);
    if filtered.is_empty() {
        return Err(CoreError::NoKnowledge(book.to_string()));
    }

    let client = reqwest::Client::new();
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let body =
        generate_summary(model, &client, timeout, &filtered, config.max_points_per_call).await?;
    Ok(write_summary(&layout.summaries_dir, book, SummaryKind::Final, &body)?)
}
