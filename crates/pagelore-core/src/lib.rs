use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub mod backend;
pub mod config_file;
pub mod layout;
pub mod model;
pub mod prompts;
pub mod reader;
pub mod response;
pub mod store;
pub mod summary;

// Re-export for convenience
pub use backend::{BackendError, PageSource};
pub use layout::AnalysisLayout;
pub use model::{ModelBackend, ModelError};
pub use store::{KnowledgeBase, StoreError};

/// Default Gemini model addressed when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";

/// Default base URL of the Gemini REST API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// What happened to a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page carried educational content; this many points were added.
    Extracted { points: usize },
    /// The model judged the page front/back matter (TOC, index, copyright...).
    NoContent,
    /// The page text was blank; no model call was made.
    Empty,
    /// The model call or reply parsing failed. The page contributes nothing.
    Failed { message: String },
}

/// Which kind of summary document is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    /// Periodic checkpoint summary, written every N pages.
    Interval,
    /// The summary written after the last processed page.
    Final,
}

impl SummaryKind {
    /// File name tag: `interval` or `final`.
    pub fn tag(&self) -> &'static str {
        match self {
            SummaryKind::Interval => "interval",
            SummaryKind::Final => "final",
        }
    }
}

/// Progress events emitted while reading books.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    BookStarted {
        book: String,
        /// Pages that will be considered this run (after the page limit).
        pages: usize,
        /// Pages already folded into the knowledge base by earlier runs.
        resumed_from: usize,
    },
    PageStarted {
        page: usize,
        total: usize,
    },
    PageFinished {
        page: usize,
        total: usize,
        outcome: PageOutcome,
    },
    SummaryStarted {
        kind: SummaryKind,
        /// Points fed to the model after the length filter.
        points: usize,
    },
    SummarySaved {
        kind: SummaryKind,
        path: PathBuf,
    },
    SummarySkipped {
        kind: SummaryKind,
        reason: String,
    },
    BookFinished {
        book: String,
        stats: BookStats,
    },
    /// A book could not be processed at all (unreadable PDF, corrupt
    /// knowledge base). The run continues with the next book.
    BookFailed {
        book: String,
        message: String,
    },
}

/// Statistics for one book over one run.
#[derive(Debug, Clone, Default)]
pub struct BookStats {
    /// Pages considered this run (after the page limit).
    pub pages_total: usize,
    /// Pages actually processed this run (excludes pages skipped by resume).
    pub pages_processed: usize,
    pub pages_with_content: usize,
    pub pages_no_content: usize,
    pub pages_empty: usize,
    pub pages_failed: usize,
    /// Points added this run.
    pub points_added: usize,
    /// Points in the knowledge base after this run.
    pub points_total: usize,
    pub summaries_written: usize,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("extraction error: {0}")]
    Backend(#[from] BackendError),
    #[error("knowledge base error: {0}")]
    Store(#[from] StoreError),
    #[error("no knowledge points recorded for {0}")]
    NoKnowledge(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the book reader.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    /// Model id addressed on the generateContent endpoint.
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Write an interval summary every N pages. `None` disables them.
    pub summary_interval: Option<u32>,
    /// Cap on pages per book, for trial runs. `None` reads whole books.
    pub page_limit: Option<usize>,
    /// Points longer than this many words are left out of summary input.
    pub max_point_words: usize,
    /// Points per summary call; larger knowledge bases are chunked.
    pub max_points_per_call: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("summary_interval", &self.summary_interval)
            .field("page_limit", &self.page_limit)
            .field("max_point_words", &self.max_point_words)
            .field("max_points_per_call", &self.max_points_per_call)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
            summary_interval: Some(20),
            page_limit: None,
            max_point_words: 50,
            max_points_per_call: 400,
        }
    }
}

/// Read a directory of books page by page, building knowledge bases and
/// summaries under `layout`.
///
/// Books are processed strictly in order, one page at a time. Progress
/// events are emitted via the callback. The operation can be cancelled via
/// the CancellationToken; cancellation is observed between pages, so the
/// on-disk knowledge base stays consistent with its cursor.
pub async fn read_books(
    source: &dyn PageSource,
    books: &[PathBuf],
    layout: &AnalysisLayout,
    model: &dyn ModelBackend,
    config: &Config,
    progress: impl Fn(ProgressEvent) + Send + Sync + 'static,
    cancel: CancellationToken,
) -> Vec<BookStats> {
    reader::read_books(source, books, layout, model, config, progress, cancel).await
}

/// File name of a book path, for knowledge base keys and display.
pub fn book_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
