//! The page-by-page reading pipeline.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::ModelBackend;
use crate::store::{self, KnowledgeBase};
use crate::{
    AnalysisLayout, BookStats, Config, CoreError, PageOutcome, PageSource, ProgressEvent,
    SummaryKind, book_name, prompts, response, summary,
};

/// Read one book page by page.
///
/// Resumes at the knowledge base cursor: pages already folded in by earlier
/// runs are not reprocessed. After every page the knowledge base file is
/// rewritten in full, cursor and points together, so a crash loses at most
/// the in-flight page. Interval summaries land every `summary_interval`
/// pages; the final summary always follows the last processed page.
#[allow(clippy::too_many_arguments)]
pub async fn read_book(
    book: &str,
    pages: &[String],
    layout: &AnalysisLayout,
    model: &dyn ModelBackend,
    client: &reqwest::Client,
    config: &Config,
    progress: &(dyn Fn(ProgressEvent) + Send + Sync),
    cancel: &CancellationToken,
) -> Result<BookStats, CoreError> {
    let total = match config.page_limit {
        Some(limit) => pages.len().min(limit),
        None => pages.len(),
    };
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let kb_path = store::kb_path(&layout.knowledge_dir, book);
    let mut kb = match store::load(&kb_path)? {
        Some(kb) => {
            info!(
                book = %book,
                points = kb.knowledge.len(),
                pages = kb.pages_processed,
                "loaded existing knowledge base"
            );
            kb
        }
        None => KnowledgeBase::new(book),
    };
    if kb.book.is_empty() {
        kb.book = book.to_string();
    }

    let start = kb.pages_processed.min(total);
    let mut stats = BookStats {
        pages_total: total,
        ..BookStats::default()
    };

    progress(ProgressEvent::BookStarted {
        book: book.to_string(),
        pages: total,
        resumed_from: start,
    });

    for page in start..total {
        if cancel.is_cancelled() {
            info!(book = %book, page = page + 1, "cancelled, stopping between pages");
            break;
        }

        progress(ProgressEvent::PageStarted {
            page: page + 1,
            total,
        });

        let (outcome, points) = analyze_page(&pages[page], model, client, timeout).await;

        match &outcome {
            PageOutcome::Extracted { points } => {
                debug!(book = %book, page = page + 1, points = *points, "extracted knowledge");
                stats.pages_with_content += 1;
                stats.points_added += *points;
            }
            PageOutcome::NoContent => stats.pages_no_content += 1,
            PageOutcome::Empty => stats.pages_empty += 1,
            PageOutcome::Failed { message } => {
                warn!(book = %book, page = page + 1, error = %message, "page analysis failed, skipping page");
                stats.pages_failed += 1;
            }
        }

        // The cursor only advances together with the points it covers.
        kb.append(points);
        kb.pages_processed = page + 1;
        store::save(&kb, &kb_path)?;
        stats.pages_processed += 1;

        progress(ProgressEvent::PageFinished {
            page: page + 1,
            total,
            outcome,
        });

        if let Some(interval) = config.summary_interval {
            let interval = interval as usize;
            if interval > 0 && (page + 1) % interval == 0 && page + 1 != total {
                run_summary(
                    SummaryKind::Interval,
                    &kb,
                    layout,
                    model,
                    client,
                    config,
                    timeout,
                    progress,
                    &mut stats,
                )
                .await?;
            }
        }
    }

    // The final summary runs whenever the book is fully read, including
    // reruns where every page was already in the knowledge base.
    if !cancel.is_cancelled() && total > 0 && kb.pages_processed >= total {
        run_summary(
            SummaryKind::Final,
            &kb,
            layout,
            model,
            client,
            config,
            timeout,
            progress,
            &mut stats,
        )
        .await?;
    }

    stats.points_total = kb.knowledge.len();
    progress(ProgressEvent::BookFinished {
        book: book.to_string(),
        stats: stats.clone(),
    });

    Ok(stats)
}

/// Analyze one page: blank pages short-circuit without a model call, and
/// model or parse failures are folded into the outcome so the caller can
/// log and move on.
async fn analyze_page(
    text: &str,
    model: &dyn ModelBackend,
    client: &reqwest::Client,
    timeout: Duration,
) -> (PageOutcome, Vec<String>) {
    if text.trim().is_empty() {
        return (PageOutcome::Empty, Vec::new());
    }

    let prompt = prompts::page_analysis(text);
    let reply = match model.generate(&prompt, client, timeout).await {
        Ok(reply) => reply,
        Err(e) => {
            return (
                PageOutcome::Failed {
                    message: e.to_string(),
                },
                Vec::new(),
            );
        }
    };

    match response::parse_page_extraction(&reply) {
        Ok(extraction) if extraction.has_content => {
            let count = extraction.points.len();
            (PageOutcome::Extracted { points: count }, extraction.points)
        }
        Ok(_) => (PageOutcome::NoContent, Vec::new()),
        Err(e) => (
            PageOutcome::Failed {
                message: e.to_string(),
            },
            Vec::new(),
        ),
    }
}

/// Filter, generate, and save one summary. Generation failures are logged
/// and reported as a skip; only file IO bubbles up.
#[allow(clippy::too_many_arguments)]
async fn run_summary(
    kind: SummaryKind,
    kb: &KnowledgeBase,
    layout: &AnalysisLayout,
    model: &dyn ModelBackend,
    client: &reqwest::Client,
    config: &Config,
    timeout: Duration,
    progress: &(dyn Fn(ProgressEvent) + Send + Sync),
    stats: &mut BookStats,
) -> Result<(), CoreError> {
    let filtered = summary::filter_points(&kb.knowledge, config.max_point_words);
    if filtered.is_empty() {
        info!(book = %kb.book, kind = kind.tag(), "skipping summary, no knowledge points");
        progress(ProgressEvent::SummarySkipped {
            kind,
            reason: "no knowledge points collected".to_string(),
        });
        return Ok(());
    }

    progress(ProgressEvent::SummaryStarted {
        kind,
        points: filtered.len(),
    });

    match summary::generate_summary(model, client, timeout, &filtered, config.max_points_per_call)
        .await
    {
        Ok(body) => {
            let path = summary::write_summary(&layout.summaries_dir, &kb.book, kind, &body)?;
            info!(book = %kb.book, kind = kind.tag(), path = %path.display(), "summary saved");
            stats.summaries_written += 1;
            progress(ProgressEvent::SummarySaved { kind, path });
        }
        Err(e) => {
            warn!(book = %kb.book, kind = kind.tag(), error = %e, "summary generation failed, skipping");
            progress(ProgressEvent::SummarySkipped {
                kind,
                reason: e.to_string(),
            });
        }
    }

    Ok(())
}

/// Read every book in order, one after another.
///
/// A book that cannot be extracted or whose knowledge base cannot be read
/// is reported and skipped; the run continues with the next book.
pub async fn read_books(
    source: &dyn PageSource,
    books: &[PathBuf],
    layout: &AnalysisLayout,
    model: &dyn ModelBackend,
    config: &Config,
    progress: impl Fn(ProgressEvent) + Send + Sync + 'static,
    cancel: CancellationToken,
) -> Vec<BookStats> {
    let client = reqwest::Client::new();
    let mut all_stats = Vec::new();

    for path in books {
        if cancel.is_cancelled() {
            break;
        }

        let book = book_name(path);
        let pages = match source.extract_pages(path) {
            Ok(pages) => pages,
            Err(e) => {
                warn!(book = %book, error = %e, "failed to extract pages, skipping book");
                progress(ProgressEvent::BookFailed {
                    book,
                    message: e.to_string(),
                });
                continue;
            }
        };

        match read_book(&book, &pages, layout, model, &client, config, &progress, &cancel).await {
            Ok(stats) => all_stats.push(stats),
            Err(e) => {
                warn!(book = %book, error = %e, "failed to process book, skipping");
                progress(ProgressEvent::BookFailed {
                    book,
                    message: e.to_string(),
                });
            }
        }
    }

    all_stats
}
