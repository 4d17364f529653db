use std::io::Write;

use owo_colors::OwoColorize;
use pagelore_core::{BookStats, PageOutcome, ProgressEvent, SummaryKind};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the header line before the first book is read.
pub fn print_run_header(
    w: &mut dyn Write,
    book_count: usize,
    input_dir: &std::path::Path,
    model: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(
        w,
        "Found {} book{} in {}",
        book_count,
        if book_count == 1 { "" } else { "s" },
        input_dir.display()
    )?;
    if color.enabled() {
        writeln!(w, "{}", format!("Model: {}", model).dimmed())?;
    } else {
        writeln!(w, "Model: {}", model)?;
    }
    writeln!(w)?;
    Ok(())
}

fn kind_label(kind: SummaryKind) -> &'static str {
    match kind {
        SummaryKind::Interval => "Interval summary",
        SummaryKind::Final => "Final summary",
    }
}

/// Print a real-time progress event.
pub fn print_progress(
    w: &mut dyn Write,
    event: &ProgressEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        ProgressEvent::BookStarted {
            book,
            pages,
            resumed_from,
        } => {
            if color.enabled() {
                writeln!(w, "{} ({} pages)", book.bold(), pages)?;
            } else {
                writeln!(w, "{} ({} pages)", book, pages)?;
            }
            if *resumed_from > 0 {
                let msg = format!("Resuming at page {}", resumed_from + 1);
                if color.enabled() {
                    writeln!(w, "{}", msg.dimmed())?;
                } else {
                    writeln!(w, "{}", msg)?;
                }
            }
        }
        ProgressEvent::PageStarted { .. } => {
            // Not displayed; the page line is printed once the outcome is known
        }
        ProgressEvent::PageFinished {
            page,
            total,
            outcome,
        } => match outcome {
            PageOutcome::Extracted { points } => {
                if color.enabled() {
                    writeln!(
                        w,
                        "[{}/{}] -> {}",
                        page,
                        total,
                        format!("+{} points", points).green()
                    )?;
                } else {
                    writeln!(w, "[{}/{}] -> +{} points", page, total, points)?;
                }
            }
            PageOutcome::NoContent => {
                if color.enabled() {
                    writeln!(w, "[{}/{}] -> {}", page, total, "no content".yellow())?;
                } else {
                    writeln!(w, "[{}/{}] -> no content", page, total)?;
                }
            }
            PageOutcome::Empty => {
                if color.enabled() {
                    writeln!(w, "[{}/{}] -> {}", page, total, "blank".dimmed())?;
                } else {
                    writeln!(w, "[{}/{}] -> blank", page, total)?;
                }
            }
            PageOutcome::Failed { message } => {
                let short = truncate(message, 80);
                if color.enabled() {
                    writeln!(
                        w,
                        "[{}/{}] -> {} ({})",
                        page,
                        total,
                        "FAILED".red(),
                        short
                    )?;
                } else {
                    writeln!(w, "[{}/{}] -> FAILED ({})", page, total, short)?;
                }
            }
        },
        ProgressEvent::SummaryStarted { kind, points } => {
            let msg = format!("{} from {} points...", kind_label(*kind), points);
            if color.enabled() {
                writeln!(w, "{}", msg.cyan())?;
            } else {
                writeln!(w, "{}", msg)?;
            }
        }
        ProgressEvent::SummarySaved { kind, path } => {
            if color.enabled() {
                writeln!(
                    w,
                    "{} {}",
                    format!("{} saved:", kind_label(*kind)).green(),
                    path.display()
                )?;
            } else {
                writeln!(w, "{} saved: {}", kind_label(*kind), path.display())?;
            }
        }
        ProgressEvent::SummarySkipped { kind, reason } => {
            let msg = format!("{} skipped: {}", kind_label(*kind), reason);
            if color.enabled() {
                writeln!(w, "{}", msg.yellow())?;
            } else {
                writeln!(w, "{}", msg)?;
            }
        }
        ProgressEvent::BookFinished { book, stats } => {
            let msg = format!(
                "Done with {}: {} points collected over {} pages",
                book, stats.points_total, stats.pages_total
            );
            if color.enabled() {
                writeln!(w, "{}", msg.bold())?;
            } else {
                writeln!(w, "{}", msg)?;
            }
            writeln!(w)?;
        }
        ProgressEvent::BookFailed { book, message } => {
            if color.enabled() {
                writeln!(
                    w,
                    "{} skipping {}: {}",
                    "WARNING:".yellow(),
                    book,
                    message
                )?;
            } else {
                writeln!(w, "WARNING: skipping {}: {}", book, message)?;
            }
            writeln!(w)?;
        }
    }
    Ok(())
}

/// Print the final summary block after all books are done.
pub fn print_run_summary(
    w: &mut dyn Write,
    all_stats: &[BookStats],
    color: ColorMode,
) -> std::io::Result<()> {
    let pages_processed: usize = all_stats.iter().map(|s| s.pages_processed).sum();
    let with_content: usize = all_stats.iter().map(|s| s.pages_with_content).sum();
    let no_content: usize = all_stats.iter().map(|s| s.pages_no_content).sum();
    let blank: usize = all_stats.iter().map(|s| s.pages_empty).sum();
    let failed: usize = all_stats.iter().map(|s| s.pages_failed).sum();
    let points_added: usize = all_stats.iter().map(|s| s.points_added).sum();
    let summaries: usize = all_stats.iter().map(|s| s.summaries_written).sum();

    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", sep)?;
    }

    writeln!(w, "  Books processed: {}", all_stats.len())?;
    writeln!(w, "  Pages analyzed: {}", pages_processed)?;
    if no_content > 0 || blank > 0 {
        let msg = format!("Skipped: {} no content, {} blank", no_content, blank);
        if color.enabled() {
            writeln!(w, "  {}", msg.dimmed())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }
    writeln!(w)?;

    if color.enabled() {
        writeln!(w, "  {} {}", "Pages with knowledge:".green(), with_content)?;
    } else {
        writeln!(w, "  Pages with knowledge: {}", with_content)?;
    }
    if failed > 0 {
        if color.enabled() {
            writeln!(w, "  {} {}", "Pages failed:".red(), failed)?;
        } else {
            writeln!(w, "  Pages failed: {}", failed)?;
        }
    }
    writeln!(w, "  Knowledge points added: {}", points_added)?;
    writeln!(w, "  Summaries written: {}", summaries)?;

    writeln!(w)?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        // Back up to a char boundary so multi-byte text cannot panic the slice.
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        s.to_string()
    }
}
