//! Integration tests for the reading pipeline.
//!
//! These tests use [`MockModel`] and an in-memory page source so that no
//! HTTP requests are made and no real PDFs are needed. Knowledge bases and
//! summaries land in a temp directory per test.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pagelore_core::model::{MockModel, MockReply};
use pagelore_core::{
    AnalysisLayout, BackendError, Config, PageSource, ProgressEvent, reader, store,
};
use tokio_util::sync::CancellationToken;

/// Page source backed by a map of path -> page texts. Unknown paths fail
/// like an unreadable PDF would.
struct InMemorySource {
    books: HashMap<PathBuf, Vec<String>>,
}

impl InMemorySource {
    fn new(books: Vec<(&str, Vec<&str>)>) -> Self {
        Self {
            books: books
                .into_iter()
                .map(|(name, pages)| {
                    (
                        PathBuf::from(name),
                        pages.into_iter().map(String::from).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl PageSource for InMemorySource {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        self.books
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::OpenError(format!("no such book: {}", path.display())))
    }
}

/// A valid page-analysis reply carrying the given points.
fn page_reply(points: &[&str]) -> MockReply {
    let list = points
        .iter()
        .map(|p| format!("\"{}\"", p))
        .collect::<Vec<_>>()
        .join(", ");
    MockReply::Text(format!(
        "{{\"has_content\": true, \"knowledge\": [{}]}}",
        list
    ))
}

fn no_content_reply() -> MockReply {
    MockReply::Text("{\"has_content\": false, \"knowledge\": []}".to_string())
}

fn summary_reply(body: &str) -> MockReply {
    MockReply::Text(body.to_string())
}

/// Config with interval summaries off; tests enable them explicitly.
fn test_config() -> Config {
    Config {
        summary_interval: None,
        ..Config::default()
    }
}

fn pages(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn full_book_builds_knowledge_base_and_final_summary() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    let model = MockModel::with_sequence(
        "m",
        vec![
            page_reply(&["alpha", "beta"]),
            no_content_reply(),
            page_reply(&["gamma"]),
            summary_reply("## Demo Book\n\n- alpha"),
        ],
    );
    let client = reqwest::Client::new();
    let book_pages = pages(&["Page one text.", "Copyright page.", "Page three text."]);

    let stats = reader::read_book(
        "demo.pdf",
        &book_pages,
        &layout,
        &model,
        &client,
        &test_config(),
        &|_| {},
        &CancellationToken::new(),
    )
    .await
    .expect("book should process");

    assert_eq!(model.call_count(), 4, "three pages plus the final summary");
    assert_eq!(stats.pages_processed, 3);
    assert_eq!(stats.pages_with_content, 2);
    assert_eq!(stats.pages_no_content, 1);
    assert_eq!(stats.points_added, 3);
    assert_eq!(stats.points_total, 3);
    assert_eq!(stats.summaries_written, 1);

    let kb = store::load(&store::kb_path(&layout.knowledge_dir, "demo.pdf"))
        .unwrap()
        .expect("knowledge base file should exist");
    assert_eq!(kb.book, "demo.pdf");
    assert_eq!(kb.pages_processed, 3);
    assert_eq!(kb.knowledge, vec!["alpha", "beta", "gamma"]);

    let summary_path = layout.summaries_dir.join("demo_final_001.md");
    let content = std::fs::read_to_string(&summary_path).expect("final summary should exist");
    assert!(content.starts_with("# Book Analysis: demo.pdf"));
    assert!(content.contains("## Demo Book"));
}

#[tokio::test]
async fn interval_summaries_land_between_intervals_only() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    // Four pages with interval 2: one interval summary after page 2, none
    // after page 4 (final page), then the final summary.
    let model = MockModel::with_sequence(
        "m",
        vec![
            page_reply(&["p1"]),
            page_reply(&["p2"]),
            summary_reply("## Interval"),
            page_reply(&["p3"]),
            page_reply(&["p4"]),
            summary_reply("## Final"),
        ],
    );
    let client = reqwest::Client::new();
    let config = Config {
        summary_interval: Some(2),
        ..Config::default()
    };
    let book_pages = pages(&["one", "two", "three", "four"]);

    let stats = reader::read_book(
        "demo.pdf",
        &book_pages,
        &layout,
        &model,
        &client,
        &config,
        &|_| {},
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(model.call_count(), 6);
    assert_eq!(stats.summaries_written, 2);
    assert!(layout.summaries_dir.join("demo_interval_001.md").exists());
    assert!(layout.summaries_dir.join("demo_final_001.md").exists());
    assert!(
        !layout.summaries_dir.join("demo_interval_002.md").exists(),
        "the last page must not produce an interval summary"
    );
}

#[tokio::test]
async fn malformed_reply_fails_only_its_page() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    let model = MockModel::with_sequence(
        "m",
        vec![
            MockReply::Text("I am sorry, I cannot analyze this page.".to_string()),
            page_reply(&["survivor"]),
            summary_reply("## Final"),
        ],
    );
    let client = reqwest::Client::new();
    let book_pages = pages(&["first page", "second page"]);

    let stats = reader::read_book(
        "demo.pdf",
        &book_pages,
        &layout,
        &model,
        &client,
        &test_config(),
        &|_| {},
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.pages_failed, 1);
    assert_eq!(stats.pages_with_content, 1);

    let kb = store::load(&store::kb_path(&layout.knowledge_dir, "demo.pdf"))
        .unwrap()
        .unwrap();
    assert_eq!(kb.knowledge, vec!["survivor"]);
    assert_eq!(
        kb.pages_processed, 2,
        "a failed page still advances the cursor"
    );
}

#[tokio::test]
async fn model_errors_are_skipped_like_parse_failures() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    let model = MockModel::with_sequence(
        "m",
        vec![
            MockReply::RateLimited,
            page_reply(&["after the storm"]),
            summary_reply("## Final"),
        ],
    );
    let client = reqwest::Client::new();
    let book_pages = pages(&["first", "second"]);

    let stats = reader::read_book(
        "demo.pdf",
        &book_pages,
        &layout,
        &model,
        &client,
        &test_config(),
        &|_| {},
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.pages_failed, 1);
    let kb = store::load(&store::kb_path(&layout.knowledge_dir, "demo.pdf"))
        .unwrap()
        .unwrap();
    assert_eq!(kb.knowledge, vec!["after the storm"]);
}

#[tokio::test]
async fn resume_skips_pages_already_processed() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    layout.ensure().unwrap();

    let mut existing = store::KnowledgeBase::new("demo.pdf");
    existing.append(vec!["old one".to_string(), "old two".to_string()]);
    existing.pages_processed = 2;
    store::save(&existing, &store::kb_path(&layout.knowledge_dir, "demo.pdf")).unwrap();

    let model = MockModel::with_sequence(
        "m",
        vec![page_reply(&["new point"]), summary_reply("## Final")],
    );
    let client = reqwest::Client::new();
    let book_pages = pages(&["one", "two", "three"]);

    let stats = reader::read_book(
        "demo.pdf",
        &book_pages,
        &layout,
        &model,
        &client,
        &test_config(),
        &|_| {},
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(
        model.call_count(),
        2,
        "only the third page and the final summary"
    );
    assert_eq!(stats.pages_processed, 1);

    let kb = store::load(&store::kb_path(&layout.knowledge_dir, "demo.pdf"))
        .unwrap()
        .unwrap();
    assert_eq!(kb.knowledge, vec!["old one", "old two", "new point"]);
    assert_eq!(kb.pages_processed, 3);
}

#[tokio::test]
async fn failed_pages_are_not_retried_on_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    let client = reqwest::Client::new();
    let book_pages = pages(&["only page"]);

    let first = MockModel::new("m", MockReply::Text("not json at all".to_string()));
    reader::read_book(
        "demo.pdf",
        &book_pages,
        &layout,
        &first,
        &client,
        &test_config(),
        &|_| {},
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(first.call_count(), 1, "no summary call with zero points");

    let second = MockModel::new("m", MockReply::Text("unused".to_string()));
    let stats = reader::read_book(
        "demo.pdf",
        &book_pages,
        &layout,
        &second,
        &client,
        &test_config(),
        &|_| {},
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(second.call_count(), 0);
    assert_eq!(stats.pages_processed, 0);
}

#[tokio::test]
async fn blank_pages_advance_without_model_calls() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    let model = MockModel::with_sequence(
        "m",
        vec![page_reply(&["real content"]), summary_reply("## Final")],
    );
    let client = reqwest::Client::new();
    let book_pages = pages(&["", "  \n\t ", "actual text"]);

    let stats = reader::read_book(
        "demo.pdf",
        &book_pages,
        &layout,
        &model,
        &client,
        &test_config(),
        &|_| {},
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(model.call_count(), 2, "blank pages cost no API calls");
    assert_eq!(stats.pages_empty, 2);

    let kb = store::load(&store::kb_path(&layout.knowledge_dir, "demo.pdf"))
        .unwrap()
        .unwrap();
    assert_eq!(kb.pages_processed, 3, "blank pages still advance the cursor");
}

#[tokio::test]
async fn oversized_points_stay_stored_but_leave_summary_input() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    let oversized = (0..60).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    let model = MockModel::with_sequence(
        "m",
        vec![
            page_reply(&[oversized.as_str(), "short point"]),
            summary_reply("## Final"),
        ],
    );
    let client = reqwest::Client::new();

    let summary_points = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&summary_points);
    let progress = move |event: ProgressEvent| {
        if let ProgressEvent::SummaryStarted { points, .. } = event {
            seen.lock().unwrap().push(points);
        }
    };

    let stats = reader::read_book(
        "demo.pdf",
        &pages(&["page text"]),
        &layout,
        &model,
        &client,
        &test_config(),
        &progress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.summaries_written, 1);
    assert_eq!(
        *summary_points.lock().unwrap(),
        vec![1],
        "only the short point feeds the summary"
    );

    let kb = store::load(&store::kb_path(&layout.knowledge_dir, "demo.pdf"))
        .unwrap()
        .unwrap();
    assert_eq!(
        kb.knowledge,
        vec![oversized, "short point".to_string()],
        "the length filter never touches stored points"
    );
}

#[tokio::test]
async fn page_limit_caps_the_book() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    let model = MockModel::with_sequence(
        "m",
        vec![
            page_reply(&["one"]),
            page_reply(&["two"]),
            summary_reply("## Final"),
        ],
    );
    let client = reqwest::Client::new();
    let config = Config {
        summary_interval: None,
        page_limit: Some(2),
        ..Config::default()
    };
    let book_pages = pages(&["a", "b", "c", "d"]);

    let stats = reader::read_book(
        "demo.pdf",
        &book_pages,
        &layout,
        &model,
        &client,
        &config,
        &|_| {},
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.pages_total, 2);
    assert_eq!(stats.pages_processed, 2);
    assert_eq!(
        model.call_count(),
        3,
        "two pages plus the final summary after the limit"
    );
}

#[tokio::test]
async fn cancellation_stops_before_the_first_page() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    let model = MockModel::new("m", page_reply(&["never used"]));
    let client = reqwest::Client::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = reader::read_book(
        "demo.pdf",
        &pages(&["one", "two"]),
        &layout,
        &model,
        &client,
        &test_config(),
        &|_| {},
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(model.call_count(), 0);
    assert_eq!(stats.pages_processed, 0);
    assert!(
        !store::kb_path(&layout.knowledge_dir, "demo.pdf").exists(),
        "nothing should be written for a cancelled book"
    );
}

#[tokio::test]
async fn read_books_continues_after_a_failed_book() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    let source = InMemorySource::new(vec![("good.pdf", vec!["some text"])]);
    let model = MockModel::with_sequence(
        "m",
        vec![page_reply(&["kept going"]), summary_reply("## Final")],
    );

    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    let progress = move |event: ProgressEvent| {
        let tag = match &event {
            ProgressEvent::BookFailed { book, .. } => format!("failed:{book}"),
            ProgressEvent::BookFinished { book, .. } => format!("finished:{book}"),
            _ => return,
        };
        events_clone.lock().unwrap().push(tag);
    };

    let books = vec![PathBuf::from("broken.pdf"), PathBuf::from("good.pdf")];
    let all_stats = reader::read_books(
        &source,
        &books,
        &layout,
        &model,
        &test_config(),
        progress,
        CancellationToken::new(),
    )
    .await;

    assert_eq!(all_stats.len(), 1, "only the good book yields stats");
    let collected = events.lock().unwrap();
    assert_eq!(
        *collected,
        vec!["failed:broken.pdf".to_string(), "finished:good.pdf".to_string()]
    );
    assert!(
        store::kb_path(&layout.knowledge_dir, "good.pdf").exists(),
        "the good book should still be processed"
    );
}

#[tokio::test]
async fn progress_events_arrive_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AnalysisLayout::new(dir.path());
    let model = MockModel::with_sequence(
        "m",
        vec![page_reply(&["point"]), summary_reply("## Final")],
    );
    let client = reqwest::Client::new();

    let events: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    let progress = move |event: ProgressEvent| {
        let tag = match &event {
            ProgressEvent::BookStarted { .. } => "book_started",
            ProgressEvent::PageStarted { .. } => "page_started",
            ProgressEvent::PageFinished { .. } => "page_finished",
            ProgressEvent::SummaryStarted { .. } => "summary_started",
            ProgressEvent::SummarySaved { .. } => "summary_saved",
            ProgressEvent::SummarySkipped { .. } => "summary_skipped",
            ProgressEvent::BookFinished { .. } => "book_finished",
            ProgressEvent::BookFailed { .. } => "book_failed",
        };
        events_clone.lock().unwrap().push(tag);
    };

    reader::read_book(
        "demo.pdf",
        &pages(&["the only page"]),
        &layout,
        &model,
        &client,
        &test_config(),
        &progress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let collected = events.lock().unwrap();
    assert_eq!(
        *collected,
        vec![
            "book_started",
            "page_started",
            "page_finished",
            "summary_started",
            "summary_saved",
            "book_finished",
        ]
    );
}
