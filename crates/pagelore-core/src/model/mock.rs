//! Mock model backend for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{ModelBackend, ModelError};

/// A configurable mock reply for [`MockModel`].
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Simulate a successful generation.
    Text(String),
    /// Simulate a 429 rate-limit response.
    RateLimited,
    /// Simulate a generic error.
    Error(String),
}

/// A hand-rolled mock implementing [`ModelBackend`] for tests.
///
/// Supports:
/// - A fixed reply (used for every call), **or**
/// - A sequence of replies (one per call, repeating the last if exhausted).
/// - Optional per-call latency.
/// - Call counting via [`call_count()`](MockModel::call_count).
pub struct MockModel {
    name: &'static str,
    /// If non-empty, each call pops the next reply (last is repeated if exhausted).
    replies: Mutex<Vec<MockReply>>,
    /// Fallback when the sequence is empty (or single-reply mode).
    fallback: MockReply,
    delay: Option<Duration>,
    call_count: AtomicUsize,
}

impl MockModel {
    /// Create a mock that always returns `reply`.
    pub fn new(name: &'static str, reply: MockReply) -> Self {
        Self {
            name,
            replies: Mutex::new(Vec::new()),
            fallback: reply,
            delay: None,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a mock that returns replies in order, repeating the last one.
    pub fn with_sequence(name: &'static str, mut replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "sequence must have at least one reply");
        let fallback = replies.last().cloned().unwrap();
        // Reverse so we can pop() from the front cheaply.
        replies.reverse();
        Self {
            name,
            replies: Mutex::new(replies),
            fallback,
            delay: None,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Set simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `generate()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> MockReply {
        let mut seq = self.replies.lock().unwrap();
        if let Some(reply) = seq.pop() {
            reply
        } else {
            self.fallback.clone()
        }
    }
}

impl ModelBackend for MockModel {
    fn name(&self) -> &str {
        self.name
    }

    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let reply = self.next_reply();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }

            match reply {
                MockReply::Text(text) => Ok(text),
                MockReply::RateLimited => Err(ModelError::RateLimited),
                MockReply::Error(msg) => Err(ModelError::Other(msg)),
            }
        })
    }
}
