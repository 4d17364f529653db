//! Model backend trait and implementations for text generation endpoints.

pub mod gemini;
pub mod mock;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use gemini::GeminiModel;
pub use mock::{MockModel, MockReply};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Rate limited (429)")]
    RateLimited,
    #[error("request blocked: {0}")]
    Blocked(String),
    #[error("empty response")]
    Empty,
    #[error("{0}")]
    Other(String),
}

/// A text generation backend addressed one prompt at a time.
pub trait ModelBackend: Send + Sync {
    /// The model id this backend addresses (e.g., "gemini-2.0-flash-001").
    fn name(&self) -> &str;

    /// Send one prompt and return the reply text.
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        client: &'a reqwest::Client,
        timeout: std::time::Duration,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>>;
}
