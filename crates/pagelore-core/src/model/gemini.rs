use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::json;

use super::{ModelBackend, ModelError};

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Debug)]
pub struct GeminiModel {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

impl GeminiModel {
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl ModelBackend for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url.trim_end_matches('/'),
                self.model
            );
            let body = json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }]
            });

            let resp = client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| ModelError::Other(e.to_string()))?;

            let status = resp.status();
            if status.as_u16() == 429 {
                return Err(ModelError::RateLimited);
            }
            if !status.is_success() {
                // Error bodies carry a human-readable message; surface it.
                let data: serde_json::Value = resp.json().await.unwrap_or_default();
                let message = data["error"]["message"].as_str().unwrap_or("");
                if message.is_empty() {
                    return Err(ModelError::Other(format!("HTTP {}", status)));
                }
                return Err(ModelError::Other(format!("HTTP {}: {}", status, message)));
            }

            let data: serde_json::Value =
                resp.json().await.map_err(|e| ModelError::Other(e.to_string()))?;

            if let Some(reason) = data["promptFeedback"]["blockReason"].as_str() {
                return Err(ModelError::Blocked(reason.to_string()));
            }

            let parts = data["candidates"][0]["content"]["parts"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            let text: String = parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect();

            if text.trim().is_empty() {
                return Err(ModelError::Empty);
            }

            Ok(text)
        })
    }
}
