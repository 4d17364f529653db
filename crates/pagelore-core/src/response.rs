//! Parsing of model replies into structured results.
//!
//! Replies are prompted to be bare JSON (pages) or bare markdown
//! (summaries), but models wrap them in code fences or prose often enough
//! that parsing has to tolerate both, plus trailing commas.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Knowledge extracted from a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtraction {
    pub has_content: bool,
    pub points: Vec<String>,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no JSON object in reply")]
    NoJson,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Strip one markdown code fence wrapping the whole reply, if present.
/// Fences inside the content are left alone.
pub fn strip_code_fence(reply: &str) -> &str {
    static FENCE_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*\n?(.*?)\n?\s*```\s*$").unwrap());
    match FENCE_RE.captures(reply) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(reply),
        None => reply,
    }
}

/// Parse a page-analysis reply into [`PageExtraction`].
///
/// Accepts the object fenced or surrounded by prose. `knowledge` entries may
/// be strings or objects carrying a `point`/`text` field; anything else is
/// ignored. A missing `has_content` counts as `false`.
pub fn parse_page_extraction(reply: &str) -> Result<PageExtraction, ParseError> {
    let cleaned = strip_code_fence(reply);
    let start = cleaned.find('{').ok_or(ParseError::NoJson)?;
    let end = cleaned.rfind('}').ok_or(ParseError::NoJson)?;
    if end < start {
        return Err(ParseError::NoJson);
    }
    let slice = &cleaned[start..=end];

    let value = match serde_json::from_str::<serde_json::Value>(slice) {
        Ok(v) => v,
        Err(first_err) => {
            // Retry with trailing commas removed before taking the reply as
            // malformed.
            static TRAILING_COMMA: Lazy<Regex> =
                Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());
            let fixed = TRAILING_COMMA.replace_all(slice, "$1");
            serde_json::from_str::<serde_json::Value>(&fixed)
                .map_err(|_| ParseError::Json(first_err))?
        }
    };

    let has_content = value["has_content"].as_bool().unwrap_or(false);
    let points = value["knowledge"]
        .as_array()
        .map(|arr| arr.iter().filter_map(point_text).collect())
        .unwrap_or_default();

    Ok(PageExtraction {
        has_content,
        points,
    })
}

/// Flatten a knowledge entry to its text. Plain strings pass through;
/// object entries carry the text under `point` or `text`.
pub(crate) fn point_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        serde_json::Value::Object(map) => map
            .get("point")
            .or_else(|| map.get("text"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from),
        _ => None,
    }
}

/// Normalize a summary reply: strip one wrapping code fence and trim.
pub fn clean_summary(reply: &str) -> String {
    strip_code_fence(reply).trim().to_string()
}
