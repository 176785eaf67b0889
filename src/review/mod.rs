pub mod llm;
pub mod types;

pub use llm::LlmReviewer;
pub use types::{ReviewComment, ReviewRequest, ReviewRules, Selection, Severity};

use async_trait::async_trait;
use serde::Deserialize;
use std::cmp::Reverse;
use thiserror::Error;
use tracing::debug;

use crate::pr::AnchorSet;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Reviewer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Reviewer returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to encode review request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid reviewer response: {0}")]
    InvalidResponse(String),
}

/// Seam between the pipeline and whatever produces review comments.
#[async_trait]
pub trait Reviewer: Send + Sync {
    /// Human-readable name of this reviewer (e.g., the model identifier)
    fn name(&self) -> &str;

    /// Review the change list and return line-anchored comments.
    async fn review(&self, request: &ReviewRequest) -> Result<Vec<ReviewComment>, ReviewError>;
}

#[derive(Deserialize)]
struct ReviewEnvelope {
    comments: Vec<ReviewComment>,
}

/// Validate the reviewer's raw output: a JSON object `{"comments": [...]}`,
/// optionally wrapped in a markdown code fence.
pub fn parse_review_response(raw: &str) -> Result<Vec<ReviewComment>, ReviewError> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(ReviewError::InvalidResponse("empty response".to_string()));
    }
    let envelope: ReviewEnvelope = serde_json::from_str(body)
        .map_err(|e| ReviewError::InvalidResponse(e.to_string()))?;
    Ok(envelope.comments)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().trim_end_matches("```").trim()
}

/// Keep at most `max_comments` comments, most severe first, and split them by
/// whether their `(file, line)` is one of the added lines.
pub fn select_comments(
    mut comments: Vec<ReviewComment>,
    anchors: &AnchorSet,
    max_comments: usize,
) -> Selection {
    comments.sort_by_key(|c| Reverse(c.severity));
    comments.truncate(max_comments);

    let (anchored, unanchored): (Vec<_>, Vec<_>) = comments
        .into_iter()
        .partition(|c| anchors.contains(&c.file, c.line));
    debug!(anchored = anchored.len(), unanchored = unanchored.len(), "selected review comments");

    Selection {
        anchored,
        unanchored,
    }
}
