use serde::{Deserialize, Serialize};

use crate::context::RepoContext;
use crate::pr::FileChanges;

/// Severity the reviewer assigns to a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

/// A single comment returned by the reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    /// File path as it appears in the change list
    pub file: String,
    /// Line number in the new version of the file
    pub line: usize,
    pub severity: Severity,
    pub message: String,
}

/// Scope rules the reviewer is asked to respect.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRules {
    pub focus: Vec<String>,
    pub ignore: Vec<String>,
    pub max_comments: usize,
}

/// Everything the reviewer sees about one pull request.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRequest {
    /// `owner/repo`
    pub repository: String,
    pub title: String,
    pub context: RepoContext,
    pub rules: ReviewRules,
    pub changes: Vec<FileChanges>,
}

/// Reviewer comments split by whether they can be anchored inline.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub anchored: Vec<ReviewComment>,
    pub unanchored: Vec<ReviewComment>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.anchored.is_empty() && self.unanchored.is_empty()
    }

    /// All selected comments, anchored first.
    pub fn iter(&self) -> impl Iterator<Item = &ReviewComment> {
        self.anchored.iter().chain(self.unanchored.iter())
    }
}
