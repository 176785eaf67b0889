use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Pull request metadata needed to anchor review comments.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// PR number (e.g., 42)
    pub number: u64,
    /// PR title
    pub title: String,
    /// Author's GitHub login
    pub author: String,
    /// Head commit the review comments are attached to
    pub head_sha: String,
}

/// One entry of the "list pull request files" response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: usize,
    #[serde(default)]
    pub deletions: usize,
    /// Unified diff for this file. Absent for binary files and oversized diffs.
    #[serde(default)]
    pub patch: Option<String>,
}

/// An added line with its position in the new version of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    /// 1-based line number in the new file
    pub line: usize,
    /// Line text without the leading '+'
    pub code: String,
}

/// Added lines of a single file, in patch order.
#[derive(Debug, Clone, Serialize)]
pub struct FileChanges {
    pub filename: String,
    pub changes: Vec<ChangeRecord>,
}

/// The `(file, line)` positions an inline comment may legally be anchored to.
#[derive(Debug, Default)]
pub struct AnchorSet {
    positions: HashSet<(String, usize)>,
}

impl AnchorSet {
    pub fn from_changes(files: &[FileChanges]) -> Self {
        let positions = files
            .iter()
            .flat_map(|f| f.changes.iter().map(move |c| (f.filename.clone(), c.line)))
            .collect();
        Self { positions }
    }

    pub fn contains(&self, file: &str, line: usize) -> bool {
        self.positions.contains(&(file.to_string(), line))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }
}

/// Represents the parsed components of a GitHub PR URL.
#[derive(Debug, Clone)]
pub struct PrUrl {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
}

impl PrUrl {
    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}
