use async_trait::async_trait;
use colored::Colorize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::pr::{GitHubClient, PrError};
use crate::review::{ReviewComment, Selection, Severity};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to post summary comment: {0}")]
    Summary(#[source] PrError),
}

/// Where review comments end up.
#[async_trait]
pub trait CommentTarget: Send + Sync {
    async fn post_inline(&self, commit_id: &str, comment: &ReviewComment) -> Result<(), PrError>;

    async fn post_summary(&self, body: &str) -> Result<(), PrError>;
}

#[async_trait]
impl CommentTarget for GitHubClient {
    async fn post_inline(&self, commit_id: &str, comment: &ReviewComment) -> Result<(), PrError> {
        let body = format!("**[{}]** {}", comment.severity, comment.message);
        self.post_review_comment(commit_id, &comment.file, comment.line, &body)
            .await
    }

    async fn post_summary(&self, body: &str) -> Result<(), PrError> {
        self.post_issue_comment(body).await
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub inline_posted: usize,
    pub inline_failed: usize,
    pub summary_posted: bool,
}

/// Post anchored comments inline. When nothing could be posted inline, post a
/// single summary comment instead.
#[instrument(skip(target, selection), fields(anchored = selection.anchored.len(), unanchored = selection.unanchored.len()))]
pub async fn publish<T: CommentTarget + ?Sized>(
    target: &T,
    commit_id: &str,
    selection: &Selection,
) -> Result<PublishOutcome, PublishError> {
    let mut outcome = PublishOutcome::default();

    for comment in &selection.anchored {
        match target.post_inline(commit_id, comment).await {
            Ok(()) => {
                debug!(file = %comment.file, line = comment.line, "posted inline comment");
                outcome.inline_posted += 1;
            }
            Err(e) => {
                warn!(file = %comment.file, line = comment.line, error = %e, "inline comment failed");
                outcome.inline_failed += 1;
            }
        }
    }

    if outcome.inline_posted == 0 {
        info!("no inline comment posted, falling back to summary comment");
        target
            .post_summary(&render_summary(selection))
            .await
            .map_err(PublishError::Summary)?;
        outcome.summary_posted = true;
    }

    Ok(outcome)
}

/// Render the selection as a markdown PR comment.
pub fn render_summary(selection: &Selection) -> String {
    let mut md = String::from("## Automated review\n\n");
    if selection.is_empty() {
        md.push_str("No issues found in the changed lines.\n");
        return md;
    }
    for comment in selection.iter() {
        md.push_str(&format!(
            "- **[{}]** {} (`{}:{}`)\n",
            comment.severity, comment.message, comment.file, comment.line
        ));
    }
    md
}

/// Print the selection to the terminal instead of posting it.
pub fn print_terminal(selection: &Selection) {
    println!();
    println!("═══ Inline comments ({}) ═══", selection.anchored.len());
    print_comments(&selection.anchored);
    println!();
    println!("═══ Not anchored to an added line ({}) ═══", selection.unanchored.len());
    print_comments(&selection.unanchored);
    println!();
}

fn print_comments(comments: &[ReviewComment]) {
    if comments.is_empty() {
        println!("  None.");
        return;
    }
    for comment in comments {
        println!(
            "  • [{}] {} ({}:{})",
            colorize_severity(comment.severity),
            comment.message,
            comment.file,
            comment.line
        );
    }
}

fn colorize_severity(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::High => "HIGH".red().bold(),
        Severity::Medium => "MEDIUM".yellow().bold(),
        Severity::Low => "LOW".green().bold(),
    }
}
