pub mod diff;
pub mod types;

pub use types::{AnchorSet, ChangedFile, FileChanges, PrUrl, PullRequest};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument, warn};

const USER_AGENT: &str = "pr-reviewer";
const GITHUB_JSON: &str = "application/vnd.github+json";
const GITHUB_RAW: &str = "application/vnd.github.raw";
const FILES_PER_PAGE: usize = 100;
const MAX_ERROR_BODY: usize = 300;
const PR_TABS: &[&str] = &["files", "commits", "checks"];

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid PR URL: {0}")]
    InvalidUrl(String),

    #[error("Malformed patch at line {line}: {reason}")]
    MalformedPatch { line: usize, reason: String },
}

/// Parse a GitHub PR URL into its component parts.
///
/// Expected format: https://github.com/{owner}/{repo}/pull/{number}, optionally
/// followed by one of the PR tabs (`/files`, `/commits`, `/checks`) as copied
/// from the browser.
pub fn parse_pr_url(url: &str) -> Result<PrUrl, PrError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| PrError::InvalidUrl(url.to_string()))?;

    if parsed.host_str() != Some("github.com") {
        return Err(PrError::InvalidUrl(url.to_string()));
    }

    let segments: Vec<_> = parsed
        .path_segments()
        .ok_or_else(|| PrError::InvalidUrl(url.to_string()))?
        .filter(|segment| !segment.is_empty())
        .collect();

    let tab_ok = match segments.get(4) {
        None => true,
        Some(tab) => PR_TABS.contains(tab),
    };
    if !(4..=5).contains(&segments.len()) || segments[2] != "pull" || !tab_ok {
        return Err(PrError::InvalidUrl(url.to_string()));
    }

    let pr_number = segments[3]
        .parse::<u64>()
        .map_err(|_| PrError::InvalidUrl(url.to_string()))?;

    Ok(PrUrl {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        pr_number,
    })
}

/// Parse every changed file's patch, skipping files that carry no patch or
/// whose patch is malformed. Files without added lines are dropped.
pub fn collect_changes(files: &[ChangedFile]) -> Vec<FileChanges> {
    let mut collected = Vec::new();
    for file in files {
        let Some(patch) = file.patch.as_deref() else {
            debug!(file = %file.filename, status = %file.status, "no patch, skipping");
            continue;
        };
        match diff::parse_diff(patch) {
            Ok(changes) if changes.is_empty() => {
                debug!(file = %file.filename, "no added lines");
            }
            Ok(changes) => {
                debug!(
                    file = %file.filename,
                    added = changes.len(),
                    additions = file.additions,
                    deletions = file.deletions,
                    "parsed patch"
                );
                collected.push(FileChanges {
                    filename: file.filename.clone(),
                    changes,
                });
            }
            Err(e) => {
                warn!(file = %file.filename, error = %e, "skipping file with malformed patch");
            }
        }
    }
    collected
}

/// Thin client over the GitHub REST endpoints a review needs.
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
    pr_url: PrUrl,
}

impl GitHubClient {
    pub fn new(pr_url: PrUrl, api_base: &str, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            pr_url,
        }
    }

    pub fn pr_url(&self) -> &PrUrl {
        &self.pr_url
    }

    fn repo_path(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.pr_url.owner, self.pr_url.repo, suffix
        )
    }

    fn request(&self, method: reqwest::Method, url: &str, accept: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", accept)
            .bearer_auth(&self.token)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, url, GITHUB_JSON)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::POST, url, GITHUB_JSON)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PrError> {
        let response = check_status(self.get(url).send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Fetch the metadata needed to anchor comments (title, author, head sha).
    #[instrument(skip(self), fields(owner = %self.pr_url.owner, repo = %self.pr_url.repo, pr = self.pr_url.pr_number))]
    pub async fn fetch_pull_request(&self) -> Result<PullRequest, PrError> {
        #[derive(Deserialize)]
        struct User {
            login: String,
        }

        #[derive(Deserialize)]
        struct Head {
            sha: String,
        }

        #[derive(Deserialize)]
        struct PullResponse {
            number: u64,
            title: String,
            user: User,
            head: Head,
        }

        debug!("fetching PR metadata from GitHub API");
        let url = self.repo_path(&format!("pulls/{}", self.pr_url.pr_number));
        let metadata: PullResponse = self.get_json(&url).await?;
        debug!(title = %metadata.title, head = %metadata.head.sha, "received PR metadata");

        Ok(PullRequest {
            number: metadata.number,
            title: metadata.title,
            author: metadata.user.login,
            head_sha: metadata.head.sha,
        })
    }

    /// List every changed file of the PR, following pagination.
    #[instrument(skip(self), fields(pr = self.pr_url.pr_number))]
    pub async fn fetch_changed_files(&self) -> Result<Vec<ChangedFile>, PrError> {
        let mut files = Vec::new();
        let mut page = 1;
        loop {
            let url = self.repo_path(&format!(
                "pulls/{}/files?per_page={}&page={}",
                self.pr_url.pr_number, FILES_PER_PAGE, page
            ));
            let batch: Vec<ChangedFile> = self.get_json(&url).await?;
            debug!(page, count = batch.len(), "received changed files page");
            let last = batch.len() < FILES_PER_PAGE;
            files.extend(batch);
            if last {
                break;
            }
            page += 1;
        }
        Ok(files)
    }

    /// Fetch the repository README as raw text. A repository without a README
    /// yields an empty string.
    #[instrument(skip(self), fields(repo = %self.pr_url.full_name()))]
    pub async fn fetch_readme(&self) -> Result<String, PrError> {
        let response = self
            .request(reqwest::Method::GET, &self.repo_path("readme"), GITHUB_RAW)
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = response.status().as_u16(), "no README available");
            return Ok(String::new());
        }
        Ok(response.text().await?)
    }

    /// Post a top-level comment on the PR conversation.
    #[instrument(skip(self, body), fields(pr = self.pr_url.pr_number))]
    pub async fn post_issue_comment(&self, body: &str) -> Result<(), PrError> {
        let url = self.repo_path(&format!("issues/{}/comments", self.pr_url.pr_number));
        let response = self.post(&url).json(&json!({ "body": body })).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Post a review comment anchored to a line of the new file version.
    #[instrument(skip(self, commit_id, body), fields(pr = self.pr_url.pr_number))]
    pub async fn post_review_comment(
        &self,
        commit_id: &str,
        path: &str,
        line: usize,
        body: &str,
    ) -> Result<(), PrError> {
        let url = self.repo_path(&format!("pulls/{}/comments", self.pr_url.pr_number));
        let payload = json!({
            "body": body,
            "commit_id": commit_id,
            "path": path,
            "line": line,
            "side": "RIGHT",
        });
        let response = self.post(&url).json(&payload).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PrError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PrError::Api {
        status: status.as_u16(),
        body: truncate_chars(&body, MAX_ERROR_BODY),
    })
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
