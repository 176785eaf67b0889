use serde::Serialize;

/// Repository background handed to the reviewer alongside the changes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoContext {
    pub readme_excerpt: String,
}

/// Build the reviewer context from the repository README, keeping at most
/// `limit` characters.
pub fn build_context(readme: &str, limit: usize) -> RepoContext {
    RepoContext {
        readme_excerpt: readme.chars().take(limit).collect(),
    }
}
