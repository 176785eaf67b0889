use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".pr-reviewer.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0} not found in config or environment")]
    MissingToken(&'static str),
}

/// Top-level configuration loaded from .pr-reviewer.toml.
///
/// Every field has a default so the tool runs with zero config as long as
/// GITHUB_TOKEN and OPENAI_API_KEY are exported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub reviewer: ReviewerConfig,

    #[serde(default)]
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_api_base(),
        }
    }
}

/// Settings for the OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewerConfig {
    /// If None, falls back to OPENAI_API_KEY env var.
    pub api_key: Option<String>,
    #[serde(default = "default_reviewer_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_reviewer_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// What the reviewer should look at and how much it may say.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_focus")]
    pub focus: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default = "default_max_comments")]
    pub max_comments: usize,
    /// Characters of README passed along as repository context
    #[serde(default = "default_readme_limit")]
    pub readme_limit: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            focus: default_focus(),
            ignore: Vec::new(),
            max_comments: default_max_comments(),
            readme_limit: default_readme_limit(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_reviewer_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_focus() -> Vec<String> {
    vec![
        "bugs".to_string(),
        "security".to_string(),
        "performance".to_string(),
    ]
}

fn default_max_comments() -> usize {
    5
}

fn default_readme_limit() -> usize {
    3000
}

impl Config {
    /// Load configuration from .pr-reviewer.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var.
    pub fn github_token(&self) -> Result<String, ConfigError> {
        self.github
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .ok_or(ConfigError::MissingToken("GITHUB_TOKEN"))
    }

    /// Resolve the reviewer API key: config file value takes precedence,
    /// falls back to OPENAI_API_KEY env var.
    pub fn reviewer_api_key(&self) -> Result<String, ConfigError> {
        self.reviewer
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or(ConfigError::MissingToken("OPENAI_API_KEY"))
    }
}
