mod config;
mod context;
mod pr;
mod publish;
mod review;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use review::Reviewer;

/// PR Reviewer — CLI tool that takes a GitHub Pull Request URL, asks an LLM to
/// review the added lines, and posts its comments back onto the PR.
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer", version, about)]
struct Cli {
    /// GitHub Pull Request URL (e.g., https://github.com/org/repo/pull/42)
    ///
    /// Not required when --mock is used.
    pr_url: Option<String>,

    /// Path to a config file (defaults to .pr-reviewer.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the review instead of posting it to GitHub
    #[arg(long)]
    dry_run: bool,

    /// Print the reviewer payload for a built-in sample PR (no network, no tokens)
    #[arg(long)]
    r#mock: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = match cli.config.as_deref() {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };

    if cli.r#mock {
        info!("using mock PR data for demo");
        let request = build_mock_request(&config)?;
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let pr_url = cli.pr_url.as_deref().ok_or(
        "PR URL is required unless --mock is used. Usage: pr-reviewer <URL> or pr-reviewer --mock",
    )?;

    let _main_span = info_span!("pr_review", pr_url = %pr_url).entered();

    info!("parsing PR URL");
    let parsed_url = pr::parse_pr_url(pr_url)?;
    debug!(owner = %parsed_url.owner, repo = %parsed_url.repo, pr = parsed_url.pr_number, "parsed PR URL");

    let github_token = config.github_token()?;
    let reviewer = review::LlmReviewer::new(&config.reviewer, config.reviewer_api_key()?)?;
    let client = pr::GitHubClient::new(parsed_url, &config.github.api_base, github_token);

    info!("fetching pull request from GitHub");
    let pull_request = client.fetch_pull_request().await?;
    let files = client.fetch_changed_files().await?;
    info!(number = pull_request.number, author = %pull_request.author, files = files.len(), "fetched PR");

    let changes = pr::collect_changes(&files);
    let anchors = pr::AnchorSet::from_changes(&changes);
    info!(files_with_additions = changes.len(), added_lines = anchors.len(), "parsed patches");

    let readme = match client.fetch_readme().await {
        Ok(readme) => readme,
        Err(e) => {
            warn!(error = %e, "README fetch failed, continuing without context");
            String::new()
        }
    };

    let request = review::ReviewRequest {
        repository: client.pr_url().full_name(),
        title: pull_request.title.clone(),
        context: context::build_context(&readme, config.review.readme_limit),
        rules: review_rules(&config),
        changes,
    };

    info!(reviewer = %reviewer.name(), "requesting review");
    let comments = reviewer.review(&request).await?;
    info!(comments = comments.len(), "review received");

    let selection = review::select_comments(comments, &anchors, config.review.max_comments);

    if cli.dry_run {
        publish::print_terminal(&selection);
        return Ok(());
    }

    let outcome = publish::publish(&client, &pull_request.head_sha, &selection).await?;
    info!(
        inline_posted = outcome.inline_posted,
        inline_failed = outcome.inline_failed,
        summary_posted = outcome.summary_posted,
        "done"
    );

    Ok(())
}

fn review_rules(config: &config::Config) -> review::ReviewRules {
    review::ReviewRules {
        focus: config.review.focus.clone(),
        ignore: config.review.ignore.clone(),
        max_comments: config.review.max_comments,
    }
}

/// Build the reviewer payload for the embedded sample PR fixture.
/// This enables inspecting the full parse pipeline without any token.
fn build_mock_request(
    config: &config::Config,
) -> Result<review::ReviewRequest, Box<dyn std::error::Error>> {
    let fixture = include_str!("../tests/fixtures/sample_files.json");
    let files: Vec<pr::ChangedFile> = serde_json::from_str(fixture)?;
    let changes = pr::collect_changes(&files);

    Ok(review::ReviewRequest {
        repository: "acme/auth-service".to_string(),
        title: "Persist sessions in SQL".to_string(),
        context: context::build_context(
            "# auth-service\nSession handling for the platform.",
            config.review.readme_limit,
        ),
        rules: review_rules(config),
        changes,
    })
}
