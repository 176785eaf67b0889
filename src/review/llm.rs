use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{parse_review_response, ReviewComment, ReviewError, ReviewRequest, Reviewer};
use crate::config::ReviewerConfig;

const MAX_ERROR_BODY: usize = 300;

const SYSTEM_PROMPT: &str = "You are a senior code reviewer. You receive a JSON document \
describing a pull request: repository context, review rules and, for every changed file, the \
added lines with their line numbers in the new file. Comment only on added lines, using the \
exact `filename` and `line` values from the input. Follow the `focus` and `ignore` rules and \
return at most `max_comments` comments. Respond with a JSON object of the form \
{\"comments\": [{\"file\": string, \"line\": integer, \"severity\": \"low\" | \"medium\" | \"high\", \
\"message\": string}]}. Return {\"comments\": []} when nothing is worth raising.";

/// Reviewer backed by an OpenAI-compatible chat completions endpoint.
pub struct LlmReviewer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl LlmReviewer {
    pub fn new(config: &ReviewerConfig, api_key: String) -> Result<Self, ReviewError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl Reviewer for LlmReviewer {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, files = request.changes.len()))]
    async fn review(&self, request: &ReviewRequest) -> Result<Vec<ReviewComment>, ReviewError> {
        let payload = serde_json::to_string(request)?;
        debug!(payload_bytes = payload.len(), "sending review request");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "temperature": 0.1,
                "response_format": { "type": "json_object" },
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": payload },
                ],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Api {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let parsed: ChatCompletionsResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ReviewError::InvalidResponse("no completion content".to_string()))?;
        debug!(content_bytes = content.len(), "received review response");

        parse_review_response(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reviewer() -> LlmReviewer {
        let config = ReviewerConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..ReviewerConfig::default()
        };
        LlmReviewer::new(&config, "sk-test".to_string()).unwrap()
    }

    #[test]
    fn test_completions_url() {
        assert_eq!(
            reviewer().completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_name_is_model() {
        assert_eq!(reviewer().name(), "gpt-4o-mini");
    }

    #[test]
    fn test_decode_completion_envelope() {
        let raw = r#"{"choices": [{"message": {"role": "assistant", "content": "{\"comments\": []}"}}]}"#;
        let parsed: ChatCompletionsResponse = serde_json::from_str(raw).unwrap();
        let content = parsed.choices[0].message.content.as_deref().unwrap();
        assert!(parse_review_response(content).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let config = ReviewerConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..ReviewerConfig::default()
        };
        let reviewer = LlmReviewer::new(&config, "sk-test".to_string()).unwrap();
        let request = ReviewRequest {
            repository: "org/repo".to_string(),
            title: "t".to_string(),
            context: Default::default(),
            rules: crate::review::ReviewRules {
                focus: vec![],
                ignore: vec![],
                max_comments: 1,
            },
            changes: vec![],
        };
        assert!(matches!(
            reviewer.review(&request).await,
            Err(ReviewError::Request(_))
        ));
    }
}
