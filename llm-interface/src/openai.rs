use crate::prompt::PromptConfig;
use crate::LlmProvider;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use threadcast_core::{AssembledDocument, CoreError, LlmError};
use tracing::{debug, info};

const PROVIDER: &str = "openai";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiProvider {
    api_key: String,
    http: Client,
    base_url: String,
    model: String,
    prompt: PromptConfig,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, prompt: PromptConfig) -> Result<Self, CoreError> {
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            api_key,
            http,
            base_url: "https://api.openai.com/v1".to_string(),
            model,
            prompt,
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap, CoreError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|_| {
            LlmError::InvalidApiKey {
                provider: PROVIDER.to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, CoreError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        debug!(model = %self.model, "OpenAI chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            let details = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, details, &self.model).into());
        }

        let chat_response: ChatResponse =
            response
                .json()
                .await
                .map_err(|_| LlmError::InvalidResponseFormat {
                    provider: PROVIDER.to_string(),
                })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                LlmError::InvalidResponseFormat {
                    provider: PROVIDER.to_string(),
                }
                .into()
            })
    }
}

fn status_error(status: StatusCode, retry_after: Option<u64>, details: String, model: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED => LlmError::InvalidApiKey {
            provider: PROVIDER.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded {
            provider: PROVIDER.to_string(),
            retry_after: retry_after.unwrap_or(60),
        },
        StatusCode::NOT_FOUND => LlmError::ModelNotAvailable {
            model: model.to_string(),
        },
        status if status.is_server_error() => LlmError::ServiceUnavailable {
            provider: PROVIDER.to_string(),
        },
        status => LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            status_code: status.as_u16(),
            details,
        },
    }
}

impl LlmProvider for OpenAiProvider {
    async fn generate(&self, document: &AssembledDocument) -> Result<String, CoreError> {
        let user_message = self.prompt.user_message(document)?;
        debug!(item_id = %document.item.id, "Document sent to model:\n{}", user_message);

        let response = self.chat(self.prompt.system_message(), &user_message).await?;

        info!(item_id = %document.item.id, model = %self.model, "Received model response");
        debug!("Model response:\n{}", response);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, None, String::new(), "gpt-4o"),
            LlmError::InvalidApiKey { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, Some(20), String::new(), "gpt-4o"),
            LlmError::RateLimitExceeded { retry_after: 20, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, None, String::new(), "gpt-9"),
            LlmError::ModelNotAvailable { ref model } if model == "gpt-9"
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, None, String::new(), "gpt-4o"),
            LlmError::ServiceUnavailable { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, None, "bad".to_string(), "gpt-4o"),
            LlmError::RequestFailed { status_code: 400, .. }
        ));
    }

    #[test]
    fn test_base_url_is_normalised() {
        let prompt = PromptConfig {
            subreddit: "rust".to_string(),
            role_description: "role".to_string(),
            focus: "focus".to_string(),
            tweet_instructions: "instructions".to_string(),
        };
        let provider = OpenAiProvider::new("key".to_string(), "gpt-4o".to_string(), prompt)
            .unwrap()
            .with_base_url("http://localhost:1234/v1/");
        assert_eq!(provider.base_url, "http://localhost:1234/v1");
        assert_eq!(provider.model(), "gpt-4o");
    }
}
