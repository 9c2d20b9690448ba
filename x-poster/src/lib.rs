pub mod oauth1;

pub use oauth1::OAuth1Credentials;

use oauth1::{authorization_header, RequestNonce};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use threadcast_core::{CoreError, Credentials, PublishConfig, PublishError};
use tracing::{debug, info, warn};
use url::Url;

/// Seconds to wait when X rate-limits without saying for how long.
const DEFAULT_RETRY_AFTER: u64 = 900;

/// Identifier and text of a published message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub id: String,
    pub text: String,
}

/// Posts a message to the microblogging platform.
pub trait Publisher {
    async fn publish(&self, text: &str) -> Result<PublishReceipt, CoreError>;
}

#[derive(Debug, Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: Option<CreatedTweet>,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl From<&Credentials> for OAuth1Credentials {
    fn from(credentials: &Credentials) -> Self {
        Self {
            consumer_key: credentials.x_api_key.clone(),
            consumer_secret: credentials.x_api_secret.clone(),
            access_token: credentials.x_access_token.clone(),
            access_secret: credentials.x_access_secret.clone(),
        }
    }
}

/// X API v2 client posting as the account the access token belongs to.
#[derive(Debug)]
pub struct XPoster {
    http: Client,
    endpoint: Url,
    credentials: OAuth1Credentials,
    max_chars: usize,
}

impl XPoster {
    pub fn new(credentials: OAuth1Credentials, config: &PublishConfig) -> Result<Self, CoreError> {
        let endpoint = format!("{}/2/tweets", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint).map_err(|e| CoreError::InvalidInput {
            message: format!("Invalid publish base_url {}: {}", config.base_url, e),
        })?;
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            http,
            endpoint,
            credentials,
            max_chars: config.max_chars,
        })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Rejects messages the platform would refuse, without a network call.
    pub fn check_length(&self, text: &str) -> Result<(), PublishError> {
        if text.trim().is_empty() {
            return Err(PublishError::EmptyMessage);
        }
        let length = text.chars().count();
        if length > self.max_chars {
            return Err(PublishError::TooLong {
                length,
                max_chars: self.max_chars,
            });
        }
        Ok(())
    }
}

impl Publisher for XPoster {
    async fn publish(&self, text: &str) -> Result<PublishReceipt, CoreError> {
        self.check_length(text)?;

        let auth = authorization_header(
            &self.credentials,
            "POST",
            &self.endpoint,
            &RequestNonce::fresh(),
        )?;

        debug!("Posting {} characters to {}", text.chars().count(), self.endpoint);
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/json")
            .json(&CreateTweetRequest { text })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER);
            warn!("X rate limit reached, retry after {} seconds", retry_after);
            return Err(PublishError::RateLimitExceeded { retry_after }.into());
        }
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status_code: status.as_u16(),
                details,
            }
            .into());
        }

        let body: CreateTweetResponse = response.json().await?;
        let created = body.data.ok_or(PublishError::MissingIdentifier)?;
        let id = created.id.ok_or(PublishError::MissingIdentifier)?;

        info!(tweet_id = %id, "Message published");
        Ok(PublishReceipt {
            id,
            text: created.text.unwrap_or_else(|| text.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poster(max_chars: usize) -> XPoster {
        let credentials = OAuth1Credentials {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            access_token: "at".to_string(),
            access_secret: "as".to_string(),
        };
        XPoster::new(
            credentials,
            &PublishConfig {
                base_url: "https://api.twitter.com/".to_string(),
                max_chars,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_is_built_from_base_url() {
        assert_eq!(poster(280).endpoint.as_str(), "https://api.twitter.com/2/tweets");
    }

    #[test]
    fn test_length_is_counted_in_characters() {
        let poster = poster(280);
        assert!(poster.check_length(&"a".repeat(280)).is_ok());
        assert!(poster.check_length(&"é".repeat(280)).is_ok());
        assert!(matches!(
            poster.check_length(&"a".repeat(281)),
            Err(PublishError::TooLong {
                length: 281,
                max_chars: 280
            })
        ));
    }

    #[test]
    fn test_blank_message_is_rejected() {
        assert!(matches!(
            poster(280).check_length("  \n"),
            Err(PublishError::EmptyMessage)
        ));
    }

    #[test]
    fn test_credentials_conversion() {
        let credentials = Credentials {
            reddit_client_id: "id".to_string(),
            reddit_client_secret: "secret".to_string(),
            reddit_user_agent: None,
            openai_api_key: "sk".to_string(),
            x_api_key: "key".to_string(),
            x_api_secret: "key-secret".to_string(),
            x_access_token: "token".to_string(),
            x_access_secret: "token-secret".to_string(),
        };
        let oauth = OAuth1Credentials::from(&credentials);
        assert_eq!(oauth.consumer_key, "key");
        assert_eq!(oauth.consumer_secret, "key-secret");
        assert_eq!(oauth.access_token, "token");
        assert_eq!(oauth.access_secret, "token-secret");
    }
}
