pub mod api;
pub mod rate_limiter;
pub mod retry;

#[cfg(test)]
mod tests;

use api::{RedditApiClient, REDDIT_API_BASE};
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    Scope, TokenResponse, TokenUrl,
};
use reqwest::Client;
use retry::{RetryConfig, RetryExecutor};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use threadcast_core::{
    ConfigError, ContentSource, CoreError, Item, RawComment, RedditApiError,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens are renewed this long before Reddit would reject them.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on comments requested for one thread.
const DEFAULT_COMMENT_LIMIT: u32 = 500;

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub token_url: String,
    pub api_base: String,
}

impl RedditOAuth2Config {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            client_id,
            client_secret,
            user_agent,
            token_url: REDDIT_TOKEN_URL.to_string(),
            api_base: REDDIT_API_BASE.to_string(),
        }
    }

    /// Points the client at other token and API hosts.
    pub fn with_endpoints(mut self, token_url: String, api_base: String) -> Self {
        self.token_url = token_url;
        self.api_base = api_base;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn new(access_token: String, expires_in: Duration, scope: Vec<String>) -> Self {
        Self {
            access_token,
            expires_at: SystemTime::now() + expires_in,
            scope,
        }
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    /// True once the token is within the refresh margin of its expiry.
    pub fn needs_refresh(&self) -> bool {
        SystemTime::now() + TOKEN_REFRESH_MARGIN >= self.expires_at
    }
}

/// Read-only Reddit access with an application-only OAuth2 token.
pub struct RedditClient {
    config: RedditOAuth2Config,
    oauth_client: BasicClient,
    http_client: Client,
    api: RedditApiClient,
    retry: RetryExecutor,
    token: RwLock<Option<RedditToken>>,
    comment_depth: u32,
    comment_limit: u32,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "auth_url".to_string(),
                value: e.to_string(),
            }
        })?;
        let token_url = TokenUrl::new(config.token_url.clone()).map_err(|_| {
            ConfigError::InvalidValue {
                field: "token_url".to_string(),
                value: config.token_url.clone(),
            }
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::BasicAuth);

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        let api = RedditApiClient::new(config.user_agent.clone(), config.api_base.clone())?;

        Ok(Self {
            config,
            oauth_client,
            http_client,
            api,
            retry: RetryExecutor::new(RetryConfig::reddit()),
            token: RwLock::new(None),
            comment_depth: 3,
            comment_limit: DEFAULT_COMMENT_LIMIT,
        })
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry = RetryExecutor::new(retry_config);
        self
    }

    /// How many levels of replies Reddit should return per thread.
    pub fn with_comment_depth(mut self, depth: u32) -> Self {
        self.comment_depth = depth;
        self
    }

    pub fn config(&self) -> &RedditOAuth2Config {
        &self.config
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .map(|token| !token.is_expired())
            .unwrap_or(false)
    }

    pub async fn set_token(&self, token: RedditToken) {
        *self.token.write().await = Some(token);
    }

    /// Requests a fresh application token with the client-credentials grant.
    pub async fn authenticate(&self) -> Result<String, CoreError> {
        info!("Requesting Reddit application token");
        let http_client = self.http_client.clone();
        let response = self
            .oauth_client
            .exchange_client_credentials()
            .add_scope(Scope::new("read".to_string()))
            .request_async(|request| send_oauth_request(http_client, request))
            .await
            .map_err(token_error)?;

        let expires_in = response.expires_in().unwrap_or(Duration::from_secs(3600));
        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.as_str().to_string()).collect())
            .unwrap_or_default();
        let token = RedditToken::new(response.access_token().secret().clone(), expires_in, scope);
        let access_token = token.access_token.clone();

        debug!("Reddit token valid for {:?}", expires_in);
        self.set_token(token).await;
        Ok(access_token)
    }

    /// The cached token, renewed when it is missing or about to expire.
    pub async fn access_token(&self) -> Result<String, CoreError> {
        if let Some(token) = self.token.read().await.as_ref() {
            if !token.needs_refresh() {
                return Ok(token.access_token.clone());
            }
        }
        self.authenticate().await
    }

    /// Drops the cached token when Reddit rejected it, so the next call
    /// authenticates again.
    async fn checked<T>(&self, result: Result<T, CoreError>) -> Result<T, CoreError> {
        if let Err(CoreError::RedditApi(RedditApiError::InvalidToken)) = &result {
            warn!("Reddit rejected the access token, clearing it");
            *self.token.write().await = None;
        }
        result
    }
}

impl ContentSource for RedditClient {
    async fn list_recent_items(&self, source_id: &str, limit: u32) -> Result<Vec<Item>, CoreError> {
        let mut items: Vec<Item> = Vec::new();
        let mut after: Option<String> = None;

        while (items.len() as u32) < limit {
            let page_size = (limit - items.len() as u32).min(api::MAX_PAGE_SIZE);
            let after_ref = after.as_deref();

            let listing = self
                .retry
                .execute("list_recent_items", move || async move {
                    let token = self.access_token().await?;
                    let page = self
                        .api
                        .get_new_posts(&token, source_id, page_size, after_ref)
                        .await;
                    self.checked(page).await
                })
                .await?;

            let page_len = listing.data.children.len();
            items.extend(
                listing
                    .data
                    .children
                    .into_iter()
                    .map(|child| Item::from(child.data)),
            );

            match listing.data.after {
                Some(next) if page_len > 0 => after = Some(next),
                _ => break,
            }
        }

        items.truncate(limit as usize);
        info!(subreddit = %source_id, "Fetched {} recent items", items.len());
        Ok(items)
    }

    async fn fetch_comments(&self, item_id: &str) -> Result<Vec<RawComment>, CoreError> {
        let depth = self.comment_depth;
        let limit = self.comment_limit;

        let things = self
            .retry
            .execute("fetch_comments", move || async move {
                let token = self.access_token().await?;
                let comments = self.api.get_comments(&token, item_id, depth, limit).await;
                self.checked(comments).await
            })
            .await?;

        Ok(things.into_iter().map(RawComment::from).collect())
    }
}

/// Runs an oauth2 token request through reqwest so the Reddit user agent is
/// sent with it.
async fn send_oauth_request(
    http_client: Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http_client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

fn token_error(error: RequestTokenError<reqwest::Error, BasicErrorResponse>) -> CoreError {
    match error {
        RequestTokenError::ServerResponse(response) => {
            CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: response.to_string(),
            })
        }
        RequestTokenError::Request(e) => CoreError::Network(e),
        RequestTokenError::Parse(e, _) => CoreError::RedditApi(RedditApiError::InvalidResponse {
            details: format!("Failed to parse token response: {}", e),
        }),
        RequestTokenError::Other(reason) => {
            CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
        }
    }
}
