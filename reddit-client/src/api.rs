use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use threadcast_core::{CoreError, Item, RawComment, RawCommentData, RedditApiError};
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Largest page Reddit serves for a listing.
pub const MAX_PAGE_SIZE: u32 = 100;

const DELETED_ACCOUNT: &str = "[deleted]";

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<T>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub is_self: bool,
}

/// A child of a comment listing: either a comment or a "load more" stub.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommentThing {
    #[serde(rename = "t1")]
    Comment(RedditCommentData),
    #[serde(rename = "more")]
    More(RedditMoreData),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditCommentData {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub replies: CommentReplies,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditMoreData {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Reddit sends `""` instead of a listing when a comment has no replies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum CommentReplies {
    Listing(Box<RedditListing<CommentThing>>),
    Empty(String),
    #[default]
    Missing,
}

impl CommentReplies {
    pub fn into_things(self) -> Vec<CommentThing> {
        match self {
            CommentReplies::Listing(listing) => listing.data.children,
            CommentReplies::Empty(_) | CommentReplies::Missing => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    user_agent: String,
    api_base: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String, api_base: String) -> Result<Self, CoreError> {
        let rate_config = RateLimitConfig::reddit_oauth();
        let rate_limiter = Arc::new(RateLimiter::new(rate_config));

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter,
            user_agent,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Sends an authenticated request and maps error statuses onto
    /// [`RedditApiError`]. A 404 becomes `on_not_found`.
    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        on_not_found: RedditApiError,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.api_base, endpoint);

        let waited = self.rate_limiter.acquire_permit().await;
        debug!(
            "Acquired rate limit permit for {} {} after {:?}",
            method, endpoint, waited
        );

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .header("User-Agent", &self.user_agent);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        info!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let api_error = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<f64>().ok())
                    .map(|seconds| seconds.ceil() as u64)
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => on_not_found,
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => RedditApiError::InvalidResponse {
                details: format!("Unexpected status {} for {}", code, endpoint),
            },
        };

        Err(CoreError::RedditApi(api_error))
    }

    /// One page of `/r/{subreddit}/new`, newest first.
    pub async fn get_new_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<RedditListing<RedditListingChild<RedditPostData>>, CoreError> {
        let endpoint = format!("/r/{}/new", subreddit);
        let limit_str = limit.min(MAX_PAGE_SIZE).to_string();
        let mut params = vec![("limit", limit_str.as_str()), ("raw_json", "1")];
        if let Some(after_val) = after {
            params.push(("after", after_val));
        }

        let response = self
            .make_request(
                Method::GET,
                &endpoint,
                access_token,
                Some(params.as_slice()),
                RedditApiError::SubredditNotFound {
                    subreddit: subreddit.to_string(),
                },
            )
            .await?;

        let listing: RedditListing<RedditListingChild<RedditPostData>> =
            response.json().await.map_err(|e| {
                error!("Failed to parse subreddit posts: {}", e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Failed to parse posts for r/{}", subreddit),
                })
            })?;

        debug!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }

    /// Comment thread of a post, best comments first.
    pub async fn get_comments(
        &self,
        access_token: &str,
        post_id: &str,
        depth: u32,
        limit: u32,
    ) -> Result<Vec<CommentThing>, CoreError> {
        let endpoint = format!("/comments/{}", post_id);
        let depth_str = depth.max(1).to_string();
        let limit_str = limit.to_string();
        let params = [
            ("sort", "top"),
            ("depth", depth_str.as_str()),
            ("limit", limit_str.as_str()),
            ("raw_json", "1"),
        ];

        let response = self
            .make_request(
                Method::GET,
                &endpoint,
                access_token,
                Some(&params),
                RedditApiError::PostNotFound {
                    post_id: post_id.to_string(),
                },
            )
            .await?;

        // The first listing holds the post itself, the second its comments.
        let (_post, comments): (serde_json::Value, RedditListing<CommentThing>) =
            response.json().await.map_err(|e| {
                error!("Failed to parse comments: {}", e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Failed to parse comments for post {}", post_id),
                })
            })?;

        debug!(
            "Retrieved {} top-level comments for post {}",
            comments.data.children.len(),
            post_id
        );
        Ok(comments.data.children)
    }
}

fn author_handle(author: Option<String>) -> Option<String> {
    author.filter(|name| !name.is_empty() && name != DELETED_ACCOUNT)
}

impl From<RedditPostData> for Item {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            id: post_data.id,
            title: post_data.title,
            selftext: post_data.selftext,
            is_self: post_data.is_self,
            author: post_data.author,
            url: post_data.url,
            num_comments: post_data.num_comments,
            score: post_data.score,
            created_utc: DateTime::<Utc>::from_timestamp(post_data.created_utc as i64, 0)
                .unwrap_or_default(),
        }
    }
}

impl From<CommentThing> for RawComment {
    fn from(thing: CommentThing) -> Self {
        match thing {
            CommentThing::Comment(data) => RawComment::Comment(RawCommentData {
                author: author_handle(data.author),
                body: data.body,
                score: data.score,
                replies: data
                    .replies
                    .into_things()
                    .into_iter()
                    .map(RawComment::from)
                    .collect(),
            }),
            CommentThing::More(more) => RawComment::MoreMarker { count: more.count },
        }
    }
}
