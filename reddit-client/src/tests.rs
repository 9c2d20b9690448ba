use crate::{api, rate_limiter, retry, RedditClient, RedditOAuth2Config, RedditToken};
use std::time::{Duration, SystemTime};

fn create_test_config() -> RedditOAuth2Config {
    RedditOAuth2Config::new(
        "test_client_id".to_string(),
        "test_client_secret".to_string(),
        "threadcast/1.0 by test_user".to_string(),
    )
}

#[test]
fn test_config_creation() {
    let config = create_test_config();
    assert_eq!(config.client_id, "test_client_id");
    assert_eq!(config.client_secret, "test_client_secret");
    assert_eq!(config.user_agent, "threadcast/1.0 by test_user");
    assert_eq!(config.token_url, "https://www.reddit.com/api/v1/access_token");
    assert_eq!(config.api_base, api::REDDIT_API_BASE);
}

#[test]
fn test_config_with_endpoints() {
    let config = create_test_config().with_endpoints(
        "http://127.0.0.1:9000/api/v1/access_token".to_string(),
        "http://127.0.0.1:9000".to_string(),
    );
    assert_eq!(config.token_url, "http://127.0.0.1:9000/api/v1/access_token");
    assert_eq!(config.api_base, "http://127.0.0.1:9000");
}

#[test]
fn test_client_creation() {
    let client = RedditClient::new(create_test_config()).unwrap();
    assert!(!tokio_test::block_on(client.is_authenticated()));
    assert_eq!(client.config().client_id, "test_client_id");
}

#[test]
fn test_invalid_token_url_is_rejected() {
    let config = create_test_config().with_endpoints(
        "not a url".to_string(),
        "http://127.0.0.1:9000".to_string(),
    );
    assert!(RedditClient::new(config).is_err());
}

#[test]
fn test_token_expiry() {
    let now = SystemTime::now();

    let valid_token = RedditToken {
        access_token: "valid_token".to_string(),
        expires_at: now + Duration::from_secs(3600),
        scope: vec!["read".to_string()],
    };
    assert!(!valid_token.is_expired());
    assert!(!valid_token.needs_refresh());

    let almost_expired = RedditToken {
        access_token: "almost".to_string(),
        expires_at: now + Duration::from_secs(30),
        scope: vec!["read".to_string()],
    };
    assert!(!almost_expired.is_expired());
    assert!(almost_expired.needs_refresh());

    let expired_token = RedditToken {
        access_token: "expired_token".to_string(),
        expires_at: now - Duration::from_secs(3600),
        scope: vec!["read".to_string()],
    };
    assert!(expired_token.is_expired());
    assert!(expired_token.needs_refresh());
}

#[tokio::test]
async fn test_cached_token_is_reused() {
    let client = RedditClient::new(create_test_config()).unwrap();
    client
        .set_token(RedditToken::new(
            "cached".to_string(),
            Duration::from_secs(3600),
            vec!["read".to_string()],
        ))
        .await;

    assert!(client.is_authenticated().await);
    assert_eq!(client.access_token().await.unwrap(), "cached");
}

#[test]
fn test_token_serialization() {
    let token = RedditToken {
        access_token: "test_access_token".to_string(),
        expires_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1640995200),
        scope: vec!["read".to_string()],
    };

    let serialized = serde_json::to_string(&token).unwrap();
    assert!(serialized.contains("test_access_token"));

    let deserialized: RedditToken = serde_json::from_str(&serialized).unwrap();
    assert_eq!(deserialized.access_token, token.access_token);
    assert_eq!(deserialized.expires_at, token.expires_at);
    assert_eq!(deserialized.scope, token.scope);
}

#[tokio::test]
async fn test_rate_limiter_defaults() {
    let limiter = rate_limiter::RateLimiter::new(rate_limiter::RateLimitConfig::reddit_oauth());
    assert_eq!(limiter.max_tokens(), 10);
    assert!(limiter.available_tokens().await > 0);
}

#[test]
fn test_client_accepts_retry_config() {
    let client = RedditClient::new(create_test_config())
        .unwrap()
        .with_retry_config(retry::RetryConfig {
            max_attempts: 1,
            ..Default::default()
        })
        .with_comment_depth(1);
    assert_eq!(client.retry.config().max_attempts, 1);
    assert_eq!(client.comment_depth, 1);
}
