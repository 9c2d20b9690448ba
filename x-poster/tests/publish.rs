use serde_json::json;
use threadcast_core::{CoreError, PublishConfig, PublishError};
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use x_poster::{OAuth1Credentials, Publisher, XPoster};

fn poster(server: &MockServer) -> XPoster {
    let credentials = OAuth1Credentials {
        consumer_key: "consumer-key".to_string(),
        consumer_secret: "consumer-secret".to_string(),
        access_token: "access-token".to_string(),
        access_secret: "access-secret".to_string(),
    };
    XPoster::new(
        credentials,
        &PublishConfig {
            base_url: server.uri(),
            max_chars: 280,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn publish_returns_receipt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(header_exists("authorization"))
        .and(body_json(json!({"text": "Patch notes are out #PoE2"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "1866000000000000001", "text": "Patch notes are out #PoE2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = poster(&server)
        .publish("Patch notes are out #PoE2")
        .await
        .unwrap();

    assert_eq!(receipt.id, "1866000000000000001");
    assert_eq!(receipt.text, "Patch notes are out #PoE2");

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(auth.starts_with("OAuth "));
    assert!(auth.contains("oauth_consumer_key=\"consumer-key\""));
    assert!(auth.contains("oauth_token=\"access-token\""));
}

#[tokio::test]
async fn overlong_message_never_reaches_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let result = poster(&server).publish(&"x".repeat(281)).await;

    assert!(matches!(
        result,
        Err(CoreError::Publish(PublishError::TooLong {
            length: 281,
            max_chars: 280
        }))
    ));
}

#[tokio::test]
async fn rejection_carries_status_and_details() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(403).set_body_string("duplicate content"))
        .mount(&server)
        .await;

    let result = poster(&server).publish("Same tweet again").await;

    match result {
        Err(CoreError::Publish(PublishError::Rejected {
            status_code,
            details,
        })) => {
            assert_eq!(status_code, 403);
            assert_eq!(details, "duplicate content");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_id_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"text": "hi"}})))
        .mount(&server)
        .await;

    let result = poster(&server).publish("hi").await;

    assert!(matches!(
        result,
        Err(CoreError::Publish(PublishError::MissingIdentifier))
    ));
}

#[tokio::test]
async fn rate_limit_uses_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "120"))
        .mount(&server)
        .await;

    let result = poster(&server).publish("hello").await;

    assert!(matches!(
        result,
        Err(CoreError::Publish(PublishError::RateLimitExceeded { retry_after: 120 }))
    ));
}
