//! OAuth 1.0a request signing (HMAC-SHA1, RFC 5849).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;
use std::fmt;
use threadcast_core::PublishError;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// Everything except the RFC 3986 unreserved characters.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Consumer and user-context token pair for one account.
#[derive(Clone)]
pub struct OAuth1Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl fmt::Debug for OAuth1Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Credentials")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

/// Per-request values that must differ between requests.
#[derive(Debug, Clone)]
pub struct RequestNonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl RequestNonce {
    pub fn fresh() -> Self {
        Self {
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Scheme, host, port (when not the default) and path of `url`.
fn base_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}

/// `METHOD&base-url&normalized-parameters`, each part percent-encoded.
///
/// Query parameters of `url` are always included; `extra_params` carries
/// form-encoded body parameters when there are any.
pub fn signature_base_string(
    method: &str,
    url: &Url,
    oauth_params: &[(&str, String)],
    extra_params: &[(&str, &str)],
) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (encode(&key), encode(&value)))
        .chain(oauth_params.iter().map(|(key, value)| (encode(key), encode(value))))
        .chain(extra_params.iter().map(|(key, value)| (encode(key), encode(value))))
        .collect();
    params.sort();

    let normalized = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(&base_url(url)),
        encode(&normalized)
    )
}

pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> Result<String, PublishError> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| PublishError::SigningFailed {
        reason: e.to_string(),
    })?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn oauth_params(credentials: &OAuth1Credentials, nonce: &RequestNonce) -> Vec<(&'static str, String)> {
    vec![
        ("oauth_consumer_key", credentials.consumer_key.clone()),
        ("oauth_nonce", nonce.nonce.clone()),
        ("oauth_signature_method", "HMAC-SHA1".to_string()),
        ("oauth_timestamp", nonce.timestamp.to_string()),
        ("oauth_token", credentials.access_token.clone()),
        ("oauth_version", "1.0".to_string()),
    ]
}

/// Value of the `Authorization` header for a request whose body is not
/// form-encoded (JSON bodies are not signed).
pub fn authorization_header(
    credentials: &OAuth1Credentials,
    method: &str,
    url: &Url,
    nonce: &RequestNonce,
) -> Result<String, PublishError> {
    let mut params = oauth_params(credentials, nonce);
    let base_string = signature_base_string(method, url, &params, &[]);
    let signature = sign(
        &base_string,
        &credentials.consumer_secret,
        &credentials.access_secret,
    )?;
    params.push(("oauth_signature", signature));
    params.sort();

    let fields = params
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {}", fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documented_credentials() -> OAuth1Credentials {
        OAuth1Credentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".to_string(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string(),
            access_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            access_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
        }
    }

    fn documented_nonce() -> RequestNonce {
        RequestNonce {
            nonce: "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg".to_string(),
            timestamp: 1318622958,
        }
    }

    #[test]
    fn test_percent_encoding() {
        assert_eq!(encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(encode("An encoded string!"), "An%20encoded%20string%21");
        assert_eq!(encode("Dogs, Cats & Mice"), "Dogs%2C%20Cats%20%26%20Mice");
        assert_eq!(encode("☃"), "%E2%98%83");
        assert_eq!(encode("safe-._~"), "safe-._~");
    }

    #[test]
    fn test_signature_matches_documented_example() {
        let credentials = documented_credentials();
        let url =
            Url::parse("https://api.twitter.com/1.1/statuses/update.json?include_entities=true")
                .unwrap();
        let params = oauth_params(&credentials, &documented_nonce());

        let base_string = signature_base_string(
            "post",
            &url,
            &params,
            &[("status", "Hello Ladies + Gentlemen, a signed OAuth request!")],
        );

        assert_eq!(
            base_string,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&\
             include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26\
             oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26\
             oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26\
             oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26\
             oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen\
             %252C%2520a%2520signed%2520OAuth%2520request%2521"
        );

        let signature = sign(
            &base_string,
            &credentials.consumer_secret,
            &credentials.access_secret,
        )
        .unwrap();
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_base_url_keeps_non_default_port() {
        let url = Url::parse("http://127.0.0.1:8080/2/tweets").unwrap();
        assert_eq!(base_url(&url), "http://127.0.0.1:8080/2/tweets");

        let url = Url::parse("HTTPS://API.X.COM:443/2/tweets").unwrap();
        assert_eq!(base_url(&url), "https://api.x.com/2/tweets");
    }

    #[test]
    fn test_authorization_header_fields() {
        let url = Url::parse("https://api.twitter.com/2/tweets").unwrap();
        let header =
            authorization_header(&documented_credentials(), "POST", &url, &documented_nonce())
                .unwrap();

        assert!(header.starts_with("OAuth "));
        for field in [
            "oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\"",
            "oauth_nonce=\"kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg\"",
            "oauth_signature_method=\"HMAC-SHA1\"",
            "oauth_timestamp=\"1318622958\"",
            "oauth_version=\"1.0\"",
            "oauth_signature=\"",
        ] {
            assert!(header.contains(field), "missing {} in {}", field, header);
        }
    }

    #[test]
    fn test_fresh_nonces_differ() {
        let first = RequestNonce::fresh();
        let second = RequestNonce::fresh();
        assert_ne!(first.nonce, second.nonce);
        assert!(first.nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", documented_credentials());
        assert!(!rendered.contains("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"));
    }
}
