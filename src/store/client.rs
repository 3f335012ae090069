use crate::config::StoreConfig;
use crate::error::{AppError, AppResult};
use crate::provision::{EncryptedSecret, PublicKeyRecord};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use sealbridge_types::{StorePublicKey, StoreSecretUpdate};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";

/// Failures talking to the remote store.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    #[error("error response: {body}, with code: {status}")]
    Status { status: u16, body: String },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid store URL: {0}")]
    InvalidUrl(String),
}

/// The two store operations the provisioning workflow depends on.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the repository's current public key and its identifier.
    async fn fetch_public_key(&self, owner: &str, repo: &str) -> Result<PublicKeyRecord, RemoteApiError>;

    /// Create or overwrite `secret_name` with an already sealed value.
    async fn submit_secret(
        &self,
        owner: &str,
        repo: &str,
        secret_name: &str,
        secret: &EncryptedSecret,
    ) -> Result<(), RemoteApiError>;
}

/// HTTP client for a GitHub-compatible Actions secrets API
pub struct SecretStoreClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for SecretStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStoreClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SecretStoreClient {
    /// Create a new store client from config
    pub fn new(config: &StoreConfig) -> AppResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            AppError::Config(config::ConfigError::Message(format!(
                "invalid store.base_url {:?}: {}",
                config.base_url, e
            )))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(config::ConfigError::Message(format!(
                "store.base_url {:?} cannot carry a path",
                config.base_url
            ))));
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));
        let api_version = HeaderValue::from_str(&config.api_version).map_err(|_| {
            AppError::Config(config::ConfigError::Message(format!(
                "store.api_version {:?} is not a valid header value",
                config.api_version
            )))
        })?;
        headers.insert(API_VERSION_HEADER, api_version);

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(RemoteApiError::from)?;

        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
        })
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        if self.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.token)
        }
    }

    /// Pass through responses whose status is in `accepted`; anything else
    /// becomes a `Status` error carrying the response body.
    async fn check_status(
        response: Response,
        accepted: &[StatusCode],
        operation: &str,
    ) -> Result<Response, RemoteApiError> {
        let status = response.status();
        if accepted.contains(&status) {
            return Ok(response);
        }

        let body = read_error_body(response.text().await, operation);
        error!("{} failed with status {}: {}", operation, status, body);
        Err(RemoteApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Body text for a rejected call. A body that cannot be read is logged and
/// replaced so the status error still says so.
fn read_error_body(body: reqwest::Result<String>, operation: &str) -> String {
    match body {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to read {} error body: {}", operation, e);
            UNREADABLE_BODY.to_string()
        }
    }
}

const UNREADABLE_BODY: &str = "<unreadable body>";

#[async_trait]
impl SecretStore for SecretStoreClient {
    async fn fetch_public_key(&self, owner: &str, repo: &str) -> Result<PublicKeyRecord, RemoteApiError> {
        let url = self.endpoint(&["repos", owner, repo, "actions", "secrets", "public-key"])?;
        debug!("Fetching public key for {}/{}", owner, repo);

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| {
                error!("Public key request for {}/{} failed: {}", owner, repo, e);
                RemoteApiError::Transport(e)
            })?;

        let response = Self::check_status(response, &[StatusCode::OK], "Public key fetch").await?;

        let key: StorePublicKey = response.json().await.map_err(|e| {
            error!("Failed to parse public key response for {}/{}: {}", owner, repo, e);
            RemoteApiError::Transport(e)
        })?;

        debug!("Fetched public key {} for {}/{}", key.key_id, owner, repo);
        Ok(PublicKeyRecord::new(key.key, key.key_id))
    }

    async fn submit_secret(
        &self,
        owner: &str,
        repo: &str,
        secret_name: &str,
        secret: &EncryptedSecret,
    ) -> Result<(), RemoteApiError> {
        let url = self.endpoint(&["repos", owner, repo, "actions", "secrets", secret_name])?;
        let body = StoreSecretUpdate {
            encrypted_value: secret.ciphertext().to_string(),
            key_id: secret.key_id().to_string(),
        };

        let response = self
            .request(Method::PUT, url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Secret write for {}/{}/{} failed: {}", owner, repo, secret_name, e);
                RemoteApiError::Transport(e)
            })?;

        let response = Self::check_status(
            response,
            &[StatusCode::CREATED, StatusCode::NO_CONTENT],
            "Secret write",
        )
        .await?;

        if response.status() == StatusCode::CREATED {
            info!("Created secret {} in {}/{}", secret_name, owner, repo);
        } else {
            info!("Updated secret {} in {}/{}", secret_name, owner, repo);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> SecretStoreClient {
        SecretStoreClient::new(&StoreConfig {
            base_url: base_url.to_string(),
            token: "test-token".to_string(),
            timeout_secs: 5,
            ..StoreConfig::default()
        })
        .unwrap()
    }

    fn sealed() -> EncryptedSecret {
        EncryptedSecret::new("c2VhbGVk".to_string(), "568250167242549743".to_string())
    }

    #[test]
    fn test_unreadable_error_body_is_marked() {
        let read_failure = reqwest::Client::new().get("not a url").build().unwrap_err();
        assert_eq!(read_error_body(Err(read_failure), "Fetch public key"), "<unreadable body>");
        assert_eq!(read_error_body(Ok("Not Found".to_string()), "Fetch public key"), "Not Found");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = test_client("https://api.github.com");
        let url = client.endpoint(&["repos", "my org", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/my%20org/a%2Fb");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        for base in ["https://ghe.example.com/api/v3", "https://ghe.example.com/api/v3/"] {
            let client = test_client(base);
            let url = client
                .endpoint(&["repos", "octo", "hello", "actions", "secrets", "public-key"])
                .unwrap();
            assert_eq!(
                url.as_str(),
                "https://ghe.example.com/api/v3/repos/octo/hello/actions/secrets/public-key"
            );
        }
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        let config = StoreConfig {
            base_url: "mailto:ops@example.com".to_string(),
            ..StoreConfig::default()
        };
        assert!(matches!(SecretStoreClient::new(&config), Err(AppError::Config(_))));

        let config = StoreConfig {
            base_url: "not a url".to_string(),
            ..StoreConfig::default()
        };
        assert!(matches!(SecretStoreClient::new(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = test_client("https://api.github.com");
        assert!(!format!("{:?}", client).contains("test-token"));
    }

    #[tokio::test]
    async fn fetch_public_key_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/hello/actions/secrets/public-key"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", ACCEPT_GITHUB_JSON))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key_id": "568250167242549743",
                "key": "hBT5WZEj8ZoOv6TYJsfWq7MxTEQopZO5/IT3ZCVQPzs="
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let record = client.fetch_public_key("octo", "hello").await.unwrap();

        assert_eq!(record.key_id(), "568250167242549743");
        assert_eq!(record.key(), "hBT5WZEj8ZoOv6TYJsfWq7MxTEQopZO5/IT3ZCVQPzs=");
    }

    #[tokio::test]
    async fn fetch_public_key_error_status_carries_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/missing/actions/secrets/public-key"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Not Found"}"#))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.fetch_public_key("octo", "missing").await.unwrap_err();

        match err {
            RemoteApiError::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("Not Found"));
            }
            other => panic!("expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fetch_public_key_transport_failure() {
        // Bind then drop a listener so the port refuses connections
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = test_client(&format!("http://{}", addr));
        let err = client.fetch_public_key("octo", "hello").await.unwrap_err();
        assert!(matches!(err, RemoteApiError::Transport(_)));
    }

    #[tokio::test]
    async fn fetch_public_key_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.fetch_public_key("octo", "hello").await.unwrap_err();
        assert!(matches!(err, RemoteApiError::Transport(_)));
    }

    #[tokio::test]
    async fn submit_secret_sends_ciphertext_and_key_id() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/repos/octo/hello/actions/secrets/API_KEY"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(json!({
                "encrypted_value": "c2VhbGVk",
                "key_id": "568250167242549743"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        client
            .submit_secret("octo", "hello", "API_KEY", &sealed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn submit_secret_accepts_no_content() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/repos/octo/hello/actions/secrets/API_KEY"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(client
            .submit_secret("octo", "hello", "API_KEY", &sealed())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn submit_secret_rejects_other_success_codes() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .submit_secret("octo", "hello", "API_KEY", &sealed())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteApiError::Status { status: 200, .. }));
    }

    #[tokio::test]
    async fn submit_secret_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(422).set_body_string(r#"{"message":"Bad request - key_id"}"#),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .submit_secret("octo", "hello", "API_KEY", &sealed())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("key_id"));
    }

    #[tokio::test]
    async fn omits_authorization_without_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Requires authentication"))
            .mount(&server)
            .await;

        let client = SecretStoreClient::new(&StoreConfig {
            base_url: server.uri(),
            ..StoreConfig::default()
        })
        .unwrap();
        let err = client.fetch_public_key("octo", "hello").await.unwrap_err();
        assert!(matches!(err, RemoteApiError::Status { status: 401, .. }));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
    }
}
