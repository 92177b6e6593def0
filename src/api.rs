use crate::{credentials::Credentials, error::ApiError, token::issue_token};
use lambda_http::tracing::{debug, info};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Query parameters or JSON body of a provider call.
pub type Params = Map<String, Value>;

/// Status and raw body bytes of a provider response, handed back uninterpreted.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Decodes the body as JSON, failing on a non-2xx status first.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.ensure_success()?;
        serde_json::from_slice(&self.body).map_err(ApiError::Decode)
    }

    pub fn ensure_success(&self) -> Result<(), ApiError> {
        if self.status.is_success() {
            Ok(())
        } else {
            Err(ApiError::UnexpectedStatus {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            })
        }
    }
}

/// Performs provider calls signed with a fresh short-lived token each.
#[derive(Debug, Clone)]
pub struct SignedApiClient {
    client: Client,
    credentials: Credentials,
}

impl SignedApiClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_client(Client::new(), credentials)
    }

    pub fn with_client(client: Client, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sends `method` to `base_url + path`.
    ///
    /// The URL is a plain concatenation; slashes are not normalized.
    /// Configuration is checked before any network I/O happens.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&Params>,
        body: Option<&Params>,
    ) -> Result<ApiResponse, ApiError> {
        self.credentials.validate_base_url()?;
        let url = format!("{}{}", self.credentials.base_url(), path);
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(ApiError::Serialize)?;

        let token = issue_token(&self.credentials)?;
        debug!("Issued token for {:?} expiring at {}", url, token.claims().exp);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(AUTHORIZATION, format!("Bearer {}", token.as_str()))
            .header(CONTENT_TYPE, "application/json");
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        info!("Calling {} {:?}", method, url);
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        info!("{} {:?} answered with {}", method, url, status);

        Ok(ApiResponse { status, body })
    }

    pub async fn get(&self, path: &str, query: Option<&Params>) -> Result<ApiResponse, ApiError> {
        self.send(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: Option<&Params>) -> Result<ApiResponse, ApiError> {
        self.send(Method::POST, path, None, body).await
    }

    pub async fn patch(&self, path: &str, body: Option<&Params>) -> Result<ApiResponse, ApiError> {
        self.send(Method::PATCH, path, None, body).await
    }

    pub async fn delete(&self, path: &str, body: Option<&Params>) -> Result<ApiResponse, ApiError> {
        self.send(Method::DELETE, path, None, body).await
    }
}

/// Converts a serializable request struct into a JSON object body.
pub(crate) fn to_params<T: Serialize>(value: &T) -> Result<Params, ApiError> {
    match serde_json::to_value(value).map_err(ApiError::Serialize)? {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::Serialize(serde::ser::Error::custom(format!(
            "expected a JSON object, got {}",
            other
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::token::{verify, TOKEN_LIFETIME_SECS};
    use chrono::Utc;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn client_for(base_url: &str) -> SignedApiClient {
        SignedApiClient::new(Credentials::new(
            "key".into(),
            "secret".into(),
            base_url.into(),
        ))
    }

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn bearer_token(header: &str) -> &str {
        header.strip_prefix("Bearer ").expect("bearer header")
    }

    #[tokio::test]
    async fn test_get_sends_signed_request_with_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v2/users/me/meetings")
                    .query_param("page_size", "30")
                    .header("content-type", "application/json")
                    .header_exists("authorization");
                then.status(200).body(r#"{"total_records":0}"#);
            })
            .await;

        let client = client_for(&server.url("/v2/"));
        let query = params(json!({ "page_size": 30 }));
        let response = client
            .get("users/me/meetings", Some(&query))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, br#"{"total_records":0}"#);
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/users/me/meetings")
                    .json_body(json!({ "topic": "Standup", "type": 2 }));
                then.status(201).body(r#"{"id":85746065}"#);
            })
            .await;

        let client = client_for(&server.url("/"));
        let body = params(json!({ "topic": "Standup", "type": 2 }));
        let response = client
            .post("users/me/meetings", Some(&body))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, StatusCode::CREATED);
        let created: Value = response.json().unwrap();
        assert_eq!(created["id"], 85746065);
    }

    #[tokio::test]
    async fn test_patch_and_delete_use_their_verbs() {
        let server = MockServer::start_async().await;
        let patch = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/meetings/42")
                    .json_body(json!({ "topic": "Renamed" }));
                then.status(204);
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/meetings/42");
                then.status(204);
            })
            .await;

        let client = client_for(&server.url("/"));
        let body = params(json!({ "topic": "Renamed" }));
        let patched = client.patch("meetings/42", Some(&body)).await.unwrap();
        let deleted = client.delete("meetings/42", None).await.unwrap();

        patch.assert_async().await;
        delete.assert_async().await;
        assert_eq!(patched.status, StatusCode::NO_CONTENT);
        assert_eq!(deleted.status, StatusCode::NO_CONTENT);
        assert!(deleted.ensure_success().is_ok());
    }

    #[tokio::test]
    async fn test_url_is_plain_concatenation() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v2//users/me");
                then.status(200);
            })
            .await;

        let client = client_for(&server.url("/v2/"));
        client.get("/users/me", None).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_returned_verbatim() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/users/me/meetings");
                then.status(401).body(r#"{"code":124,"message":"Invalid access token."}"#);
            })
            .await;

        let client = client_for(&server.url("/"));
        let response = client.get("users/me/meetings", None).await.unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body, br#"{"code":124,"message":"Invalid access token."}"#);
        assert!(matches!(
            response.json::<Value>(),
            Err(ApiError::UnexpectedStatus { status, .. }) if status == StatusCode::UNAUTHORIZED
        ));
    }

    #[tokio::test]
    async fn test_body_bytes_are_returned_unmodified() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/raw");
                then.status(200)
                    .header("content-type", "text/plain")
                    .body(vec![0xFF, 0xFE, b'a']);
            })
            .await;

        let client = client_for(&server.url("/"));
        let response = client.get("raw", None).await.unwrap();

        assert_eq!(response.body, vec![0xFF, 0xFE, b'a']);
        assert!(matches!(response.json::<Value>(), Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_concurrent_calls_carry_valid_tokens() {
        let server = MockServer::start_async().await;
        let sent_headers = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&sent_headers);
        let mock = server
            .mock_async(move |when, then| {
                when.method(GET).path("/users/me").is_true(move |req| {
                    if let Some(value) = req
                        .headers()
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                    {
                        recorded.lock().unwrap().push(value.to_string());
                    }
                    true
                });
                then.status(200);
            })
            .await;

        let client = client_for(&server.url("/"));
        let before = Utc::now().timestamp();
        let (first, second) = tokio::join!(
            client.get("users/me", None),
            client.get("users/me", None)
        );
        let after = Utc::now().timestamp();
        assert!(first.is_ok());
        assert!(second.is_ok());
        mock.assert_calls_async(2).await;

        let sent_headers = sent_headers.lock().unwrap();
        assert!(sent_headers.len() >= 2, "{:?}", sent_headers);
        for header in sent_headers.iter() {
            let claims = verify(bearer_token(header), "secret").expect("valid token");
            assert_eq!(claims.iss, "key");
            assert!(claims.exp >= before + TOKEN_LIFETIME_SECS, "{:?}", claims);
            assert!(claims.exp <= after + TOKEN_LIFETIME_SECS, "{:?}", claims);
            assert!(claims.exp > after);
        }
    }

    #[tokio::test]
    async fn test_config_errors_happen_before_network() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200);
            })
            .await;

        let misconfigured = [
            Credentials::new("key".into(), "secret".into(), "".into()),
            Credentials::new("".into(), "secret".into(), server.url("/")),
            Credentials::new("key".into(), "".into(), server.url("/")),
        ];
        for credentials in misconfigured {
            let client = SignedApiClient::new(credentials);
            let result = client.get("users/me/meetings", None).await;
            assert!(
                matches!(result, Err(ApiError::Config(ConfigError::Empty(_)))),
                "{:?}",
                result
            );
        }

        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Nothing listens on the discard port locally.
        let client = client_for("http://127.0.0.1:9/");
        let result = client.get("users/me", None).await;
        assert!(matches!(result, Err(ApiError::Transport(_))), "{:?}", result);
    }

    #[test]
    fn test_to_params_rejects_non_objects() {
        assert!(to_params(&json!({ "topic": "Standup" })).is_ok());
        assert!(matches!(to_params(&json!([1, 2])), Err(ApiError::Serialize(_))));
    }
}
