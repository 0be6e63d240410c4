use axum::http::HeaderMap;
use sea_orm::DatabaseConnection;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::controllers::AppState;
use crate::models::user;
use crate::workflow::{Policy, Role};

/// Full application on an ephemeral port, backed by in-memory SQLite.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_author_submission_is_queued() {
///     let app = TestApp::new().await;
///     let (token, _) = app.create_user("Ana", "ana@example.com", &[Role::Author]).await;
///     let res = app.client.post_with_auth(&app.url("/api/content/article"), &token, r#"{"title":"Hi"}"#).await;
///     assert_eq!(res.status, 202);
/// }
/// ```
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: TestClient,
    pub db: DatabaseConnection,
    pub config: Config,
    pub state: AppState,
}

/// Configuration used by [`TestApp`].
pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret-key-for-testing".to_string(),
        server_port: 0, // OS assigns a random port
        environment: "test".to_string(),
        ..Config::default()
    }
}

impl TestApp {
    /// Test app with the built-in policy.
    pub async fn new() -> Self {
        Self::with_policy(Policy::default()).await
    }

    /// Test app with a custom policy.
    pub async fn with_policy(policy: Policy) -> Self {
        let app = crate::App::with_config(test_config())
            .await
            .expect("Failed to create test app")
            .with_policy(policy);

        let state = app.state();
        let router = app.router_with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestApp {
            addr,
            client: TestClient::new(addr),
            db: app.db,
            config: app.config,
            state,
        }
    }

    /// Get the URL for a path on the test server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Seed a user and return `(token, user_id)`.
    pub async fn create_user(&self, name: &str, email: &str, roles: &[Role]) -> (String, String) {
        let user = user::create(&self.db, name, email, roles)
            .await
            .expect("Failed to create user");
        (self.token_for(&user.id), user.id)
    }

    /// Issue a bearer token for any user id.
    pub fn token_for(&self, user_id: &str) -> String {
        crate::auth::create_token(user_id, &self.config.jwt_secret, 1)
            .expect("Failed to create token")
    }
}

/// A simple HTTP test client with helper methods.
#[derive(Clone)]
pub struct TestClient {
    inner: reqwest::Client,
    base_addr: SocketAddr,
}

impl TestClient {
    /// Create a new test client pointing at the given address.
    pub fn new(addr: SocketAddr) -> Self {
        TestClient {
            inner: reqwest::Client::new(),
            base_addr: addr,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, token: Option<&str>) -> TestResponse {
        let request = match token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        };
        let res = request.send().await.expect("request failed");
        TestResponse::from_response(res).await
    }

    fn json_body(request: reqwest::RequestBuilder, body: &str) -> reqwest::RequestBuilder {
        request
            .header("Content-Type", "application/json")
            .body(body.to_string())
    }

    /// Send a GET request.
    pub async fn get(&self, url: &str) -> TestResponse {
        self.send(self.inner.get(url), None).await
    }

    /// Send a GET request with an auth token.
    pub async fn get_with_auth(&self, url: &str, token: &str) -> TestResponse {
        self.send(self.inner.get(url), Some(token)).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&self, url: &str, body: &str) -> TestResponse {
        self.send(Self::json_body(self.inner.post(url), body), None)
            .await
    }

    /// Send a POST request with auth token and JSON body.
    pub async fn post_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        self.send(Self::json_body(self.inner.post(url), body), Some(token))
            .await
    }

    /// Send a PUT request with auth token and JSON body.
    pub async fn put_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        self.send(Self::json_body(self.inner.put(url), body), Some(token))
            .await
    }

    /// Send a PATCH request with auth token and JSON body.
    pub async fn patch_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        self.send(Self::json_body(self.inner.patch(url), body), Some(token))
            .await
    }

    /// Send a PATCH request with auth token and no body.
    pub async fn patch_empty_with_auth(&self, url: &str, token: &str) -> TestResponse {
        self.send(self.inner.patch(url), Some(token)).await
    }

    /// Send a DELETE request with auth token.
    pub async fn delete_with_auth(&self, url: &str, token: &str) -> TestResponse {
        self.send(self.inner.delete(url), Some(token)).await
    }

    /// Get the base URL.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.base_addr)
    }
}

/// A simplified HTTP response for test assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let mut headers = HeaderMap::new();
        for (name, value) in res.headers() {
            if let (Ok(name), Ok(value)) = (
                axum::http::HeaderName::from_bytes(name.as_str().as_bytes()),
                axum::http::HeaderValue::from_bytes(value.as_bytes()),
            ) {
                headers.append(name, value);
            }
        }
        let body = res.text().await.unwrap_or_default();
        TestResponse {
            status,
            body,
            headers,
        }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Failed to parse response as JSON")
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.json()["success"].as_bool().unwrap_or(false)
    }

    /// Get the data field from the response.
    pub fn data(&self) -> serde_json::Value {
        self.json()["data"].clone()
    }

    /// Get the error code from the response, if any.
    pub fn error_code(&self) -> Option<String> {
        self.json()["error"]["code"].as_str().map(str::to_string)
    }
}
