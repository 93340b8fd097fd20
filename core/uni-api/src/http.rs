//! reqwest-backed [`RemoteClient`].
//!
//! The session token lives in the key/value store rather than in the client,
//! so every component following the token key (login screens, the user
//! menu) sees logins and logouts as storage events.

use crate::client::{decode, ApiResult, RemoteClient};
use crate::process::ProcessTracker;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uni_events::KvStore;
use uni_types::{ApiError, Token, User};

/// Store key holding the session token.
pub const TOKEN_STORAGE_KEY: &str = "uni.token";
/// Header carrying the session token on every request.
pub const TOKEN_HEADER: &str = "token";
/// Login endpoint (HTTP Basic credentials in, [`Token`] out).
pub const AUTH_ENDPOINT: &str = "/auth";
/// Endpoint returning the logged-in [`User`].
pub const SELF_ENDPOINT: &str = "/user/get_self";

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the back-end (e.g. `https://admin.example.com/api`).
    pub server_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Store key the session token is kept under.
    pub token_storage_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            token_storage_key: TOKEN_STORAGE_KEY.to_string(),
        }
    }
}

/// HTTP client for the Uni back-end.
pub struct HttpClient {
    config: ApiConfig,
    client: Client,
    store: Arc<KvStore>,
    processes: ProcessTracker,
}

impl HttpClient {
    /// Creates a client reading its session token from `store`.
    pub fn new(config: ApiConfig, store: Arc<KvStore>) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::new(500, "error", format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            store,
            processes: ProcessTracker::new(),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Tracker of requests issued through this client.
    pub fn processes(&self) -> &ProcessTracker {
        &self.processes
    }

    /// The current session token, if logged in.
    pub fn token(&self) -> Option<Token> {
        self.store
            .get_as(&self.config.token_storage_key)
            .ok()
            .flatten()
    }

    /// Replaces (or with `None`, removes) the session token.
    pub fn set_token(&self, token: Option<&Token>) {
        let key = &self.config.token_storage_key;
        let result = match token {
            Some(token) => self.store.set(key, token),
            None => self.store.delete(key).map(|_| ()),
        };
        if let Err(e) = result {
            warn!("Failed to update session token: {}", e);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Exchanges credentials for a session token and stores it.
    /// A failed login clears any previous token.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Token> {
        let request = self
            .client
            .get(self.url(AUTH_ENDPOINT))
            .basic_auth(username, Some(password));

        let result = {
            let _process = self.processes.start();
            match request.send().await {
                Ok(response) => read_response(response).await,
                Err(e) => Err(transport_error(e)),
            }
        }
        .and_then(decode::<Token>);

        match result {
            Ok(token) => {
                self.set_token(Some(&token));
                info!("Logged in as {}", username);
                Ok(token)
            }
            Err(e) => {
                self.set_token(None);
                warn!("Login failed for {}: {}", username, e);
                Err(e)
            }
        }
    }

    /// Drops the session token.
    pub fn logout(&self) {
        debug!("Logging out");
        self.set_token(None);
    }

    /// Fetches the logged-in user.
    pub async fn current_user(&self) -> ApiResult<User> {
        let value = self.get(SELF_ENDPOINT, &[]).await?;
        decode(value)
    }

    fn url(&self, endpoint: &str) -> String {
        let base = self.config.server_url.trim_end_matches('/');
        if endpoint.starts_with('/') {
            format!("{base}{endpoint}")
        } else {
            format!("{base}/{endpoint}")
        }
    }

    async fn execute(&self, request: RequestBuilder) -> ApiResult<Value> {
        let request = match self.token() {
            Some(token) => request.header(TOKEN_HEADER, token.token),
            None => request,
        };

        let result = {
            let _process = self.processes.start();
            match request.send().await {
                Ok(response) => read_response(response).await,
                Err(e) => Err(transport_error(e)),
            }
        };

        if let Err(e) = &result {
            if e.is_unauthorized() {
                info!("Session rejected by server, logging out");
                self.logout();
            }
        }
        result
    }
}

#[async_trait]
impl RemoteClient for HttpClient {
    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> ApiResult<Value> {
        let url = self.url(endpoint);
        debug!("GET {}", url);
        self.execute(self.client.get(url).query(params)).await
    }

    async fn post(&self, endpoint: &str, body: Value) -> ApiResult<Value> {
        let url = self.url(endpoint);
        debug!("POST {}", url);
        self.execute(self.client.post(url).json(&body)).await
    }
}

async fn read_response(response: Response) -> ApiResult<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_envelope(response).await);
    }

    let body = response.bytes().await.map_err(transport_error)?;
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&body).map_err(ApiError::decode)
}

/// Builds the envelope for a non-2xx response. The back-end puts the
/// human-readable cause under `detail`.
async fn error_envelope(response: Response) -> ApiError {
    let status = response.status();
    let text = status.canonical_reason().unwrap_or("error").to_string();

    match response.json::<Value>().await {
        Ok(body) => {
            let detail = body.get("detail").cloned().unwrap_or(Value::Null);
            ApiError::new(status.as_u16(), text, detail)
        }
        Err(_) => ApiError::new(status.as_u16(), text, "unknown server error"),
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    warn!("Request failed: {}", e);
    ApiError::unknown()
}
