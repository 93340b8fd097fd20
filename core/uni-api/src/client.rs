//! Remote client abstraction.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uni_types::ApiError;

/// Result type for remote calls. Failures always carry the error envelope.
pub type ApiResult<T> = Result<T, ApiError>;

/// Abstract JSON-over-HTTP client.
///
/// `endpoint` is a path relative to the server root, including any query
/// string (e.g. `/user/get?entity_id=42`).
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Issues a GET request with the given query parameters.
    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> ApiResult<Value>;

    /// Issues a POST request with a JSON body.
    async fn post(&self, endpoint: &str, body: Value) -> ApiResult<Value>;
}

/// Decodes a JSON response into `T`, mapping failures into the envelope.
pub fn decode<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(ApiError::decode)
}
