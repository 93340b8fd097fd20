use crate::ModelMeta;
use serde::{Deserialize, Serialize};

/// Base shape shared by every record the back-end stores.
///
/// Optional fields are omitted from the serialized form when absent so that
/// a record round-trips to the same JSON object it was read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseModel {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<ModelMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<ModelMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessed: Option<ModelMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_collections: Option<serde_json::Value>,
}

impl DatabaseModel {
    /// Creates an empty record with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// A user account as returned by `/user/get` and `/user/get_self`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub base: DatabaseModel,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub user_permissions: Vec<String>,
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub last_login: i64,
}

impl User {
    /// Full display name, skipping empty parts.
    pub fn display_name(&self) -> String {
        [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the user holds a permission. Root users hold all of them.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.root || self.user_permissions.iter().any(|p| p == permission)
    }
}

/// Session token issued by `/auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
}

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires: None,
            valid: None,
        }
    }

    /// Whether the token has expired at `now_ms`. Tokens without an expiry never do.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires.is_some_and(|exp| exp < now_ms)
    }
}

/// One entry of the back-end's key/value store. `value` is null for a key
/// that was never set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvEntry {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// State of a long-running job on the back-end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundTaskInfo {
    pub id: String,
    pub custom_id: String,
    pub finished: bool,
    pub exception_type: String,
    pub exception_detail: String,
    /// Percent complete, 0 to 100.
    pub progress: u32,
}

impl BackgroundTaskInfo {
    pub fn failed(&self) -> bool {
        !self.exception_type.is_empty()
    }
}
