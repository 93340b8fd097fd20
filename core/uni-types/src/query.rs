//! Find queries for list endpoints (`/find`, `/count`).
//!
//! Filters are passed through to the back-end untouched. A single clause is
//! a `[field, op, value]` triple; clauses combine under `{"OR": [...]}` or
//! `{"AND": [...]}` objects.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Sort direction. Encoded as `0` (ascending) / `1` (descending) on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl From<SortOrder> for u8 {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Ascending => 0,
            SortOrder::Descending => 1,
        }
    }
}

impl TryFrom<u8> for SortOrder {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SortOrder::Ascending),
            1 => Ok(SortOrder::Descending),
            other => Err(format!("invalid sort order: {other}")),
        }
    }
}

/// Query body for `/find` and `/count`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_to: Option<u64>,
    #[serde(default)]
    pub filters: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_dict: Option<bool>,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filters(mut self, filters: Vec<Value>) -> Self {
        self.filters = filters;
        self
    }

    pub fn sorted_by(mut self, key: impl Into<String>, order: SortOrder) -> Self {
        self.sort_key = Some(key.into());
        self.sort_order = Some(order);
        self
    }

    /// Restricts the result window to `[from, to)`.
    pub fn page(mut self, from: u64, to: u64) -> Self {
        self.limit_from = Some(from);
        self.limit_to = Some(to);
        self
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }
}

/// Filters matching records whose `field` equals any of `values`.
pub fn find_by_values(field: &str, values: &[Value]) -> Vec<Value> {
    combine("OR", values.iter().map(|v| json!([field, "==", v])).collect())
}

/// Filters matching records whose `field` equals none of `values`.
pub fn find_not_in(field: &str, values: &[Value]) -> Vec<Value> {
    combine("AND", values.iter().map(|v| json!([field, "!=", v])).collect())
}

fn combine(op: &str, mut clauses: Vec<Value>) -> Vec<Value> {
    match clauses.len() {
        0 => Vec::new(),
        1 => vec![clauses.remove(0)],
        _ => {
            let mut group = Map::new();
            group.insert(op.to_string(), Value::Array(clauses));
            vec![Value::Object(group)]
        }
    }
}
