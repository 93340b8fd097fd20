//! Shared type definitions for the Uni client.
//!
//! This crate defines the wire-level shapes exchanged with the Uni back-end:
//! - Record metadata (`created` / `updated` / `accessed` stamps)
//! - The base database model and the user record built on it
//! - Authentication tokens
//! - Key/value entries and background task state
//! - The error envelope returned by every endpoint
//! - Find queries and filter builders for list endpoints
//!
//! Application records are defined by their consumers; anything that
//! serializes to a JSON object can be bound by `uni-entity`.

mod error;
mod meta;
mod model;
mod query;

pub use error::ApiError;
pub use meta::ModelMeta;
pub use model::{BackgroundTaskInfo, DatabaseModel, KvEntry, Token, User};
pub use query::{find_by_values, find_not_in, FindQuery, SortOrder};
