//! Remote JSON API client for the Uni back-end.
//!
//! # Components
//!
//! - **RemoteClient**: the async seam every consumer talks to (`get`/`post`
//!   returning JSON or an [`ApiError`] envelope)
//! - **HttpClient**: reqwest implementation with session token handling
//! - **EntityEndpoint**: typed helpers for the CRUD endpoints every entity
//!   module exposes (`/get`, `/update`, `/delete`, `/find`, `/count`, `/create`)
//! - **ProcessTracker**: counts in-flight requests for progress indicators
//! - **RemoteKvStore**: the server-side key/value store
//! - **background_tasks**: lists long-running jobs on the server

mod client;
mod endpoint;
mod http;
mod kvstore;
mod process;
mod tasks;

pub use client::{decode, ApiResult, RemoteClient};
pub use endpoint::EntityEndpoint;
pub use http::{ApiConfig, HttpClient, AUTH_ENDPOINT, SELF_ENDPOINT, TOKEN_HEADER, TOKEN_STORAGE_KEY};
pub use kvstore::{RemoteKvStore, KV_DELETE_ENDPOINT, KV_GET_ENDPOINT, KV_SET_ENDPOINT};
pub use process::{ProcessGuard, ProcessId, ProcessTracker};
pub use tasks::{background_tasks, BACKGROUND_TASKS_ENDPOINT};
pub use uni_types::ApiError;
