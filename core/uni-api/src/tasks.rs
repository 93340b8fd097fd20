//! Background task listing.

use crate::client::{decode, ApiResult, RemoteClient};
use serde_json::json;
use tracing::debug;
use uni_types::BackgroundTaskInfo;

pub const BACKGROUND_TASKS_ENDPOINT: &str = "/background_tasks/get_all";

/// Lists every background task the server knows about. Root users only.
pub async fn background_tasks(client: &dyn RemoteClient) -> ApiResult<Vec<BackgroundTaskInfo>> {
    let tasks: Vec<BackgroundTaskInfo> =
        decode(client.post(BACKGROUND_TASKS_ENDPOINT, json!({})).await?)?;
    debug!("{} background task(s)", tasks.len());
    Ok(tasks)
}
