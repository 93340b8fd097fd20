//! Query-bound lists of records.

use crate::error::EntityError;
use crate::pending::Pending;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uni_api::{ApiResult, EntityEndpoint};
use uni_events::{Notification, Notifier, Severity};
use uni_types::FindQuery;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Skip reloads while the query carries no filters.
    pub no_empty_query: bool,
}

/// Result of an [`EntityList::reload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    /// The query is empty and `no_empty_query` is set.
    Skipped,
    /// Data was replaced; carries the total count reported by the back-end.
    Loaded(u64),
    Failed,
    /// The query changed while the request was in flight.
    Discarded,
}

struct ListState<T> {
    query: FindQuery,
    generation: u64,
    data: Vec<T>,
    count: u64,
}

/// The records of one endpoint that match a [`FindQuery`].
///
/// A reload asks for the count first and only fetches records when the
/// count is positive.
pub struct EntityList<T> {
    endpoint: EntityEndpoint,
    notifier: Arc<dyn Notifier>,
    config: ListConfig,
    state: RwLock<ListState<T>>,
    pending: Pending,
}

impl<T> EntityList<T>
where
    T: DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(
        endpoint: EntityEndpoint,
        query: FindQuery,
        notifier: Arc<dyn Notifier>,
        config: ListConfig,
    ) -> Self {
        Self {
            endpoint,
            notifier,
            config,
            state: RwLock::new(ListState {
                query,
                generation: 0,
                data: Vec::new(),
                count: 0,
            }),
            pending: Pending::default(),
        }
    }

    pub async fn reload(&self) -> ListOutcome {
        let (query, generation) = {
            let state = self.state.read().await;
            (state.query.clone(), state.generation)
        };

        if self.config.no_empty_query && !query.has_filters() {
            debug!("Empty query on {}, skipping reload", self.endpoint.path());
            return ListOutcome::Skipped;
        }

        let _pending = self.pending.begin();
        let result = self.fetch(&query).await;

        let mut state = self.state.write().await;
        if state.generation != generation {
            return ListOutcome::Discarded;
        }

        match result {
            Ok((count, data)) => {
                debug!("{} matched {} record(s)", self.endpoint.path(), count);
                state.count = count;
                state.data = data;
                ListOutcome::Loaded(count)
            }
            Err(e) => {
                state.count = 0;
                state.data.clear();
                drop(state);
                warn!("Failed to list {}: {}", self.endpoint.path(), e);
                let detail = EntityError::Api(e).detail();
                self.notifier
                    .notify(Notification::from_detail("error", &detail, Severity::Error));
                ListOutcome::Failed
            }
        }
    }

    async fn fetch(&self, query: &FindQuery) -> ApiResult<(u64, Vec<T>)> {
        let count = self.endpoint.count(query).await?;
        if count == 0 {
            return Ok((0, Vec::new()));
        }
        let data = self.endpoint.find(query).await?;
        Ok((count, data))
    }

    /// Replaces the query and reloads. Responses for the old query are dropped.
    pub async fn set_query(&self, query: FindQuery) -> ListOutcome {
        {
            let mut state = self.state.write().await;
            state.query = query;
            state.generation += 1;
        }
        self.reload().await
    }

    pub async fn query(&self) -> FindQuery {
        self.state.read().await.query.clone()
    }

    pub async fn data(&self) -> Vec<T> {
        self.state.read().await.data.clone()
    }

    pub async fn count(&self) -> u64 {
        self.state.read().await.count
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_active()
    }
}
