// src/services/avatar_cache.rs
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::message::Avatar;
use crate::services::api_client::ApiClient;

/// The one query key the avatar list is cached under.
pub const AVATARS_QUERY_KEY: &str = "avatars";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    Loading,
    Empty,
    Ready,
    Failed(String),
}

#[derive(Debug, Default)]
struct Entry {
    data: Option<Vec<Avatar>>,
    stale: bool,
    last_error: Option<String>,
}

/// Shared cache of the avatar list. Mutations elsewhere call
/// [`AvatarCache::invalidate`] and the next read refetches.
#[derive(Clone, Debug, Default)]
pub struct AvatarCache {
    inner: Arc<RwLock<Entry>>,
}

impl AvatarCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> &'static str {
        AVATARS_QUERY_KEY
    }

    /// Cached list if fresh, otherwise fetch and store it.
    ///
    /// On failure the previous data is kept and the error is returned.
    pub async fn fetch(&self, api: &ApiClient) -> Result<Vec<Avatar>, ClientError> {
        {
            let guard = self.inner.read().await;
            if let Some(data) = guard.data.as_ref().filter(|_| !guard.stale) {
                return Ok(data.clone());
            }
        }

        debug!(key = AVATARS_QUERY_KEY, "fetching");
        match api.list_avatars().await {
            Ok(avatars) => {
                let mut guard = self.inner.write().await;
                guard.data = Some(avatars.clone());
                guard.stale = false;
                guard.last_error = None;
                Ok(avatars)
            }
            Err(e) => {
                warn!(key = AVATARS_QUERY_KEY, error = %e, "fetch failed");
                self.inner.write().await.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn invalidate(&self) {
        debug!(key = AVATARS_QUERY_KEY, "invalidated");
        self.inner.write().await.stale = true;
    }

    pub async fn is_stale(&self) -> bool {
        let guard = self.inner.read().await;
        guard.data.is_none() || guard.stale
    }

    /// Cached data without fetching, stale or not.
    pub async fn peek(&self) -> Option<Vec<Avatar>> {
        self.inner.read().await.data.clone()
    }

    pub async fn status(&self) -> QueryStatus {
        let guard = self.inner.read().await;
        match (&guard.data, &guard.last_error) {
            (None, Some(err)) => QueryStatus::Failed(err.clone()),
            (None, None) => QueryStatus::Loading,
            (Some(list), _) if list.is_empty() => QueryStatus::Empty,
            (Some(_), _) => QueryStatus::Ready,
        }
    }
}
