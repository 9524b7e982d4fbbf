// src/services/notice_board.rs
use std::{
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Loading,
    Error,
}

/// A transient, user-facing message.
#[derive(Clone, Debug)]
pub struct Notice {
    pub id: Uuid,
    /// Keyed notices replace each other instead of stacking.
    pub key: Option<String>,
    pub level: NoticeLevel,
    pub text: String,
    pub posted_at: Instant,
}

#[derive(Clone)]
pub struct NoticeBoard {
    inner: Arc<RwLock<Vec<Notice>>>,
    ttl: Duration,
}

impl Debug for NoticeBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeBoard").field("ttl", &self.ttl).finish()
    }
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Vec::new())),
            ttl,
        }
    }

    pub async fn success(&self, text: impl Into<String>) {
        self.post(None, NoticeLevel::Success, text.into()).await;
    }

    pub async fn info(&self, text: impl Into<String>) {
        self.post(None, NoticeLevel::Info, text.into()).await;
    }

    pub async fn error(&self, text: impl Into<String>) {
        self.post(None, NoticeLevel::Error, text.into()).await;
    }

    /// Show a progress notice under `key`, replacing any live one with the same key.
    pub async fn loading(&self, key: &str, text: impl Into<String>) {
        self.post(Some(key.to_string()), NoticeLevel::Loading, text.into()).await;
    }

    async fn post(&self, key: Option<String>, level: NoticeLevel, text: String) {
        match level {
            NoticeLevel::Error => warn!(notice = %text, "error notice"),
            _ => info!(notice = %text, ?level, "notice"),
        }

        let notice = Notice { id: Uuid::new_v4(), key, level, text, posted_at: Instant::now() };
        let mut guard = self.inner.write().await;
        if let Some(key) = notice.key.as_deref() {
            guard.retain(|n| n.key.as_deref() != Some(key));
        }
        guard.push(notice);
    }

    /// Remove the keyed notice, if any. Returns whether one was removed.
    pub async fn dismiss(&self, key: &str) -> bool {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|n| n.key.as_deref() != Some(key));
        before != guard.len()
    }

    /// Copy of the live notices, oldest first.
    pub async fn snapshot(&self) -> Vec<Notice> {
        self.inner.read().await.clone()
    }

    /// Take every live notice for rendering.
    pub async fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.inner.write().await)
    }

    /// Remove notices older than ttl. Returns number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut guard = self.inner.write().await;
        let now = Instant::now();
        let before = guard.len();
        guard.retain(|n| now.duration_since(n.posted_at) < self.ttl);
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Texts of the live notices at `level`, oldest first.
    pub async fn texts(&self, level: NoticeLevel) -> Vec<String> {
        let guard = self.inner.read().await;
        guard.iter().filter(|n| n.level == level).map(|n| n.text.clone()).collect()
    }
}
