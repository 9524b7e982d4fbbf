// src/views/gallery.rs
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::message::Avatar;
use crate::services::{api_client::ApiClient, avatar_cache::AvatarCache, notice_board::NoticeBoard};

/// The avatar picked for chat. Purely client-side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection(Option<String>);

impl Selection {
    pub fn get(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn set(&mut self, avatar_id: impl Into<String>) {
        self.0 = Some(avatar_id.into());
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn is(&self, avatar_id: &str) -> bool {
        self.0.as_deref() == Some(avatar_id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GalleryItem {
    pub avatar: Avatar,
    pub selected: bool,
    /// Thumbnail (or full image) URL, when its host is allowed.
    pub display_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GalleryView {
    Empty,
    Items(Vec<GalleryItem>),
}

/// "Your Avatars" card.
#[derive(Debug, Clone)]
pub struct Gallery {
    avatars: AvatarCache,
    notices: NoticeBoard,
    config: ClientConfig,
    pending_delete: Option<String>,
}

impl Gallery {
    pub fn new(avatars: AvatarCache, notices: NoticeBoard, config: ClientConfig) -> Self {
        Self { avatars, notices, config, pending_delete: None }
    }

    /// Fetch (or reuse) the avatar list and lay it out.
    ///
    /// A failed fetch posts an error notice and falls back to whatever was
    /// cached, or to the empty state when nothing was.
    pub async fn load(&self, api: &ApiClient, selection: &Selection) -> GalleryView {
        let avatars = match self.avatars.fetch(api).await {
            Ok(avatars) => avatars,
            Err(_) => {
                self.notices.error("Failed to load avatars").await;
                self.avatars.peek().await.unwrap_or_default()
            }
        };

        if avatars.is_empty() {
            return GalleryView::Empty;
        }

        let items = avatars
            .into_iter()
            .map(|avatar| {
                let display_url = avatar
                    .thumbnail_url
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .unwrap_or(avatar.image_url.as_str());
                let display_url = self
                    .config
                    .allows_image(display_url)
                    .then(|| display_url.to_string());
                GalleryItem { selected: selection.is(&avatar.id), display_url, avatar }
            })
            .collect();
        GalleryView::Items(items)
    }

    /// Selecting never touches the network.
    pub fn select(&self, selection: &mut Selection, avatar_id: impl Into<String>) {
        selection.set(avatar_id);
    }

    /// Ask for confirmation before deleting `avatar_id`.
    pub fn request_delete(&mut self, avatar_id: impl Into<String>) {
        self.pending_delete = Some(avatar_id.into());
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// Resolve the pending confirmation. Returns whether an avatar was deleted.
    pub async fn confirm_delete(
        &mut self,
        confirmed: bool,
        api: &ApiClient,
        selection: &mut Selection,
    ) -> bool {
        let Some(avatar_id) = self.pending_delete.take() else {
            return false;
        };
        if !confirmed {
            return false;
        }

        match api.delete_avatar(&avatar_id).await {
            Ok(()) => {
                info!(%avatar_id, "avatar deleted");
                self.notices.success("Avatar deleted successfully").await;
                self.avatars.invalidate().await;
                if selection.is(&avatar_id) {
                    selection.clear();
                }
                true
            }
            Err(e) => {
                warn!(%avatar_id, error = %e, "avatar delete failed");
                self.notices.error("Failed to delete avatar").await;
                false
            }
        }
    }
}
