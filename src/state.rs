// src/state.rs
use crate::config::ClientConfig;
use crate::services::api_client::ApiClient;
use crate::services::avatar_cache::AvatarCache;
use crate::services::connection::WsConnector;
use crate::services::notice_board::NoticeBoard;
use crate::views::gallery::Gallery;
use crate::views::upload::UploadForm;

/// Collaborators shared by every view.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub connector: WsConnector,
    pub notices: NoticeBoard,
    pub avatars: AvatarCache,
}

impl AppState {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            api: ApiClient::new(&config),
            connector: WsConnector::new(&config),
            notices: NoticeBoard::new(config.notice_ttl),
            avatars: AvatarCache::new(),
            config,
        }
    }

    pub fn upload_form(&self) -> UploadForm {
        UploadForm::new(self.notices.clone())
    }

    pub fn gallery(&self) -> Gallery {
        Gallery::new(self.avatars.clone(), self.notices.clone(), self.config.clone())
    }
}
