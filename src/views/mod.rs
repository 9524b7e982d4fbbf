// src/views/mod.rs
pub mod gallery;
pub mod upload;

use tracing::{debug, info};

use crate::services::session_manager::ChatSession;
use crate::state::AppState;
use gallery::Selection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Manage,
    Chat,
}

/// Top-level page: toggles between avatar management and chat.
///
/// Owns the only chat session. Entering chat again replaces it; leaving chat
/// tears it down.
#[derive(Debug)]
pub struct Shell {
    view: View,
    selection: Selection,
    chat: Option<ChatSession>,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    pub fn new() -> Self {
        Self { view: View::Manage, selection: Selection::default(), chat: None }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn can_chat(&self) -> bool {
        self.selection.get().is_some()
    }

    pub fn show_manage(&mut self) {
        if let Some(mut chat) = self.chat.take() {
            chat.teardown();
        }
        if self.view != View::Manage {
            debug!("view -> manage");
        }
        self.view = View::Manage;
    }

    /// Switch to chat with the selected avatar, mounting a fresh, unmounted
    /// [`ChatSession`]. Returns `None` when nothing is selected.
    pub fn enter_chat(&mut self, state: &AppState) -> Option<&mut ChatSession> {
        let avatar_id = self.selection.get()?.to_string();
        if let Some(mut previous) = self.chat.take() {
            previous.teardown();
        }

        info!(%avatar_id, "view -> chat");
        self.view = View::Chat;
        let chat = ChatSession::new(
            avatar_id,
            state.notices.clone(),
            state.config.processing_timeout,
        );
        Some(self.chat.insert(chat))
    }

    pub fn chat(&self) -> Option<&ChatSession> {
        self.chat.as_ref()
    }

    pub fn chat_mut(&mut self) -> Option<&mut ChatSession> {
        self.chat.as_mut()
    }
}
