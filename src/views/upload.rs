// src/views/upload.rs
use std::fmt;
use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{info, warn};

use crate::error::ClientError;
use crate::message::Avatar;
use crate::services::{api_client::ApiClient, avatar_cache::AvatarCache, notice_board::NoticeBoard};

/// A picked or dropped file, before validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInput {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), mime: mime.into(), bytes }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_guess::from_path(path).first_or_octet_stream().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, mime, bytes })
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// `data:<mime>;base64,<payload>`
#[derive(Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime: String,
    data: Vec<u8>,
}

impl DataUrl {
    pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self { mime: mime.into(), data }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let mime = meta.strip_suffix(";base64")?;
        let data = STANDARD.decode(payload).ok()?;
        Some(Self::new(mime, data))
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }
}

impl fmt::Debug for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUrl")
            .field("mime", &self.mime)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Local state of the "Upload Avatar" card.
#[derive(Clone, Debug)]
pub struct UploadForm {
    name: String,
    preview: Option<String>,
    drag_active: bool,
    notices: NoticeBoard,
}

impl UploadForm {
    pub fn new(notices: NoticeBoard) -> Self {
        Self { name: String::new(), preview: None, drag_active: false, notices }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The preview as a data URL, if an image has been chosen.
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn drag_enter(&mut self) {
        self.drag_active = true;
    }

    pub fn drag_over(&mut self) {
        self.drag_active = true;
    }

    pub fn drag_leave(&mut self) {
        self.drag_active = false;
    }

    pub async fn drop_file(&mut self, file: FileInput) -> bool {
        self.drag_active = false;
        self.choose_file(file).await
    }

    /// Validate the file and turn it into the preview. Returns whether the
    /// file was accepted.
    pub async fn choose_file(&mut self, file: FileInput) -> bool {
        if !file.is_image() {
            warn!(file = %file.file_name, mime = %file.mime, "rejected non-image file");
            self.notices.error("Please upload an image file").await;
            return false;
        }
        self.preview = Some(DataUrl::new(file.mime, file.bytes).to_string());
        true
    }

    /// "Change Image"
    pub fn clear_preview(&mut self) {
        self.preview = None;
    }

    /// Upload the chosen image under the entered name.
    ///
    /// Nothing is sent unless both are present. On success the form is
    /// cleared and the avatar list invalidated; on failure the form keeps
    /// what the user entered.
    pub async fn submit(&mut self, api: &ApiClient, avatars: &AvatarCache) -> Option<Avatar> {
        let preview = match self.preview.as_deref() {
            Some(preview) if !self.name.is_empty() => preview,
            _ => {
                self.notices.error("Please provide a name and select an image").await;
                return None;
            }
        };

        let Some(image) = DataUrl::parse(preview) else {
            warn!("preview is not a base64 data url");
            self.notices.error("Failed to upload avatar").await;
            return None;
        };
        let file_name = format!("avatar.{}", extension_for(image.mime()));
        let mime = image.mime().to_string();

        match api.upload_avatar(&self.name, image.into_bytes(), &file_name, &mime).await {
            Ok(avatar) => {
                info!(avatar_id = %avatar.id, name = %avatar.name, "avatar uploaded");
                self.notices.success("Avatar uploaded successfully!").await;
                self.preview = None;
                self.name.clear();
                avatars.invalidate().await;
                Some(avatar)
            }
            Err(e) => {
                warn!(error = %e, "avatar upload failed");
                self.notices.error("Failed to upload avatar").await;
                None
            }
        }
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        _ => mime_guess::get_mime_extensions_str(mime)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("jpg"),
    }
}
