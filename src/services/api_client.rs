// src/services/api_client.rs
use reqwest::{Client, Response, multipart};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::message::{
    Avatar, CreateSessionRequest, ErrorBody, MessageRecord, SendMessageRequest, SessionInfo,
};

/// Thin wrapper over the backend's REST surface.
///
/// Every method issues exactly one request and hands back the parsed body, or
/// the error for the caller to turn into a notice. No retries, no timeouts.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_base_url(config.api_url.as_str())
    }

    pub fn with_base_url(base: impl AsRef<str>) -> Self {
        Self {
            http: Client::new(),
            base: base.as_ref().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn upload_avatar(
        &self,
        name: &str,
        bytes: Vec<u8>,
        file_name: &str,
        mime: &str,
    ) -> Result<Avatar, ClientError> {
        debug!(name, file_name, mime, size = bytes.len(), "uploading avatar");
        let file = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = multipart::Form::new()
            .part("file", file)
            .text("name", name.to_string());

        let resp = self
            .http
            .post(self.url("/api/v1/avatars/upload"))
            .multipart(form)
            .send()
            .await?;
        read_json(resp).await
    }

    pub async fn list_avatars(&self) -> Result<Vec<Avatar>, ClientError> {
        let resp = self.http.get(self.url("/api/v1/avatars/")).send().await?;
        read_json(resp).await
    }

    pub async fn get_avatar(&self, avatar_id: &str) -> Result<Avatar, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/v1/avatars/{avatar_id}")))
            .send()
            .await?;
        read_json(resp).await
    }

    /// The backend answers 204 with no body; anything 2xx counts as done.
    pub async fn delete_avatar(&self, avatar_id: &str) -> Result<(), ClientError> {
        debug!(avatar_id, "deleting avatar");
        let resp = self
            .http
            .delete(self.url(&format!("/api/v1/avatars/{avatar_id}")))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    pub async fn create_session(&self, avatar_id: &str) -> Result<SessionInfo, ClientError> {
        debug!(avatar_id, "creating session");
        let resp = self
            .http
            .post(self.url("/api/v1/sessions/create"))
            .json(&CreateSessionRequest { avatar_id })
            .send()
            .await?;
        read_json(resp).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionInfo, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/v1/sessions/{session_id}")))
            .send()
            .await?;
        read_json(resp).await
    }

    pub async fn send_message(
        &self,
        session_id: &str,
        content: &str,
    ) -> Result<MessageRecord, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/v1/messages/send"))
            .json(&SendMessageRequest { session_id, content })
            .send()
            .await?;
        read_json(resp).await
    }

    pub async fn get_messages(&self, session_id: &str) -> Result<Vec<MessageRecord>, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/v1/messages/session/{session_id}")))
            .send()
            .await?;
        read_json(resp).await
    }
}

/// `{ws_base}/ws/session/{session_id}`
pub fn session_socket_url(ws_base: &Url, session_id: &str) -> String {
    format!(
        "{}/ws/session/{}",
        ws_base.as_str().trim_end_matches('/'),
        session_id
    )
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let resp = check_status(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn check_status(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody { detail: Value::String(s) }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body,
    };

    Err(ClientError::Http { status: status.as_u16(), detail })
}
