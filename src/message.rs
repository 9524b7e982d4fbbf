// src/message.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Avatar {
    pub id: String,
    pub name: String,
    pub image_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub status: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionInfo {
    pub id: String,
    #[serde(default)]
    pub avatar_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
}

/// A message as stored by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MessageRecord {
    pub id: String,
    pub session_id: String,
    pub role: String,
    pub content: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_content_type() -> String {
    "text".to_string()
}

#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub avatar_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub session_id: &'a str,
    pub content: &'a str,
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: Value,
}

/// Frames the client writes to the session socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Text { text: String },
    Audio { audio: String },
    Ping,
}

impl ClientFrame {
    pub fn to_json(&self) -> Result<String, ClientError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Frames the backend pushes over the session socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Transcription {
        text: String,
    },
    Message {
        content: String,
        #[serde(default)]
        role: Option<String>,
    },
    Video {
        video_url: String,
        #[serde(default)]
        text: Option<String>,
    },
    Status {
        message: String,
        #[serde(default)]
        stage: Option<String>,
    },
    Error {
        message: String,
    },
    Pong,
    /// Any tag this client does not know. Never produced by serde directly.
    #[serde(skip)]
    Unknown { kind: String },
}

const KNOWN_TAGS: [&str; 6] = ["transcription", "message", "video", "status", "error", "pong"];

impl ServerFrame {
    /// Decode one inbound text frame.
    ///
    /// Unrecognised `type` values decode to [`ServerFrame::Unknown`]; a frame
    /// that is not a JSON object with a string `type` is an error.
    pub fn decode(text: &str) -> Result<Self, ClientError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = match value.get("type").and_then(Value::as_str) {
            Some(kind) => kind.to_string(),
            None => {
                return Err(ClientError::Decode(serde::de::Error::custom(
                    "frame has no string `type` tag",
                )));
            }
        };

        if KNOWN_TAGS.contains(&kind.as_str()) {
            Ok(serde_json::from_value(value)?)
        } else {
            Ok(ServerFrame::Unknown { kind })
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            ServerFrame::Transcription { .. } => "transcription",
            ServerFrame::Message { .. } => "message",
            ServerFrame::Video { .. } => "video",
            ServerFrame::Status { .. } => "status",
            ServerFrame::Error { .. } => "error",
            ServerFrame::Pong => "pong",
            ServerFrame::Unknown { kind } => kind,
        }
    }
}
