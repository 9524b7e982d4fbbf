// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("backend returned {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("websocket: {0}")]
    WebSocket(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("configuration: {0}")]
    Config(String),
}

/// Failures of the audio capture device.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone unavailable: {0}")]
    PermissionDenied(String),

    #[error("no recording in progress")]
    NotRecording,

    #[error("already recording")]
    AlreadyRecording,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why an outbound chat frame was not sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendRejected {
    #[error("nothing to send")]
    EmptyInput,

    #[error("no session yet")]
    NoSession,

    #[error("socket is not open")]
    NotConnected,

    #[error("avatar is still processing")]
    Busy,

    #[error("not recording")]
    NotRecording,

    #[error("send failed: {0}")]
    Transport(String),
}
