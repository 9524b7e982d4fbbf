// src/services/session_manager.rs
use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SendRejected;
use crate::message::{ClientFrame, ServerFrame, SessionInfo};
use crate::services::api_client::ApiClient;
use crate::services::connection::{ConnectionEvent, Connector, FrameSink};
use crate::services::notice_board::NoticeBoard;
use crate::services::recorder::AudioCapture;

/// Key of the single progress notice a chat session keeps on screen.
pub const PROCESSING_NOTICE: &str = "processing";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    CreatingSession,
    Connected,
    /// Session creation failed; there is no live connection and no retry.
    Failed,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoState {
    pub url: String,
    pub playing: bool,
}

/// Controller behind the chat view: one backend session, one socket, one
/// transcript.
///
/// All mutation goes through `&mut self`, so frames, user input and timer
/// ticks are applied strictly in the order the owner observes them.
pub struct ChatSession {
    avatar_id: String,
    phase: SessionPhase,
    session: Option<SessionInfo>,
    sink: Option<Box<dyn FrameSink>>,
    transcript: Vec<TranscriptEntry>,
    input: String,
    processing: bool,
    processing_since: Option<Instant>,
    processing_timeout: Option<Duration>,
    video: Option<VideoState>,
    recording: bool,
    notices: NoticeBoard,
    lifetime: CancellationToken,
}

impl Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("avatar_id", &self.avatar_id)
            .field("phase", &self.phase)
            .field("session_id", &self.session_id())
            .field("messages", &self.transcript.len())
            .field("processing", &self.processing)
            .finish()
    }
}

impl ChatSession {
    pub fn new(
        avatar_id: impl Into<String>,
        notices: NoticeBoard,
        processing_timeout: Option<Duration>,
    ) -> Self {
        Self {
            avatar_id: avatar_id.into(),
            phase: SessionPhase::Idle,
            session: None,
            sink: None,
            transcript: Vec::new(),
            input: String::new(),
            processing: false,
            processing_since: None,
            processing_timeout,
            video: None,
            recording: false,
            notices,
            lifetime: CancellationToken::new(),
        }
    }

    /// Token cancelled when this session is torn down. Cancelling it from
    /// outside aborts a pending [`ChatSession::mount`].
    pub fn lifetime_token(&self) -> CancellationToken {
        self.lifetime.clone()
    }

    /// Create the backend session and open its socket.
    ///
    /// Runs at most once per `ChatSession`; later calls return `None` without
    /// touching the network. Returns the socket's event stream on success.
    pub async fn mount<C>(
        &mut self,
        api: &ApiClient,
        connector: &C,
    ) -> Option<mpsc::UnboundedReceiver<ConnectionEvent>>
    where
        C: Connector + ?Sized,
    {
        if self.phase != SessionPhase::Idle {
            warn!(avatar_id = %self.avatar_id, phase = ?self.phase, "session already mounted");
            return None;
        }
        self.phase = SessionPhase::CreatingSession;
        info!(avatar_id = %self.avatar_id, "creating session");

        let avatar_id = self.avatar_id.clone();
        let lifetime = self.lifetime.clone();
        let created = tokio::select! {
            biased;
            _ = lifetime.cancelled() => None,
            result = api.create_session(&avatar_id) => Some(result),
        };

        match created {
            None => {
                debug!(%avatar_id, "session creation abandoned");
                self.phase = SessionPhase::Closed;
                None
            }
            Some(Ok(info)) => self.attach(info, connector).await,
            Some(Err(e)) => {
                warn!(%avatar_id, error = %e, "session creation failed");
                self.notices.error("Failed to start session").await;
                self.phase = SessionPhase::Failed;
                None
            }
        }
    }

    /// Second half of [`ChatSession::mount`]: adopt a created session and
    /// open its socket.
    ///
    /// Only a session that has not connected yet can attach; a torn-down or
    /// failed session stays where it is and `None` is returned.
    pub async fn attach<C>(
        &mut self,
        session: SessionInfo,
        connector: &C,
    ) -> Option<mpsc::UnboundedReceiver<ConnectionEvent>>
    where
        C: Connector + ?Sized,
    {
        let attachable = matches!(self.phase, SessionPhase::Idle | SessionPhase::CreatingSession);
        if !attachable || self.lifetime.is_cancelled() {
            warn!(session_id = %session.id, phase = ?self.phase, "refusing to attach session");
            return None;
        }
        if let Some(mut old) = self.sink.take() {
            old.close();
        }
        info!(session_id = %session.id, avatar_id = %self.avatar_id, "session created");

        let (sink, events) = connector.connect(&session.id);
        self.session = Some(session);
        self.sink = Some(sink);
        self.phase = SessionPhase::Connected;
        self.notices.success("Session started!").await;
        Some(events)
    }

    pub async fn handle_event(&mut self, event: ConnectionEvent) {
        if self.phase == SessionPhase::Closed {
            debug!(?event, "event after teardown ignored");
            return;
        }

        match event {
            ConnectionEvent::Opened => info!(session_id = ?self.session_id(), "socket open"),
            ConnectionEvent::Frame(text) => match ServerFrame::decode(&text) {
                Ok(frame) => self.dispatch(frame).await,
                Err(e) => warn!(error = %e, %text, "dropping undecodable frame"),
            },
            ConnectionEvent::Error(reason) => {
                warn!(%reason, "socket error");
                self.notices.error("Connection error").await;
            }
            ConnectionEvent::Closed => {
                info!(session_id = ?self.session_id(), "socket closed");
                if let Some(mut sink) = self.sink.take() {
                    sink.close();
                }
                self.phase = SessionPhase::Closed;
            }
        }
    }

    /// Apply one inbound frame.
    pub async fn dispatch(&mut self, frame: ServerFrame) {
        debug!(kind = frame.kind(), "dispatching frame");
        match frame {
            ServerFrame::Transcription { text } => self.push(MessageRole::User, text),
            ServerFrame::Message { content, .. } => self.push(MessageRole::Assistant, content),
            ServerFrame::Video { video_url, .. } => {
                info!(%video_url, "playing avatar video");
                self.video = Some(VideoState { url: video_url, playing: true });
                self.clear_processing();
                self.notices.dismiss(PROCESSING_NOTICE).await;
            }
            ServerFrame::Status { message, .. } => {
                self.mark_processing();
                self.notices.loading(PROCESSING_NOTICE, message).await;
            }
            ServerFrame::Error { message } => {
                self.notices.dismiss(PROCESSING_NOTICE).await;
                self.notices.error(message).await;
                self.clear_processing();
            }
            ServerFrame::Pong => {}
            ServerFrame::Unknown { kind } => debug!(%kind, "ignoring frame with unknown type"),
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Send the current input as a text frame.
    ///
    /// On success the user entry is appended before any server
    /// acknowledgement, the input is cleared and the processing flag is set.
    pub async fn send_text(&mut self) -> Result<(), SendRejected> {
        if self.input.trim().is_empty() {
            return Err(SendRejected::EmptyInput);
        }
        if self.session.is_none() {
            return Err(SendRejected::NoSession);
        }
        if self.processing {
            return Err(SendRejected::Busy);
        }

        let frame = ClientFrame::Text { text: self.input.clone() };
        self.send_frame(&frame).await?;

        let content = std::mem::take(&mut self.input);
        self.push(MessageRole::User, content);
        self.mark_processing();
        Ok(())
    }

    /// Start capturing a voice clip. Returns whether recording started.
    pub async fn start_recording(&mut self, capture: &mut dyn AudioCapture) -> bool {
        if self.processing || self.recording {
            return false;
        }
        match capture.start() {
            Ok(()) => {
                self.recording = true;
                self.notices.success("Recording started").await;
                true
            }
            Err(e) => {
                warn!(error = %e, "microphone unavailable");
                self.notices.error("Failed to access microphone").await;
                false
            }
        }
    }

    /// Stop capturing and send the clip as one base64 audio frame.
    pub async fn stop_recording(
        &mut self,
        capture: &mut dyn AudioCapture,
    ) -> Result<(), SendRejected> {
        if !self.recording {
            return Err(SendRejected::NotRecording);
        }
        self.recording = false;

        let clip = match capture.stop() {
            Ok(clip) => clip,
            Err(e) => {
                warn!(error = %e, "failed to finish recording");
                self.notices.error("Failed to access microphone").await;
                return Err(SendRejected::Transport(e.to_string()));
            }
        };
        self.notices.success("Recording stopped").await;

        let frame = ClientFrame::Audio { audio: STANDARD.encode(&clip) };
        self.send_frame(&frame).await?;
        self.mark_processing();
        Ok(())
    }

    /// Keepalive; the backend answers with a `pong` frame.
    pub async fn ping(&mut self) -> Result<(), SendRejected> {
        self.send_frame(&ClientFrame::Ping).await
    }

    /// Give up on a generation step that has gone quiet for too long.
    /// Returns whether the processing flag was cleared.
    pub async fn check_processing_timeout(&mut self, now: Instant) -> bool {
        let (Some(limit), Some(since)) = (self.processing_timeout, self.processing_since) else {
            return false;
        };
        if !self.processing || now.duration_since(since) < limit {
            return false;
        }

        warn!(waited = ?now.duration_since(since), "processing timed out");
        self.clear_processing();
        self.notices.dismiss(PROCESSING_NOTICE).await;
        self.notices.error("The avatar took too long to respond").await;
        true
    }

    /// Close the socket and abort any pending mount. Idempotent.
    pub fn teardown(&mut self) {
        self.lifetime.cancel();
        if let Some(mut sink) = self.sink.take() {
            sink.close();
        }
        if self.phase != SessionPhase::Closed {
            info!(avatar_id = %self.avatar_id, session_id = ?self.session_id(), "chat session closed");
            self.phase = SessionPhase::Closed;
        }
    }

    async fn send_frame(&mut self, frame: &ClientFrame) -> Result<(), SendRejected> {
        let sent = match self.sink.as_ref().filter(|s| s.is_open()) {
            Some(sink) => sink.send(frame),
            None => return Err(SendRejected::NotConnected),
        };
        if let Err(e) = sent {
            warn!(error = %e, "failed to send frame");
            self.notices.error("Connection error").await;
            return Err(SendRejected::Transport(e.to_string()));
        }
        Ok(())
    }

    fn push(&mut self, role: MessageRole, content: String) {
        self.transcript.push(TranscriptEntry {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
        });
    }

    fn mark_processing(&mut self) {
        self.processing = true;
        self.processing_since = Some(Instant::now());
    }

    fn clear_processing(&mut self) {
        self.processing = false;
        self.processing_since = None;
    }

    pub fn avatar_id(&self) -> &str {
        &self.avatar_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id.as_str())
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_connected(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.is_open())
    }

    pub fn current_video(&self) -> Option<&VideoState> {
        self.video.as_ref()
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
