#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use avatar_client::error::ClientError;
use avatar_client::message::ClientFrame;
use avatar_client::services::connection::{ConnectionEvent, Connector, FrameSink};
use avatar_client::services::notice_board::NoticeBoard;
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// In-memory socket: records what the controller sends.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub sent: Arc<Mutex<Vec<ClientFrame>>>,
    pub open: Arc<AtomicBool>,
    pub closes: Arc<AtomicUsize>,
}

impl RecordingSink {
    pub fn open() -> Self {
        let sink = Self::default();
        sink.open.store(true, Ordering::SeqCst);
        sink
    }

    pub fn frames(&self) -> Vec<ClientFrame> {
        self.sent.lock().unwrap().clone()
    }
}

impl FrameSink for RecordingSink {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send(&self, frame: &ClientFrame) -> Result<(), ClientError> {
        if !self.is_open() {
            return Err(ClientError::WebSocket("closed".into()));
        }
        self.sent.lock().unwrap().push(frame.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out a shared [`RecordingSink`] and keeps the event sender so tests
/// can push frames at the controller.
#[derive(Clone)]
pub struct FakeConnector {
    pub sink: RecordingSink,
    pub connected_to: Arc<Mutex<Vec<String>>>,
    pub events: Arc<Mutex<Option<mpsc::UnboundedSender<ConnectionEvent>>>>,
}

impl FakeConnector {
    pub fn new(sink: RecordingSink) -> Self {
        Self {
            sink,
            connected_to: Arc::default(),
            events: Arc::default(),
        }
    }

    pub fn push(&self, event: ConnectionEvent) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            tx.send(event).unwrap();
        }
    }
}

impl Connector for FakeConnector {
    fn connect(
        &self,
        session_id: &str,
    ) -> (Box<dyn FrameSink>, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connected_to.lock().unwrap().push(session_id.to_string());
        *self.events.lock().unwrap() = Some(tx);
        (Box::new(self.sink.clone()), rx)
    }
}

pub fn notices() -> NoticeBoard {
    NoticeBoard::new(Duration::from_secs(60))
}

pub fn avatar_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "user_id": "demo-user",
        "name": name,
        "image_url": format!("http://localhost:9000/avatars/{id}/image.jpg"),
        "thumbnail_url": format!("http://localhost:9000/avatars/{id}/thumbnail.jpg"),
        "status": "ready",
        "metadata": {"width": 512, "height": 512},
        "created_at": "2024-05-01T12:00:00"
    })
}

pub fn frame(value: Value) -> ConnectionEvent {
    ConnectionEvent::Frame(value.to_string())
}
