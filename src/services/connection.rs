// src/services/connection.rs
//! Session socket transport.
//!
//! [`WsConnection`] owns one WebSocket to `/ws/session/{id}`. The socket is
//! opened by a background task, so [`Connector::connect`] returns at once and
//! every outcome (open, frames, failure, close) arrives on the event channel.
//! There is no reconnect: once [`ConnectionEvent::Closed`] is emitted the
//! connection is gone for good.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::message::ClientFrame;
use crate::services::api_client::session_socket_url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened,
    /// One inbound text frame, undecoded.
    Frame(String),
    Error(String),
    Closed,
}

/// Write half of a session socket, as seen by the chat controller.
pub trait FrameSink: Send {
    fn is_open(&self) -> bool;
    fn send(&self, frame: &ClientFrame) -> Result<(), ClientError>;
    /// Close without draining. Idempotent.
    fn close(&mut self);
}

/// Opens the socket for a freshly created session.
pub trait Connector {
    fn connect(
        &self,
        session_id: &str,
    ) -> (Box<dyn FrameSink>, mpsc::UnboundedReceiver<ConnectionEvent>);
}

#[derive(Debug, Clone)]
pub struct WsConnector {
    ws_base: Url,
}

impl WsConnector {
    pub fn new(config: &ClientConfig) -> Self {
        Self { ws_base: config.ws_url.clone() }
    }

    pub fn with_base(ws_base: Url) -> Self {
        Self { ws_base }
    }
}

impl Connector for WsConnector {
    fn connect(
        &self,
        session_id: &str,
    ) -> (Box<dyn FrameSink>, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (conn, events) = WsConnection::open(session_socket_url(&self.ws_base, session_id));
        (Box::new(conn), events)
    }
}

enum Outbound {
    Text(String),
    Close,
}

pub struct WsConnection {
    url: String,
    tx: Option<mpsc::UnboundedSender<Outbound>>,
    open: Arc<AtomicBool>,
}

impl std::fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnection")
            .field("url", &self.url)
            .field("open", &self.is_open())
            .finish()
    }
}

impl WsConnection {
    /// Start connecting to `url` in the background. Must be called inside a
    /// tokio runtime.
    pub fn open(url: String) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (ev_tx, ev_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));

        tokio::spawn(run(url.clone(), Arc::clone(&open), out_rx, ev_tx));

        (Self { url, tx: Some(out_tx), open }, ev_rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FrameSink for WsConnection {
    fn is_open(&self) -> bool {
        self.tx.is_some() && self.open.load(Ordering::Acquire)
    }

    fn send(&self, frame: &ClientFrame) -> Result<(), ClientError> {
        if !self.is_open() {
            return Err(ClientError::WebSocket("socket is not open".into()));
        }
        let json = frame.to_json()?;
        match &self.tx {
            Some(tx) => tx
                .send(Outbound::Text(json))
                .map_err(|_| ClientError::WebSocket("connection task has stopped".into())),
            None => Err(ClientError::WebSocket("socket is closed".into())),
        }
    }

    fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            debug!(url = %self.url, "closing socket");
            self.open.store(false, Ordering::Release);
            // The task may already be gone; nothing left to close then.
            let _ = tx.send(Outbound::Close);
        }
    }
}

async fn run(
    url: String,
    open: Arc<AtomicBool>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
) {
    match pump(&url, &open, &mut outbound, &events).await {
        Ok(()) => info!(%url, "websocket disconnected"),
        Err(e) => {
            warn!(%url, error = %e, "websocket failed");
            let _ = events.send(ConnectionEvent::Error(e.to_string()));
        }
    }
    open.store(false, Ordering::Release);
    let _ = events.send(ConnectionEvent::Closed);
}

async fn pump(
    url: &str,
    open: &AtomicBool,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
) -> Result<(), ClientError> {
    let (stream, _) = connect_async(url)
        .await
        .map_err(|e| ClientError::WebSocket(format!("connect: {e}")))?;
    let (mut write, mut read) = stream.split();

    open.store(true, Ordering::Release);
    info!(%url, "websocket connected");
    let _ = events.send(ConnectionEvent::Opened);

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    debug!(%text, "frame received");
                    let _ = events.send(ConnectionEvent::Frame(text));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Err(e)) => return Err(ClientError::WebSocket(format!("read: {e}"))),
                // Binary and ping/pong frames are handled by tungstenite.
                Some(Ok(_)) => {}
            },
            out = outbound.recv() => match out {
                Some(Outbound::Text(json)) => {
                    write
                        .send(Message::Text(json))
                        .await
                        .map_err(|e| ClientError::WebSocket(format!("send: {e}")))?;
                }
                Some(Outbound::Close) | None => {
                    open.store(false, Ordering::Release);
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            },
        }
    }
}
