//! Transport session: one persistent outbound WebSocket connection.
//!
//! A [`Session`] is the single shared handle in the system. It is mutated
//! only from the controller's event loop, so state changes need no locking.
//! There is no acknowledgment, no retry, and no automatic reconnection:
//! any transport failure ends in [`ConnectionState::Disconnected`] and stays
//! there until the user connects again.

use std::fmt;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

/// Where payloads are sent: `ws://host:port/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEndpoint {
    pub host: String,
    pub port: u16,
    pub name: String,
}

impl SessionEndpoint {
    pub fn new(host: impl Into<String>, port: u16, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            host: host.into(),
            port,
            name: name.trim_matches('/').to_string(),
        }
    }

    /// Connection URL for this endpoint.
    pub fn url(&self) -> String {
        format!("ws://{}:{}/{}", self.host, self.port, self.name)
    }
}

impl fmt::Display for SessionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Connectivity state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Events surfaced to the session's owner: inbound traffic plus unsolicited
/// close and transport errors. Consumed on the same scheduling context as
/// frame processing.
#[derive(Debug)]
pub enum TransportEvent {
    /// An inbound message. Logged, never otherwise interpreted.
    Message(Vec<u8>),
    /// The remote side closed the connection.
    Closed,
    /// The underlying transport failed.
    Error(String),
}

/// A single logical connection to one endpoint at a time.
pub struct Session {
    state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<WsMessage>>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl Session {
    /// Create a disconnected session and the event channel its owner
    /// consumes.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                state: ConnectionState::Disconnected,
                outbound: None,
                events_tx,
                reader: None,
                writer: None,
            },
            events_rx,
        )
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Open the connection. No-op if already connected; the existing
    /// connection is left untouched.
    pub async fn connect(&mut self, endpoint: &SessionEndpoint) -> Result<()> {
        if self.is_connected() {
            tracing::debug!(%endpoint, "connect ignored, session already connected");
            return Ok(());
        }

        let (ws_stream, _) = connect_async(endpoint.url())
            .await
            .with_context(|| format!("failed to connect to {endpoint}"))?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsMessage>();

        let writer_events = self.events_tx.clone();
        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    let _ = writer_events.send(TransportEvent::Error(e.to_string()));
                    return;
                }
            }
            // Outbound channel dropped: voluntary disconnect, say goodbye.
            let _ = ws_sender.send(WsMessage::Close(None)).await;
        });

        let reader_events = self.events_tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(WsMessage::Binary(data)) => {
                        tracing::debug!(bytes = data.len(), "inbound binary message");
                        let _ = reader_events.send(TransportEvent::Message(data));
                    }
                    Ok(WsMessage::Text(text)) => {
                        tracing::debug!(%text, "inbound text message");
                        let _ = reader_events.send(TransportEvent::Message(text.into_bytes()));
                    }
                    Ok(WsMessage::Close(_)) => {
                        let _ = reader_events.send(TransportEvent::Closed);
                        return;
                    }
                    Err(e) => {
                        let _ = reader_events.send(TransportEvent::Error(e.to_string()));
                        return;
                    }
                    _ => {}
                }
            }
            let _ = reader_events.send(TransportEvent::Closed);
        });

        self.outbound = Some(out_tx);
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.state = ConnectionState::Connected;
        tracing::info!(%endpoint, "session connected");
        Ok(())
    }

    /// Enqueue one binary message. Silently drops the payload if no session
    /// is open.
    pub fn send(&mut self, payload: Vec<u8>) {
        let Some(tx) = &self.outbound else {
            tracing::trace!(bytes = payload.len(), "no session open, dropping payload");
            return;
        };
        if tx.send(WsMessage::Binary(payload)).is_err() {
            // Writer task is gone; the reader has already reported why.
            self.mark_disconnected();
        }
    }

    /// Close the connection. No-op if not connected.
    pub async fn disconnect(&mut self) {
        if !self.is_connected() {
            tracing::debug!("disconnect ignored, session not connected");
            return;
        }

        // Dropping the outbound sender makes the writer flush queued
        // payloads, send a close frame, and exit.
        self.outbound = None;
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.state = ConnectionState::Disconnected;
        tracing::info!("session disconnected");
    }

    /// Force the session into `Disconnected` after an unsolicited close or
    /// transport error. Same effect as [`Session::disconnect`], but triggered
    /// by the remote side or the network. Idempotent.
    pub fn mark_disconnected(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.outbound = None;
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.state = ConnectionState::Disconnected;
        tracing::info!("session closed by transport");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_shape() {
        let endpoint = SessionEndpoint::new("192.168.1.20", 9000, "cam1");
        assert_eq!(endpoint.url(), "ws://192.168.1.20:9000/cam1");
    }

    #[test]
    fn endpoint_name_is_normalized() {
        let endpoint = SessionEndpoint::new("host", 80, "/session/");
        assert_eq!(endpoint.url(), "ws://host:80/session");
    }

    #[test]
    fn send_without_connection_is_a_noop() {
        let (mut session, _events) = Session::new();
        session.send(vec![1, 2, 3]);
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_without_connection_is_a_noop() {
        let (mut session, _events) = Session::new();
        session.disconnect().await;
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn mark_disconnected_is_idempotent() {
        let (mut session, _events) = Session::new();
        session.mark_disconnected();
        session.mark_disconnected();
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }
}
