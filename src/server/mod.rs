//! Development frame sink.
//!
//! Accepts WebSocket connections and logs received frame payloads. This is
//! the counterpart a `camcast stream` run points at during development; it
//! never interprets or stores frames.

use anyhow::Result;
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};

pub struct FrameSink {
    addr: String,
}

impl FrameSink {
    pub fn new(addr: String) -> Self {
        Self { addr }
    }

    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        tracing::info!(addr = %self.addr, "frame sink listening");

        loop {
            let (stream, _) = listener.accept().await?;
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream).await {
                    let err_str = e.to_string();
                    // Port scanners and plain-HTTP probes fail the upgrade;
                    // not worth a warning.
                    if !err_str.contains("Connection: upgrade") && !err_str.contains("protocol error")
                    {
                        tracing::warn!(error = %e, "connection error");
                    }
                }
            });
        }
    }
}

async fn handle_connection(stream: TcpStream) -> Result<()> {
    let peer = stream.peer_addr()?;
    let mut ws_stream = accept_async(stream).await?;
    tracing::info!(%peer, "stream connected");

    let mut frames: u64 = 0;
    let mut bytes: u64 = 0;

    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(WsMessage::Binary(data)) => {
                frames += 1;
                bytes += data.len() as u64;
                tracing::debug!(frame = frames, payload_bytes = data.len(), "received frame");
            }
            Ok(WsMessage::Text(text)) => {
                tracing::debug!(%text, "received text message");
            }
            Ok(WsMessage::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    tracing::info!(%peer, frames, total_bytes = bytes, "stream ended");
    Ok(())
}
