//! Session controller: orchestrates capture, conversion, encoding, and the
//! transport session.
//!
//! One event loop consumes captured frames, user commands, and transport
//! events. A frame's full pass (convert → encode → send) completes before
//! the next frame is taken, so payloads leave in capture order, and all
//! session state is mutated from this single context.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::convert;
use crate::encode;
use crate::frame::PlanarFrame;
use crate::transport::{ConnectionState, Session, SessionEndpoint, TransportEvent};

/// Actions the UI layer can request.
#[derive(Debug)]
pub enum Command {
    Connect(SessionEndpoint),
    Disconnect,
    /// Display concern only; the frame pipeline is unaffected.
    TogglePrivacy,
    SetQuality(u8),
    Shutdown,
}

/// User-facing state, published on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    pub connection: ConnectionState,
    pub privacy: bool,
}

/// Pipeline counters for observability and test assertions.
pub struct PipelineMetrics {
    pub frames_in: AtomicU64,
    pub frames_sent: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub messages_in: AtomicU64,
}

impl PipelineMetrics {
    fn new() -> Self {
        Self {
            frames_in: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            messages_in: AtomicU64::new(0),
        }
    }
}

pub struct SessionController {
    session: Session,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    quality: u8,
    privacy: bool,
    metrics: Arc<PipelineMetrics>,
    state_tx: watch::Sender<ControllerState>,
}

impl SessionController {
    pub fn new(quality: u8) -> Self {
        let (session, events_rx) = Session::new();
        let (state_tx, _) = watch::channel(ControllerState {
            connection: ConnectionState::Disconnected,
            privacy: false,
        });
        Self {
            session,
            events_rx,
            quality: quality.clamp(1, 100),
            privacy: false,
            metrics: Arc::new(PipelineMetrics::new()),
            state_tx,
        }
    }

    /// Watch connection/privacy state for display.
    pub fn state_watch(&self) -> watch::Receiver<ControllerState> {
        self.state_tx.subscribe()
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until `Command::Shutdown` or the command channel closes.
    /// Disconnects the session on the way out.
    pub async fn run(
        self,
        frame_rx: mpsc::Receiver<PlanarFrame>,
        command_rx: mpsc::UnboundedReceiver<Command>,
    ) {
        let SessionController {
            session,
            events_rx,
            quality,
            privacy,
            metrics,
            state_tx,
        } = self;
        control_loop(
            session, events_rx, frame_rx, command_rx, quality, privacy, metrics, state_tx,
        )
        .await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn control_loop(
    mut session: Session,
    mut events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    mut frame_rx: mpsc::Receiver<PlanarFrame>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    mut quality: u8,
    mut privacy: bool,
    metrics: Arc<PipelineMetrics>,
    state_tx: watch::Sender<ControllerState>,
) {
    tracing::debug!("session controller started");
    let mut frames_open = true;

    loop {
        tokio::select! {
            biased;
            cmd = command_rx.recv() => {
                match cmd {
                    Some(Command::Connect(endpoint)) => {
                        if let Err(e) = session.connect(&endpoint).await {
                            tracing::warn!(error = %e, "connect failed");
                        }
                        publish_state(&state_tx, &session, privacy);
                    }
                    Some(Command::Disconnect) => {
                        session.disconnect().await;
                        publish_state(&state_tx, &session, privacy);
                    }
                    Some(Command::TogglePrivacy) => {
                        privacy = !privacy;
                        tracing::debug!(privacy, "privacy toggled");
                        publish_state(&state_tx, &session, privacy);
                    }
                    Some(Command::SetQuality(q)) => {
                        quality = q.clamp(1, 100);
                        tracing::debug!(quality, "quality changed");
                    }
                    Some(Command::Shutdown) | None => break,
                }
            }
            event = events_rx.recv() => {
                match event {
                    Some(TransportEvent::Message(data)) => {
                        metrics.messages_in.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(bytes = data.len(), "ignoring inbound message");
                    }
                    Some(TransportEvent::Closed) => {
                        session.mark_disconnected();
                        publish_state(&state_tx, &session, privacy);
                    }
                    Some(TransportEvent::Error(e)) => {
                        tracing::warn!(error = %e, "transport error");
                        session.mark_disconnected();
                        publish_state(&state_tx, &session, privacy);
                    }
                    // The session holds its own event sender, so this arm
                    // only fires once the session itself is gone.
                    None => {}
                }
            }
            frame = frame_rx.recv(), if frames_open => {
                match frame {
                    Some(frame) => process_frame(&mut session, quality, &metrics, frame),
                    None => frames_open = false,
                }
            }
        }
    }

    session.disconnect().await;
    tracing::debug!("session controller stopped");
}

/// One frame's pass through the pipeline. Every failure drops the frame and
/// nothing else: no retry, no user-visible error.
fn process_frame(
    session: &mut Session,
    quality: u8,
    metrics: &PipelineMetrics,
    frame: PlanarFrame,
) {
    metrics.frames_in.fetch_add(1, Ordering::Relaxed);

    if !session.is_connected() {
        metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("no session open, discarding frame");
        return;
    }

    let raster = match convert::to_rgb(&frame) {
        Ok(raster) => raster,
        Err(e) => {
            metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "frame conversion failed, dropping frame");
            return;
        }
    };

    let payload = match encode::to_jpeg(&raster, quality) {
        Ok(payload) => payload,
        Err(e) => {
            metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "jpeg encode failed, dropping frame");
            return;
        }
    };

    session.send(payload);
    metrics.frames_sent.fetch_add(1, Ordering::Relaxed);
}

fn publish_state(tx: &watch::Sender<ControllerState>, session: &Session, privacy: bool) {
    let _ = tx.send(ControllerState {
        connection: session.state(),
        privacy,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_increment() {
        let m = PipelineMetrics::new();
        m.frames_in.fetch_add(3, Ordering::Relaxed);
        m.frames_sent.fetch_add(2, Ordering::Relaxed);
        m.frames_dropped.fetch_add(1, Ordering::Relaxed);

        assert_eq!(m.frames_in.load(Ordering::Relaxed), 3);
        assert_eq!(m.frames_sent.load(Ordering::Relaxed), 2);
        assert_eq!(m.frames_dropped.load(Ordering::Relaxed), 1);
        assert_eq!(m.messages_in.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn initial_state_is_disconnected() {
        let controller = SessionController::new(80);
        let state = *controller.state_watch().borrow();
        assert_eq!(state.connection, ConnectionState::Disconnected);
        assert!(!state.privacy);
    }

    #[test]
    fn quality_is_clamped_on_construction() {
        let controller = SessionController::new(0);
        assert_eq!(controller.quality, 1);
        let controller = SessionController::new(255);
        assert_eq!(controller.quality, 100);
    }

    #[tokio::test]
    async fn frames_without_a_session_are_counted_as_dropped() {
        let (mut session, _events) = Session::new();
        let metrics = PipelineMetrics::new();
        let frame = crate::capture::TestPattern::frame_at(8, 8, 0);

        process_frame(&mut session, 80, &metrics, frame);

        assert_eq!(metrics.frames_in.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.frames_dropped.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.frames_sent.load(Ordering::Relaxed), 0);
    }
}
