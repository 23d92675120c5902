//! Frame capture loop.
//!
//! A [`CaptureLoop`] runs a [`FrameSource`] at its native rate and hands each
//! produced frame to the pipeline through a bounded channel of capacity 1,
//! so there is never more than one frame in flight. If the pipeline is still
//! busy with the previous frame, the new frame is dropped: for live video a
//! stale frame is worth less than no frame.

pub mod pattern;

pub use pattern::TestPattern;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::frame::PlanarFrame;

/// A producer of raw frames, standing in for the device capture callback.
///
/// Implementations hand off ownership of one frame per call and must not
/// retain frame memory across calls.
pub trait FrameSource: Send + 'static {
    /// Produce the next frame. An error skips this tick; capture continues.
    fn next_frame(&mut self) -> Result<PlanarFrame>;

    /// Native capture rate in frames per second.
    fn frame_rate(&self) -> u32;
}

/// Drives a [`FrameSource`] until stopped.
///
/// Starting while already started and stopping while already stopped are
/// no-ops. Stop is checked before each tick, so it takes effect before the
/// next frame is produced; a frame already handed to the pipeline still
/// completes its pass.
pub struct CaptureLoop {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Start capturing. Returns the frame receiver, or `None` if the loop is
    /// already running (the running capture is left untouched).
    pub fn start<S: FrameSource>(&mut self, mut source: S) -> Option<mpsc::Receiver<PlanarFrame>> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("capture already running, start ignored");
            return None;
        }
        if let Some(old) = self.handle.take() {
            old.abort();
        }

        // Capacity 1: one frame in flight, drop the rest.
        let (tx, rx) = mpsc::channel::<PlanarFrame>(1);
        let running = Arc::clone(&self.running);
        let rate = source.frame_rate().max(1);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / rate as f64));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            tracing::debug!(rate, "capture loop started");

            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let frame = match source.next_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(error = %e, "frame capture failed, skipping tick");
                        continue;
                    }
                };

                match tx.try_send(frame) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        // Pipeline still busy with the previous frame.
                        tracing::trace!("pipeline busy, dropping frame");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }

            running.store(false, Ordering::SeqCst);
            tracing::debug!("capture loop stopped");
        });

        self.handle = Some(handle);
        Some(rx)
    }

    /// Stop capturing. No-op if already stopped.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            tracing::debug!("capture already stopped, stop ignored");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for CaptureLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
