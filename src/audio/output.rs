//! Generic audio output trait for exclusive speech playback.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;

use super::buffer::AudioBuffer;
use crate::error::SpeechError;

/// Power state of the shared output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Running,
    /// Power-saving or autoplay policy: nothing is audible until resumed.
    Suspended,
}

/// A sink that can play one decoded buffer at a time per call to `start`.
///
/// Implementations must not block the caller: `start` hands the buffer to
/// the device (thread, task, callback) and returns a receiver that fires
/// once playback has ended, naturally or because `stop` was raised. Dropping
/// the sender without sending counts as "ended" too.
pub trait AudioOutput: Send + Sync {
    fn state(&self) -> OutputState;

    /// Resume a suspended device. Must be idempotent.
    fn resume(&self) -> Result<(), SpeechError>;

    /// Enter the suspended state.
    fn suspend(&self);

    /// Begin playback of `buffer`. The implementation polls `stop` and
    /// finishes early once it is set.
    fn start(
        &self,
        buffer: AudioBuffer,
        stop: Arc<AtomicBool>,
    ) -> Result<oneshot::Receiver<()>, SpeechError>;
}

/// Output with no device behind it: "plays" a buffer by waiting for its
/// duration. Keeps timing and exclusivity identical to a real device.
pub struct NullOutput {
    suspended: AtomicBool,
}

/// 停止标志的轮询间隔
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

impl NullOutput {
    pub fn new(start_suspended: bool) -> Self {
        Self {
            suspended: AtomicBool::new(start_suspended),
        }
    }
}

impl Default for NullOutput {
    fn default() -> Self {
        Self::new(false)
    }
}

impl AudioOutput for NullOutput {
    fn state(&self) -> OutputState {
        if self.suspended.load(Ordering::SeqCst) {
            OutputState::Suspended
        } else {
            OutputState::Running
        }
    }

    fn resume(&self) -> Result<(), SpeechError> {
        if self.suspended.swap(false, Ordering::SeqCst) {
            log::info!("Null output resumed");
        }
        Ok(())
    }

    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }

    fn start(
        &self,
        buffer: AudioBuffer,
        stop: Arc<AtomicBool>,
    ) -> Result<oneshot::Receiver<()>, SpeechError> {
        if self.state() == OutputState::Suspended {
            return Err(SpeechError::OutputSuspended);
        }
        let (done_tx, done_rx) = oneshot::channel();
        let duration = buffer.duration();
        log::debug!(
            "Null output playing {} frames ({:?})",
            buffer.frames(),
            duration
        );
        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + duration;
            while tokio::time::Instant::now() < deadline && !stop.load(Ordering::SeqCst) {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                tokio::time::sleep(remaining.min(STOP_POLL_INTERVAL)).await;
            }
            let _ = done_tx.send(());
        });
        Ok(done_rx)
    }
}
