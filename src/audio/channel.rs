//! The exclusive playback channel: at most one synthesized utterance is
//! audible at any time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::buffer::AudioBuffer;
use super::output::{AudioOutput, OutputState};
use crate::error::SpeechError;

/// The source currently tracked as playing.
struct ActiveSource {
    id: u64,
    stop: Arc<AtomicBool>,
}

pub struct PlaybackChannel {
    output: Arc<dyn AudioOutput>,
    current: Mutex<Option<ActiveSource>>,
    next_id: AtomicU64,
}

impl PlaybackChannel {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Resume the output if the platform suspended it. Idempotent.
    pub fn resume_output(&self) {
        if self.output.state() == OutputState::Suspended {
            match self.output.resume() {
                Ok(()) => log::debug!("Audio output resumed"),
                Err(e) => log::warn!("Failed to resume audio output: {}", e),
            }
        }
    }

    /// Put the output into the suspended state (platform power-saving).
    pub fn suspend_output(&self) {
        self.stop_exclusive();
        self.output.suspend();
    }

    pub fn output_state(&self) -> OutputState {
        self.output.state()
    }

    /// Stop and release the tracked source, if any. Idempotent, and safe when
    /// the source already finished on its own.
    pub fn stop_exclusive(&self) {
        if let Some(source) = self.current.lock().take() {
            source.stop.store(true, Ordering::SeqCst);
            log::debug!("Stopped playback source #{}", source.id);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Play `buffer` as the only audible source and wait until it ends.
    ///
    /// Any source tracked before this call is stopped first. Stop and start
    /// happen under the same lock, so two calls racing each other never leave
    /// two sources tracked at once.
    pub async fn play_exclusive(&self, buffer: AudioBuffer) -> Result<(), SpeechError> {
        self.play_exclusive_if(buffer, || true).await.map(|_| ())
    }

    /// Like [`play_exclusive`](Self::play_exclusive), but `admit` is evaluated
    /// under the channel lock right before the previous source is stopped.
    /// Returns `Ok(false)` without touching the channel when it refuses.
    pub async fn play_exclusive_if<F>(&self, buffer: AudioBuffer, admit: F) -> Result<bool, SpeechError>
    where
        F: FnOnce() -> bool,
    {
        self.resume_output();

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stop = Arc::new(AtomicBool::new(false));
        let done = {
            let mut current = self.current.lock();
            if !admit() {
                return Ok(false);
            }
            if let Some(previous) = current.take() {
                previous.stop.store(true, Ordering::SeqCst);
                log::debug!("Source #{} preempted by #{}", previous.id, id);
            }
            let done = self.output.start(buffer, stop.clone())?;
            *current = Some(ActiveSource { id, stop });
            done
        };

        // 发送端被丢弃同样视为播放结束
        let _ = done.await;

        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|source| source.id == id) {
            *current = None;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullOutput;
    use std::time::Duration;

    fn tone(ms: usize) -> AudioBuffer {
        AudioBuffer::new(1000, 1, vec![0.1; ms])
    }

    #[tokio::test(start_paused = true)]
    async fn tracked_source_is_released_after_natural_end() {
        let channel = PlaybackChannel::new(Arc::new(NullOutput::default()));
        channel.play_exclusive(tone(20)).await.unwrap();
        assert!(!channel.is_playing());
        // 已结束的源再停止是空操作
        channel.stop_exclusive();
        channel.stop_exclusive();
    }

    #[tokio::test(start_paused = true)]
    async fn new_playback_preempts_old() {
        let channel = Arc::new(PlaybackChannel::new(Arc::new(NullOutput::default())));
        let first = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.play_exclusive(tone(60_000)).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(channel.is_playing());

        let started = tokio::time::Instant::now();
        channel.play_exclusive(tone(30)).await.unwrap();
        first.await.unwrap().unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!channel.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn refused_playback_leaves_current_source_alone() {
        let channel = Arc::new(PlaybackChannel::new(Arc::new(NullOutput::default())));
        let first = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.play_exclusive(tone(200)).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        let played = channel.play_exclusive_if(tone(10), || false).await.unwrap();
        assert!(!played);
        assert!(channel.is_playing());
        first.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn play_resumes_suspended_output() {
        let channel = PlaybackChannel::new(Arc::new(NullOutput::new(true)));
        assert_eq!(channel.output_state(), OutputState::Suspended);
        channel.play_exclusive(tone(5)).await.unwrap();
        assert_eq!(channel.output_state(), OutputState::Running);
    }
}
