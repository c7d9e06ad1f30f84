use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use super::synth::{SpeechConfig, SpeechSynthesizer};
use crate::audio::{AudioBuffer, AudioOutput, OutputState, PlaybackChannel, codec};
use crate::error::SpeechError;

/// A synthesis in flight, awaitable by any number of callers.
type PendingAudio = Shared<BoxFuture<'static, Option<AudioBuffer>>>;

/// Cache and in-flight map share one lock: a text moves from `pending` to
/// `cache` atomically, so no caller can see it in neither.
#[derive(Default)]
struct Registry {
    cache: HashMap<String, AudioBuffer>,
    pending: HashMap<String, PendingAudio>,
}

struct Inner {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: PlaybackChannel,
    config: SpeechConfig,
    registry: Mutex<Registry>,
    queue: Mutex<VecDeque<String>>,
    draining: AtomicBool,
    generation: AtomicU64,
}

impl Inner {
    async fn synthesize_and_decode(&self, text: &str) -> Result<AudioBuffer, SpeechError> {
        let timeout = self.config.synthesis_timeout;
        let payload = tokio::time::timeout(
            timeout,
            self.synthesizer.synthesize(text, &self.config.voice),
        )
        .await
        .map_err(|_| SpeechError::Timeout(timeout.as_millis()))??;

        if payload.is_empty() {
            return Err(SpeechError::EmptyResponse);
        }
        let bytes = codec::decode(&payload)?;
        Ok(codec::pcm16_to_samples(
            &bytes,
            self.config.sample_rate,
            self.config.channels,
        )?)
    }
}

/// Removes the pending entry if the synthesis task unwinds before it settles.
struct PendingGuard {
    inner: Arc<Inner>,
    text: String,
    armed: bool,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.armed {
            log::error!("Synthesis for {:?} aborted", self.text);
            self.inner.registry.lock().pending.remove(&self.text);
        }
    }
}

/// Text-to-speech cache and dispatcher.
///
/// Cheap to clone; all clones share the same cache, queue, generation
/// counter and playback channel. Every method that may start work spawns
/// onto the current tokio runtime, so they must be called from within one.
///
/// Failures never surface to callers: a failed or stale utterance simply
/// stays silent.
#[derive(Clone)]
pub struct SpeechDispatcher {
    inner: Arc<Inner>,
}

impl SpeechDispatcher {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        output: Arc<dyn AudioOutput>,
        config: SpeechConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                synthesizer,
                playback: PlaybackChannel::new(output),
                config,
                registry: Mutex::new(Registry::default()),
                queue: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Return the audio for `text`, synthesizing it at most once.
    ///
    /// Whitespace-only text yields `None` without contacting the service.
    /// Concurrent calls for the same text share one synthesis. A failure is
    /// not cached, so a later call retries.
    pub async fn fetch_audio(&self, text: &str) -> Option<AudioBuffer> {
        if text.trim().is_empty() {
            return None;
        }

        let pending = {
            let mut registry = self.inner.registry.lock();
            if let Some(buffer) = registry.cache.get(text) {
                return Some(buffer.clone());
            }
            match registry.pending.get(text) {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.start_synthesis(text.to_string());
                    registry.pending.insert(text.to_string(), pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    /// Spawn the synthesis so it settles (and leaves `pending`) even if every
    /// caller awaiting it goes away. Called with the registry lock held.
    fn start_synthesis(&self, text: String) -> PendingAudio {
        log::debug!("Synthesizing: {:?}", text);
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let mut guard = PendingGuard {
                inner: inner.clone(),
                text: text.clone(),
                armed: true,
            };
            let result = inner.synthesize_and_decode(&text).await;
            if let Err(e) = &result {
                log::warn!("TTS failed for {:?}: {}", text, e);
            }
            let mut registry = inner.registry.lock();
            registry.pending.remove(&text);
            guard.armed = false;
            match result {
                Ok(buffer) => {
                    registry.cache.insert(text, buffer.clone());
                    Some(buffer)
                }
                Err(_) => None,
            }
        });

        async move {
            task.await.unwrap_or_else(|e| {
                log::error!("Synthesis task failed: {}", e);
                None
            })
        }
        .boxed()
        .shared()
    }

    /// Queue `text` for low-priority background synthesis and return at once.
    pub fn preload(&self, text: &str) {
        if text.trim().is_empty() || self.is_cached(text) {
            return;
        }
        {
            let mut queue = self.inner.queue.lock();
            if !queue.iter().any(|queued| queued == text) {
                queue.push_back(text.to_string());
            }
        }
        self.ensure_draining();
    }

    fn ensure_draining(&self) {
        if self
            .inner
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let dispatcher = self.clone();
            tokio::spawn(async move { dispatcher.drain_preload_queue().await });
        }
    }

    /// Single background worker: FIFO, one synthesis at a time, a short pause
    /// after each so foreground requests keep their connection budget.
    async fn drain_preload_queue(&self) {
        loop {
            let next = self.inner.queue.lock().pop_front();
            let Some(text) = next else {
                self.inner.draining.store(false, Ordering::SeqCst);
                // preload() 可能在取空队列与清除标志之间入队
                let refill = !self.inner.queue.lock().is_empty();
                if refill
                    && self
                        .inner
                        .draining
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                {
                    continue;
                }
                log::debug!("Preload queue drained");
                return;
            };

            if self.is_cached_or_pending(&text) {
                continue;
            }
            if self.fetch_audio(&text).await.is_none() {
                log::warn!("Preload failed for: {:?}", text);
            }
            tokio::time::sleep(self.inner.config.preload_delay).await;
        }
    }

    /// Speak `text` now, cutting off whatever is playing.
    ///
    /// If another `speak` is issued before this one's audio is ready, this
    /// one stays silent. Resolves when playback ends or is abandoned.
    pub async fn speak(&self, text: &str) {
        if text.is_empty() {
            return;
        }

        // 先递增再停止：较早的 speak 无法在两步之间开始播放
        let my_generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.playback.stop_exclusive();

        let cached = self.inner.registry.lock().cache.get(text).cloned();
        let buffer = match cached {
            Some(buffer) => buffer,
            None => match self.fetch_audio(text).await {
                Some(buffer) => buffer,
                None => return,
            },
        };

        let generation = &self.inner.generation;
        let admitted = self
            .inner
            .playback
            .play_exclusive_if(buffer, || generation.load(Ordering::SeqCst) == my_generation)
            .await;
        match admitted {
            Ok(true) => {}
            Ok(false) => log::debug!("Discarding stale audio for {:?}", text),
            Err(e) => log::warn!("Playback failed for {:?}: {}", text, e),
        }
    }

    /// Stop the current utterance, if any.
    pub fn stop(&self) {
        self.inner.playback.stop_exclusive();
    }

    /// Resume the audio output after the platform suspended it. Idempotent.
    pub fn resume_output(&self) {
        self.inner.playback.resume_output();
    }

    pub fn suspend_output(&self) {
        self.inner.playback.suspend_output();
    }

    pub fn output_state(&self) -> OutputState {
        self.inner.playback.output_state()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.playback.is_playing()
    }

    pub fn is_cached(&self, text: &str) -> bool {
        self.inner.registry.lock().cache.contains_key(text)
    }

    fn is_cached_or_pending(&self, text: &str) -> bool {
        let registry = self.inner.registry.lock();
        registry.cache.contains_key(text) || registry.pending.contains_key(text)
    }

    pub fn cached_count(&self) -> usize {
        self.inner.registry.lock().cache.len()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.registry.lock().pending.len()
    }

    pub fn queued_count(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn is_preloading(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    /// Number of non-empty `speak` calls issued so far.
    pub fn current_generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }
}
