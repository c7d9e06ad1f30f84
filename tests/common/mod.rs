#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bilsem_voice::audio::{AudioBuffer, AudioOutput, OutputState, encode};
use bilsem_voice::{SpeechConfig, SpeechDispatcher, SpeechError, SpeechSynthesizer, VoiceConfig};
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Default synthesis latency of the mock service.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(100);

/// Every utterance is 200 ms of a constant tone at 24 kHz.
const UTTERANCE_FRAMES: usize = 4800;

/// Scripted text-to-speech service.
///
/// Each text is rendered as a constant tone so the output can tell which
/// utterance it is playing.
#[derive(Default)]
pub struct MockSynthesizer {
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Mutex<HashMap<String, Duration>>,
    tones: Mutex<HashMap<String, i16>>,
    failing: Mutex<HashSet<String>>,
    crashing: Mutex<HashSet<String>>,
}

impl MockSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_latency(&self, text: &str, latency: Duration) {
        self.latency.lock().insert(text.to_string(), latency);
    }

    pub fn set_tone(&self, text: &str, tone: i16) {
        self.tones.lock().insert(text.to_string(), tone);
    }

    pub fn fail(&self, text: &str) {
        self.failing.lock().insert(text.to_string());
    }

    /// Panic on the next call for `text`, then behave normally.
    pub fn crash_once(&self, text: &str) {
        self.crashing.lock().insert(text.to_string());
    }

    pub fn recover(&self, text: &str) {
        self.failing.lock().remove(text);
    }

    /// Texts in the order the service was called for them.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().iter().filter(|t| *t == text).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn tone_of(&self, text: &str) -> i16 {
        self.tones.lock().get(text).copied().unwrap_or(1000)
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &VoiceConfig) -> Result<String, SpeechError> {
        self.calls.lock().push(text.to_string());
        if self.crashing.lock().remove(text) {
            panic!("synthesizer crashed on {:?}", text);
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = self.latency.lock().get(text).copied().unwrap_or(DEFAULT_LATENCY);
        tokio::time::sleep(latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().contains(text) {
            return Err(SpeechError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        let tone = self.tone_of(text).to_le_bytes();
        let pcm: Vec<u8> = tone.iter().copied().cycle().take(UTTERANCE_FRAMES * 2).collect();
        Ok(encode(&pcm))
    }
}

struct StartedSource {
    tone: i16,
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

/// Output that records what it was asked to play and how many sources were
/// audible at the moment each one started.
pub struct RecordingOutput {
    suspended: AtomicBool,
    sources: Mutex<Vec<StartedSource>>,
    max_overlap: AtomicUsize,
}

impl RecordingOutput {
    pub fn new(start_suspended: bool) -> Arc<Self> {
        Arc::new(Self {
            suspended: AtomicBool::new(start_suspended),
            sources: Mutex::new(Vec::new()),
            max_overlap: AtomicUsize::new(0),
        })
    }

    /// Tones of every started source, in start order.
    pub fn played(&self) -> Vec<i16> {
        self.sources.lock().iter().map(|s| s.tone).collect()
    }

    /// Tones of sources that were stopped before their natural end.
    pub fn stopped(&self) -> Vec<i16> {
        self.sources
            .lock()
            .iter()
            .filter(|s| s.stop.load(Ordering::SeqCst))
            .map(|s| s.tone)
            .collect()
    }

    /// Largest number of other sources still audible when a source started.
    pub fn max_overlap(&self) -> usize {
        self.max_overlap.load(Ordering::SeqCst)
    }
}

impl AudioOutput for RecordingOutput {
    fn state(&self) -> OutputState {
        if self.suspended.load(Ordering::SeqCst) {
            OutputState::Suspended
        } else {
            OutputState::Running
        }
    }

    fn resume(&self) -> Result<(), SpeechError> {
        self.suspended.store(false, Ordering::SeqCst);
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
        let tone = buffer
            .samples()
            .first()
            .map(|s| (s * 32768.0) as i16)
            .unwrap_or_default();
        let finished = Arc::new(AtomicBool::new(false));
        {
            let mut sources = self.sources.lock();
            let audible = sources
                .iter()
                .filter(|s| !s.stop.load(Ordering::SeqCst) && !s.finished.load(Ordering::SeqCst))
                .count();
            self.max_overlap.fetch_max(audible, Ordering::SeqCst);
            sources.push(StartedSource {
                tone,
                stop: stop.clone(),
                finished: finished.clone(),
            });
        }

        let (done_tx, done_rx) = oneshot::channel();
        let duration = buffer.duration();
        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + duration;
            while tokio::time::Instant::now() < deadline && !stop.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            finished.store(true, Ordering::SeqCst);
            let _ = done_tx.send(());
        });
        Ok(done_rx)
    }
}

pub fn test_config() -> SpeechConfig {
    SpeechConfig {
        synthesis_timeout: Duration::from_secs(5),
        ..SpeechConfig::default()
    }
}

pub fn dispatcher(
    synth: &Arc<MockSynthesizer>,
    output: &Arc<RecordingOutput>,
) -> SpeechDispatcher {
    SpeechDispatcher::new(synth.clone(), output.clone(), test_config())
}
