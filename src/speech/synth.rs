use std::time::Duration;

use async_trait::async_trait;

use crate::error::SpeechError;

/// Prebuilt voice of the synthesis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConfig {
    pub voice_name: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_name: "Kore".to_string(),
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Sample rate of the synthesized PCM (typically 24000)
    pub sample_rate: u32,
    /// Channel count of the synthesized PCM (typically 1)
    pub channels: u16,
    /// Pause between two background preloads
    pub preload_delay: Duration,
    /// Upper bound for one synthesis call; a timed-out call counts as failed
    pub synthesis_timeout: Duration,
    pub voice: VoiceConfig,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24000,
            channels: 1,
            preload_delay: Duration::from_millis(50),
            synthesis_timeout: Duration::from_secs(30),
            voice: VoiceConfig::default(),
        }
    }
}

/// Remote text-to-speech backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return the audio as base64-encoded s16le PCM
    /// at the rate and channel count the dispatcher is configured for.
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<String, SpeechError>;
}
