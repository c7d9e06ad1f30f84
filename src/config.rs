use std::time::Duration;

use crate::speech::{SpeechConfig, VoiceConfig};

/// 运行时读取 API Key 的环境变量，按顺序尝试
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone)]
pub struct Config {
    // 应用信息
    pub app_name: &'static str,
    pub app_version: &'static str,

    // Gemini 服务配置（静态部分）
    pub gemini_base_url: &'static str,
    pub tts_model: &'static str,
    pub voice_name: &'static str,
    pub stt_model: &'static str,
    pub image_model: &'static str,

    // API Key（动态部分，运行时从环境变量读取，不写入二进制）
    pub api_key: String,

    // 语音缓存与调度
    pub speech_sample_rate: u32,
    pub speech_channels: u16,
    pub preload_delay_ms: u64,
    pub synthesis_timeout_ms: u64,

    // 播放设备
    pub playback_device: &'static str,
    pub playback_period_size: usize,
    pub playback_start_suspended: bool,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有静态参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),

            gemini_base_url: env!("GEMINI_BASE_URL"),
            tts_model: env!("GEMINI_TTS_MODEL"),
            voice_name: env!("GEMINI_VOICE_NAME"),
            stt_model: env!("GEMINI_STT_MODEL"),
            image_model: env!("GEMINI_IMAGE_MODEL"),

            api_key: String::new(),

            speech_sample_rate: env!("SPEECH_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse SPEECH_SAMPLE_RATE")?,
            speech_channels: env!("SPEECH_CHANNELS").parse()
                .map_err(|_| "Failed to parse SPEECH_CHANNELS")?,
            preload_delay_ms: env!("SPEECH_PRELOAD_DELAY_MS").parse()
                .map_err(|_| "Failed to parse SPEECH_PRELOAD_DELAY_MS")?,
            synthesis_timeout_ms: env!("SPEECH_SYNTHESIS_TIMEOUT_MS").parse()
                .map_err(|_| "Failed to parse SPEECH_SYNTHESIS_TIMEOUT_MS")?,

            playback_device: env!("PLAYBACK_DEVICE"),
            playback_period_size: env!("PLAYBACK_PERIOD_SIZE").parse()
                .map_err(|_| "Failed to parse PLAYBACK_PERIOD_SIZE")?,
            playback_start_suspended: env!("PLAYBACK_START_SUSPENDED").parse()
                .map_err(|_| "Failed to parse PLAYBACK_START_SUSPENDED")?,
        })
    }

    /// 编译期配置 + 运行时 API Key
    pub fn load() -> Result<Self, &'static str> {
        let mut config = Self::new()?;
        config.api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_default();
        Ok(config)
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn voice(&self) -> VoiceConfig {
        VoiceConfig {
            voice_name: self.voice_name.to_string(),
        }
    }

    pub fn speech(&self) -> SpeechConfig {
        SpeechConfig {
            sample_rate: self.speech_sample_rate,
            channels: self.speech_channels,
            preload_delay: Duration::from_millis(self.preload_delay_ms),
            synthesis_timeout: Duration::from_millis(self.synthesis_timeout_ms),
            voice: self.voice(),
        }
    }

    /// Period size in frames, `None` lets ALSA decide.
    pub fn period_size(&self) -> Option<usize> {
        if self.playback_period_size > 0 {
            Some(self.playback_period_size)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_time_values_parse() {
        let config = Config::new().unwrap();
        assert_eq!(config.speech_sample_rate, 24000);
        assert_eq!(config.speech_channels, 1);
        assert_eq!(config.voice_name, "Kore");
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn speech_config_follows_build_time_values() {
        let config = Config::new().unwrap();
        let speech = config.speech();
        assert_eq!(speech.sample_rate, config.speech_sample_rate);
        assert_eq!(speech.preload_delay, Duration::from_millis(config.preload_delay_ms));
        assert_eq!(speech.voice.voice_name, config.voice_name);
    }
}
