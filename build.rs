use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    gemini: Gemini,
    speech: Speech,
    playback: Playback,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Gemini {
    base_url: String,
    tts_model: String,
    voice_name: String,
    stt_model: String,
    image_model: String,
}

#[derive(Deserialize)]
struct Speech {
    sample_rate: u32,
    channels: u16,
    preload_delay_ms: u64,
    synthesis_timeout_ms: u64,
}

#[derive(Deserialize)]
struct Playback {
    device: String,
    period_size: usize,
    start_suspended: bool,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    // 应用信息
    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // Gemini 服务配置（API Key 不在编译期写入，运行时从环境变量读取）
    println!("cargo:rustc-env=GEMINI_BASE_URL={}", config.gemini.base_url);
    println!("cargo:rustc-env=GEMINI_TTS_MODEL={}", config.gemini.tts_model);
    println!("cargo:rustc-env=GEMINI_VOICE_NAME={}", config.gemini.voice_name);
    println!("cargo:rustc-env=GEMINI_STT_MODEL={}", config.gemini.stt_model);
    println!("cargo:rustc-env=GEMINI_IMAGE_MODEL={}", config.gemini.image_model);

    // 语音缓存与调度
    println!("cargo:rustc-env=SPEECH_SAMPLE_RATE={}", config.speech.sample_rate);
    println!("cargo:rustc-env=SPEECH_CHANNELS={}", config.speech.channels);
    println!("cargo:rustc-env=SPEECH_PRELOAD_DELAY_MS={}", config.speech.preload_delay_ms);
    println!("cargo:rustc-env=SPEECH_SYNTHESIS_TIMEOUT_MS={}", config.speech.synthesis_timeout_ms);

    // 播放设备
    println!("cargo:rustc-env=PLAYBACK_DEVICE={}", config.playback.device);
    println!("cargo:rustc-env=PLAYBACK_PERIOD_SIZE={}", config.playback.period_size);
    println!("cargo:rustc-env=PLAYBACK_START_SUSPENDED={}", config.playback.start_suspended);
}
