//! bilsem_voice - speech for the BİLSEM Kids games
//!
//! A text-to-speech cache and dispatcher on top of a small PCM transport
//! layer. Game code calls [`SpeechDispatcher::speak`],
//! [`SpeechDispatcher::preload`] and [`SpeechDispatcher::resume_output`];
//! everything else (dedup, background warming, stale-result suppression,
//! exclusive playback) happens behind those three calls.

pub mod audio;
pub mod config;
pub mod error;
pub mod gemini;
pub mod phrases;
pub mod speech;

pub use audio::{AudioBuffer, AudioOutput, NullOutput, OutputState, PlaybackChannel};
pub use config::Config;
pub use error::{CodecError, SpeechError};
pub use gemini::GeminiClient;
pub use speech::{SpeechConfig, SpeechDispatcher, SpeechSynthesizer, VoiceConfig};
