//! speech - Text-to-speech cache and dispatch
//!
//! Maps utterance text to synthesized audio, keeps at most one synthesis in
//! flight per text, warms a phrase set in the background and makes sure only
//! the most recently requested utterance is ever heard.

mod dispatcher;
mod synth;

pub use dispatcher::SpeechDispatcher;
pub use synth::{SpeechConfig, SpeechSynthesizer, VoiceConfig};
