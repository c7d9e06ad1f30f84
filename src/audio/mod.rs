//! audio - Speech transport: transcoding and exclusive playback
//!
//! Base64 and 16-bit PCM conversion for the synthesis service's payloads,
//! the decoded `AudioBuffer`, the `AudioOutput` device seam and the
//! `PlaybackChannel` that keeps at most one utterance audible.

mod buffer;
mod channel;
pub mod codec;
mod output;

#[cfg(feature = "alsa-output")]
mod alsa_device;
#[cfg(feature = "alsa-output")]
mod play;

pub use buffer::AudioBuffer;
pub use channel::PlaybackChannel;
pub use codec::{PcmBlob, decode, encode, pcm16_to_samples, samples_to_pcm16};
pub use output::{AudioOutput, NullOutput, OutputState};

#[cfg(feature = "alsa-output")]
pub use play::{AlsaConfig, AlsaOutput};
