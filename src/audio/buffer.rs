//! Decoded, immutable audio ready for playback.

use std::sync::Arc;
use std::time::Duration;

/// Interleaved floating-point samples in [-1, 1] tagged with their format.
///
/// Cloning is cheap: clones share the sample storage, so a buffer handed out
/// from the speech cache is the same storage every time.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: u16,
    samples: Arc<[f32]>,
}

impl AudioBuffer {
    /// `samples` must hold whole frames (`len % channels == 0`).
    pub(crate) fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        debug_assert!(channels > 0 && samples.len() % channels as usize == 0);
        Self {
            sample_rate,
            channels,
            samples: samples.into(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// All samples, interleaved by channel.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Samples of one channel, de-interleaved.
    pub fn channel(&self, channel: u16) -> impl Iterator<Item = f32> + '_ {
        self.samples
            .iter()
            .skip(channel as usize)
            .step_by(self.channels as usize)
            .copied()
    }

    /// True when both buffers share the same sample storage.
    pub fn same_storage(&self, other: &AudioBuffer) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}
