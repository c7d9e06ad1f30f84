//! ALSA PCM device wrapper for speech playback.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};

/// 缓冲区上限（周期数），停止请求最多滞后这么多个周期
const BUFFER_PERIODS: usize = 4;

/// 未指定周期大小时的缓冲区时长上限（微秒）
const MAX_BUFFER_TIME_US: u32 = 100_000;

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone)]
pub struct AlsaParams {
    /// Actual sample rate after negotiation
    pub sample_rate: u32,
    /// Actual number of channels
    pub channels: u32,
    /// Period size in frames (one frame = channels × sample_width)
    pub period_size: usize,
    /// Ring buffer size in frames
    pub buffer_size: usize,
}

/// Open a PCM device for playback.
pub fn open_playback(
    device: &str,
    sample_rate: u32,
    channels: u32,
    period_size: Option<usize>,
) -> Result<(PCM, AlsaParams)> {
    let pcm = PCM::new(device, Direction::Playback, false)
        .with_context(|| format!("Failed to open PCM device '{}' for playback", device))?;

    // Configure hardware parameters
    {
        let hwp = HwParams::any(&pcm).with_context(|| "Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::S16LE)?;
        hwp.set_channels(channels)?;
        hwp.set_rate_near(sample_rate, ValueOr::Nearest)?;
        // 限制环形缓冲区大小，避免整段语音一次写入后无法打断
        match period_size {
            Some(ps) => {
                hwp.set_period_size_near(ps as alsa::pcm::Frames, ValueOr::Nearest)?;
                hwp.set_buffer_size_near((ps * BUFFER_PERIODS) as alsa::pcm::Frames)?;
            }
            None => {
                hwp.set_buffer_time_near(MAX_BUFFER_TIME_US, ValueOr::Nearest)?;
            }
        }
        pcm.hw_params(&hwp)?;
    }

    // Read back actual negotiated parameters
    let params = {
        let hwp = pcm.hw_params_current()?;
        AlsaParams {
            sample_rate: hwp.get_rate()?,
            channels: hwp.get_channels()?,
            period_size: hwp.get_period_size()? as usize,
            buffer_size: hwp.get_buffer_size()? as usize,
        }
    };

    log::info!(
        "ALSA Playback: device={}, rate={}, channels={}, period_size={}, buffer_size={}",
        device,
        params.sample_rate,
        params.channels,
        params.period_size,
        params.buffer_size,
    );

    Ok((pcm, params))
}
