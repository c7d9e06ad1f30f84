//! ALSA-backed `AudioOutput`.
//!
//! Uses std::thread (NOT tokio tasks) for real-time audio I/O to avoid
//! contention with async network tasks. Each utterance gets its own
//! playback thread, which opens the device, writes the buffer period by
//! period and checks the stop flag between periods and while the ring
//! buffer drains. Threads take the device in turn: a new utterance opens
//! the PCM only after the previous thread has closed it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use alsa::pcm::State;
use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::alsa_device;
use super::buffer::AudioBuffer;
use super::output::{AudioOutput, OutputState};
use crate::error::SpeechError;

/// 连续写入失败的最大重试次数
const MAX_RECOVERY_RETRIES: u32 = 3;

/// 排空缓冲区时检查停止标志的间隔
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// ALSA playback configuration.
#[derive(Debug, Clone)]
pub struct AlsaConfig {
    /// ALSA playback device name (e.g. "default", "plughw:0,0")
    pub device: String,
    /// Desired period size in frames (`None` = let ALSA decide)
    pub period_size: Option<usize>,
}

pub struct AlsaOutput {
    config: AlsaConfig,
    suspended: AtomicBool,
    /// Held by the playback thread while its PCM is open.
    device: Arc<Mutex<()>>,
}

impl AlsaOutput {
    pub fn new(config: AlsaConfig, start_suspended: bool) -> Self {
        log::info!(
            "AlsaOutput ready: device=\"{}\", period={:?}, suspended={}",
            config.device,
            config.period_size,
            start_suspended,
        );
        Self {
            config,
            suspended: AtomicBool::new(start_suspended),
            device: Arc::new(Mutex::new(())),
        }
    }
}

impl AudioOutput for AlsaOutput {
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
        let (done_tx, done_rx) = oneshot::channel();
        let config = self.config.clone();
        let device = self.device.clone();
        thread::Builder::new()
            .name("audio-play".into())
            .spawn(move || {
                // 等待上一个线程关闭设备；它已被要求停止，最多滞后一个轮询间隔
                let _device = device.lock();
                if stop.load(Ordering::SeqCst) {
                    log::debug!("Playback cancelled before the device was free");
                } else if let Err(e) = play_thread(&config, &buffer, &stop) {
                    log::error!("Playback thread error: {}", e);
                }
                let _ = done_tx.send(());
            })
            .map_err(|e| SpeechError::Output(format!("Failed to spawn playback thread: {}", e)))?;
        Ok(done_rx)
    }
}

fn play_thread(config: &AlsaConfig, buffer: &AudioBuffer, stop: &AtomicBool) -> Result<()> {
    // 1. Open ALSA playback device at the buffer's native format
    let (pcm, params) = alsa_device::open_playback(
        &config.device,
        buffer.sample_rate(),
        u32::from(buffer.channels()),
        config.period_size,
    )?;

    // 2. Convert to whatever the hardware negotiated
    let pcm_data = render_i16(buffer, params.sample_rate, params.channels);
    let channels = params.channels.max(1) as usize;
    let period = params.period_size.max(1);
    let io = pcm.io_i16()?;

    // Write period by period so a stop request takes effect within one period,
    // retrying short writes and recovering from XRUN without losing frames.
    let total_frames = pcm_data.len() / channels;
    let mut frames_written = 0;
    let mut retry_count = 0u32;

    while frames_written < total_frames {
        if stop.load(Ordering::Relaxed) {
            pcm.drop()?;
            log::debug!(
                "Playback stopped after {}/{} frames",
                frames_written,
                total_frames
            );
            return Ok(());
        }
        let end = (frames_written + period).min(total_frames);
        match io.writei(&pcm_data[frames_written * channels..end * channels]) {
            Ok(n) => {
                frames_written += n;
                retry_count = 0; // 成功写入，重置重试计数
            }
            Err(e) => {
                log::warn!("ALSA XRUN or error: {}, recovering...", e);
                retry_count += 1;

                // 触发 ALSA 硬件恢复状态机
                if let Err(e2) = pcm.prepare() {
                    log::error!("Failed to recover PCM playback: {}", e2);
                    break;
                }

                // 熔断器：底层持续跟不上写入速度时，丢弃剩余帧防止死循环
                if retry_count >= MAX_RECOVERY_RETRIES {
                    log::error!(
                        "Max recovery retries ({}) reached. Dropping {} unwritten frames.",
                        retry_count,
                        total_frames - frames_written
                    );
                    break;
                }
            }
        }
    }

    // 等待硬件缓冲区中剩余的音频播放完毕，期间仍响应停止请求
    loop {
        let running = pcm.state() == State::Running;
        let pending = if running { pcm.delay().unwrap_or(0) } else { 0 };
        match drain_step(stop.load(Ordering::Relaxed), running, pending) {
            DrainStep::Stop => {
                pcm.drop()?;
                log::debug!("Playback stopped while draining");
                return Ok(());
            }
            DrainStep::Wait => thread::sleep(DRAIN_POLL_INTERVAL),
            DrainStep::Finish => break,
        }
    }
    // 剩余不足一个轮询间隔（或尚未启动、不超过一个缓冲区）的数据
    pcm.drain()?;
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum DrainStep {
    /// Drop whatever is still buffered.
    Stop,
    /// Sleep one poll interval and look again.
    Wait,
    /// Let ALSA play out the short remainder.
    Finish,
}

fn drain_step(stopped: bool, running: bool, pending_frames: alsa::pcm::Frames) -> DrainStep {
    if stopped {
        DrainStep::Stop
    } else if running && pending_frames > 0 {
        DrainStep::Wait
    } else {
        DrainStep::Finish
    }
}

/// Render `buffer` as interleaved i16 at `out_rate` / `out_channels`.
///
/// Rate conversion is linear interpolation; channel conversion averages down
/// to mono or wraps source channels when upmixing.
fn render_i16(buffer: &AudioBuffer, out_rate: u32, out_channels: u32) -> Vec<i16> {
    let samples = buffer.samples();
    let in_channels = buffer.channels() as usize;
    let out_channels = out_channels.max(1) as usize;
    let in_frames = buffer.frames();
    let out_frames = if out_rate == buffer.sample_rate() || buffer.sample_rate() == 0 {
        in_frames
    } else {
        (in_frames as u64 * u64::from(out_rate) / u64::from(buffer.sample_rate())) as usize
    };
    if in_frames == 0 || out_frames == 0 {
        return Vec::new();
    }
    let step = in_frames as f64 / out_frames as f64;

    let at = |frame: usize, channel: usize| samples[frame * in_channels + channel];
    let mut out = Vec::with_capacity(out_frames * out_channels);
    for i in 0..out_frames {
        let pos = i as f64 * step;
        let i0 = (pos.floor() as usize).min(in_frames - 1);
        let i1 = (i0 + 1).min(in_frames - 1);
        let frac = (pos - i0 as f64) as f32;
        let lerp = |channel: usize| at(i0, channel) + (at(i1, channel) - at(i0, channel)) * frac;

        for c in 0..out_channels {
            let value = if out_channels == 1 && in_channels > 1 {
                // Multi-channel → mono: average all channels
                (0..in_channels).map(lerp).sum::<f32>() / in_channels as f32
            } else {
                lerp(c % in_channels)
            };
            out.push((value * 32768.0).clamp(-32768.0, 32767.0) as i16);
        }
    }
    out
}
