//! Base64 transcoding and 16-bit PCM conversion.
//!
//! - Inbound: base64 text → raw bytes → s16le PCM → normalized f32 `AudioBuffer`
//! - Outbound: f32 capture samples → s16le PCM (16 kHz mono) → base64 text

use base64::{Engine as _, engine::general_purpose};
use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::buffer::AudioBuffer;
use crate::error::CodecError;

/// Sample rate of outbound capture audio.
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Mime descriptor attached to outbound capture audio.
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Decode a standard (padded) base64 string into raw bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    general_purpose::STANDARD
        .decode(text)
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))
}

/// Encode raw bytes as standard (padded) base64.
pub fn encode(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Interpret `data` as interleaved s16le PCM and normalize it to [-1, 1).
pub fn pcm16_to_samples(
    data: &[u8],
    sample_rate: u32,
    channels: u16,
) -> Result<AudioBuffer, CodecError> {
    if channels == 0 {
        return Err(CodecError::ZeroChannels);
    }
    let frame = 2 * channels as usize;
    if data.len() % frame != 0 {
        return Err(CodecError::MisalignedPcm {
            len: data.len(),
            frame,
        });
    }

    let mut buf = data;
    let mut samples = Vec::with_capacity(data.len() / 2);
    while buf.has_remaining() {
        samples.push(f32::from(buf.get_i16_le()) / 32768.0);
    }
    Ok(AudioBuffer::new(sample_rate, channels, samples))
}

/// Outbound capture payload: s16le mono PCM plus its mime descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBlob {
    pub data: Bytes,
    pub mime_type: &'static str,
}

impl PcmBlob {
    /// Base64 text form, as the live streaming collaborator expects it.
    pub fn to_base64(&self) -> String {
        encode(&self.data)
    }
}

/// Convert capture samples to s16le PCM.
///
/// Samples are clamped to [-1, 1]. Negative values scale by 32768 and
/// non-negative ones by 32767, truncating toward zero.
pub fn samples_to_pcm16(samples: &[f32]) -> PcmBlob {
    let mut out = BytesMut::with_capacity(samples.len() * 2);
    for &sample in samples {
        let s = sample.clamp(-1.0, 1.0);
        let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
        // NaN 转换为 0
        out.put_i16_le(scaled as i16);
    }
    PcmBlob {
        data: out.freeze(),
        mime_type: CAPTURE_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_known_vector() {
        assert_eq!(encode(b"Aferin!"), "QWZlcmluIQ==");
        assert_eq!(decode("QWZlcmluIQ==").unwrap(), b"Aferin!");
    }

    #[test]
    fn malformed_base64_is_an_error() {
        assert!(matches!(decode("QWZl*mluIQ=="), Err(CodecError::InvalidBase64(_))));
        // 截断的输入不能被静默接受
        assert!(decode("QWZlcmluIQ=").is_err());
    }

    #[test]
    fn pcm16_little_endian_mono() {
        // 0x4000 = 16384, 0x8000 = -32768, 0x7fff = 32767
        let data = [0x00, 0x40, 0x00, 0x80, 0xff, 0x7f];
        let buffer = pcm16_to_samples(&data, 24000, 1).unwrap();
        assert_eq!(buffer.samples(), &[0.5, -1.0, 32767.0 / 32768.0]);
        assert_eq!(buffer.sample_rate(), 24000);
    }

    #[test]
    fn pcm16_interleaved_stereo() {
        let data = [0x00, 0x40, 0x00, 0xc0, 0x00, 0x20, 0x00, 0xe0];
        let buffer = pcm16_to_samples(&data, 16000, 2).unwrap();
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0).collect::<Vec<_>>(), vec![0.5, 0.25]);
        assert_eq!(buffer.channel(1).collect::<Vec<_>>(), vec![-0.5, -0.25]);
    }

    #[test]
    fn pcm16_rejects_partial_frames() {
        assert_eq!(
            pcm16_to_samples(&[0, 0, 0], 24000, 1),
            Err(CodecError::MisalignedPcm { len: 3, frame: 2 })
        );
        assert_eq!(
            pcm16_to_samples(&[0, 0, 0, 0, 0, 0], 24000, 2),
            Err(CodecError::MisalignedPcm { len: 6, frame: 4 })
        );
        assert_eq!(pcm16_to_samples(&[], 24000, 0), Err(CodecError::ZeroChannels));
    }

    #[test]
    fn capture_scaling_is_asymmetric() {
        let blob = samples_to_pcm16(&[-1.0, 1.0, 0.0, 0.5, -0.5]);
        assert_eq!(blob.mime_type, "audio/pcm;rate=16000");
        let values: Vec<i16> = blob
            .data
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        // 0.5 * 32767 = 16383.5，向零截断
        assert_eq!(values, vec![-32768, 32767, 0, 16383, -16384]);
    }

    #[test]
    fn capture_clamps_out_of_range_and_nan() {
        let blob = samples_to_pcm16(&[-3.0, 2.5, f32::NAN]);
        assert_eq!(&blob.data[..], &[0x00, 0x80, 0xff, 0x7f, 0x00, 0x00]);
    }

    #[test]
    fn capture_blob_base64() {
        let blob = samples_to_pcm16(&[0.0, -1.0]);
        assert_eq!(blob.to_base64(), encode(&[0x00, 0x00, 0x00, 0x80]));
    }
}
