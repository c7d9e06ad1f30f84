use bilsem_voice::audio::{decode, encode, pcm16_to_samples, samples_to_pcm16};

fn pseudo_random_bytes(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

#[test]
fn base64_round_trip_preserves_bytes() {
    let all_bytes: Vec<u8> = (0..=255).collect();
    let cases = [
        Vec::new(),
        vec![0],
        vec![0xff, 0xfe],
        all_bytes,
        pseudo_random_bytes(4801, 7),
    ];
    for bytes in cases {
        assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
    }
}

#[test]
fn canonical_base64_survives_decode_then_encode() {
    for text in ["", "AA==", "AAE=", "QWZlcmluIQ==", "////"] {
        assert_eq!(encode(&decode(text).unwrap()), text);
    }
}

#[test]
fn capture_then_playback_stays_within_one_step() {
    let samples: Vec<f32> = (-32768..=32767)
        .step_by(97)
        .map(|v: i32| {
            if v < 0 {
                v as f32 / 32768.0
            } else {
                v as f32 / 32767.0
            }
        })
        .chain([-1.0, 0.0, 1.0])
        .collect();

    let blob = samples_to_pcm16(&samples);
    let buffer = pcm16_to_samples(&blob.data, 16000, 1).unwrap();

    assert_eq!(buffer.samples().len(), samples.len());
    for (original, restored) in samples.iter().zip(buffer.samples()) {
        assert!(
            (original - restored).abs() <= 2.0 / 32768.0,
            "{} came back as {}",
            original,
            restored
        );
    }
}

#[test]
fn capture_blob_decodes_as_playback_pcm() {
    let blob = samples_to_pcm16(&[0.25, -0.25, 0.0, -1.0]);
    let text = blob.to_base64();
    let buffer = pcm16_to_samples(&decode(&text).unwrap(), 16000, 1).unwrap();
    assert_eq!(buffer.frames(), 4);
    assert_eq!(buffer.samples()[3], -1.0);
}
