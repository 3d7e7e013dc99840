use base64::{engine::general_purpose, Engine as _};

use crate::buffer::AudioBuffer;
use crate::error::AudioError;

/// Decode headerless signed 16-bit little-endian mono PCM into floats.
///
/// Every sample is divided by 32768, so the range is [-1.0, 1.0): +32767
/// maps to just under 1.0.
pub fn decode_raw_to_buffer(raw: &[u8], sample_rate: u32) -> Result<AudioBuffer, AudioError> {
    if raw.len() % 2 != 0 {
        return Err(AudioError::MalformedAudioData(format!(
            "16-bit PCM stream has odd length ({} bytes)",
            raw.len()
        )));
    }
    if sample_rate == 0 {
        return Err(AudioError::MalformedAudioData(
            "sample rate must be non-zero".to_string(),
        ));
    }

    let samples = raw
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(AudioBuffer::mono(samples, sample_rate))
}

/// Decode a base64 speech payload into raw PCM bytes.
///
/// Accepts a bare payload or a `data:` URL.
pub fn decode_base64_pcm(payload: &str) -> Result<Vec<u8>, AudioError> {
    let trimmed = payload.trim();
    let encoded = match trimmed.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => trimmed,
    };
    general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| AudioError::MalformedAudioData(format!("invalid base64 audio payload: {e}")))
}
