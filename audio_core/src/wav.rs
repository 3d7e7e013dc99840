//! RIFF/WAVE container codec for 16-bit linear PCM.
//!
//! Two directions are supported: wrapping headerless PCM bytes as-is (the
//! playback fast path) and quantizing a floating-point [`AudioBuffer`]
//! (the export path).

use crate::buffer::AudioBuffer;
use crate::error::AudioError;

/// Size of the canonical PCM header written by this module.
pub const WAV_HEADER_LEN: usize = 44;

const PCM_FORMAT: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const FMT_CHUNK_LEN: u32 = 16;

/// Fields of the 44-byte canonical header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub data_len: u32,
}

impl WavHeader {
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * (BITS_PER_SAMPLE as u32 / 8)
    }

    pub fn block_align(&self) -> u16 {
        self.channels * (BITS_PER_SAMPLE / 8)
    }

    /// RIFF chunk size: everything after the first 8 bytes.
    pub fn chunk_size(&self) -> u32 {
        self.data_len.saturating_add(36)
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        // RIFF header
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&self.chunk_size().to_le_bytes());
        out.extend_from_slice(b"WAVE");

        // fmt chunk
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
        out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&self.byte_rate().to_le_bytes());
        out.extend_from_slice(&self.block_align().to_le_bytes());
        out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

        // data chunk
        out.extend_from_slice(b"data");
        out.extend_from_slice(&self.data_len.to_le_bytes());
    }

    /// Parse a canonical 44-byte PCM header.
    pub fn parse(bytes: &[u8]) -> Result<Self, AudioError> {
        if bytes.len() < WAV_HEADER_LEN {
            return Err(AudioError::MalformedAudioData(format!(
                "WAV header needs {WAV_HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(AudioError::MalformedAudioData("not a RIFF/WAVE stream".to_string()));
        }
        if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
            return Err(AudioError::MalformedAudioData(
                "unsupported WAV chunk layout".to_string(),
            ));
        }
        let format = read_u16(bytes, 20);
        let bits = read_u16(bytes, 34);
        if format != PCM_FORMAT || bits != BITS_PER_SAMPLE {
            return Err(AudioError::MalformedAudioData(format!(
                "expected 16-bit PCM, got format {format} with {bits} bits"
            )));
        }
        Ok(Self {
            channels: read_u16(bytes, 22),
            sample_rate: read_u32(bytes, 24),
            data_len: read_u32(bytes, 40),
        })
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Wrap headerless mono 16-bit PCM bytes in a WAV container.
///
/// The bytes are copied verbatim. An odd length is not rejected: the
/// trailing byte ends up as half a sample, which players drop.
pub fn encode_raw_to_wav(raw: &[u8], sample_rate: u32) -> Vec<u8> {
    let header = WavHeader {
        channels: 1,
        sample_rate,
        data_len: u32::try_from(raw.len()).unwrap_or(u32::MAX - 36),
    };
    let mut out = Vec::with_capacity(WAV_HEADER_LEN + raw.len());
    header.write_to(&mut out);
    out.extend_from_slice(raw);
    out
}

/// Quantize a float sample to i16.
///
/// Negative values scale by 32768 and non-negative ones by 32767 so both
/// ends of [-1, 1] land exactly on the i16 limits. Truncates toward zero.
pub fn sample_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

/// Encode a float buffer as 16-bit PCM WAV, interleaving channels frame by frame.
pub fn encode_buffer_to_wav(buffer: &AudioBuffer) -> Result<Vec<u8>, AudioError> {
    let channels = buffer.number_of_channels();
    let frames = buffer.len();

    let data_len = (frames as u64) * (channels as u64) * 2;
    let data_len = u32::try_from(data_len)
        .ok()
        .filter(|len| *len <= u32::MAX - 36)
        .ok_or_else(|| {
            AudioError::EncodingFailure(format!(
                "{frames} frames x {channels} channels exceed the WAV size limit"
            ))
        })?;
    let channel_count = u16::try_from(channels)
        .map_err(|_| AudioError::EncodingFailure(format!("too many channels: {channels}")))?;

    let header = WavHeader {
        channels: channel_count,
        sample_rate: buffer.sample_rate(),
        data_len,
    };

    let mut out = Vec::<u8>::with_capacity(WAV_HEADER_LEN + data_len as usize);
    header.write_to(&mut out);

    let data: Vec<&[f32]> = (0..channels).filter_map(|c| buffer.channel(c)).collect();
    for frame in 0..frames {
        for channel in &data {
            out.extend_from_slice(&sample_to_i16(channel[frame]).to_le_bytes());
        }
    }

    Ok(out)
}
