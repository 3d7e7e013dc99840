use crate::error::AudioError;

/// Floating-point sample buffer, one `Vec` per channel.
///
/// Produced by the raw decoder (mono) and by offline renders. Never mutated
/// after creation; share it with `Arc<AudioBuffer>`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Single-channel buffer.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    /// Multi-channel buffer. All channels must have the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, AudioError> {
        let frames = match channels.first() {
            Some(first) => first.len(),
            None => {
                return Err(AudioError::MalformedAudioData(
                    "audio buffer needs at least one channel".to_string(),
                ))
            }
        };
        if channels.iter().any(|c| c.len() != frames) {
            return Err(AudioError::MalformedAudioData(
                "audio buffer channels differ in length".to_string(),
            ));
        }
        if channels.len() > u16::MAX as usize {
            return Err(AudioError::MalformedAudioData(format!(
                "too many channels: {}",
                channels.len()
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel).
    pub fn len(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds: `frames / sample_rate`.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Down-mixed value of one frame (mean across channels).
    pub(crate) fn frame_mono(&self, frame: usize) -> f32 {
        let count = self.channels.len();
        if count == 1 {
            return self.channels[0].get(frame).copied().unwrap_or(0.0);
        }
        let sum: f32 = self
            .channels
            .iter()
            .map(|c| c.get(frame).copied().unwrap_or(0.0))
            .sum();
        sum / count as f32
    }
}
