//! Offline mixdown of a spoken lesson over a fresh ambient bed, encoded as
//! a downloadable WAV.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::ambient::build_ambient_graph;
use crate::context::{AudioContext, OfflineContext};
use crate::decode::decode_raw_to_buffer;
use crate::error::AudioError;
use crate::wav::{encode_buffer_to_wav, encode_raw_to_wav};
use crate::PIPELINE_SAMPLE_RATE;

pub const DEFAULT_TAIL_SECS: f64 = 2.0;
pub const DEFAULT_EXPORT_VOLUME: f32 = 0.25;
pub const SPEECH_ONLY_FILE_NAME: &str = "Lesson_Speech_Only.wav";

/// Result of an export that always yields a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Mixed(Vec<u8>),
    /// The mix failed; the WAV holds the speech alone.
    SpeechOnly { wav: Vec<u8>, reason: String },
}

impl ExportOutcome {
    pub fn wav(&self) -> &[u8] {
        match self {
            ExportOutcome::Mixed(wav) => wav,
            ExportOutcome::SpeechOnly { wav, .. } => wav,
        }
    }

    pub fn into_wav(self) -> Vec<u8> {
        match self {
            ExportOutcome::Mixed(wav) => wav,
            ExportOutcome::SpeechOnly { wav, .. } => wav,
        }
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, ExportOutcome::Mixed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixdownPipeline {
    pub sample_rate: u32,
    /// Seconds rendered past the end of the speech so chimes can ring out.
    pub tail_secs: f64,
    pub ambient_volume: f32,
}

impl Default for MixdownPipeline {
    fn default() -> Self {
        Self {
            sample_rate: PIPELINE_SAMPLE_RATE,
            tail_secs: DEFAULT_TAIL_SECS,
            ambient_volume: DEFAULT_EXPORT_VOLUME,
        }
    }
}

impl MixdownPipeline {
    /// Speech at time zero plus an ambient graph, rendered for the speech
    /// duration plus the tail. Exactly `round((D + tail) * rate)` frames.
    pub async fn render_mix(
        &self,
        raw_speech: &[u8],
        rng: StdRng,
    ) -> Result<crate::AudioBuffer, AudioError> {
        let speech = decode_raw_to_buffer(raw_speech, self.sample_rate)?;
        let total = speech.duration() + self.tail_secs;
        let ctx = OfflineContext::with_duration(total, self.sample_rate)?;

        {
            let mut graph = ctx.lock_graph()?;
            let voice = graph.create_buffer_source(Arc::new(speech))?;
            graph.connect(voice, ctx.destination())?;
            graph.start(voice, 0.0)?;
        }
        build_ambient_graph(&ctx, ctx.destination(), self.ambient_volume, rng)?;

        ctx.start_rendering().await
    }

    /// Render and encode the mix.
    pub async fn export_mix(&self, raw_speech: &[u8], rng: StdRng) -> Result<Vec<u8>, AudioError> {
        let started = Instant::now();
        let mix = self.render_mix(raw_speech, rng).await?;
        let wav = encode_buffer_to_wav(&mix)?;
        info!(
            "Mixed {:.2}s of audio into {} bytes in {:?}",
            mix.duration(),
            wav.len(),
            started.elapsed()
        );
        Ok(wav)
    }

    /// Like [`export_mix`](Self::export_mix), but a failed mix degrades to
    /// the speech wrapped in a WAV header instead of producing nothing.
    pub async fn export_with_fallback(&self, raw_speech: &[u8], rng: StdRng) -> ExportOutcome {
        match self.export_mix(raw_speech, rng).await {
            Ok(wav) => ExportOutcome::Mixed(wav),
            Err(e) => {
                warn!("Mix failed, exporting speech only: {e}");
                ExportOutcome::SpeechOnly {
                    wav: encode_raw_to_wav(raw_speech, self.sample_rate),
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// `Virtual_Temple_<path>_<language>.wav`, spaces turned into underscores
/// and anything else outside `[A-Za-z0-9_-]` dropped.
pub fn download_file_name(path: &str, language: &str) -> String {
    fn clean(part: &str) -> String {
        part.trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect()
    }
    format!("Virtual_Temple_{}_{}.wav", clean(path), clean(language))
}
