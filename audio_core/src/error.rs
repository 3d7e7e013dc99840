use thiserror::Error;

/// Errors raised by the audio pipeline.
///
/// Decoding and encoding failures are local: callers are expected to catch
/// them and degrade (the export path falls back to speech only).
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Malformed audio data: {0}")]
    MalformedAudioData(String),

    #[error("Synthesis failure: {0}")]
    SynthesisFailure(String),

    #[error("Encoding failure: {0}")]
    EncodingFailure(String),
}

impl AudioError {
    pub(crate) fn synthesis(msg: impl Into<String>) -> Self {
        AudioError::SynthesisFailure(msg.into())
    }
}
