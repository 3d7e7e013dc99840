//! Common utilities for integration tests

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use lesson_core::{Gender, GenerationError, Language, LessonGenerator, SpiritualPath, Tone};
use server::{build_router, config::ServerConfig, AppState};

/// A 440 Hz tone at 24 kHz, as raw little-endian PCM.
pub fn tone_pcm(seconds: f64) -> Vec<u8> {
    let frames = (seconds * 24_000.0) as usize;
    (0..frames)
        .flat_map(|i| {
            let t = i as f64 / 24_000.0;
            let v = ((t * 440.0 * std::f64::consts::TAU).sin() * 8_000.0) as i16;
            v.to_le_bytes()
        })
        .collect()
}

/// Generator answering every call from canned data, or failing every call.
pub struct StubGenerator {
    pub fail: bool,
}

#[async_trait]
impl LessonGenerator for StubGenerator {
    async fn generate_lesson(
        &self,
        path: SpiritualPath,
        _language: Language,
    ) -> Result<String, GenerationError> {
        if self.fail {
            return Err(GenerationError::GenerationFailure("quota exceeded".into()));
        }
        Ok(format!("Breathe in the stillness of {path}."))
    }

    async fn generate_background(
        &self,
        _path: SpiritualPath,
    ) -> Result<Option<String>, GenerationError> {
        Ok(Some("https://example.test/bg.png".into()))
    }

    async fn generate_portrait(
        &self,
        _path: SpiritualPath,
        _gender: Gender,
    ) -> Result<Option<String>, GenerationError> {
        Ok(None)
    }

    async fn generate_speech(
        &self,
        _text: &str,
        _gender: Gender,
        _tone: Tone,
    ) -> Result<Option<Vec<u8>>, GenerationError> {
        Ok(Some(tone_pcm(0.5)))
    }
}

pub fn test_state(fail: bool) -> AppState {
    AppState::new(Arc::new(StubGenerator { fail }), ServerConfig::default())
}

/// Create a test app instance
pub fn create_test_app() -> Router {
    build_router(test_state(false)).expect("router should build")
}

pub fn create_failing_app() -> Router {
    build_router(test_state(true)).expect("router should build")
}
