use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::GenerationError;
use crate::types::{Gender, Language, LessonRequest, LessonSession, SpiritualPath, Tone};

/// The remote generation service, reduced to the four calls a visit needs.
#[async_trait]
pub trait LessonGenerator: Send + Sync {
    /// Lesson script. Implementations substitute
    /// [`FALLBACK_LESSON`](crate::FALLBACK_LESSON) for an empty answer.
    async fn generate_lesson(
        &self,
        path: SpiritualPath,
        language: Language,
    ) -> Result<String, GenerationError>;

    async fn generate_background(
        &self,
        path: SpiritualPath,
    ) -> Result<Option<String>, GenerationError>;

    async fn generate_portrait(
        &self,
        path: SpiritualPath,
        gender: Gender,
    ) -> Result<Option<String>, GenerationError>;

    /// Raw 16-bit mono PCM at 24 kHz.
    async fn generate_speech(
        &self,
        text: &str,
        gender: Gender,
        tone: Tone,
    ) -> Result<Option<Vec<u8>>, GenerationError>;
}

async fn bounded<T>(
    limit: Duration,
    what: &'static str,
    call: impl Future<Output = Result<T, GenerationError>>,
) -> Result<T, GenerationError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GenerationError::Timeout(limit.as_secs(), what)),
    }
}

/// Generate everything for one visit: the lesson first, then background,
/// portrait and speech concurrently. Each call is bounded by `limit`. Any
/// failure fails the whole visit; partial results are discarded.
pub async fn fetch_session(
    generator: &dyn LessonGenerator,
    request: &LessonRequest,
    limit: Duration,
) -> Result<LessonSession, GenerationError> {
    let started = Instant::now();

    let lesson_text = bounded(
        limit,
        "lesson",
        generator.generate_lesson(request.path, request.language),
    )
    .await
    .inspect_err(|e| warn!("Lesson generation failed: {e}"))?;

    let (background_url, guru_url, speech) = tokio::try_join!(
        bounded(limit, "background", generator.generate_background(request.path)),
        bounded(
            limit,
            "portrait",
            generator.generate_portrait(request.path, request.gender)
        ),
        bounded(
            limit,
            "speech",
            generator.generate_speech(&lesson_text, request.gender, request.tone)
        ),
    )
    .inspect_err(|e| warn!("Visual/voice generation failed: {e}"))?;

    info!(
        "Session for {} ({}) generated in {:?}: {} chars, speech {}",
        request.path,
        request.language,
        started.elapsed(),
        lesson_text.len(),
        speech
            .as_ref()
            .map(|s| format!("{} bytes", s.len()))
            .unwrap_or_else(|| "missing".to_string())
    );

    Ok(LessonSession {
        lesson_text,
        background_url,
        guru_url,
        speech,
    })
}
