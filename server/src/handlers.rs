use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::Response,
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use audio_core::{
    decode_base64_pcm, download_file_name, encode_raw_to_wav, ExportOutcome, PlaybackState,
    SPEECH_ONLY_FILE_NAME,
};
use lesson_core::{
    fetch_session, Gender, Language, LessonRequest, SpiritualPath, Tone, VoiceConfig, VOICE_MAP,
};

use crate::error::ApiError;
use crate::metrics::{EndpointMetrics, MetricsResponse};
use crate::validation::{validate_audio_payload, validate_volume};
use crate::AppState;

pub const MIX_STATUS_HEADER: &str = "x-mix-status";

fn track<T>(metrics: &EndpointMetrics, started: Instant, result: &Result<T, ApiError>) {
    metrics.record_request(started.elapsed().as_millis() as u64);
    if result.is_err() {
        metrics.record_error();
    }
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {uri}"))
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.metrics.snapshot())
}

#[derive(Serialize)]
pub struct PathInfo {
    id: SpiritualPath,
    description: &'static str,
}

#[derive(Serialize)]
pub struct LanguageInfo {
    id: Language,
    label: &'static str,
}

#[derive(Serialize)]
pub struct CatalogResponse {
    paths: Vec<PathInfo>,
    languages: Vec<LanguageInfo>,
    genders: Vec<Gender>,
    tones: Vec<Tone>,
    voices: Vec<VoiceConfig>,
}

pub async fn catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse {
        paths: SpiritualPath::ALL
            .iter()
            .map(|p| PathInfo {
                id: *p,
                description: p.description(),
            })
            .collect(),
        languages: Language::ALL
            .iter()
            .map(|l| LanguageInfo {
                id: *l,
                label: l.native_label(),
            })
            .collect(),
        genders: Gender::ALL.to_vec(),
        tones: Tone::ALL.to_vec(),
        voices: VOICE_MAP.to_vec(),
    })
}

#[derive(Serialize)]
pub struct LessonResponse {
    lesson_text: String,
    background_url: Option<String>,
    guru_url: Option<String>,
    /// Headerless 16-bit mono PCM, base64.
    audio_base64: Option<String>,
    sample_rate: u32,
    duration_ms: Option<u64>,
}

pub async fn lesson_endpoint(
    State(state): State<AppState>,
    Json(req): Json<LessonRequest>,
) -> Result<Json<LessonResponse>, ApiError> {
    let started = Instant::now();
    info!(
        "Lesson request: path={}, language={}, voice={}/{}",
        req.path, req.language, req.gender, req.tone
    );

    let result = fetch_session(
        state.generator.as_ref(),
        &req,
        state.config.generation_timeout(),
    )
    .await
    .map_err(ApiError::from);
    track(&state.metrics.lesson, started, &result);
    let session = result?;

    let sample_rate = state.config.sample_rate;
    let duration_ms = session
        .speech
        .as_ref()
        .map(|pcm| (pcm.len() / 2) as u64 * 1000 / sample_rate as u64);

    Ok(Json(LessonResponse {
        lesson_text: session.lesson_text,
        background_url: session.background_url,
        guru_url: session.guru_url,
        audio_base64: session
            .speech
            .map(|pcm| general_purpose::STANDARD.encode(pcm)),
        sample_rate,
        duration_ms,
    }))
}

#[derive(Deserialize)]
pub struct SpeechRequest {
    audio_base64: String,
}

fn wav_response(
    wav: Vec<u8>,
    attachment: Option<&str>,
    mix_status: Option<&'static str>,
) -> Result<Response, ApiError> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/wav");
    if let Some(name) = attachment {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        );
    }
    if let Some(status) = mix_status {
        builder = builder.header(MIX_STATUS_HEADER, status);
    }
    builder
        .body(Body::from(wav))
        .map_err(|e| ApiError::Internal(format!("failed to build audio response: {e}")))
}

/// Speech straight into a WAV container, for immediate playback.
pub async fn speech_wav_endpoint(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let result = speech_wav(&state, &req);
    track(&state.metrics.speech, started, &result);
    result
}

fn speech_wav(state: &AppState, req: &SpeechRequest) -> Result<Response, ApiError> {
    validate_audio_payload(&req.audio_base64, state.config.max_audio_bytes)?;
    let raw = decode_base64_pcm(&req.audio_base64)?;
    wav_response(encode_raw_to_wav(&raw, state.config.sample_rate), None, None)
}

#[derive(Deserialize)]
pub struct ExportRequest {
    audio_base64: String,
    path: SpiritualPath,
    #[serde(default)]
    language: Language,
    /// Fixes the ambience randomness, for reproducible files.
    #[serde(default)]
    seed: Option<u64>,
}

/// Speech mixed over ambience as a WAV download; speech only if the mix fails.
pub async fn export_endpoint(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let result = export(&state, &req).await;
    track(&state.metrics.export, started, &result);
    result
}

async fn export(state: &AppState, req: &ExportRequest) -> Result<Response, ApiError> {
    validate_audio_payload(&req.audio_base64, state.config.max_audio_bytes)?;
    let raw = decode_base64_pcm(&req.audio_base64)?;

    let rng = match req.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let outcome = state.config.mixdown().export_with_fallback(&raw, rng).await;
    state
        .metrics
        .audio
        .record_export(outcome.is_mixed(), outcome.wav().len());

    match outcome {
        ExportOutcome::Mixed(wav) => {
            let name = download_file_name(req.path.as_str(), req.language.as_str());
            info!("Exporting mixed lesson as {name} ({} bytes)", wav.len());
            wav_response(wav, Some(&name), Some("mixed"))
        }
        ExportOutcome::SpeechOnly { wav, reason } => {
            info!("Exporting speech only ({reason})");
            wav_response(wav, Some(SPEECH_ONLY_FILE_NAME), Some("speech-only"))
        }
    }
}

#[derive(Serialize)]
pub struct AmbientStatus {
    state: PlaybackState,
    sample_rate: u32,
}

fn ambient_status_of(state: &AppState) -> Json<AmbientStatus> {
    Json(AmbientStatus {
        state: state.ambient.state(),
        sample_rate: state.ambient.sample_rate(),
    })
}

pub async fn ambient_status(State(state): State<AppState>) -> Json<AmbientStatus> {
    ambient_status_of(&state)
}

#[derive(Deserialize, Default)]
pub struct AmbientStartRequest {
    #[serde(default)]
    volume: Option<f32>,
}

pub async fn ambient_start(
    State(state): State<AppState>,
    Json(req): Json<AmbientStartRequest>,
) -> Result<Json<AmbientStatus>, ApiError> {
    let started = Instant::now();
    let result = start_ambient(&state, req.volume).await;
    track(&state.metrics.ambient, started, &result);
    result
}

async fn start_ambient(
    state: &AppState,
    volume: Option<f32>,
) -> Result<Json<AmbientStatus>, ApiError> {
    let volume = validate_volume(volume.unwrap_or(state.config.ambient_default_volume))?;
    let was_idle = state.ambient.state() == PlaybackState::Idle;
    state.ambient.start(volume).await?;
    if was_idle && state.ambient.state() == PlaybackState::Playing {
        state.metrics.audio.record_ambient_session();
    }
    Ok(ambient_status_of(state))
}

#[derive(Deserialize)]
pub struct AmbientVolumeRequest {
    volume: f32,
}

pub async fn ambient_volume(
    State(state): State<AppState>,
    Json(req): Json<AmbientVolumeRequest>,
) -> Result<Json<AmbientStatus>, ApiError> {
    let started = Instant::now();
    let result = validate_volume(req.volume)
        .and_then(|volume| state.ambient.set_volume(volume).map_err(ApiError::from))
        .map(|_| ambient_status_of(&state));
    track(&state.metrics.ambient, started, &result);
    result
}

pub async fn ambient_stop(State(state): State<AppState>) -> Json<AmbientStatus> {
    let started = Instant::now();
    state.ambient.stop().await;
    state
        .metrics
        .ambient
        .record_request(started.elapsed().as_millis() as u64);
    ambient_status_of(&state)
}
