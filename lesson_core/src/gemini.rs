//! Client for the Generative Language REST API (`models/*:generateContent`).

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::generator::LessonGenerator;
use crate::prompts::{
    background_prompt, current_time_context, lesson_prompt, portrait_prompt, FALLBACK_LESSON,
};
use crate::types::{Gender, Language, SpiritualPath, Tone};
use crate::voices::voice_name;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Shown instead of a generated background when image generation errors.
pub const PLACEHOLDER_BACKGROUND_URL: &str = "https://picsum.photos/1920/1080?grayscale&blur=2";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub tts_model: String,
    pub http_timeout: Duration,
}

impl GeminiConfig {
    /// Reads `GEMINI_API_KEY` (or `API_KEY`) and optional model overrides.
    pub fn from_env() -> Result<Self, GenerationError> {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .map_err(|_| GenerationError::Config("GEMINI_API_KEY must be set".to_string()))?;
        if api_key.trim().is_empty() {
            return Err(GenerationError::Config("GEMINI_API_KEY is empty".to_string()));
        }

        Ok(Self {
            api_key,
            base_url: env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            text_model: env::var("GEMINI_TEXT_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            image_model: env::var("GEMINI_IMAGE_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-image".to_string()),
            tts_model: env::var("GEMINI_TTS_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-preview-tts".to_string()),
            http_timeout: Duration::from_secs(
                env::var("GEMINI_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoice<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice<'a> {
    voice_name: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn text(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: None,
        }
    }

    fn image(prompt: &'a str) -> Self {
        Self {
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
                speech_config: None,
            }),
            ..Self::text(prompt)
        }
    }

    fn speech(text: &'a str, voice: &'a str) -> Self {
        Self {
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO"],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoice { voice_name: voice },
                    },
                }),
            }),
            ..Self::text(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|c| c.parts.iter())
    }

    /// All text parts of the first candidate, joined.
    fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn inline_data(&self) -> Option<&InlineData> {
        self.parts().find_map(|p| p.inline_data.as_ref())
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| GenerationError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self, GenerationError> {
        Self::new(GeminiConfig::from_env()?)
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<GenerateResponse, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );
        debug!("POST {url}");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;
        Ok(response)
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, GenerationError> {
        let response = self
            .generate(&self.config.image_model, &GenerateRequest::image(prompt))
            .await?;
        Ok(response.inline_data().map(|data| {
            let mime = if data.mime_type.is_empty() {
                "image/png"
            } else {
                data.mime_type.as_str()
            };
            format!("data:{mime};base64,{}", data.data)
        }))
    }
}

#[async_trait]
impl LessonGenerator for GeminiClient {
    async fn generate_lesson(
        &self,
        path: SpiritualPath,
        language: Language,
    ) -> Result<String, GenerationError> {
        let prompt = lesson_prompt(path, language, current_time_context());
        let response = self
            .generate(&self.config.text_model, &GenerateRequest::text(&prompt))
            .await?;
        Ok(response.text().unwrap_or_else(|| FALLBACK_LESSON.to_string()))
    }

    async fn generate_background(
        &self,
        path: SpiritualPath,
    ) -> Result<Option<String>, GenerationError> {
        match self.generate_image(&background_prompt(path)).await {
            Ok(url) => Ok(url),
            Err(e) => {
                warn!("Background generation failed, using placeholder: {e}");
                Ok(Some(PLACEHOLDER_BACKGROUND_URL.to_string()))
            }
        }
    }

    async fn generate_portrait(
        &self,
        path: SpiritualPath,
        gender: Gender,
    ) -> Result<Option<String>, GenerationError> {
        match self.generate_image(&portrait_prompt(path, gender)).await {
            Ok(url) => Ok(url),
            Err(e) => {
                warn!("Portrait generation failed: {e}");
                Ok(None)
            }
        }
    }

    async fn generate_speech(
        &self,
        text: &str,
        gender: Gender,
        tone: Tone,
    ) -> Result<Option<Vec<u8>>, GenerationError> {
        let voice = voice_name(gender, tone);
        let response = match self
            .generate(&self.config.tts_model, &GenerateRequest::speech(text, voice))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Speech generation failed (voice {voice}): {e}");
                return Ok(None);
            }
        };
        let Some(data) = response.inline_data() else {
            warn!("Speech response carried no audio");
            return Ok(None);
        };
        match general_purpose::STANDARD.decode(data.data.trim()) {
            Ok(pcm) => Ok(Some(pcm)),
            Err(e) => {
                warn!("Speech payload is not valid base64: {e}");
                Ok(None)
            }
        }
    }
}
