//! Generation collaborators for a temple visit: lesson text, background and
//! portrait images, and speech, behind the [`LessonGenerator`] trait.

pub mod error;
pub mod gemini;
pub mod generator;
pub mod prompts;
pub mod types;
pub mod voices;

pub use error::GenerationError;
pub use gemini::{GeminiClient, GeminiConfig, PLACEHOLDER_BACKGROUND_URL};
pub use generator::{fetch_session, LessonGenerator};
pub use prompts::FALLBACK_LESSON;
pub use types::{Gender, Language, LessonRequest, LessonSession, SpiritualPath, Tone};
pub use voices::{voice_name, VoiceConfig, VOICE_MAP};
