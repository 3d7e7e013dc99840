use chrono::{Local, Timelike};

use crate::types::{Gender, Language, SpiritualPath};

/// Returned when the text model answers with nothing usable.
pub const FALLBACK_LESSON: &str = "Peace be with you. Today, we reflect on silence.";

/// Theme for the greeting, by local hour (0-23).
pub fn time_context(hour: u32) -> &'static str {
    if hour < 12 {
        "morning (focus on awakening, clarity, and energy for the day)"
    } else if hour < 18 {
        "afternoon (focus on mindfulness, balance, and pausing amidst work)"
    } else {
        "evening or night (focus on reflection, peace, winding down, and rest)"
    }
}

pub fn current_time_context() -> &'static str {
    time_context(Local::now().hour())
}

pub fn lesson_prompt(path: SpiritualPath, language: Language, time_context: &str) -> String {
    format!(
        "Act as a wise, compassionate spiritual master from the {path} tradition.\n\
         Create a unique \"Daily Lesson\" for a seeker who has entered the temple right now.\n\
         \n\
         Current context: It is currently {time_context}. Adjust your greeting and the theme \
         of the lesson to match this time of day.\n\
         \n\
         IMPORTANT: Write the entire response in {language}.\n\
         \n\
         Structure:\n\
         1. A warm, serene greeting appropriate for the {time_context}.\n\
         2. A core spiritual concept relevant to {path} (approx 200 words).\n\
         3. A practical mindfulness exercise or reflection for this specific moment (approx 100 words).\n\
         4. A blessing or closing thought.\n\
         \n\
         Total length should be substantial enough for a 3-5 minute spoken session.\n\
         Do not use markdown formatting like bolding or headers, write it strictly as a speech \
         script to be read aloud.\n\
         Ensure the content is fresh and unique, avoiding generic repetition."
    )
}

pub fn background_prompt(path: SpiritualPath) -> String {
    format!(
        "A breathtaking, photorealistic, wide-angle view of a serene {path} temple interior. \
         Soft, divine lighting, atmospheric fog, ancient architecture, spiritual symbols of {path}. \
         Symmetrical composition, peaceful ambiance, high detail, 4k resolution. \
         No people, just the sacred space."
    )
}

pub fn portrait_prompt(path: SpiritualPath, gender: Gender) -> String {
    let gender = gender.as_str().to_lowercase();
    format!(
        "A portrait of a wise spiritual master of the {path} tradition, {gender} gender. \
         Sitting in meditation, serene expression, glowing aura, traditional robes. \
         Oil painting style, soft lighting, ethereal, benevolent."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_context_boundaries() {
        assert!(time_context(0).starts_with("morning"));
        assert!(time_context(11).starts_with("morning"));
        assert!(time_context(12).starts_with("afternoon"));
        assert!(time_context(17).starts_with("afternoon"));
        assert!(time_context(18).starts_with("evening"));
        assert!(time_context(23).starts_with("evening"));
    }

    #[test]
    fn test_lesson_prompt_mentions_choices() {
        let prompt = lesson_prompt(SpiritualPath::Zen, Language::Japanese, time_context(9));
        assert!(prompt.contains("Zen Buddhism tradition"));
        assert!(prompt.contains("entire response in Japanese"));
        assert!(prompt.contains("It is currently morning"));
        assert!(!prompt.contains("**"));
    }

    #[test]
    fn test_image_prompts() {
        assert!(background_prompt(SpiritualPath::Christian).contains("Christian Mysticism temple"));
        let portrait = portrait_prompt(SpiritualPath::Krishna, Gender::Neutral);
        assert!(portrait.contains("Krishna Consciousness tradition, neutral gender"));
    }
}
