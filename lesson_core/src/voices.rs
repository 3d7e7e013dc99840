//! Mapping from the seeker's voice preference to a prebuilt TTS voice.

use serde::Serialize;

use crate::types::{Gender, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoiceConfig {
    pub name: &'static str,
    pub gender: Gender,
    pub tone: Tone,
}

pub const VOICE_MAP: [VoiceConfig; 6] = [
    VoiceConfig { name: "Puck", gender: Gender::Male, tone: Tone::Serene },
    VoiceConfig { name: "Fenrir", gender: Gender::Male, tone: Tone::Deep },
    VoiceConfig { name: "Kore", gender: Gender::Female, tone: Tone::Calm },
    VoiceConfig { name: "Aoede", gender: Gender::Female, tone: Tone::Serene },
    VoiceConfig { name: "Charon", gender: Gender::Male, tone: Tone::Calm },
    VoiceConfig { name: "Zephyr", gender: Gender::Neutral, tone: Tone::Calm },
];

/// Exact (gender, tone) match from [`VOICE_MAP`], else a per-gender default.
pub fn voice_name(gender: Gender, tone: Tone) -> &'static str {
    if let Some(voice) = VOICE_MAP
        .iter()
        .find(|v| v.gender == gender && v.tone == tone)
    {
        return voice.name;
    }
    match gender {
        Gender::Female => "Kore",
        Gender::Male => "Fenrir",
        Gender::Neutral => "Zephyr",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_matches() {
        assert_eq!(voice_name(Gender::Male, Tone::Serene), "Puck");
        assert_eq!(voice_name(Gender::Female, Tone::Serene), "Aoede");
        assert_eq!(voice_name(Gender::Male, Tone::Calm), "Charon");
        assert_eq!(voice_name(Gender::Neutral, Tone::Calm), "Zephyr");
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(voice_name(Gender::Female, Tone::Deep), "Kore");
        assert_eq!(voice_name(Gender::Neutral, Tone::Deep), "Zephyr");
        assert_eq!(voice_name(Gender::Neutral, Tone::Serene), "Zephyr");
    }

    #[test]
    fn test_every_combination_has_a_voice() {
        for gender in Gender::ALL {
            for tone in Tone::ALL {
                assert!(!voice_name(gender, tone).is_empty());
            }
        }
    }
}
