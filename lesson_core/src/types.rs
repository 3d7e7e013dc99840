use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpiritualPath {
    #[serde(rename = "Zen Buddhism")]
    Zen,
    #[serde(rename = "Krishna Consciousness")]
    Krishna,
    #[serde(rename = "Buddhism")]
    Buddhist,
    #[serde(rename = "Brahma Kumaris")]
    BrahmaKumaris,
    #[serde(rename = "Christian Mysticism")]
    Christian,
    #[serde(rename = "Universal Harmony")]
    Universal,
}

impl SpiritualPath {
    pub const ALL: [SpiritualPath; 6] = [
        SpiritualPath::Zen,
        SpiritualPath::Krishna,
        SpiritualPath::Buddhist,
        SpiritualPath::BrahmaKumaris,
        SpiritualPath::Christian,
        SpiritualPath::Universal,
    ];

    /// Tradition name as used in prompts and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpiritualPath::Zen => "Zen Buddhism",
            SpiritualPath::Krishna => "Krishna Consciousness",
            SpiritualPath::Buddhist => "Buddhism",
            SpiritualPath::BrahmaKumaris => "Brahma Kumaris",
            SpiritualPath::Christian => "Christian Mysticism",
            SpiritualPath::Universal => "Universal Harmony",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SpiritualPath::Zen => "Find clarity in simplicity and the present moment.",
            SpiritualPath::Krishna => "Devotion, love, and the divine play of the universe.",
            SpiritualPath::Buddhist => "Compassion, mindfulness, and the path to enlightenment.",
            SpiritualPath::BrahmaKumaris => {
                "Soul consciousness and connection with the Supreme Soul."
            }
            SpiritualPath::Christian => "Faith, divine love, and the teachings of Christ.",
            SpiritualPath::Universal => "A harmonious blend of wisdom from all traditions.",
        }
    }
}

impl fmt::Display for SpiritualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Italian,
    Spanish,
    French,
    German,
    Hindi,
    Japanese,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::English,
        Language::Italian,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Hindi,
        Language::Japanese,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Italian => "Italian",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Hindi => "Hindi",
            Language::Japanese => "Japanese",
        }
    }

    /// Name of the language in itself, for pickers.
    pub fn native_label(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Italian => "Italiano",
            Language::Spanish => "Español",
            Language::French => "Français",
            Language::German => "Deutsch",
            Language::Hindi => "हिन्दी",
            Language::Japanese => "日本語",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    Male,
    #[default]
    Female,
    Neutral,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Calm,
    Serene,
    Deep,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Calm, Tone::Serene, Tone::Deep];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Calm => "Calm",
            Tone::Serene => "Serene",
            Tone::Deep => "Deep",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the seeker picked before entering the temple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRequest {
    pub path: SpiritualPath,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub language: Language,
}

/// Everything generated for one visit. Images are URLs (possibly `data:`
/// URLs); speech is headerless 16-bit mono PCM at 24 kHz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonSession {
    pub lesson_text: String,
    pub background_url: Option<String>,
    pub guru_url: Option<String>,
    pub speech: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_wire_names() {
        let json = serde_json::to_string(&SpiritualPath::Zen).unwrap();
        assert_eq!(json, "\"Zen Buddhism\"");
        let path: SpiritualPath = serde_json::from_str("\"Brahma Kumaris\"").unwrap();
        assert_eq!(path, SpiritualPath::BrahmaKumaris);
        for path in SpiritualPath::ALL {
            let round: SpiritualPath =
                serde_json::from_str(&format!("\"{}\"", path.as_str())).unwrap();
            assert_eq!(round, path);
        }
    }

    #[test]
    fn test_request_defaults() {
        let request: LessonRequest = serde_json::from_str(r#"{"path":"Buddhism"}"#).unwrap();
        assert_eq!(request.path, SpiritualPath::Buddhist);
        assert_eq!(request.gender, Gender::Female);
        assert_eq!(request.tone, Tone::Calm);
        assert_eq!(request.language, Language::English);
    }

    #[test]
    fn test_unknown_path_rejected() {
        assert!(serde_json::from_str::<SpiritualPath>("\"Stoicism\"").is_err());
    }
}
