use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    It,
    En,
}

const SWITCH_TO_ENGLISH: &[&str] = &[
    "in english",
    "speak english",
    "talk in english",
    "english please",
    "parla inglese",
    "parlare inglese",
    "parli inglese",
    "in inglese",
];

const SWITCH_TO_ITALIAN: &[&str] = &[
    "in italian",
    "speak italian",
    "italian please",
    "parla italiano",
    "parlare italiano",
    "parli italiano",
    "in italiano",
];

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::It => "it",
            Language::En => "en",
        }
    }

    /// Accepts bare codes ("it") and locale tags ("en-US", "it_IT").
    pub fn from_code(code: &str) -> Option<Self> {
        let lower = code.trim().to_lowercase();
        match lower.split(['-', '_']).next().unwrap_or("") {
            "it" => Some(Language::It),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    /// Voice locale used by the speech synthesizer and recognizer.
    pub fn voice_code(&self) -> &'static str {
        match self {
            Language::It => "it-IT",
            Language::En => "en-US",
        }
    }

    /// Detects an explicit request to change the spoken language.
    pub fn detect_switch(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if SWITCH_TO_ENGLISH.iter().any(|p| lower.contains(p)) {
            Some(Language::En)
        } else if SWITCH_TO_ITALIAN.iter().any(|p| lower.contains(p)) {
            Some(Language::It)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_accepts_locale_tags() {
        assert_eq!(Language::from_code("en-US"), Some(Language::En));
        assert_eq!(Language::from_code("it_IT"), Some(Language::It));
        assert_eq!(Language::from_code("IT"), Some(Language::It));
        assert_eq!(Language::from_code("fr-FR"), None);
    }

    #[test]
    fn test_detect_switch() {
        assert_eq!(
            Language::detect_switch("Can you speak English please?"),
            Some(Language::En)
        );
        assert_eq!(
            Language::detect_switch("Scusi, possiamo parlare in italiano?"),
            Some(Language::It)
        );
        assert_eq!(Language::detect_switch("un tavolo per due"), None);
    }
}
