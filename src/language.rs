//! The closed set of supported languages and the session language pair.

use crate::error::{Result, TranslateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A language the translation product supports.
///
/// Closed set: collaborating services are provisioned per language, so new
/// entries require a provider rollout, not just a new code here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    English,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
    Japanese,
    Korean,
    Mandarin,
    Hindi,
    Arabic,
    Russian,
}

impl Language {
    /// BCP-47-style primary language code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
            Self::French => "fr",
            Self::German => "de",
            Self::Italian => "it",
            Self::Portuguese => "pt",
            Self::Japanese => "ja",
            Self::Korean => "ko",
            Self::Mandarin => "zh",
            Self::Hindi => "hi",
            Self::Arabic => "ar",
            Self::Russian => "ru",
        }
    }

    /// Parse a primary language code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Self::English),
            "es" => Some(Self::Spanish),
            "fr" => Some(Self::French),
            "de" => Some(Self::German),
            "it" => Some(Self::Italian),
            "pt" => Some(Self::Portuguese),
            "ja" => Some(Self::Japanese),
            "ko" => Some(Self::Korean),
            "zh" => Some(Self::Mandarin),
            "hi" => Some(Self::Hindi),
            "ar" => Some(Self::Arabic),
            "ru" => Some(Self::Russian),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The active source/target pair of a session.
///
/// Constructing a pair with identical languages is rejected, so a session
/// can never reach `source == target` — including through `swapped()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguagePair {
    source: Language,
    target: Language,
}

impl LanguagePair {
    /// Create a pair.
    ///
    /// # Errors
    ///
    /// Returns `TranslateError::LanguagePair` if source and target are equal.
    pub fn new(source: Language, target: Language) -> Result<Self> {
        if source == target {
            return Err(TranslateError::LanguagePair);
        }
        Ok(Self { source, target })
    }

    pub fn source(&self) -> Language {
        self.source
    }

    pub fn target(&self) -> Language {
        self.target
    }

    /// The reversed pair. Always valid since the constructor rejected
    /// `source == target`.
    pub fn swapped(self) -> Self {
        Self {
            source: self.target,
            target: self.source,
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        for lang in [
            Language::English,
            Language::Spanish,
            Language::Japanese,
            Language::Arabic,
        ] {
            assert_eq!(Language::from_code(lang.code()), Some(lang));
        }
        assert_eq!(Language::from_code("xx"), None);
    }

    #[test]
    fn pair_rejects_identical_languages() {
        let result = LanguagePair::new(Language::English, Language::English);
        assert!(matches!(result, Err(TranslateError::LanguagePair)));
    }

    #[test]
    fn swapped_reverses_and_stays_valid() {
        let pair = LanguagePair::new(Language::English, Language::Spanish).unwrap();
        let swapped = pair.swapped();
        assert_eq!(swapped.source(), Language::Spanish);
        assert_eq!(swapped.target(), Language::English);
        assert_ne!(swapped.source(), swapped.target());
    }

    #[test]
    fn serde_uses_kebab_case_names() {
        let json = serde_json::to_string(&Language::Mandarin).unwrap();
        assert_eq!(json, "\"mandarin\"");
    }
}
