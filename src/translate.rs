//! Translation capability consumed around the matchers.
//!
//! Catalogs are stored in English; queries are translated in before
//! matching and record fields are translated out for display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "zh-CN")]
    ChineseSimplified,
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "te")]
    Telugu,
}

impl Language {
    pub const ALL: &'static [Language] = &[
        Language::English,
        Language::Hindi,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::ChineseSimplified,
        Language::Arabic,
        Language::Telugu,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
            Language::ChineseSimplified => "zh-CN",
            Language::Arabic => "ar",
            Language::Telugu => "te",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "हिन्दी (Hindi)",
            Language::Spanish => "Español (Spanish)",
            Language::French => "Français (French)",
            Language::German => "Deutsch (German)",
            Language::ChineseSimplified => "中文 (简体) (Chinese Simplified)",
            Language::Arabic => "العربية (Arabic)",
            Language::Telugu => "తెలుగు (Telugu)",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let codes: Vec<&str> = Language::ALL.iter().map(Language::code).collect();
                format!("unsupported language '{}', expected one of {}", wanted, codes.join(", "))
            })
    }
}

pub trait Translator: Send + Sync {
    fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslateError>;
}

/// Returns text unchanged. Used when no translation backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTranslator;

impl Translator for PassthroughTranslator {
    fn translate(
        &self,
        text: &str,
        _source: Language,
        _target: Language,
    ) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }
}
