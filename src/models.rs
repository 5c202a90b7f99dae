use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A dense sentence embedding.
pub type Embedding = Vec<f32>;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        }
    }
}

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for YesNo {
    type Err = String;

    /// Accepts plain yes/no as well as the wording used in the IPC schedule
    /// ("Cognizable", "Non-bailable", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_lowercase();
        match folded.as_str() {
            "yes" | "y" | "true" | "cognizable" | "bailable" => Ok(YesNo::Yes),
            "no" | "n" | "false" | "non-cognizable" | "non-bailable" | "non cognizable"
            | "non bailable" | "not cognizable" | "not bailable" => Ok(YesNo::No),
            _ => Err(format!("expected a yes/no value, got '{}'", s.trim())),
        }
    }
}

/// A Cognizable or Bailable cell. The source wording is kept as-is since
/// schedule entries like "According as offence abetted is cognizable or
/// non-cognizable" have no yes/no reading.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Classification {
    pub text: String,
    pub value: Option<YesNo>,
}

impl Classification {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let value = text.parse().ok();
        Self { text, value }
    }
}

impl From<YesNo> for Classification {
    fn from(value: YesNo) -> Self {
        Self {
            text: value.as_str().to_string(),
            value: Some(value),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OffenseRecord {
    pub ipc_section: String,
    pub offense: String,
    pub punishment: String,
    pub cognizable: Classification,
    pub bailable: Classification,
    pub court: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LawyerRecord {
    pub name: String,
    pub address: String,
    pub phone: String,
}

/// Outcome of a top-1 lookup. `NotFound` is an ordinary result, not an error.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult<T> {
    Found { index: usize, record: T, score: f32 },
    NotFound,
}

impl<T> MatchResult<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchResult::Found { .. })
    }

    pub fn record(&self) -> Option<&T> {
        match self {
            MatchResult::Found { record, .. } => Some(record),
            MatchResult::NotFound => None,
        }
    }

    pub fn score(&self) -> Option<f32> {
        match self {
            MatchResult::Found { score, .. } => Some(*score),
            MatchResult::NotFound => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            MatchResult::Found { index, .. } => Some(*index),
            MatchResult::NotFound => None,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ScoredMatch {
    pub index: usize,
    pub record: OffenseRecord,
    pub score: f32,
}

impl From<ScoredMatch> for MatchResult<OffenseRecord> {
    fn from(m: ScoredMatch) -> Self {
        MatchResult::Found {
            index: m.index,
            record: m.record,
            score: m.score,
        }
    }
}
