//! Request/response orchestration around the two matchers.
//!
//! A [`Session`] owns the conversation history explicitly; the matchers
//! themselves stay stateless apart from the offense embedding cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::catalog::LawyerCatalog;
use crate::error::{MatchError, SessionError};
use crate::models::{LawyerRecord, MatchResult, OffenseRecord};
use crate::offense_matcher::OffenseMatcher;
use crate::translate::{Language, Translator};

pub const NO_OFFENSE_MESSAGE: &str = "No matching row found.";
pub const NO_LAWYER_MESSAGE: &str = "No lawyer found at the specified location.";

/// Offense fields as shown to the user, translated into their language.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OffenseView {
    pub index: usize,
    pub score: f32,
    pub ipc_section: String,
    pub offense: String,
    pub punishment: String,
    pub cognizable: String,
    pub bailable: String,
    pub court: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct LawyerView {
    pub index: usize,
    pub name: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Response {
    Offense(OffenseView),
    Lawyer(LawyerView),
    NoMatch(String),
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub language: Language,
    pub query: String,
    pub response: Response,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }
}

pub struct Session {
    offenses: Arc<OffenseMatcher>,
    lawyers: Arc<LawyerCatalog>,
    translator: Arc<dyn Translator>,
    language: Language,
    history: History,
}

impl Session {
    pub fn new(
        offenses: Arc<OffenseMatcher>,
        lawyers: Arc<LawyerCatalog>,
        translator: Arc<dyn Translator>,
        language: Language,
    ) -> Self {
        Self {
            offenses,
            lawyers,
            translator,
            language,
            history: History::new(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    fn to_english(&self, text: &str) -> Result<String, SessionError> {
        Ok(self.translator.translate(text, self.language, Language::English)?)
    }

    fn from_english(&self, text: &str) -> Result<String, SessionError> {
        Ok(self.translator.translate(text, Language::English, self.language)?)
    }

    fn record(&mut self, query: &str, response: Response) {
        self.history.push(HistoryEntry {
            at: Utc::now(),
            language: self.language,
            query: query.to_string(),
            response,
        });
    }

    fn offense_view(
        &self,
        index: usize,
        score: f32,
        record: &OffenseRecord,
    ) -> Result<OffenseView, SessionError> {
        Ok(OffenseView {
            index,
            score,
            ipc_section: record.ipc_section.clone(),
            offense: self.from_english(&record.offense)?,
            punishment: self.from_english(&record.punishment)?,
            cognizable: self.from_english(&record.cognizable.text)?,
            bailable: self.from_english(&record.bailable.text)?,
            court: self.from_english(&record.court)?,
        })
    }

    /// Looks up the offense closest to `question`. `Ok(None)` means nothing
    /// was similar enough; the outcome is recorded in the history either way.
    pub fn ask(&mut self, question: &str) -> Result<Option<OffenseView>, SessionError> {
        if question.trim().is_empty() {
            return Err(MatchError::EmptyQuery.into());
        }

        let english = self.to_english(question)?;
        match self.offenses.find(&english)? {
            MatchResult::Found { index, record, score } => {
                info!("Matched {} (score {:.4})", record.ipc_section, score);
                let view = self.offense_view(index, score, &record)?;
                self.record(question, Response::Offense(view.clone()));
                Ok(Some(view))
            }
            MatchResult::NotFound => {
                info!("No offense matched the question");
                self.record(question, Response::NoMatch(NO_OFFENSE_MESSAGE.to_string()));
                Ok(None)
            }
        }
    }

    /// Looks up the first lawyer whose address contains `location`.
    pub fn find_lawyer(&mut self, location: &str) -> Result<Option<LawyerView>, SessionError> {
        if location.trim().is_empty() {
            return Err(MatchError::EmptyQuery.into());
        }

        let english = self.to_english(location)?;
        match self.lawyers.find_by_location(&english)? {
            MatchResult::Found { index, record, .. } => {
                let LawyerRecord { name, address, phone } = record;
                info!("Matched lawyer {}", name);
                let view = LawyerView {
                    index,
                    name,
                    address: self.from_english(&address)?,
                    phone,
                };
                self.record(location, Response::Lawyer(view.clone()));
                Ok(Some(view))
            }
            MatchResult::NotFound => {
                info!("No lawyer matched the location");
                self.record(location, Response::NoMatch(NO_LAWYER_MESSAGE.to_string()));
                Ok(None)
            }
        }
    }
}
