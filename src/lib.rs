//! Matching engine behind CrimeScribe: finds the Indian Penal Code offense
//! closest to a described situation, and a lawyer near a given location.

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod lawyer_matcher;
pub mod models;
pub mod offense_matcher;
pub mod session;
pub mod startup;
pub mod translate;

pub use catalog::{LawyerCatalog, OffenseCatalog};
pub use embedding::{Embedder, EmbedderKind, FastEmbedder, HashEmbedder};
pub use error::{EmbedError, LoadError, MatchError, SessionError, TranslateError};
pub use lawyer_matcher::match_lawyer;
pub use models::{
    Classification, Embedding, LawyerRecord, MatchResult, OffenseRecord, ScoredMatch, YesNo,
};
pub use offense_matcher::{match_offense, OffenseMatcher};
pub use session::{History, HistoryEntry, Session};
pub use translate::{Language, PassthroughTranslator, Translator};
