use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::embedding::EmbedderKind;
use crate::offense_matcher::DEFAULT_MIN_SCORE;
use crate::translate::Language;

pub const DEFAULT_OFFENSES_PATH: &str = "IPC_dataset.csv";
pub const DEFAULT_LAWYERS_PATH: &str = "lawyers.csv";

#[derive(Debug, Clone)]
pub struct Settings {
    pub offenses_path: PathBuf,
    pub lawyers_path: PathBuf,
    pub model: EmbedderKind,
    pub min_score: f32,
    pub cache_dir: Option<PathBuf>,
    pub language: Language,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            offenses_path: PathBuf::from(DEFAULT_OFFENSES_PATH),
            lawyers_path: PathBuf::from(DEFAULT_LAWYERS_PATH),
            model: EmbedderKind::default(),
            min_score: DEFAULT_MIN_SCORE,
            cache_dir: default_cache_dir(),
            language: Language::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..1.0).contains(&self.min_score) {
            bail!("min score must be in [-1, 1), got {}", self.min_score);
        }
        Ok(())
    }
}

/// Where downloaded embedding models are kept, e.g.
/// `~/.cache/crimescribe/models` on Linux.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("crimescribe").join("models"))
}
