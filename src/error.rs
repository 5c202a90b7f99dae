use std::path::PathBuf;

use thiserror::Error;

use crate::translate::Language;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Catalog file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error in {} at line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },
    #[error("Missing required column '{column}' in {}", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("Catalog {} has no rows", path.display())]
    EmptyCatalog { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Embedding model initialization failed: {0}")]
    ModelInit(String),
    #[error("Embedding error: {0}")]
    Inference(String),
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Embedding count mismatch: expected {expected} vectors, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Query is empty")]
    EmptyQuery,
    #[error(transparent)]
    Embedding(#[from] EmbedError),
}

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Translation from {source_lang} to {target_lang} is not supported")]
    Unsupported {
        source_lang: Language,
        target_lang: Language,
    },
    #[error("Translation backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
}
