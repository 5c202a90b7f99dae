//! Sentence-embedding backends.
//!
//! Matchers never load a model themselves; they receive an [`Embedder`]
//! constructed once at startup and shared behind an `Arc`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use crate::error::EmbedError;
use crate::models::Embedding;

/// Dimension of the hashing embedder, chosen to line up with MiniLM.
pub const HASH_DIMENSION: usize = 384;

pub trait Embedder: Send + Sync {
    /// Stable identifier of the model producing the vectors.
    fn model_id(&self) -> &str;

    /// Embeds `texts` in order; the output has one vector per input.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbedError>;

    fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        let mut vectors = self.embed_batch(&[text])?;
        if vectors.len() != 1 {
            return Err(EmbedError::CountMismatch {
                expected: 1,
                actual: vectors.len(),
            });
        }
        Ok(vectors.remove(0))
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    (dot_product / (magnitude_a * magnitude_b)).clamp(-1.0, 1.0)
}

/// Which backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedderKind {
    #[default]
    ParaphraseMultilingualMiniLm,
    AllMiniLm,
    BgeSmallEn,
    Hash,
}

impl EmbedderKind {
    pub const ALL: &'static [EmbedderKind] = &[
        EmbedderKind::ParaphraseMultilingualMiniLm,
        EmbedderKind::AllMiniLm,
        EmbedderKind::BgeSmallEn,
        EmbedderKind::Hash,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EmbedderKind::ParaphraseMultilingualMiniLm => "paraphrase-multilingual-minilm-l12-v2",
            EmbedderKind::AllMiniLm => "all-minilm-l6-v2",
            EmbedderKind::BgeSmallEn => "bge-small-en-v1.5",
            EmbedderKind::Hash => "hash",
        }
    }

    fn fastembed_model(&self) -> Option<EmbeddingModel> {
        match self {
            EmbedderKind::ParaphraseMultilingualMiniLm => {
                Some(EmbeddingModel::ParaphraseMLMiniLML12V2)
            }
            EmbedderKind::AllMiniLm => Some(EmbeddingModel::AllMiniLML6V2),
            EmbedderKind::BgeSmallEn => Some(EmbeddingModel::BGESmallENV15),
            EmbedderKind::Hash => None,
        }
    }

    /// Constructs the backend. Model download and ONNX session setup happen
    /// here, so callers should run this off the async executor.
    pub fn build(&self, cache_dir: Option<PathBuf>) -> Result<Box<dyn Embedder>, EmbedError> {
        match self.fastembed_model() {
            Some(model) => Ok(Box::new(FastEmbedder::new(self.name(), model, cache_dir)?)),
            None => Ok(Box::new(HashEmbedder::new(HASH_DIMENSION))),
        }
    }
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EmbedderKind {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        EmbedderKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| EmbedError::UnknownModel(s.to_string()))
    }
}

/// ONNX sentence-transformer served by fastembed.
pub struct FastEmbedder {
    id: String,
    model: TextEmbedding,
}

impl FastEmbedder {
    pub fn new(
        id: &str,
        model: EmbeddingModel,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self, EmbedError> {
        let mut options = InitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        info!("Initializing embedding model {}", id);
        let model =
            TextEmbedding::try_new(options).map_err(|e| EmbedError::ModelInit(e.to_string()))?;

        Ok(Self {
            id: id.to_string(),
            model,
        })
    }
}

impl Embedder for FastEmbedder {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbedError::Inference(e.to_string()))?;
        if embeddings.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            });
        }
        debug!("Embedded {} texts with {}", texts.len(), self.id);
        Ok(embeddings)
    }
}

/// Signed feature hashing over lower-cased word tokens, L2-normalized.
///
/// Deterministic and model-free: texts sharing no words score near zero and
/// identical texts score exactly 1.0.
pub struct HashEmbedder {
    id: String,
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            id: format!("fnv1a-{}", dimension),
            dimension: dimension.max(1),
        }
    }

    fn fnv1a(bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in bytes {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];
        let folded = text.to_lowercase();
        for token in folded.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let hash = Self::fnv1a(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
