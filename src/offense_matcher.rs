//! Semantic nearest-neighbor lookup over the offense catalog.

use std::cmp::Ordering;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, error, info};

use crate::catalog::OffenseCatalog;
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{EmbedError, MatchError};
use crate::models::{Embedding, MatchResult, OffenseRecord, ScoredMatch};

/// Scores at or below this are reported as no match.
pub const DEFAULT_MIN_SCORE: f32 = 0.0;

pub struct OffenseMatcher {
    catalog: Arc<OffenseCatalog>,
    embedder: Arc<dyn Embedder>,
    min_score: f32,
    catalog_vectors: OnceCell<Vec<Embedding>>,
}

impl OffenseMatcher {
    pub fn new(catalog: Arc<OffenseCatalog>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            catalog,
            embedder,
            min_score: DEFAULT_MIN_SCORE,
            catalog_vectors: OnceCell::new(),
        }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Embeds every offense description on first call. Concurrent callers
    /// wait for the single computation; a failure leaves the cell empty.
    fn catalog_vectors(&self) -> Result<&[Embedding], EmbedError> {
        let vectors = self.catalog_vectors.get_or_try_init(|| {
            info!(
                "Embedding {} offense descriptions with {}",
                self.catalog.len(),
                self.embedder.model_id()
            );
            let texts: Vec<&str> = self.catalog.iter().map(|r| r.offense.as_str()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            if vectors.len() != texts.len() {
                return Err(EmbedError::CountMismatch {
                    expected: texts.len(),
                    actual: vectors.len(),
                });
            }
            debug!(
                "Cached {} catalog embeddings (dimension {})",
                vectors.len(),
                vectors.first().map_or(0, Vec::len)
            );
            Ok(vectors)
        })?;
        Ok(vectors.as_slice())
    }

    /// Forces the catalog embeddings to be computed now instead of on the
    /// first query.
    pub fn warm_up(&self) -> Result<(), MatchError> {
        self.catalog_vectors().map(|_| ()).map_err(|e| {
            error!("Failed to embed offense catalog: {}", e);
            MatchError::from(e)
        })
    }

    fn scores(&self, query: &str) -> Result<Vec<f32>, EmbedError> {
        let catalog_vectors = self.catalog_vectors()?;
        let query_vector = self.embedder.embed(query)?;

        catalog_vectors
            .iter()
            .map(|v| {
                if v.len() != query_vector.len() {
                    return Err(EmbedError::DimensionMismatch {
                        expected: v.len(),
                        actual: query_vector.len(),
                    });
                }
                Ok(cosine_similarity(&query_vector, v))
            })
            .collect()
    }

    /// Returns up to `k` rows scoring above the threshold, best first.
    /// Equal scores keep catalog order.
    pub fn rank(&self, query: &str, k: usize) -> Result<Vec<ScoredMatch>, MatchError> {
        if query.trim().is_empty() || k == 0 {
            debug!("Blank query or k = 0, nothing to rank");
            return Ok(Vec::new());
        }

        let scores = self.scores(query).map_err(|e| {
            error!("Embedding failed for offense query: {}", e);
            MatchError::from(e)
        })?;

        let mut ranked: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > self.min_score)
            .collect();
        // Stable sort, so ties stay in index order.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .filter_map(|(index, score)| {
                self.catalog.get(index).map(|record| ScoredMatch {
                    index,
                    record: record.clone(),
                    score,
                })
            })
            .collect())
    }

    /// Best-matching offense for `query`, or `NotFound` when nothing scores
    /// above the threshold.
    pub fn find(&self, query: &str) -> Result<MatchResult<OffenseRecord>, MatchError> {
        if query.trim().is_empty() {
            debug!("Blank offense query, reporting no match");
            return Ok(MatchResult::NotFound);
        }

        let scores = self.scores(query).map_err(|e| {
            error!("Embedding failed for offense query: {}", e);
            MatchError::from(e)
        })?;

        // Strict comparison keeps the first of equal scores; NaN never wins.
        let mut best: Option<(usize, f32)> = None;
        for (index, score) in scores.into_iter().enumerate() {
            if best.map_or(!score.is_nan(), |(_, top)| score > top) {
                best = Some((index, score));
            }
        }

        match best {
            Some((index, score)) if score > self.min_score => {
                debug!("Best offense match: row {} with score {:.4}", index, score);
                Ok(self
                    .catalog
                    .get(index)
                    .map_or(MatchResult::NotFound, |record| MatchResult::Found {
                        index,
                        record: record.clone(),
                        score,
                    }))
            }
            other => {
                debug!("No offense above {:.4} (best: {:?})", self.min_score, other);
                Ok(MatchResult::NotFound)
            }
        }
    }
}

/// Free-function form of [`OffenseMatcher::find`].
pub fn match_offense(
    matcher: &OffenseMatcher,
    query: &str,
) -> Result<MatchResult<OffenseRecord>, MatchError> {
    matcher.find(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::models::YesNo;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn offense(section: &str, text: &str) -> OffenseRecord {
        OffenseRecord {
            ipc_section: section.to_string(),
            offense: text.to_string(),
            punishment: "1 Year or Fine or Both".to_string(),
            cognizable: YesNo::Yes.into(),
            bailable: YesNo::No.into(),
            court: "Any Magistrate".to_string(),
        }
    }

    fn catalog(rows: &[(&str, &str)]) -> Arc<OffenseCatalog> {
        Arc::new(
            OffenseCatalog::from_records(rows.iter().map(|(s, t)| offense(s, t)).collect())
                .expect("non-empty catalog"),
        )
    }

    /// Returns fixed vectors by text and counts batch calls.
    struct FixedEmbedder {
        vectors: HashMap<String, Embedding>,
        fallback: Embedding,
        batch_calls: AtomicUsize,
    }

    impl FixedEmbedder {
        fn new(entries: &[(&str, Vec<f32>)], fallback: Vec<f32>) -> Self {
            Self {
                vectors: entries.iter().map(|(t, v)| (t.to_string(), v.clone())).collect(),
                fallback,
                batch_calls: AtomicUsize::new(0),
            }
        }
    }

    impl Embedder for FixedEmbedder {
        fn model_id(&self) -> &str {
            "fixed"
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbedError> {
            self.batch_calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| self.vectors.get(*t).cloned().unwrap_or_else(|| self.fallback.clone()))
                .collect())
        }
    }

    /// Drops the last vector of every batch.
    struct ShortBatchEmbedder;

    impl Embedder for ShortBatchEmbedder {
        fn model_id(&self) -> &str {
            "short-batch"
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbedError> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn model_id(&self) -> &str {
            "failing"
        }

        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>, EmbedError> {
            Err(EmbedError::Inference("model unavailable".to_string()))
        }
    }

    fn sample_matcher() -> OffenseMatcher {
        let catalog = catalog(&[
            ("IPC_302", "Murder"),
            ("IPC_379", "Theft of movable property"),
            ("IPC_323", "Voluntarily causing hurt"),
        ]);
        OffenseMatcher::new(catalog, Arc::new(HashEmbedder::new(384)))
    }

    #[test]
    fn test_exact_match_scores_one() {
        let matcher = sample_matcher();

        let result = matcher.find("Theft of movable property").unwrap();

        match result {
            MatchResult::Found { index, record, score } => {
                assert_eq!(index, 1);
                assert_eq!(record.ipc_section, "IPC_379");
                assert!((score - 1.0).abs() < 1e-5, "score was {}", score);
            }
            MatchResult::NotFound => panic!("expected a match"),
        }
    }

    #[test]
    fn test_find_is_deterministic_and_embeds_catalog_once() {
        let embedder = Arc::new(FixedEmbedder::new(
            &[
                ("Murder", vec![1.0, 0.0, 0.0]),
                ("Theft", vec![0.0, 1.0, 0.0]),
                ("someone stole my bike", vec![0.2, 0.9, 0.1]),
            ],
            vec![0.0, 0.0, 1.0],
        ));
        let matcher = OffenseMatcher::new(
            catalog(&[("IPC_302", "Murder"), ("IPC_379", "Theft")]),
            embedder.clone(),
        );

        let first = matcher.find("someone stole my bike").unwrap();
        let second = matcher.find("someone stole my bike").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.index(), Some(1));
        // One batch for the catalog plus one per query.
        assert_eq!(embedder.batch_calls.load(AtomicOrdering::SeqCst), 3);
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let matcher = OffenseMatcher::new(
            catalog(&[
                ("IPC_323", "Voluntarily causing hurt"),
                ("IPC_379", "Theft"),
                ("IPC_379A", "Theft"),
            ]),
            Arc::new(HashEmbedder::new(384)),
        );

        let result = matcher.find("Theft").unwrap();
        assert_eq!(result.index(), Some(1));
        assert_eq!(result.record().unwrap().ipc_section, "IPC_379");
    }

    #[test]
    fn test_non_positive_best_score_is_not_found() {
        let embedder = Arc::new(FixedEmbedder::new(
            &[
                ("Murder", vec![1.0, 0.0]),
                ("Theft", vec![0.0, 1.0]),
                ("unrelated", vec![-1.0, -1.0]),
            ],
            vec![0.0, 0.0],
        ));
        let matcher =
            OffenseMatcher::new(catalog(&[("IPC_302", "Murder"), ("IPC_379", "Theft")]), embedder);

        assert_eq!(matcher.find("unrelated").unwrap(), MatchResult::NotFound);
        // Zero-magnitude query vectors score 0 everywhere.
        assert_eq!(matcher.find("no vector for this").unwrap(), MatchResult::NotFound);
    }

    #[test]
    fn test_found_scores_are_positive_and_bounded() {
        let matcher = sample_matcher();
        for query in ["murder of a person", "hurt", "theft", "property", "xyz"] {
            if let MatchResult::Found { score, .. } = matcher.find(query).unwrap() {
                assert!(score > 0.0 && score <= 1.0, "{} scored {}", query, score);
            }
        }
    }

    #[test]
    fn test_blank_query_is_not_found() {
        let matcher = sample_matcher();
        assert_eq!(matcher.find("").unwrap(), MatchResult::NotFound);
        assert_eq!(matcher.find("   ").unwrap(), MatchResult::NotFound);
    }

    #[test]
    fn test_min_score_threshold() {
        let embedder = Arc::new(FixedEmbedder::new(
            &[
                ("Murder", vec![1.0, 0.0]),
                ("Theft", vec![0.0, 1.0]),
                ("vague", vec![1.0, 1.0]),
            ],
            vec![0.0, 0.0],
        ));
        let matcher =
            OffenseMatcher::new(catalog(&[("IPC_302", "Murder"), ("IPC_379", "Theft")]), embedder)
                .with_min_score(0.8);

        // cos(45 degrees) is about 0.707
        assert_eq!(matcher.find("vague").unwrap(), MatchResult::NotFound);
        assert!(matcher.find("Murder").unwrap().is_found());
    }

    #[test]
    fn test_rank_orders_by_score_then_index() {
        let embedder = Arc::new(FixedEmbedder::new(
            &[
                ("Murder", vec![1.0, 0.0]),
                ("Theft", vec![0.6, 0.8]),
                ("Robbery", vec![0.6, 0.8]),
                ("Defamation", vec![-1.0, 0.0]),
                ("query", vec![0.0, 1.0]),
            ],
            vec![0.0, 0.0],
        ));
        let matcher = OffenseMatcher::new(
            catalog(&[
                ("IPC_302", "Murder"),
                ("IPC_379", "Theft"),
                ("IPC_392", "Robbery"),
                ("IPC_499", "Defamation"),
            ]),
            embedder,
        );

        let ranked = matcher.rank("query", 10).unwrap();
        let indices: Vec<usize> = ranked.iter().map(|m| m.index).collect();
        // Murder and Defamation score 0 and are dropped.
        assert_eq!(indices, vec![1, 2]);

        let top = matcher.rank("query", 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(MatchResult::from(top[0].clone()), matcher.find("query").unwrap());
        assert!(matcher.rank("query", 0).unwrap().is_empty());
    }

    #[test]
    fn test_embedding_failure_propagates_and_is_not_cached() {
        let matcher =
            OffenseMatcher::new(catalog(&[("IPC_302", "Murder")]), Arc::new(FailingEmbedder));

        assert!(matches!(matcher.find("murder"), Err(MatchError::Embedding(_))));
        assert!(matches!(matcher.warm_up(), Err(MatchError::Embedding(_))));
    }

    #[test]
    fn test_short_catalog_batch_is_count_mismatch() {
        let matcher = OffenseMatcher::new(
            catalog(&[("IPC_302", "Murder"), ("IPC_379", "Theft")]),
            Arc::new(ShortBatchEmbedder),
        );

        assert!(matches!(
            matcher.find("Theft"),
            Err(MatchError::Embedding(EmbedError::CountMismatch {
                expected: 2,
                actual: 1
            }))
        ));
        assert!(matches!(
            matcher.warm_up(),
            Err(MatchError::Embedding(EmbedError::CountMismatch { .. }))
        ));
    }

    #[test]
    fn test_dimension_mismatch_is_reported() {
        let embedder = Arc::new(FixedEmbedder::new(
            &[("Murder", vec![1.0, 0.0]), ("short", vec![1.0])],
            vec![0.0, 0.0],
        ));
        let matcher = OffenseMatcher::new(catalog(&[("IPC_302", "Murder")]), embedder);

        assert!(matches!(
            matcher.find("short"),
            Err(MatchError::Embedding(EmbedError::DimensionMismatch { expected: 2, actual: 1 }))
        ));
    }

    #[test]
    fn test_concurrent_first_use_embeds_catalog_once() {
        let embedder = Arc::new(FixedEmbedder::new(
            &[("Murder", vec![1.0, 0.0]), ("Theft", vec![0.0, 1.0])],
            vec![0.5, 0.5],
        ));
        let matcher = OffenseMatcher::new(
            catalog(&[("IPC_302", "Murder"), ("IPC_379", "Theft")]),
            embedder.clone(),
        );

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert!(matcher.find("Theft").unwrap().is_found());
                });
            }
        });

        // 1 catalog batch + 8 query embeddings.
        assert_eq!(embedder.batch_calls.load(AtomicOrdering::SeqCst), 9);
    }

    #[test]
    fn test_match_offense_alias() {
        let matcher = sample_matcher();
        assert_eq!(match_offense(&matcher, "Murder").unwrap().index(), Some(0));
    }
}
