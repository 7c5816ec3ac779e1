//! Eight-layer semantic scorer.
//!
//! Owns the matcher set and the shared splitter, stemmer, fuzzy matcher,
//! and dictionary. Every layer is evaluated for each `(query, symbol)`
//! pair (phrase only for whitespace queries) and the best raw score wins;
//! the winning layer's identity fixes the confidence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SemanticConfig;
use crate::error::Result;
use crate::providers::AnnotationIndex;
use crate::semantic::dictionary::TranslationDictionary;
use crate::semantic::fuzzy::FuzzyMatcher;
use crate::semantic::matchers::{
    AbbreviationMatcher, AnnotationMatcher, ExactMatcher, FuzzyLayerMatcher, MatchContext, Matcher,
    NameSplitMatcher, PhraseLayerMatcher, StemmingMatcher, SubstringMatcher,
};
use crate::semantic::name_split::NameSplitter;
use crate::semantic::phrase::PhraseMatcher;
use crate::semantic::query_cache::QueryAnalysisCache;
use crate::semantic::stemmer::Stemmer;
use crate::types::{MatchKind, ScoredSymbol, SearchReport, SemanticScore};

/// Candidate count at which scoring fans out across threads.
const PARALLEL_SCORING_THRESHOLD: usize = 64;

#[derive(Debug, Default)]
struct ScorerMetrics {
    queries: AtomicU64,
    symbols_scored: AtomicU64,
    results_returned: AtomicU64,
}

/// Aggregate scorer counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScorerMetricsSnapshot {
    pub queries: u64,
    pub symbols_scored: u64,
    pub results_returned: u64,
}

/// The semantic scorer. Construct once and share; scoring never mutates
/// the shared tables.
pub struct SemanticScorer {
    config: SemanticConfig,
    matchers: Vec<Box<dyn Matcher>>,
    splitter: Arc<NameSplitter>,
    stemmer: Arc<Stemmer>,
    query_cache: QueryAnalysisCache,
    metrics: ScorerMetrics,
}

impl SemanticScorer {
    pub fn new() -> Self {
        Self::build(SemanticConfig::default(), None)
            .expect("default semantic configuration is valid")
    }

    pub fn with_config(config: SemanticConfig) -> Result<Self> {
        Self::build(config, None)
    }

    pub fn with_annotation_index(
        config: SemanticConfig,
        index: Arc<dyn AnnotationIndex>,
    ) -> Result<Self> {
        Self::build(config, Some(index))
    }

    fn build(config: SemanticConfig, annotations: Option<Arc<dyn AnnotationIndex>>) -> Result<Self> {
        config.validate()?;
        let splitter = Arc::new(NameSplitter::with_config(config.splitter)?);
        let stemmer = Arc::new(Stemmer::new(config.stemmer.clone())?);
        let fuzzy = Arc::new(FuzzyMatcher::new(config.fuzzy)?);
        let dictionary = Arc::new(TranslationDictionary::new());
        let phrase = Arc::new(PhraseMatcher::new(
            Arc::clone(&splitter),
            Arc::clone(&fuzzy),
            Some(Arc::clone(&stemmer)),
            Arc::clone(&dictionary),
            config.phrase,
        ));

        // Cascade order is fixed; the scorer still evaluates every layer
        // and keeps the best score.
        let mut matchers: Vec<Box<dyn Matcher>> = vec![
            Box::new(ExactMatcher),
            Box::new(SubstringMatcher),
            Box::new(PhraseLayerMatcher::new(phrase)),
        ];
        if let Some(index) = annotations {
            matchers.push(Box::new(AnnotationMatcher::new(index)));
        }
        matchers.push(Box::new(FuzzyLayerMatcher::new(Arc::clone(&fuzzy))));
        matchers.push(Box::new(StemmingMatcher::new(
            Arc::clone(&splitter),
            Arc::clone(&stemmer),
        )));
        matchers.push(Box::new(NameSplitMatcher::new(Arc::clone(&splitter))));
        matchers.push(Box::new(AbbreviationMatcher::new(
            Arc::clone(&splitter),
            Arc::clone(&dictionary),
        )));

        let query_cache = QueryAnalysisCache::new(config.query_cache_size);
        Ok(Self {
            config,
            matchers,
            splitter,
            stemmer,
            query_cache,
            metrics: ScorerMetrics::default(),
        })
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.config
    }

    pub fn cached_queries(&self) -> usize {
        self.query_cache.len()
    }

    pub fn metrics(&self) -> ScorerMetricsSnapshot {
        ScorerMetricsSnapshot {
            queries: self.metrics.queries.load(Ordering::Relaxed),
            symbols_scored: self.metrics.symbols_scored.load(Ordering::Relaxed),
            results_returned: self.metrics.results_returned.load(Ordering::Relaxed),
        }
    }

    /// Score one symbol against the query. Returns the no-match score when
    /// every layer declines.
    pub fn score(&self, query: &str, symbol: &str) -> SemanticScore {
        let analysis = self
            .query_cache
            .analyze(query, &self.splitter, &self.stemmer);
        let symbol_lower = symbol.to_lowercase();
        let ctx = MatchContext {
            query,
            query_lower: &analysis.lowercase,
            symbol,
            symbol_lower: &symbol_lower,
            layers: &self.config.layers,
            analysis: &analysis,
        };

        let mut best: Option<(MatchKind, crate::semantic::matchers::MatcherResult)> = None;
        for matcher in &self.matchers {
            if matcher.kind() == MatchKind::Phrase && !analysis.has_whitespace {
                continue;
            }
            if let Some(result) = matcher.evaluate(&ctx) {
                let improves = best
                    .as_ref()
                    .map(|(_, current)| result.raw_score > current.raw_score)
                    .unwrap_or(true);
                if improves {
                    best = Some((matcher.kind(), result));
                }
            }
        }

        match best {
            Some((kind, result)) => {
                let mut score = SemanticScore::new(
                    result.raw_score.clamp(0.0, 1.0),
                    kind,
                    result.justification,
                );
                score.details = result.details;
                score
            }
            None => SemanticScore::none(),
        }
    }

    /// Score every candidate, drop sub-threshold results, rank, truncate.
    pub fn score_many(&self, query: &str, symbols: &[String]) -> Vec<ScoredSymbol> {
        self.metrics.queries.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .symbols_scored
            .fetch_add(symbols.len() as u64, Ordering::Relaxed);

        let scored: Vec<(String, SemanticScore)> = if symbols.len() >= PARALLEL_SCORING_THRESHOLD {
            symbols
                .par_iter()
                .map(|symbol| (symbol.clone(), self.score(query, symbol)))
                .collect()
        } else {
            symbols
                .iter()
                .map(|symbol| (symbol.clone(), self.score(query, symbol)))
                .collect()
        };

        let min_score = self.config.layers.min_score;
        let mut kept: Vec<(String, SemanticScore)> = scored
            .into_iter()
            .filter(|(_, score)| score.is_match() && score.score >= min_score)
            .collect();
        kept.sort_by(|a, b| {
            b.1.score
                .total_cmp(&a.1.score)
                .then_with(|| b.1.confidence.total_cmp(&a.1.confidence))
        });

        let results: Vec<ScoredSymbol> = kept
            .into_iter()
            .take(self.config.layers.max_results)
            .enumerate()
            .map(|(index, (symbol, score))| ScoredSymbol {
                symbol,
                score,
                rank: index + 1,
            })
            .collect();
        self.metrics
            .results_returned
            .fetch_add(results.len() as u64, Ordering::Relaxed);
        results
    }

    /// `score_many` wrapped with timing and candidate accounting.
    pub fn search(&self, query: &str, candidates: &[String]) -> SearchReport {
        let start = Instant::now();
        let results = self.score_many(query, candidates);
        let elapsed = start.elapsed();
        tracing::debug!(
            query,
            candidates = candidates.len(),
            results = results.len(),
            elapsed_ns = elapsed.as_nanos() as u64,
            "semantic search complete"
        );
        SearchReport {
            query: query.to_string(),
            results_returned: results.len(),
            candidates_considered: candidates.len(),
            results,
            execution_time_ns: elapsed.as_nanos() as u64,
            timestamp: Utc::now(),
        }
    }
}

impl Default for SemanticScorer {
    fn default() -> Self {
        Self::new()
    }
}
