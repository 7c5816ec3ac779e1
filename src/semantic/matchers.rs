//! The eight matcher layers of the semantic cascade.
//!
//! Every matcher receives the same context (original and lowercased query
//! and symbol, the calibrated layer weights, and the memoized query
//! analysis) and reports a raw score with a justification. The scorer
//! invokes all of them and keeps the best score; each layer's identity
//! carries its canonical confidence.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ScoreLayers;
use crate::providers::AnnotationIndex;
use crate::semantic::dictionary::TranslationDictionary;
use crate::semantic::fuzzy::FuzzyMatcher;
use crate::semantic::name_split::NameSplitter;
use crate::semantic::phrase::PhraseMatcher;
use crate::semantic::query_cache::QueryAnalysis;
use crate::semantic::stemmer::Stemmer;
use crate::types::MatchKind;

/// Everything a layer needs to evaluate one `(query, symbol)` pair.
pub struct MatchContext<'a> {
    pub query: &'a str,
    pub query_lower: &'a str,
    pub symbol: &'a str,
    pub symbol_lower: &'a str,
    pub layers: &'a ScoreLayers,
    pub analysis: &'a QueryAnalysis,
}

/// A layer's verdict when it matches.
#[derive(Debug, Clone)]
pub struct MatcherResult {
    pub raw_score: f64,
    pub justification: String,
    pub details: HashMap<String, String>,
}

impl MatcherResult {
    fn new(raw_score: f64, justification: impl Into<String>) -> Self {
        Self {
            raw_score,
            justification: justification.into(),
            details: HashMap::new(),
        }
    }

    fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// One layer of the cascade.
pub trait Matcher: Send + Sync {
    fn kind(&self) -> MatchKind;
    fn evaluate(&self, ctx: &MatchContext<'_>) -> Option<MatcherResult>;
}

/// Layer 1: lowercase equality.
pub struct ExactMatcher;

impl Matcher for ExactMatcher {
    fn kind(&self) -> MatchKind {
        MatchKind::Exact
    }

    fn evaluate(&self, ctx: &MatchContext<'_>) -> Option<MatcherResult> {
        if ctx.query_lower == ctx.symbol_lower {
            Some(MatcherResult::new(
                ctx.layers.exact_weight,
                "query equals symbol name",
            ))
        } else {
            None
        }
    }
}

/// Layer 2: the symbol contains the query.
pub struct SubstringMatcher;

impl Matcher for SubstringMatcher {
    fn kind(&self) -> MatchKind {
        MatchKind::Substring
    }

    fn evaluate(&self, ctx: &MatchContext<'_>) -> Option<MatcherResult> {
        if !ctx.query_lower.is_empty() && ctx.symbol_lower.contains(ctx.query_lower) {
            Some(
                MatcherResult::new(ctx.layers.substring_weight, "symbol contains query")
                    .with_detail("query", ctx.query_lower),
            )
        } else {
            None
        }
    }
}

/// Layer 3: multi-word phrase matching. The scorer only invokes this for
/// queries containing whitespace.
pub struct PhraseLayerMatcher {
    phrase: Arc<PhraseMatcher>,
}

impl PhraseLayerMatcher {
    pub fn new(phrase: Arc<PhraseMatcher>) -> Self {
        Self { phrase }
    }
}

impl Matcher for PhraseLayerMatcher {
    fn kind(&self) -> MatchKind {
        MatchKind::Phrase
    }

    fn evaluate(&self, ctx: &MatchContext<'_>) -> Option<MatcherResult> {
        let result = self.phrase.match_phrase(ctx.query, ctx.symbol)?;
        let raw = result.score * ctx.layers.phrase_weight;
        Some(
            MatcherResult::new(
                raw,
                format!(
                    "{}/{} phrase words matched",
                    result.matched_words, result.total_words
                ),
            )
            .with_detail("phrase_score", format!("{:.3}", result.score))
            .with_detail("exact_phrase", result.is_exact_phrase.to_string()),
        )
    }
}

/// Layer 4: the query names a known annotation label or category.
///
/// Only the counted label/category key sets are consulted; tag and
/// dependency dimensions belong to the annotation query builder.
pub struct AnnotationMatcher {
    index: Arc<dyn AnnotationIndex>,
}

impl AnnotationMatcher {
    pub fn new(index: Arc<dyn AnnotationIndex>) -> Self {
        Self { index }
    }
}

impl Matcher for AnnotationMatcher {
    fn kind(&self) -> MatchKind {
        MatchKind::Annotation
    }

    fn evaluate(&self, ctx: &MatchContext<'_>) -> Option<MatcherResult> {
        let query = ctx.query_lower;
        if self
            .index
            .label_stats()
            .iter()
            .any(|(label, _)| label == query)
        {
            return Some(
                MatcherResult::new(ctx.layers.annotation_weight, "query matches a label")
                    .with_detail("dimension", "label"),
            );
        }
        if self
            .index
            .category_stats()
            .iter()
            .any(|(category, _)| category == query)
        {
            return Some(
                MatcherResult::new(ctx.layers.annotation_weight, "query matches a category")
                    .with_detail("dimension", "category"),
            );
        }
        None
    }
}

/// Layer 5: whole-string similarity above the fuzzy threshold.
pub struct FuzzyLayerMatcher {
    fuzzy: Arc<FuzzyMatcher>,
}

impl FuzzyLayerMatcher {
    pub fn new(fuzzy: Arc<FuzzyMatcher>) -> Self {
        Self { fuzzy }
    }
}

impl Matcher for FuzzyLayerMatcher {
    fn kind(&self) -> MatchKind {
        MatchKind::Fuzzy
    }

    fn evaluate(&self, ctx: &MatchContext<'_>) -> Option<MatcherResult> {
        if !self.fuzzy.enabled() {
            return None;
        }
        let similarity = self.fuzzy.similarity(ctx.query_lower, ctx.symbol_lower);
        let threshold = ctx.layers.fuzzy_threshold;
        if similarity <= threshold {
            return None;
        }
        // The gradient runs over percentage points above the threshold;
        // more than three points clears the full layer weight.
        let boost = 0.7 + (similarity - threshold) * 100.0 * 0.1;
        let raw = (ctx.layers.fuzzy_weight * boost).min(ctx.layers.fuzzy_weight);
        Some(
            MatcherResult::new(raw, format!("similarity {:.3}", similarity))
                .with_detail("similarity", format!("{:.4}", similarity)),
        )
    }
}

/// Layer 6: shared word stems.
pub struct StemmingMatcher {
    splitter: Arc<NameSplitter>,
    stemmer: Arc<Stemmer>,
}

impl StemmingMatcher {
    pub fn new(splitter: Arc<NameSplitter>, stemmer: Arc<Stemmer>) -> Self {
        Self { splitter, stemmer }
    }
}

impl Matcher for StemmingMatcher {
    fn kind(&self) -> MatchKind {
        MatchKind::Stemming
    }

    fn evaluate(&self, ctx: &MatchContext<'_>) -> Option<MatcherResult> {
        let min_length = ctx.layers.stem_min_length;
        let query_stems: Vec<&String> = ctx
            .analysis
            .stems
            .iter()
            .zip(ctx.analysis.words.iter())
            .filter(|(_, word)| word.len() >= min_length)
            .map(|(stem, _)| stem)
            .collect();
        if query_stems.is_empty() {
            return None;
        }
        let target_stems: Vec<String> = self
            .splitter
            .split(ctx.symbol)
            .iter()
            .filter(|word| word.len() >= min_length)
            .map(|word| self.stemmer.stem(word))
            .collect();
        let matched = query_stems
            .iter()
            .filter(|stem| target_stems.iter().any(|t| t.as_str() == stem.as_str()))
            .count();
        if matched == 0 {
            return None;
        }
        let raw = ctx.layers.stemming_weight * matched as f64 / query_stems.len() as f64;
        Some(
            MatcherResult::new(
                raw,
                format!("{}/{} stems shared", matched, query_stems.len()),
            )
            .with_detail("matched_stems", matched.to_string()),
        )
    }
}

/// Layer 7: shared split words.
pub struct NameSplitMatcher {
    splitter: Arc<NameSplitter>,
}

impl NameSplitMatcher {
    pub fn new(splitter: Arc<NameSplitter>) -> Self {
        Self { splitter }
    }
}

impl Matcher for NameSplitMatcher {
    fn kind(&self) -> MatchKind {
        MatchKind::NameSplit
    }

    fn evaluate(&self, ctx: &MatchContext<'_>) -> Option<MatcherResult> {
        let query_words = &ctx.analysis.words;
        if query_words.is_empty() {
            return None;
        }
        let target_words = self.splitter.split(ctx.symbol);
        let matched = query_words
            .iter()
            .filter(|word| target_words.contains(*word))
            .count();
        if matched == 0 {
            return None;
        }
        let raw = ctx.layers.name_split_weight * matched as f64 / query_words.len() as f64;
        Some(MatcherResult::new(
            raw,
            format!("{}/{} words shared", matched, query_words.len()),
        ))
    }
}

/// Layer 8: abbreviation equivalence through the dictionary, in both
/// directions.
pub struct AbbreviationMatcher {
    splitter: Arc<NameSplitter>,
    dictionary: Arc<TranslationDictionary>,
}

impl AbbreviationMatcher {
    pub fn new(splitter: Arc<NameSplitter>, dictionary: Arc<TranslationDictionary>) -> Self {
        Self {
            splitter,
            dictionary,
        }
    }
}

impl Matcher for AbbreviationMatcher {
    fn kind(&self) -> MatchKind {
        MatchKind::Abbreviation
    }

    fn evaluate(&self, ctx: &MatchContext<'_>) -> Option<MatcherResult> {
        let forward_candidates = self.dictionary.expand(ctx.query_lower);
        let forward_matches = forward_candidates
            .iter()
            .filter(|expansion| ctx.symbol_lower.contains(expansion.as_str()))
            .count();

        let target_words = self.splitter.split(ctx.symbol);
        let reverse_matches = target_words
            .iter()
            .filter(|word| {
                self.dictionary
                    .expand(word)
                    .iter()
                    .any(|expansion| expansion == ctx.query_lower)
            })
            .count();

        let total = forward_matches + reverse_matches;
        if total == 0 {
            return None;
        }
        let denominator = forward_candidates.len() + target_words.len();
        let raw = ctx.layers.abbreviation_weight * total as f64 / denominator as f64;
        let direction = match (forward_matches > 0, reverse_matches > 0) {
            (true, true) => "bidirectional",
            (true, false) => "forward",
            _ => "reverse",
        };
        Some(
            MatcherResult::new(raw, format!("{} abbreviation match", direction))
                .with_detail("direction", direction)
                .with_detail("matches", total.to_string()),
        )
    }
}
