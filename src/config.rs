//! Configuration structs for every tunable component.
//!
//! All configs are plain serde-derived data with `Default` impls matching
//! the calibrated defaults. Invalid values are rejected by `validate()` at
//! construction time; queries never produce configuration errors.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{IndexError, Result};

/// One size class of the slab allocator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Buffer capacity served by this tier. Must be positive.
    pub capacity: usize,
    /// Relative share of the workload expected to land in this tier.
    /// Scales how many recycled buffers the tier retains.
    pub weight: f64,
}

/// Tier layout for a [`crate::cache::memory_pool::SlabPool`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabConfig {
    /// Tier descriptors, ascending by capacity.
    pub tiers: Vec<TierConfig>,
    /// Base retention bound per tier; the effective bound is scaled by the
    /// tier weight and floored at 8.
    pub retained_per_tier: usize,
}

impl Default for SlabConfig {
    fn default() -> Self {
        let tiers = [8usize, 16, 32, 64, 128, 256, 512]
            .iter()
            .map(|&capacity| TierConfig {
                capacity,
                weight: 1.0,
            })
            .collect();
        Self {
            tiers,
            retained_per_tier: 256,
        }
    }
}

impl SlabConfig {
    /// Tier layout tuned for trigram posting lists: roughly 40% of lists
    /// hold at most 5 entries, another 40% hold 6-10, 15% hold 11-20, and
    /// the remainder are larger.
    pub fn trigram_tuned() -> Self {
        Self {
            tiers: vec![
                TierConfig {
                    capacity: 8,
                    weight: 0.40,
                },
                TierConfig {
                    capacity: 16,
                    weight: 0.40,
                },
                TierConfig {
                    capacity: 32,
                    weight: 0.15,
                },
                TierConfig {
                    capacity: 64,
                    weight: 0.04,
                },
                TierConfig {
                    capacity: 128,
                    weight: 0.01,
                },
            ],
            retained_per_tier: 256,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() {
            return Err(IndexError::config("slab pool requires at least one tier"));
        }
        let mut prev = 0usize;
        for tier in &self.tiers {
            if tier.capacity == 0 {
                return Err(IndexError::config("tier capacity must be positive"));
            }
            if tier.capacity <= prev {
                return Err(IndexError::config(
                    "tier capacities must be strictly ascending",
                ));
            }
            if !tier.weight.is_finite() || tier.weight < 0.0 {
                return Err(IndexError::config("tier weight must be a finite non-negative number"));
            }
            prev = tier.capacity;
        }
        Ok(())
    }
}

/// Bounds for the dual simple/complex pattern cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexCacheConfig {
    pub max_simple_entries: usize,
    pub max_complex_entries: usize,
    /// Patterns longer than this bypass the cache entirely.
    pub max_pattern_length: usize,
}

impl Default for RegexCacheConfig {
    fn default() -> Self {
        Self {
            max_simple_entries: 256,
            max_complex_entries: 128,
            max_pattern_length: 1000,
        }
    }
}

impl RegexCacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_simple_entries == 0 || self.max_complex_entries == 0 {
            return Err(IndexError::config("pattern cache sizes must be positive"));
        }
        if self.max_pattern_length == 0 {
            return Err(IndexError::config("max pattern length must be positive"));
        }
        Ok(())
    }
}

/// Similarity algorithm used by the fuzzy matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FuzzyAlgorithm {
    JaroWinkler,
    Levenshtein,
    CosineBigrams,
}

impl FuzzyAlgorithm {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "jaro-winkler" => Some(Self::JaroWinkler),
            "levenshtein" => Some(Self::Levenshtein),
            "cosine-bigrams" => Some(Self::CosineBigrams),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JaroWinkler => "jaro-winkler",
            Self::Levenshtein => "levenshtein",
            Self::CosineBigrams => "cosine-bigrams",
        }
    }
}

/// Fuzzy matcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyConfig {
    pub enabled: bool,
    /// Minimum similarity for [`crate::semantic::FuzzyMatcher::is_match`].
    pub threshold: f64,
    pub algorithm: FuzzyAlgorithm,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.70,
            algorithm: FuzzyAlgorithm::JaroWinkler,
        }
    }
}

impl FuzzyConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(IndexError::config(format!(
                "fuzzy threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Stemming algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StemAlgorithm {
    Porter2,
    None,
}

/// Stemmer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StemmerConfig {
    pub enabled: bool,
    pub algorithm: StemAlgorithm,
    /// Words shorter than this pass through unstemmed.
    pub min_length: usize,
    /// Case-insensitive set of words that must never be stemmed.
    pub exclusions: HashSet<String>,
}

impl Default for StemmerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: StemAlgorithm::Porter2,
            min_length: 3,
            exclusions: HashSet::new(),
        }
    }
}

impl StemmerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_length == 0 {
            return Err(IndexError::config("stem minimum length must be positive"));
        }
        Ok(())
    }
}

/// Name splitter memo bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    pub cache_size: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self { cache_size: 1000 }
    }
}

impl SplitterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cache_size == 0 {
            return Err(IndexError::config("splitter cache size must be positive"));
        }
        Ok(())
    }
}

/// Bonus and penalty weights applied by the phrase matcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhraseConfig {
    /// Added when every query word matched, in order.
    pub exact_phrase_bonus: f64,
    /// Added when every query word matched, out of order.
    pub all_words_bonus: f64,
    /// Added per ordered pair of matched words; subtracted per match when
    /// words appear out of order.
    pub word_order_bonus: f64,
    /// Scaled by the fuzzy share of the matched words.
    pub fuzzy_penalty: f64,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            exact_phrase_bonus: 0.05,
            all_words_bonus: 0.02,
            word_order_bonus: 0.03,
            fuzzy_penalty: 0.08,
        }
    }
}

/// Calibrated weights and bounds for the eight-layer semantic cascade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreLayers {
    pub exact_weight: f64,
    pub substring_weight: f64,
    pub phrase_weight: f64,
    pub annotation_weight: f64,
    pub fuzzy_weight: f64,
    pub stemming_weight: f64,
    pub name_split_weight: f64,
    pub abbreviation_weight: f64,
    pub fuzzy_threshold: f64,
    pub stem_min_length: usize,
    pub max_results: usize,
    pub min_score: f64,
}

impl Default for ScoreLayers {
    fn default() -> Self {
        Self {
            exact_weight: 1.00,
            substring_weight: 0.90,
            phrase_weight: 0.88,
            annotation_weight: 0.85,
            fuzzy_weight: 0.70,
            stemming_weight: 0.55,
            name_split_weight: 0.40,
            abbreviation_weight: 0.25,
            fuzzy_threshold: 0.70,
            stem_min_length: 3,
            max_results: 50,
            min_score: 0.20,
        }
    }
}

impl ScoreLayers {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("exact", self.exact_weight),
            ("substring", self.substring_weight),
            ("phrase", self.phrase_weight),
            ("annotation", self.annotation_weight),
            ("fuzzy", self.fuzzy_weight),
            ("stemming", self.stemming_weight),
            ("name_split", self.name_split_weight),
            ("abbreviation", self.abbreviation_weight),
            ("min_score", self.min_score),
            ("fuzzy_threshold", self.fuzzy_threshold),
        ];
        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(IndexError::config(format!(
                    "{} weight {} outside [0, 1]",
                    name, value
                )));
            }
        }
        if self.max_results == 0 {
            return Err(IndexError::config("max_results must be positive"));
        }
        if self.stem_min_length == 0 {
            return Err(IndexError::config("stem_min_length must be positive"));
        }
        Ok(())
    }
}

/// Hybrid regex engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub regex_cache: RegexCacheConfig,
    /// Candidate count at which regex execution fans out across threads.
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            regex_cache: RegexCacheConfig::default(),
            parallel_threshold: 16,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.regex_cache.validate()?;
        if self.parallel_threshold == 0 {
            return Err(IndexError::config("parallel threshold must be positive"));
        }
        Ok(())
    }
}

/// Aggregate configuration for the semantic scorer and its matchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticConfig {
    pub layers: ScoreLayers,
    pub fuzzy: FuzzyConfig,
    pub stemmer: StemmerConfig,
    pub phrase: PhraseConfig,
    pub splitter: SplitterConfig,
    /// Bound on memoized query analyses.
    pub query_cache_size: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            layers: ScoreLayers::default(),
            fuzzy: FuzzyConfig::default(),
            stemmer: StemmerConfig::default(),
            phrase: PhraseConfig::default(),
            splitter: SplitterConfig::default(),
            query_cache_size: 1000,
        }
    }
}

impl SemanticConfig {
    pub fn validate(&self) -> Result<()> {
        self.layers.validate()?;
        self.fuzzy.validate()?;
        self.stemmer.validate()?;
        self.splitter.validate()?;
        if self.query_cache_size == 0 {
            return Err(IndexError::config("query cache size must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs_validate() {
        SlabConfig::default().validate().unwrap();
        SlabConfig::trigram_tuned().validate().unwrap();
        RegexCacheConfig::default().validate().unwrap();
        FuzzyConfig::default().validate().unwrap();
        StemmerConfig::default().validate().unwrap();
        ScoreLayers::default().validate().unwrap();
        EngineConfig::default().validate().unwrap();
        SemanticConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_weights_strictly_decrease() {
        let layers = ScoreLayers::default();
        let weights = [
            layers.exact_weight,
            layers.substring_weight,
            layers.phrase_weight,
            layers.annotation_weight,
            layers.fuzzy_weight,
            layers.stemming_weight,
            layers.name_split_weight,
            layers.abbreviation_weight,
        ];
        for pair in weights.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let config = FuzzyConfig {
            threshold: 1.5,
            ..FuzzyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsorted_tiers_rejected() {
        let config = SlabConfig {
            tiers: vec![
                TierConfig {
                    capacity: 64,
                    weight: 1.0,
                },
                TierConfig {
                    capacity: 8,
                    weight: 1.0,
                },
            ],
            retained_per_tier: 256,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fuzzy_algorithm_name() {
        assert!(FuzzyAlgorithm::from_name("soundex").is_none());
        assert_eq!(
            FuzzyAlgorithm::from_name("jaro-winkler"),
            Some(FuzzyAlgorithm::JaroWinkler)
        );
    }
}
