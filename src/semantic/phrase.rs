//! Multi-word phrase matching.
//!
//! Query and target are split into words, then query words claim target
//! words through six passes of decreasing strength: exact, substring,
//! fuzzy, abbreviation, stem, dictionary synonym. Earlier passes claim
//! target words exclusively. The combined score starts from the per-word
//! average and is adjusted by order and completeness bonuses and a fuzzy
//! penalty.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::config::PhraseConfig;
use crate::semantic::dictionary::TranslationDictionary;
use crate::semantic::fuzzy::FuzzyMatcher;
use crate::semantic::name_split::NameSplitter;
use crate::semantic::stemmer::Stemmer;

const EXACT_WORD_SCORE: f64 = 1.00;
const SUBSTRING_WORD_SCORE: f64 = 0.95;
const ABBREVIATION_WORD_SCORE: f64 = 0.85;
const SYNONYM_WORD_SCORE: f64 = 0.82;
const STEM_WORD_SCORE: f64 = 0.80;
const AVERAGE_DAMPING: f64 = 0.85;
const MIN_ABBREVIATION_PREFIX: usize = 3;

lazy_static! {
    /// Small built-in table for the abbreviation pass; the full dictionary
    /// is consulted separately by the synonym pass.
    static ref WORD_ABBREVIATIONS: HashMap<&'static str, &'static [&'static str]> = {
        let entries: &[(&str, &[&str])] = &[
            ("auth", &["authentication", "authenticate"]),
            ("cfg", &["config", "configuration"]),
            ("db", &["database"]),
            ("fn", &["function"]),
            ("func", &["function"]),
            ("impl", &["implementation"]),
            ("init", &["initialize"]),
            ("mgr", &["manager"]),
            ("msg", &["message"]),
            ("num", &["number"]),
            ("ptr", &["pointer"]),
            ("str", &["string"]),
            ("txn", &["transaction"]),
        ];
        entries.iter().copied().collect()
    };
}

/// How one query word matched one target word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordMatchKind {
    Exact,
    Substring,
    Fuzzy,
    Abbreviation,
    Stem,
    Synonym,
}

impl WordMatchKind {
    /// Layers 1-2 count as exact for phrase ordering purposes.
    pub fn is_exact(&self) -> bool {
        matches!(self, WordMatchKind::Exact | WordMatchKind::Substring)
    }
}

/// One claimed query-word/target-word pair.
#[derive(Debug, Clone)]
pub struct WordMatch {
    pub query_word: String,
    pub target_word: String,
    pub target_position: usize,
    pub kind: WordMatchKind,
    pub score: f64,
}

/// Outcome of matching one phrase against one target symbol.
#[derive(Debug, Clone)]
pub struct PhraseMatch {
    pub score: f64,
    pub matched_words: usize,
    pub total_words: usize,
    pub is_exact_phrase: bool,
    pub word_matches: Vec<WordMatch>,
}

/// A target with its phrase-match outcome, used for ranking.
#[derive(Debug, Clone)]
pub struct PhraseRanking {
    pub target: String,
    pub result: PhraseMatch,
}

/// Six-pass phrase matcher over split words.
pub struct PhraseMatcher {
    splitter: Arc<NameSplitter>,
    fuzzy: Arc<FuzzyMatcher>,
    stemmer: Option<Arc<Stemmer>>,
    dictionary: Arc<TranslationDictionary>,
    config: PhraseConfig,
}

impl PhraseMatcher {
    pub fn new(
        splitter: Arc<NameSplitter>,
        fuzzy: Arc<FuzzyMatcher>,
        stemmer: Option<Arc<Stemmer>>,
        dictionary: Arc<TranslationDictionary>,
        config: PhraseConfig,
    ) -> Self {
        Self {
            splitter,
            fuzzy,
            stemmer,
            dictionary,
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(NameSplitter::new()),
            Arc::new(FuzzyMatcher::with_defaults()),
            Some(Arc::new(Stemmer::with_defaults())),
            Arc::new(TranslationDictionary::new()),
            PhraseConfig::default(),
        )
    }

    /// Match a multi-word query against one target. `None` when either
    /// side has no words or no query word finds a target word.
    pub fn match_phrase(&self, query: &str, target: &str) -> Option<PhraseMatch> {
        let query_words = self.splitter.split(query);
        let target_words = self.splitter.split(target);
        if query_words.is_empty() || target_words.is_empty() {
            return None;
        }

        let mut claimed = vec![false; target_words.len()];
        let mut matches: Vec<Option<WordMatch>> = vec![None; query_words.len()];

        self.pass_exact(&query_words, &target_words, &mut claimed, &mut matches);
        self.pass_substring(&query_words, &target_words, &mut claimed, &mut matches);
        self.pass_fuzzy(&query_words, &target_words, &mut claimed, &mut matches);
        self.pass_abbreviation(&query_words, &target_words, &mut claimed, &mut matches);
        self.pass_stem(&query_words, &target_words, &mut claimed, &mut matches);
        self.pass_synonym(&query_words, &target_words, &mut claimed, &mut matches);

        let word_matches: Vec<WordMatch> = matches.into_iter().flatten().collect();
        if word_matches.is_empty() {
            return None;
        }
        Some(self.score(&query_words, word_matches))
    }

    /// Rank targets by phrase score descending; ties prefer exact phrases,
    /// then shorter targets.
    pub fn rank_phrases(&self, query: &str, targets: &[String]) -> Vec<PhraseRanking> {
        let mut rankings: Vec<PhraseRanking> = targets
            .iter()
            .filter_map(|target| {
                self.match_phrase(query, target).map(|result| PhraseRanking {
                    target: target.clone(),
                    result,
                })
            })
            .collect();
        rankings.sort_by(|a, b| {
            b.result
                .score
                .total_cmp(&a.result.score)
                .then_with(|| b.result.is_exact_phrase.cmp(&a.result.is_exact_phrase))
                .then_with(|| a.target.len().cmp(&b.target.len()))
        });
        rankings
    }

    fn pass_exact(
        &self,
        query_words: &[String],
        target_words: &[String],
        claimed: &mut [bool],
        matches: &mut [Option<WordMatch>],
    ) {
        for (qi, query_word) in query_words.iter().enumerate() {
            if matches[qi].is_some() {
                continue;
            }
            for (ti, target_word) in target_words.iter().enumerate() {
                if !claimed[ti] && query_word == target_word {
                    claimed[ti] = true;
                    matches[qi] = Some(WordMatch {
                        query_word: query_word.clone(),
                        target_word: target_word.clone(),
                        target_position: ti,
                        kind: WordMatchKind::Exact,
                        score: EXACT_WORD_SCORE,
                    });
                    break;
                }
            }
        }
    }

    fn pass_substring(
        &self,
        query_words: &[String],
        target_words: &[String],
        claimed: &mut [bool],
        matches: &mut [Option<WordMatch>],
    ) {
        for (qi, query_word) in query_words.iter().enumerate() {
            if matches[qi].is_some() {
                continue;
            }
            for (ti, target_word) in target_words.iter().enumerate() {
                if !claimed[ti]
                    && (target_word.contains(query_word.as_str())
                        || query_word.contains(target_word.as_str()))
                {
                    claimed[ti] = true;
                    matches[qi] = Some(WordMatch {
                        query_word: query_word.clone(),
                        target_word: target_word.clone(),
                        target_position: ti,
                        kind: WordMatchKind::Substring,
                        score: SUBSTRING_WORD_SCORE,
                    });
                    break;
                }
            }
        }
    }

    fn pass_fuzzy(
        &self,
        query_words: &[String],
        target_words: &[String],
        claimed: &mut [bool],
        matches: &mut [Option<WordMatch>],
    ) {
        if !self.fuzzy.enabled() {
            return;
        }
        let threshold = self.fuzzy.threshold();
        for (qi, query_word) in query_words.iter().enumerate() {
            if matches[qi].is_some() {
                continue;
            }
            let mut best: Option<(usize, f64)> = None;
            for (ti, target_word) in target_words.iter().enumerate() {
                if claimed[ti] {
                    continue;
                }
                let similarity = self.fuzzy.similarity(query_word, target_word);
                if similarity >= threshold
                    && best.map(|(_, s)| similarity > s).unwrap_or(true)
                {
                    best = Some((ti, similarity));
                }
            }
            if let Some((ti, similarity)) = best {
                claimed[ti] = true;
                matches[qi] = Some(WordMatch {
                    query_word: query_word.clone(),
                    target_word: target_words[ti].clone(),
                    target_position: ti,
                    kind: WordMatchKind::Fuzzy,
                    score: similarity,
                });
            }
        }
    }

    fn pass_abbreviation(
        &self,
        query_words: &[String],
        target_words: &[String],
        claimed: &mut [bool],
        matches: &mut [Option<WordMatch>],
    ) {
        for (qi, query_word) in query_words.iter().enumerate() {
            if matches[qi].is_some() {
                continue;
            }
            for (ti, target_word) in target_words.iter().enumerate() {
                if !claimed[ti] && is_abbreviation_pair(query_word, target_word) {
                    claimed[ti] = true;
                    matches[qi] = Some(WordMatch {
                        query_word: query_word.clone(),
                        target_word: target_word.clone(),
                        target_position: ti,
                        kind: WordMatchKind::Abbreviation,
                        score: ABBREVIATION_WORD_SCORE,
                    });
                    break;
                }
            }
        }
    }

    fn pass_stem(
        &self,
        query_words: &[String],
        target_words: &[String],
        claimed: &mut [bool],
        matches: &mut [Option<WordMatch>],
    ) {
        for (qi, query_word) in query_words.iter().enumerate() {
            if matches[qi].is_some() {
                continue;
            }
            let query_stem = self.stem_word(query_word);
            for (ti, target_word) in target_words.iter().enumerate() {
                if !claimed[ti] && self.stem_word(target_word) == query_stem {
                    claimed[ti] = true;
                    matches[qi] = Some(WordMatch {
                        query_word: query_word.clone(),
                        target_word: target_word.clone(),
                        target_position: ti,
                        kind: WordMatchKind::Stem,
                        score: STEM_WORD_SCORE,
                    });
                    break;
                }
            }
        }
    }

    fn pass_synonym(
        &self,
        query_words: &[String],
        target_words: &[String],
        claimed: &mut [bool],
        matches: &mut [Option<WordMatch>],
    ) {
        for (qi, query_word) in query_words.iter().enumerate() {
            if matches[qi].is_some() {
                continue;
            }
            let expansions = self.dictionary.expand(query_word);
            for (ti, target_word) in target_words.iter().enumerate() {
                // The head of the expansion is the query word itself,
                // already handled by the exact pass.
                if !claimed[ti] && expansions[1..].contains(target_word) {
                    claimed[ti] = true;
                    matches[qi] = Some(WordMatch {
                        query_word: query_word.clone(),
                        target_word: target_word.clone(),
                        target_position: ti,
                        kind: WordMatchKind::Synonym,
                        score: SYNONYM_WORD_SCORE,
                    });
                    break;
                }
            }
        }
    }

    fn stem_word(&self, word: &str) -> String {
        match &self.stemmer {
            Some(stemmer) => stemmer.stem(word),
            None => strip_suffix_fallback(word).to_string(),
        }
    }

    fn score(&self, query_words: &[String], word_matches: Vec<WordMatch>) -> PhraseMatch {
        let total_words = query_words.len();
        let matched = word_matches.len();
        let sum: f64 = word_matches.iter().map(|m| m.score).sum();
        let mut score = sum / total_words as f64 * AVERAGE_DAMPING;

        let positions: Vec<usize> = word_matches.iter().map(|m| m.target_position).collect();
        let ordered_pairs = positions
            .windows(2)
            .filter(|pair| pair[1] > pair[0])
            .count();
        let in_order = ordered_pairs == matched.saturating_sub(1);
        let all_matched = matched == total_words;
        let fuzzy_count = word_matches
            .iter()
            .filter(|m| m.kind == WordMatchKind::Fuzzy)
            .count();
        let all_exact = word_matches.iter().all(|m| m.kind.is_exact());

        if all_matched && in_order {
            score += self.config.exact_phrase_bonus;
        } else if all_matched {
            score += self.config.all_words_bonus;
        }
        if in_order {
            score += self.config.word_order_bonus * ordered_pairs as f64;
        } else {
            score -= self.config.word_order_bonus * matched as f64;
        }
        score -= self.config.fuzzy_penalty * fuzzy_count as f64 / matched as f64;

        PhraseMatch {
            score: score.clamp(0.0, 1.0),
            matched_words: matched,
            total_words,
            is_exact_phrase: all_exact && all_matched && in_order,
            word_matches,
        }
    }
}

/// Built-in table membership either direction, or a shared prefix of at
/// least three characters.
fn is_abbreviation_pair(a: &str, b: &str) -> bool {
    let table_hit = WORD_ABBREVIATIONS
        .get(a)
        .map(|expansions| expansions.contains(&b))
        .unwrap_or(false)
        || WORD_ABBREVIATIONS
            .get(b)
            .map(|expansions| expansions.contains(&a))
            .unwrap_or(false);
    if table_hit {
        return true;
    }
    (a.len() >= MIN_ABBREVIATION_PREFIX && a != b && b.starts_with(a))
        || (b.len() >= MIN_ABBREVIATION_PREFIX && a != b && a.starts_with(b))
}

/// Suffix-stripping stand-in used when no stemmer is supplied.
fn strip_suffix_fallback(word: &str) -> &str {
    for suffix in ["ing", "ed", "es", "er", "s"] {
        if word.len() > suffix.len() + 2 {
            if let Some(stripped) = word.strip_suffix(suffix) {
                return stripped;
            }
        }
    }
    word
}
