//! English stemming (Porter2) with enablement gates.
//!
//! The algorithm is ported in-tree: deterministic, idempotent on its own
//! output for the vocabulary that matters here, with the standard
//! exception lists. Words below the configured minimum length, words in
//! the exclusion set, and non-ASCII words pass through unchanged.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::config::{StemAlgorithm, StemmerConfig};
use crate::error::Result;

const VOWELS: &[u8] = b"aeiouy";
const DOUBLES: &[&str] = &["bb", "dd", "ff", "gg", "mm", "nn", "pp", "rr", "tt"];
const LI_ENDINGS: &[u8] = b"cdeghkmnrt";

/// Irregular forms applied before the main algorithm.
static SPECIAL_FORMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("skis", "ski"),
        ("skies", "sky"),
        ("dying", "die"),
        ("lying", "lie"),
        ("tying", "tie"),
        ("idly", "idl"),
        ("gently", "gentl"),
        ("ugly", "ugli"),
        ("early", "earli"),
        ("only", "onli"),
        ("singly", "singl"),
    ]
    .into_iter()
    .collect()
});

/// Words the algorithm must leave untouched.
static INVARIANT_FORMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["sky", "news", "howe", "atlas", "cosmos", "bias", "andes"]
        .into_iter()
        .collect()
});

/// Words frozen after step 1a.
static POST_1A_STOPS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "inning", "outing", "canning", "herring", "earring", "proceed", "exceed", "succeed",
    ]
    .into_iter()
    .collect()
});

/// Configured stemmer shared across matchers.
pub struct Stemmer {
    config: StemmerConfig,
    exclusions: HashSet<String>,
}

impl Stemmer {
    pub fn new(config: StemmerConfig) -> Result<Self> {
        config.validate()?;
        let exclusions = config
            .exclusions
            .iter()
            .map(|word| word.to_lowercase())
            .collect();
        Ok(Self { config, exclusions })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: StemmerConfig::default(),
            exclusions: HashSet::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn min_length(&self) -> usize {
        self.config.min_length
    }

    /// Stem a word, honoring the enablement, exclusion, and length gates.
    pub fn stem(&self, word: &str) -> String {
        if !self.config.enabled
            || self.config.algorithm == StemAlgorithm::None
            || word.len() < self.config.min_length
            || self.exclusions.contains(&word.to_lowercase())
        {
            return word.to_string();
        }
        porter2_stem(word)
    }

    /// Group words by their stem, preserving first-seen stem order within
    /// each group.
    pub fn stem_and_group(&self, words: &[String]) -> HashMap<String, Vec<String>> {
        let mut groups: HashMap<String, Vec<String>> = HashMap::new();
        for word in words {
            groups
                .entry(self.stem(word))
                .or_default()
                .push(word.clone());
        }
        groups
    }

    /// Candidates sharing `word`'s stem.
    pub fn variations_of(&self, word: &str, candidates: &[String]) -> Vec<String> {
        let target = self.stem(word);
        candidates
            .iter()
            .filter(|candidate| self.stem(candidate) == target)
            .cloned()
            .collect()
    }
}

impl Default for Stemmer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Porter2 (English) stem of a single word.
pub fn porter2_stem(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.len() <= 2 || !lower.is_ascii() {
        return lower;
    }

    if let Some(stem) = SPECIAL_FORMS.get(lower.as_str()) {
        return (*stem).to_string();
    }
    if INVARIANT_FORMS.contains(lower.as_str()) {
        return lower;
    }

    let mut w: Vec<u8> = lower.into_bytes();
    if w[0] == b'\'' {
        w.remove(0);
    }
    mark_consonant_ys(&mut w);
    let (r1, r2) = regions(&w);

    step0(&mut w);
    step1a(&mut w);

    if let Ok(text) = std::str::from_utf8(&w) {
        if POST_1A_STOPS.contains(text) {
            return unmark(&w);
        }
    }

    step1b(&mut w, r1);
    step1c(&mut w);
    step2(&mut w, r1);
    step3(&mut w, r1, r2);
    step4(&mut w, r2);
    step5(&mut w, r1, r2);

    unmark(&w)
}

fn is_vowel(b: u8) -> bool {
    VOWELS.contains(&b)
}

/// Upper-case `Y` marks a consonant y: initial y, or y after a vowel.
fn mark_consonant_ys(w: &mut [u8]) {
    for i in 0..w.len() {
        if w[i] == b'y' && (i == 0 || is_vowel(w[i - 1])) {
            w[i] = b'Y';
        }
    }
}

fn unmark(w: &[u8]) -> String {
    w.iter()
        .map(|&b| if b == b'Y' { 'y' } else { b as char })
        .collect()
}

/// R1 starts after the first vowel/non-vowel pair; R2 repeats the rule
/// inside R1. Words with the prefixes gener-, commun-, arsen- pin R1.
fn regions(w: &[u8]) -> (usize, usize) {
    let r1 = if w.starts_with(b"gener") || w.starts_with(b"arsen") {
        5
    } else if w.starts_with(b"commun") {
        6
    } else {
        region_after(w, 0)
    };
    let r2 = region_after(w, r1);
    (r1, r2)
}

fn region_after(w: &[u8], from: usize) -> usize {
    let mut i = from;
    while i + 1 < w.len() {
        if is_vowel(w[i]) && !is_vowel(w[i + 1]) {
            return i + 2;
        }
        i += 1;
    }
    w.len()
}

fn ends_with(w: &[u8], suffix: &str) -> bool {
    w.len() >= suffix.len() && &w[w.len() - suffix.len()..] == suffix.as_bytes()
}

/// Whether a suffix of the given length starts at or after a region mark.
fn in_region(w: &[u8], region: usize, suffix_len: usize) -> bool {
    w.len() >= suffix_len && w.len() - suffix_len >= region
}

fn has_vowel(w: &[u8]) -> bool {
    w.iter().copied().any(is_vowel)
}

fn truncate(w: &mut Vec<u8>, by: usize) {
    let new_len = w.len().saturating_sub(by);
    w.truncate(new_len);
}

/// Strip possessive endings.
fn step0(w: &mut Vec<u8>) {
    for suffix in ["'s'", "'s", "'"] {
        if ends_with(w, suffix) {
            truncate(w, suffix.len());
            return;
        }
    }
}

fn step1a(w: &mut Vec<u8>) {
    if ends_with(w, "sses") {
        truncate(w, 2);
        return;
    }
    if ends_with(w, "ied") || ends_with(w, "ies") {
        if w.len() > 4 {
            truncate(w, 2);
        } else {
            truncate(w, 1);
        }
        return;
    }
    if ends_with(w, "ss") || ends_with(w, "us") {
        return;
    }
    if ends_with(w, "s") {
        // Delete only when a vowel precedes the penultimate character.
        if w.len() >= 3 && has_vowel(&w[..w.len() - 2]) {
            truncate(w, 1);
        }
    }
}

fn step1b(w: &mut Vec<u8>, r1: usize) {
    for suffix in ["eedly", "eed"] {
        if ends_with(w, suffix) {
            if in_region(w, r1, suffix.len()) {
                truncate(w, suffix.len());
                w.extend_from_slice(b"ee");
            }
            return;
        }
    }
    for suffix in ["ingly", "edly", "ing", "ed"] {
        if ends_with(w, suffix) {
            if has_vowel(&w[..w.len() - suffix.len()]) {
                truncate(w, suffix.len());
                if ends_with(w, "at") || ends_with(w, "bl") || ends_with(w, "iz") {
                    w.push(b'e');
                } else if DOUBLES.iter().any(|d| ends_with(w, d)) {
                    truncate(w, 1);
                } else if is_short_word(w, r1) {
                    w.push(b'e');
                }
            }
            return;
        }
    }
}

fn step1c(w: &mut Vec<u8>) {
    let n = w.len();
    if n > 2 && (w[n - 1] == b'y' || w[n - 1] == b'Y') && !is_vowel(w[n - 2]) {
        w[n - 1] = b'i';
    }
}

fn step2(w: &mut Vec<u8>, r1: usize) {
    const RULES: &[(&str, &str)] = &[
        ("ization", "ize"),
        ("ational", "ate"),
        ("fulness", "ful"),
        ("ousness", "ous"),
        ("iveness", "ive"),
        ("tional", "tion"),
        ("biliti", "ble"),
        ("lessli", "less"),
        ("entli", "ent"),
        ("ation", "ate"),
        ("alism", "al"),
        ("aliti", "al"),
        ("ousli", "ous"),
        ("iviti", "ive"),
        ("fulli", "ful"),
        ("enci", "ence"),
        ("anci", "ance"),
        ("abli", "able"),
        ("izer", "ize"),
        ("ator", "ate"),
        ("alli", "al"),
        ("bli", "ble"),
    ];
    for (suffix, replacement) in RULES {
        if ends_with(w, suffix) {
            if in_region(w, r1, suffix.len()) {
                truncate(w, suffix.len());
                w.extend_from_slice(replacement.as_bytes());
            }
            return;
        }
    }
    if ends_with(w, "ogi") {
        if in_region(w, r1, 3) && w.len() >= 4 && w[w.len() - 4] == b'l' {
            truncate(w, 1);
        }
        return;
    }
    if ends_with(w, "li")
        && in_region(w, r1, 2)
        && w.len() >= 3
        && LI_ENDINGS.contains(&w[w.len() - 3])
    {
        truncate(w, 2);
    }
}

fn step3(w: &mut Vec<u8>, r1: usize, r2: usize) {
    const RULES: &[(&str, &str)] = &[
        ("ational", "ate"),
        ("tional", "tion"),
        ("alize", "al"),
        ("icate", "ic"),
        ("iciti", "ic"),
        ("ical", "ic"),
        ("ness", ""),
        ("ful", ""),
    ];
    if ends_with(w, "ative") {
        if in_region(w, r2, 5) {
            truncate(w, 5);
        }
        return;
    }
    for (suffix, replacement) in RULES {
        if ends_with(w, suffix) {
            if in_region(w, r1, suffix.len()) {
                truncate(w, suffix.len());
                w.extend_from_slice(replacement.as_bytes());
            }
            return;
        }
    }
}

fn step4(w: &mut Vec<u8>, r2: usize) {
    const SUFFIXES: &[&str] = &[
        "ement", "ance", "ence", "able", "ible", "ment", "ant", "ent", "ism", "ate", "iti", "ous",
        "ive", "ize", "al", "er", "ic",
    ];
    if ends_with(w, "ion") {
        if in_region(w, r2, 3) && w.len() >= 4 && (w[w.len() - 4] == b's' || w[w.len() - 4] == b't')
        {
            truncate(w, 3);
        }
        return;
    }
    for suffix in SUFFIXES {
        if ends_with(w, suffix) {
            if in_region(w, r2, suffix.len()) {
                truncate(w, suffix.len());
            }
            return;
        }
    }
}

fn step5(w: &mut Vec<u8>, r1: usize, r2: usize) {
    let n = w.len();
    if n == 0 {
        return;
    }
    if w[n - 1] == b'e' {
        if in_region(w, r2, 1) || (in_region(w, r1, 1) && !ends_in_short_syllable(&w[..n - 1])) {
            truncate(w, 1);
        }
        return;
    }
    if w[n - 1] == b'l' && in_region(w, r2, 1) && n >= 2 && w[n - 2] == b'l' {
        truncate(w, 1);
    }
}

/// Short syllable: vowel + non-vowel (not w, x, Y) preceded by a
/// non-vowel, or a vowel/non-vowel pair at the start of the word.
fn ends_in_short_syllable(w: &[u8]) -> bool {
    let n = w.len();
    if n == 2 {
        return is_vowel(w[0]) && !is_vowel(w[1]);
    }
    if n >= 3 {
        let c = w[n - 1];
        return !is_vowel(w[n - 3])
            && is_vowel(w[n - 2])
            && !is_vowel(c)
            && c != b'w'
            && c != b'x'
            && c != b'Y';
    }
    false
}

fn is_short_word(w: &[u8], r1: usize) -> bool {
    r1 >= w.len() && ends_in_short_syllable(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_stems() {
        let cases = [
            ("running", "run"),
            ("runner", "runner"),
            ("authentication", "authent"),
            ("authenticate", "authent"),
            ("connection", "connect"),
            ("connections", "connect"),
            ("caresses", "caress"),
            ("ponies", "poni"),
            ("cats", "cat"),
            ("agreed", "agre"),
            ("hopping", "hop"),
            ("hoping", "hope"),
            ("happy", "happi"),
            ("relational", "relat"),
            ("conditional", "condit"),
            ("generalization", "general"),
        ];
        for (word, expected) in cases {
            assert_eq!(porter2_stem(word), expected, "stem of {:?}", word);
        }
    }

    #[test]
    fn test_special_and_invariant_forms() {
        assert_eq!(porter2_stem("dying"), "die");
        assert_eq!(porter2_stem("skies"), "sky");
        assert_eq!(porter2_stem("news"), "news");
        assert_eq!(porter2_stem("proceed"), "proceed");
        assert_eq!(porter2_stem("sky"), "sky");
    }

    #[test]
    fn test_short_words_untouched() {
        assert_eq!(porter2_stem("at"), "at");
        assert_eq!(porter2_stem("by"), "by");
    }

    #[test]
    fn test_deterministic_and_stable() {
        for word in ["running", "authentication", "connections", "happiness"] {
            let once = porter2_stem(word);
            assert_eq!(porter2_stem(word), once);
            // Stable on its own output for this vocabulary.
            assert_eq!(porter2_stem(&once), once, "restem of {:?}", word);
        }
    }

    #[test]
    fn test_gates_return_original() {
        let disabled = Stemmer::new(StemmerConfig {
            enabled: false,
            ..StemmerConfig::default()
        })
        .unwrap();
        assert_eq!(disabled.stem("running"), "running");

        let short_gate = Stemmer::with_defaults();
        assert_eq!(short_gate.stem("go"), "go");

        let mut config = StemmerConfig::default();
        config.exclusions.insert("Running".to_string());
        let excluded = Stemmer::new(config).unwrap();
        assert_eq!(excluded.stem("running"), "running");
        assert_eq!(excluded.stem("jumping"), "jump");
    }

    #[test]
    fn test_none_algorithm_passthrough() {
        let stemmer = Stemmer::new(StemmerConfig {
            algorithm: StemAlgorithm::None,
            ..StemmerConfig::default()
        })
        .unwrap();
        assert_eq!(stemmer.stem("running"), "running");
    }

    #[test]
    fn test_stem_and_group() {
        let stemmer = Stemmer::with_defaults();
        let words = vec![
            "connect".to_string(),
            "connection".to_string(),
            "connections".to_string(),
            "running".to_string(),
        ];
        let groups = stemmer.stem_and_group(&words);
        assert_eq!(groups["connect"].len(), 3);
        assert_eq!(groups["run"], vec!["running"]);
    }

    #[test]
    fn test_variations_of() {
        let stemmer = Stemmer::with_defaults();
        let candidates = vec![
            "connected".to_string(),
            "connecting".to_string(),
            "disconnect".to_string(),
        ];
        let variations = stemmer.variations_of("connection", &candidates);
        assert_eq!(variations, vec!["connected", "connecting"]);
    }
}
