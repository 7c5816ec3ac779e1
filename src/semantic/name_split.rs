//! Identifier splitting.
//!
//! Tokenizes symbol names into lowercase words along separators, case
//! transitions, acronym runs, and letter/digit boundaries. A bounded LRU
//! memoizes splits; identifiers repeat heavily inside one source tree.

use std::sync::{Arc, Mutex};

use crate::cache::lru::LruCache;
use crate::config::SplitterConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharKind {
    Lower,
    Upper,
    Digit,
    Other,
}

fn kind(c: char) -> CharKind {
    if c.is_ascii_digit() {
        CharKind::Digit
    } else if c.is_uppercase() {
        CharKind::Upper
    } else if c.is_lowercase() || c.is_alphabetic() {
        CharKind::Lower
    } else {
        CharKind::Other
    }
}

/// Split an identifier into lowercase word tokens.
///
/// `XMLHttpRequest` becomes `["xml", "http", "request"]`: an upper→lower
/// transition that follows another upper letter terminates the acronym on
/// the second-to-last upper. Letter/digit transitions and the separators
/// `_ - . /` (and any other non-alphanumeric byte) also begin new tokens.
pub fn split_identifier(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for i in 0..chars.len() {
        let c = chars[i];
        let k = kind(c);
        if k == CharKind::Other {
            flush(&mut current, &mut tokens);
            continue;
        }

        if !current.is_empty() {
            let prev = kind(chars[i - 1]);
            if prev == CharKind::Upper
                && k == CharKind::Lower
                && i >= 2
                && kind(chars[i - 2]) == CharKind::Upper
            {
                // Acronym run ends: the previous upper starts the new word.
                let carried = current.pop();
                flush(&mut current, &mut tokens);
                if let Some(carried) = carried {
                    current.push(carried);
                }
            } else {
                let boundary = matches!(
                    (prev, k),
                    (CharKind::Lower, CharKind::Upper)
                        | (CharKind::Lower, CharKind::Digit)
                        | (CharKind::Upper, CharKind::Digit)
                        | (CharKind::Digit, CharKind::Lower)
                        | (CharKind::Digit, CharKind::Upper)
                );
                if boundary {
                    flush(&mut current, &mut tokens);
                }
            }
        }
        current.push(c);
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(current.to_lowercase());
        current.clear();
    }
}

/// Thread-safe splitter with a bounded memo of recent splits.
pub struct NameSplitter {
    cache: Mutex<LruCache<String, Arc<Vec<String>>>>,
}

impl NameSplitter {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(SplitterConfig::default().cache_size)),
        }
    }

    pub fn with_config(config: SplitterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: Mutex::new(LruCache::new(config.cache_size)),
        })
    }

    /// Split `name`, consulting and updating the memo.
    pub fn split(&self, name: &str) -> Arc<Vec<String>> {
        if name.is_empty() {
            return Arc::new(Vec::new());
        }
        let key = name.to_string();
        {
            let mut cache = self.lock_cache();
            if let Some(hit) = cache.get(&key) {
                return Arc::clone(hit);
            }
        }
        // Split outside the lock; inserting twice under a race is harmless.
        let tokens = Arc::new(split_identifier(name));
        self.lock_cache().insert(key, Arc::clone(&tokens));
        tokens
    }

    pub fn cached_entries(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<Vec<String>>>> {
        self.cache.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Mutex poisoned in NameSplitter");
            poisoned.into_inner()
        })
    }
}

impl Default for NameSplitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(name: &str) -> Vec<String> {
        split_identifier(name)
    }

    #[test]
    fn test_separators() {
        assert_eq!(split("snake_case_name"), vec!["snake", "case", "name"]);
        assert_eq!(split("kebab-case"), vec!["kebab", "case"]);
        assert_eq!(split("dotted.path/segment"), vec!["dotted", "path", "segment"]);
    }

    #[test]
    fn test_camel_and_pascal_case() {
        assert_eq!(split("camelCaseName"), vec!["camel", "case", "name"]);
        assert_eq!(split("PascalCase"), vec!["pascal", "case"]);
    }

    #[test]
    fn test_acronym_runs() {
        assert_eq!(split("XMLHttpRequest"), vec!["xml", "http", "request"]);
        assert_eq!(split("HTTPClient"), vec!["http", "client"]);
        assert_eq!(split("parseJSON"), vec!["parse", "json"]);
    }

    #[test]
    fn test_digit_transitions() {
        assert_eq!(split("base64Encode"), vec!["base", "64", "encode"]);
        assert_eq!(split("sha256"), vec!["sha", "256"]);
        assert_eq!(split("2fa"), vec!["2", "fa"]);
    }

    #[test]
    fn test_edge_shapes() {
        assert_eq!(split(""), Vec::<String>::new());
        assert_eq!(split("___"), Vec::<String>::new());
        assert_eq!(split("_leading_trailing_"), vec!["leading", "trailing"]);
        assert_eq!(split("x"), vec!["x"]);
    }

    #[test]
    fn test_tokens_lowercase_nonempty() {
        for name in ["XMLHttpRequest", "do_HTTP2_Call", "weird__Name-3x"] {
            for token in split(name) {
                assert!(!token.is_empty());
                assert_eq!(token, token.to_lowercase());
            }
        }
    }

    #[test]
    fn test_idempotent_on_joined_output() {
        for name in ["XMLHttpRequest", "base64Encode", "snake_case", "HTTPClient2"] {
            let once = split(name);
            let rejoined = once.join("_");
            assert_eq!(split(&rejoined), once, "splitting {:?} twice", name);
        }
    }

    #[test]
    fn test_memo_returns_same_split() {
        let splitter = NameSplitter::new();
        let first = splitter.split("XMLHttpRequest");
        let second = splitter.split("XMLHttpRequest");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, vec!["xml", "http", "request"]);
        assert_eq!(splitter.cached_entries(), 1);
    }

    #[test]
    fn test_memo_eviction_is_bounded() {
        let splitter = NameSplitter::with_config(SplitterConfig { cache_size: 4 }).unwrap();
        for i in 0..10 {
            splitter.split(&format!("name{}", i));
        }
        assert_eq!(splitter.cached_entries(), 4);
    }
}
