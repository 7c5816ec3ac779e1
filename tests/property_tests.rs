//! Property Tests
//!
//! Fuzz-style invariants for the classifier, literal extractor, name
//! splitter, and slab pool: no panics on arbitrary input, deterministic
//! outputs, and structural guarantees.

use proptest::prelude::*;

use lightning_index::cache::memory_pool::SlabPool;
use lightning_index::pattern::{classify, extract_literals, is_simple};
use lightning_index::semantic::split_identifier;

proptest! {
    #[test]
    fn classifier_never_panics_and_is_deterministic(pattern in ".*") {
        let first = classify(&pattern);
        let second = classify(&pattern);
        prop_assert_eq!(first, second);
        prop_assert_eq!(is_simple(&pattern), first.is_simple());
    }

    #[test]
    fn classifier_handles_regex_shaped_input(pattern in r"[\(\)\[\]\{\}\|\\\*\+\?a-z0-9]{0,64}") {
        // Deliberately malformed regex fragments must classify quietly.
        let _ = classify(&pattern);
    }

    #[test]
    fn extracted_literals_are_wellformed_substrings(pattern in ".*") {
        let literals = extract_literals(&pattern);
        // Deterministic.
        prop_assert_eq!(&literals, &extract_literals(&pattern));
        let mut seen = std::collections::HashSet::new();
        for literal in &literals {
            prop_assert!(literal.len() >= 3);
            prop_assert!(literal.chars().any(|c| c.is_ascii_alphanumeric()));
            prop_assert!(pattern.contains(literal.as_str()));
            prop_assert!(seen.insert(literal.clone()), "duplicate literal");
        }
    }

    #[test]
    fn split_tokens_are_lowercase_nonempty(name in ".*") {
        for token in split_identifier(&name) {
            prop_assert!(!token.is_empty());
            prop_assert_eq!(token.clone(), token.to_lowercase());
        }
    }

    #[test]
    fn split_is_idempotent_over_underscore_join(name in r"[A-Za-z0-9_\-\./ ]{0,40}") {
        let once = split_identifier(&name);
        let rejoined = once.join("_");
        prop_assert_eq!(split_identifier(&rejoined), once);
    }

    #[test]
    fn pool_get_covers_request(requested in 0usize..2048) {
        let pool: SlabPool<u8> = SlabPool::with_default_tiers();
        let buffer = pool.get(requested);
        prop_assert!(buffer.capacity() >= requested);
        prop_assert!(buffer.is_empty());
        pool.put(buffer);
    }
}
