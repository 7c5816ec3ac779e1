//! Semantic Search Tests
//!
//! End-to-end scorer scenarios: phrase ranking, typo tolerance,
//! bidirectional abbreviations, and the universal score invariants.

use lightning_index::semantic::{SemanticScorer, TranslationDictionary};
use lightning_index::types::MatchKind;

fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn phrase_query_ranks_exact_compound_first() {
    let scorer = SemanticScorer::new();
    let results = scorer.score_many(
        "HTTP client",
        &symbols(&[
            "HTTPClient",
            "HttpClientRequest",
            "ClientHTTP",
            "HTTPConnection",
            "DatabaseClient",
            "SomethingElse",
        ]),
    );

    assert_eq!(results[0].symbol, "HTTPClient");
    for pair in results.windows(2) {
        assert!(pair[0].score.score >= pair[1].score.score);
    }
    // "SomethingElse" shares nothing with the query: absent or last.
    match results.iter().position(|r| r.symbol == "SomethingElse") {
        None => {}
        Some(position) => assert_eq!(position, results.len() - 1),
    }
}

#[test]
fn typo_resolves_through_fuzzy_layer() {
    let scorer = SemanticScorer::new();
    let results = scorer.score_many(
        "authentificate",
        &symbols(&["authenticate", "Authentication", "authorizeUser"]),
    );
    assert_eq!(results[0].symbol, "authenticate");
    assert_eq!(results[0].score.match_kind, MatchKind::Fuzzy);
    assert!(results[0].score.score > 0.55);
}

#[test]
fn abbreviations_expand_both_ways() {
    let dictionary = TranslationDictionary::new();

    let auth = dictionary.expand("auth");
    for term in ["authenticate", "login", "signin"] {
        assert!(auth.contains(&term.to_string()), "expand(auth) missing {}", term);
    }

    let transaction = dictionary.expand("transaction");
    assert!(transaction.contains(&"txn".to_string()));

    let scorer = SemanticScorer::new();
    let score = scorer.score("transaction", "processTxn");
    assert_eq!(score.match_kind, MatchKind::Abbreviation);
    assert!(score.score > 0.0);
}

#[test]
fn expansion_head_and_dedup_invariants() {
    let dictionary = TranslationDictionary::new();
    for term in ["Auth", "TRANSACTION", "login", "weird_unknown"] {
        let expanded = dictionary.expand(term);
        assert_eq!(expanded[0], term.to_lowercase());
        let mut seen = std::collections::HashSet::new();
        for entry in &expanded {
            assert!(seen.insert(entry.clone()), "duplicate {:?} for {:?}", entry, term);
            assert_eq!(entry, &entry.to_lowercase());
        }
    }
}

#[test]
fn scores_and_confidences_stay_in_unit_range() {
    let scorer = SemanticScorer::new();
    let queries = [
        "HTTP client",
        "authentificate",
        "transaction",
        "parse config",
        "zzz",
    ];
    let candidates = symbols(&[
        "HTTPClient",
        "authenticate",
        "processTxn",
        "parseConfigFile",
        "unrelatedSymbol",
    ]);
    for query in queries {
        for candidate in &candidates {
            let score = scorer.score(query, candidate);
            assert!(score.is_valid(), "invalid score for {:?}/{:?}", query, candidate);
            assert!((0.0..=1.0).contains(&score.score));
            assert!((0.0..=1.0).contains(&score.confidence));
        }
    }
}

#[test]
fn score_many_output_is_ranked_filtered_and_bounded() {
    let scorer = SemanticScorer::new();
    let candidates: Vec<String> = (0..100)
        .map(|i| format!("userHandler{}", i))
        .chain(symbols(&["user", "getUser", "unrelated"]))
        .collect();
    let results = scorer.score_many("user", &candidates);

    let max_results = scorer.config().layers.max_results;
    let min_score = scorer.config().layers.min_score;
    assert!(results.len() <= max_results);
    for (index, result) in results.iter().enumerate() {
        assert_eq!(result.rank, index + 1);
        assert!(result.score.score >= min_score);
    }
    for pair in results.windows(2) {
        assert!(pair[0].score.score >= pair[1].score.score);
    }
    assert_eq!(results[0].symbol, "user");
}

#[test]
fn search_reports_candidates_and_timing() {
    let scorer = SemanticScorer::new();
    let report = scorer.search("HTTP client", &symbols(&["HTTPClient", "Other"]));
    assert_eq!(report.candidates_considered, 2);
    assert_eq!(report.results_returned, report.results.len());
    assert_eq!(report.query, "HTTP client");
}

#[test]
fn concurrent_scoring_shares_caches_safely() {
    let scorer = std::sync::Arc::new(SemanticScorer::new());
    let candidates = std::sync::Arc::new(symbols(&[
        "HTTPClient",
        "authenticate",
        "parseConfigFile",
        "TokenStore",
    ]));
    let mut handles = Vec::new();
    for worker in 0..6 {
        let scorer = std::sync::Arc::clone(&scorer);
        let candidates = std::sync::Arc::clone(&candidates);
        handles.push(std::thread::spawn(move || {
            let queries = ["HTTP client", "authentificate", "parse config", "token"];
            for i in 0..40 {
                let query = queries[(worker + i) % queries.len()];
                let results = scorer.score_many(query, &candidates);
                for result in results {
                    assert!(result.score.is_valid());
                }
            }
        }));
    }
    for handle in handles {
        handle.join().expect("scoring worker panicked");
    }
    // Four distinct queries were analyzed.
    assert_eq!(scorer.cached_queries(), 4);
}
