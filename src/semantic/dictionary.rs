//! Abbreviation, domain, and language-term expansion.
//!
//! A read-mostly vocabulary built once and frozen: forward abbreviation
//! expansions, a reverse index (which abbreviations expand *to* a term),
//! and per-domain peer terms. Ships with a built-in programming
//! vocabulary so semantic search works out of the box; embedders can
//! supply their own tables at construction.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

use crate::config::{FuzzyConfig, StemmerConfig};

const DEFAULT_ABBREVIATIONS: &[(&str, &[&str])] = &[
    ("addr", &["address"]),
    ("auth", &["authenticate", "authorization", "login", "signin"]),
    ("btn", &["button"]),
    ("buf", &["buffer"]),
    ("calc", &["calculate"]),
    ("cfg", &["config", "configuration"]),
    ("cmd", &["command"]),
    ("config", &["configuration"]),
    ("conn", &["connection"]),
    ("ctx", &["context"]),
    ("db", &["database"]),
    ("del", &["delete"]),
    ("dir", &["directory"]),
    ("doc", &["document"]),
    ("env", &["environment"]),
    ("err", &["error"]),
    ("fn", &["function"]),
    ("func", &["function"]),
    ("idx", &["index"]),
    ("impl", &["implementation", "implement"]),
    ("init", &["initialize", "initialization"]),
    ("iter", &["iterator", "iterate"]),
    ("len", &["length"]),
    ("lib", &["library"]),
    ("max", &["maximum"]),
    ("mgr", &["manager"]),
    ("min", &["minimum"]),
    ("msg", &["message"]),
    ("num", &["number"]),
    ("obj", &["object"]),
    ("param", &["parameter"]),
    ("pkg", &["package"]),
    ("pos", &["position"]),
    ("prev", &["previous"]),
    ("proc", &["process", "procedure"]),
    ("ptr", &["pointer"]),
    ("repo", &["repository"]),
    ("req", &["request"]),
    ("res", &["response", "result"]),
    ("resp", &["response"]),
    ("str", &["string"]),
    ("svc", &["service"]),
    ("sync", &["synchronize", "synchronization"]),
    ("tmp", &["temporary"]),
    ("txn", &["transaction"]),
    ("util", &["utility", "utilities"]),
    ("val", &["value"]),
    ("var", &["variable"]),
    ("win", &["window"]),
];

const DEFAULT_DOMAINS: &[(&str, &[&str])] = &[
    (
        "authentication",
        &[
            "login",
            "signin",
            "logout",
            "token",
            "authenticate",
            "credential",
            "password",
            "session",
        ],
    ),
    (
        "database",
        &[
            "query",
            "table",
            "schema",
            "index",
            "transaction",
            "record",
            "migration",
        ],
    ),
    (
        "networking",
        &["socket", "http", "request", "response", "connection", "protocol"],
    ),
    (
        "error-handling",
        &["error", "exception", "panic", "failure", "recover", "retry"],
    ),
    (
        "caching",
        &["cache", "evict", "expire", "invalidate", "memoize"],
    ),
    (
        "concurrency",
        &["thread", "mutex", "lock", "atomic", "channel", "spawn"],
    ),
];

const DEFAULT_LANGUAGE_TERMS: &[(&str, &[(&str, f64)])] = &[
    (
        "rust",
        &[
            ("fn", 0.9),
            ("struct", 0.9),
            ("impl", 0.9),
            ("trait", 0.85),
            ("crate", 0.8),
            ("mod", 0.8),
        ],
    ),
    (
        "go",
        &[
            ("func", 0.9),
            ("struct", 0.85),
            ("goroutine", 0.85),
            ("chan", 0.8),
        ],
    ),
    ("python", &[("def", 0.9), ("init", 0.8), ("self", 0.7)]),
];

lazy_static! {
    /// Shared built-in vocabulary; dictionaries constructed with `new`
    /// clone these frozen tables instead of re-parsing the constants.
    static ref BUILTIN_TABLES: (
        HashMap<String, Vec<String>>,
        HashMap<String, Vec<String>>,
        HashMap<String, HashMap<String, f64>>,
    ) = {
        let abbreviations = DEFAULT_ABBREVIATIONS
            .iter()
            .map(|(abbr, expansions)| {
                (
                    (*abbr).to_string(),
                    expansions.iter().map(|e| (*e).to_string()).collect(),
                )
            })
            .collect();
        let domains = DEFAULT_DOMAINS
            .iter()
            .map(|(domain, terms)| {
                (
                    (*domain).to_string(),
                    terms.iter().map(|t| (*t).to_string()).collect(),
                )
            })
            .collect();
        let languages = DEFAULT_LANGUAGE_TERMS
            .iter()
            .map(|(language, terms)| {
                (
                    (*language).to_string(),
                    terms
                        .iter()
                        .map(|(term, weight)| ((*term).to_string(), *weight))
                        .collect(),
                )
            })
            .collect();
        (abbreviations, domains, languages)
    };
}

/// Frozen bidirectional vocabulary for the abbreviation and synonym
/// layers.
pub struct TranslationDictionary {
    abbreviations: HashMap<String, Vec<String>>,
    domains: HashMap<String, Vec<String>>,
    language_terms: HashMap<String, HashMap<String, f64>>,
    /// Full term -> abbreviations that expand to it.
    reverse_abbreviations: HashMap<String, Vec<String>>,
    /// Term -> peer terms across every domain containing it.
    domain_peers: HashMap<String, Vec<String>>,
    fuzzy: FuzzyConfig,
    stemming: StemmerConfig,
}

impl TranslationDictionary {
    /// The built-in programming vocabulary.
    pub fn new() -> Self {
        let (abbreviations, domains, languages) = BUILTIN_TABLES.clone();
        Self::with_tables(abbreviations, domains, languages)
    }

    /// Build from caller-supplied tables. Keys and values are lowercased;
    /// the reverse index and peer map are derived here and never change.
    pub fn with_tables(
        abbreviations: HashMap<String, Vec<String>>,
        domains: HashMap<String, Vec<String>>,
        language_terms: HashMap<String, HashMap<String, f64>>,
    ) -> Self {
        let abbreviations: HashMap<String, Vec<String>> = abbreviations
            .into_iter()
            .map(|(abbr, expansions)| {
                (
                    abbr.to_lowercase(),
                    expansions.into_iter().map(|e| e.to_lowercase()).collect(),
                )
            })
            .collect();
        let domains: HashMap<String, Vec<String>> = domains
            .into_iter()
            .map(|(domain, terms)| {
                (
                    domain.to_lowercase(),
                    terms.into_iter().map(|t| t.to_lowercase()).collect(),
                )
            })
            .collect();
        let language_terms: HashMap<String, HashMap<String, f64>> = language_terms
            .into_iter()
            .map(|(language, terms)| {
                (
                    language.to_lowercase(),
                    terms
                        .into_iter()
                        .map(|(term, weight)| (term.to_lowercase(), weight))
                        .collect(),
                )
            })
            .collect();

        let mut reverse_abbreviations: HashMap<String, Vec<String>> = HashMap::new();
        for (abbr, expansions) in &abbreviations {
            for expansion in expansions {
                let entry = reverse_abbreviations.entry(expansion.clone()).or_default();
                if !entry.contains(abbr) {
                    entry.push(abbr.clone());
                }
            }
        }
        for list in reverse_abbreviations.values_mut() {
            list.sort();
        }

        let mut domain_peers: HashMap<String, Vec<String>> = HashMap::new();
        for (domain, terms) in &domains {
            // The domain name itself counts as a member.
            let mut members: Vec<&String> = Vec::with_capacity(terms.len() + 1);
            members.push(domain);
            members.extend(terms.iter());
            for member in &members {
                let entry = domain_peers.entry((*member).clone()).or_default();
                for peer in &members {
                    if peer != member && !entry.contains(*peer) {
                        entry.push((*peer).clone());
                    }
                }
            }
        }

        Self {
            abbreviations,
            domains,
            language_terms,
            reverse_abbreviations,
            domain_peers,
            fuzzy: FuzzyConfig::default(),
            stemming: StemmerConfig::default(),
        }
    }

    pub fn with_fuzzy_config(mut self, fuzzy: FuzzyConfig) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn with_stemming_config(mut self, stemming: StemmerConfig) -> Self {
        self.stemming = stemming;
        self
    }

    pub fn fuzzy_config(&self) -> &FuzzyConfig {
        &self.fuzzy
    }

    pub fn stemming_config(&self) -> &StemmerConfig {
        &self.stemming
    }

    pub fn is_abbreviation(&self, term: &str) -> bool {
        self.abbreviations.contains_key(&term.to_lowercase())
    }

    pub fn abbreviation_expansions(&self, abbr: &str) -> Option<&[String]> {
        self.abbreviations
            .get(&abbr.to_lowercase())
            .map(|v| v.as_slice())
    }

    pub fn domain_terms(&self, domain: &str) -> Option<&[String]> {
        self.domains.get(&domain.to_lowercase()).map(|v| v.as_slice())
    }

    /// Ordered, deduplicated expansion of a term: the lowercased term
    /// itself, its abbreviation expansions, the abbreviations expanding to
    /// it, and its domain peers.
    pub fn expand(&self, term: &str) -> Vec<String> {
        let lower = term.to_lowercase();
        let mut out = Vec::with_capacity(8);
        out.push(lower.clone());
        let mut dedup: HashSet<String> = HashSet::new();
        dedup.insert(lower.clone());

        if let Some(expansions) = self.abbreviations.get(&lower) {
            for expansion in expansions {
                if dedup.insert(expansion.clone()) {
                    out.push(expansion.clone());
                }
            }
        }
        if let Some(abbrs) = self.reverse_abbreviations.get(&lower) {
            for abbr in abbrs {
                if dedup.insert(abbr.clone()) {
                    out.push(abbr.clone());
                }
            }
        }
        if let Some(peers) = self.domain_peers.get(&lower) {
            for peer in peers {
                if dedup.insert(peer.clone()) {
                    out.push(peer.clone());
                }
            }
        }
        out
    }

    /// Like [`expand`](Self::expand), with terms from the language's
    /// vocabulary moved to the front of the tail, ordered by descending
    /// relevance weight. The head stays the queried term.
    pub fn expand_language(&self, language: &str, term: &str) -> Vec<String> {
        let mut expanded = self.expand(term);
        let table = match self.language_terms.get(&language.to_lowercase()) {
            Some(table) => table,
            None => return expanded,
        };
        let head = expanded.remove(0);
        let (mut in_language, rest): (Vec<String>, Vec<String>) = expanded
            .into_iter()
            .partition(|candidate| table.contains_key(candidate));
        in_language.sort_by(|a, b| table[b].total_cmp(&table[a]));

        let mut out = Vec::with_capacity(1 + in_language.len() + rest.len());
        out.push(head);
        out.extend(in_language);
        out.extend(rest);
        out
    }
}

impl Default for TranslationDictionary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_head_is_lowercased_input() {
        let dictionary = TranslationDictionary::new();
        assert_eq!(dictionary.expand("AUTH")[0], "auth");
        assert_eq!(dictionary.expand("unknownterm"), vec!["unknownterm"]);
    }

    #[test]
    fn test_forward_abbreviation_expansion() {
        let dictionary = TranslationDictionary::new();
        let expanded = dictionary.expand("auth");
        for term in ["authenticate", "login", "signin"] {
            assert!(expanded.contains(&term.to_string()), "missing {}", term);
        }
    }

    #[test]
    fn test_reverse_abbreviation_expansion() {
        let dictionary = TranslationDictionary::new();
        let expanded = dictionary.expand("transaction");
        assert!(expanded.contains(&"txn".to_string()));
        let expanded = dictionary.expand("function");
        assert!(expanded.contains(&"fn".to_string()));
        assert!(expanded.contains(&"func".to_string()));
    }

    #[test]
    fn test_abbreviation_relation_is_bidirectional() {
        let dictionary = TranslationDictionary::new();
        for (abbr, expansions) in DEFAULT_ABBREVIATIONS {
            for expansion in *expansions {
                let forward = dictionary.expand(abbr);
                let backward = dictionary.expand(expansion);
                assert!(forward.contains(&(*expansion).to_string()));
                assert!(backward.contains(&(*abbr).to_string()));
            }
        }
    }

    #[test]
    fn test_domain_peers() {
        let dictionary = TranslationDictionary::new();
        let expanded = dictionary.expand("login");
        for peer in ["signin", "token", "authentication"] {
            assert!(expanded.contains(&peer.to_string()), "missing {}", peer);
        }
    }

    #[test]
    fn test_expand_is_deduplicated() {
        let dictionary = TranslationDictionary::new();
        for term in ["auth", "transaction", "login", "config"] {
            let expanded = dictionary.expand(term);
            let distinct: HashSet<&String> = expanded.iter().collect();
            assert_eq!(distinct.len(), expanded.len(), "duplicates for {}", term);
            assert!(expanded.iter().all(|t| t.to_lowercase() == *t));
        }
    }

    #[test]
    fn test_expand_language_prioritizes_language_terms() {
        let dictionary = TranslationDictionary::new();
        let expanded = dictionary.expand_language("go", "function");
        assert_eq!(expanded[0], "function");
        // "func" carries a go-specific weight and must precede "fn".
        let func_pos = expanded.iter().position(|t| t == "func").unwrap();
        let fn_pos = expanded.iter().position(|t| t == "fn").unwrap();
        assert!(func_pos < fn_pos);
    }

    #[test]
    fn test_expand_language_unknown_language_falls_back() {
        let dictionary = TranslationDictionary::new();
        assert_eq!(
            dictionary.expand_language("cobol", "function"),
            dictionary.expand("function")
        );
    }

    #[test]
    fn test_custom_tables_are_lowercased() {
        let mut abbreviations = HashMap::new();
        abbreviations.insert(
            "HTTP".to_string(),
            vec!["HyperText".to_string(), "protocol".to_string()],
        );
        let dictionary =
            TranslationDictionary::with_tables(abbreviations, HashMap::new(), HashMap::new());
        let expanded = dictionary.expand("http");
        assert!(expanded.contains(&"hypertext".to_string()));
        assert!(dictionary.expand("hypertext").contains(&"http".to_string()));
    }
}
