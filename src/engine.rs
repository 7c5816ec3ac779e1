//! Hybrid regex execution engine.
//!
//! Classifies each pattern, caches the parsed form, narrows the candidate
//! set through the trigram index when the pattern is simple, and executes
//! the compiled regex only on surviving files. Filtering is strictly
//! behaviour-preserving: the match set is identical with or without it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use aho_corasick::AhoCorasickBuilder;
use chrono::Utc;
use memchr::memmem;
use rayon::prelude::*;
use regex::bytes::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::cache::regex_cache::{CachedPattern, PatternCache, PatternCacheStats, SimplePattern};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::pattern::{classify, extract_literals, PatternClass};
use crate::providers::{ContentProvider, TrigramIndex};
use crate::types::{ExecutionPath, ExecutionResult, FileId, Match};

const MIN_FILTER_LITERAL_LENGTH: usize = 3;

#[derive(Debug, Default)]
struct EngineMetrics {
    searches_total: AtomicU64,
    simple_filtered: AtomicU64,
    simple_unfiltered: AtomicU64,
    complex_direct: AtomicU64,
    errors: AtomicU64,
    matches_emitted: AtomicU64,
    total_search_nanos: AtomicU64,
}

/// Aggregate engine counters across all searches since the last reset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngineMetricsSnapshot {
    pub searches_total: u64,
    pub simple_filtered: u64,
    pub simple_unfiltered: u64,
    pub complex_direct: u64,
    pub errors: u64,
    pub matches_emitted: u64,
    pub total_search_nanos: u64,
}

impl EngineMetricsSnapshot {
    pub fn average_search_nanos(&self) -> u64 {
        if self.searches_total == 0 {
            0
        } else {
            self.total_search_nanos / self.searches_total
        }
    }

    pub fn report(&self) -> String {
        format!(
            "Search Engine Report:\n\
             - Searches: {} ({} filtered, {} unfiltered, {} complex, {} errors)\n\
             - Matches emitted: {}\n\
             - Average search time: {}ns",
            self.searches_total,
            self.simple_filtered,
            self.simple_unfiltered,
            self.complex_direct,
            self.errors,
            self.matches_emitted,
            self.average_search_nanos()
        )
    }
}

/// The hybrid regex engine. Safe to share across threads.
pub struct HybridSearchEngine {
    cache: Arc<PatternCache>,
    trigram_index: Option<Arc<dyn TrigramIndex>>,
    config: EngineConfig,
    metrics: EngineMetrics,
}

impl HybridSearchEngine {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(PatternCache::with_defaults()),
            trigram_index: None,
            config: EngineConfig::default(),
            metrics: EngineMetrics::default(),
        }
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: Arc::new(PatternCache::new(config.regex_cache)?),
            trigram_index: None,
            config,
            metrics: EngineMetrics::default(),
        })
    }

    /// Attach the trigram collaborator used for simple-pattern filtering.
    pub fn with_trigram_index(mut self, index: Arc<dyn TrigramIndex>) -> Self {
        self.trigram_index = Some(index);
        self
    }

    /// The shared parsed-pattern cache.
    pub fn pattern_cache(&self) -> &PatternCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> PatternCacheStats {
        self.cache.stats()
    }

    pub fn metrics(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            searches_total: self.metrics.searches_total.load(Ordering::Relaxed),
            simple_filtered: self.metrics.simple_filtered.load(Ordering::Relaxed),
            simple_unfiltered: self.metrics.simple_unfiltered.load(Ordering::Relaxed),
            complex_direct: self.metrics.complex_direct.load(Ordering::Relaxed),
            errors: self.metrics.errors.load(Ordering::Relaxed),
            matches_emitted: self.metrics.matches_emitted.load(Ordering::Relaxed),
            total_search_nanos: self.metrics.total_search_nanos.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.metrics.searches_total.store(0, Ordering::Relaxed);
        self.metrics.simple_filtered.store(0, Ordering::Relaxed);
        self.metrics.simple_unfiltered.store(0, Ordering::Relaxed);
        self.metrics.complex_direct.store(0, Ordering::Relaxed);
        self.metrics.errors.store(0, Ordering::Relaxed);
        self.metrics.matches_emitted.store(0, Ordering::Relaxed);
        self.metrics.total_search_nanos.store(0, Ordering::Relaxed);
    }

    /// Run one search over the supplied candidate files.
    ///
    /// Matches are ordered by the caller's candidate order, then ascending
    /// start offset within each file. Anchors always bind to line
    /// boundaries. Compilation failure yields the `Error` path with an
    /// empty match list; missing file content is skipped silently.
    pub fn search(
        &self,
        pattern: &str,
        case_insensitive: bool,
        provider: &dyn ContentProvider,
        candidates: &[FileId],
    ) -> (Vec<Match>, ExecutionResult) {
        let search_start = Instant::now();

        let cache_start = Instant::now();
        let cached = self.cache.get(pattern, case_insensitive);
        let cache_lookup_time = cache_start.elapsed();
        let cache_hit = cached.is_some();

        let parsed = match cached {
            Some(parsed) => parsed,
            None => match self.parse(pattern, case_insensitive) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::debug!(pattern, error = %err, "pattern failed to compile");
                    self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                    self.metrics.searches_total.fetch_add(1, Ordering::Relaxed);
                    let total_time = search_start.elapsed();
                    self.metrics
                        .total_search_nanos
                        .fetch_add(total_time.as_nanos() as u64, Ordering::Relaxed);
                    return (
                        Vec::new(),
                        ExecutionResult {
                            path: ExecutionPath::Error,
                            pattern: pattern.to_string(),
                            case_insensitive,
                            cache_hit: false,
                            candidates_total: candidates.len(),
                            candidates_filtered: 0,
                            matches_found: 0,
                            total_time,
                            cache_lookup_time,
                            filter_time: Default::default(),
                            execute_time: Default::default(),
                            error: Some(err.to_string()),
                            timestamp: Utc::now(),
                        },
                    );
                }
            },
        };

        let filter_start = Instant::now();
        let (survivors, path) = match &parsed {
            CachedPattern::Simple(simple) => self.filter_candidates(simple, provider, candidates),
            CachedPattern::Complex(_) => (candidates.to_vec(), ExecutionPath::ComplexDirect),
        };
        let filter_time = filter_start.elapsed();

        let execute_start = Instant::now();
        let regex = match &parsed {
            CachedPattern::Simple(simple) => &simple.regex,
            CachedPattern::Complex(complex) => &complex.regex,
        };
        let matches = self.execute(regex, provider, &survivors);
        let execute_time = execute_start.elapsed();

        let total_time = search_start.elapsed();
        self.record(path, matches.len(), total_time.as_nanos() as u64);
        tracing::debug!(
            pattern,
            path = path.as_str(),
            candidates = candidates.len(),
            survivors = survivors.len(),
            matches = matches.len(),
            "search complete"
        );

        let result = ExecutionResult {
            path,
            pattern: pattern.to_string(),
            case_insensitive,
            cache_hit,
            candidates_total: candidates.len(),
            candidates_filtered: survivors.len(),
            matches_found: matches.len(),
            total_time,
            cache_lookup_time,
            filter_time,
            execute_time,
            error: None,
            timestamp: Utc::now(),
        };
        (matches, result)
    }

    fn record(&self, path: ExecutionPath, matches: usize, nanos: u64) {
        self.metrics.searches_total.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .matches_emitted
            .fetch_add(matches as u64, Ordering::Relaxed);
        self.metrics
            .total_search_nanos
            .fetch_add(nanos, Ordering::Relaxed);
        let counter = match path {
            ExecutionPath::SimpleTrigramFiltered => &self.metrics.simple_filtered,
            ExecutionPath::SimpleNoTrigrams => &self.metrics.simple_unfiltered,
            ExecutionPath::ComplexDirect => &self.metrics.complex_direct,
            ExecutionPath::Error => &self.metrics.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Classify, compile, and cache a pattern missing from the cache.
    fn parse(
        &self,
        pattern: &str,
        case_insensitive: bool,
    ) -> std::result::Result<CachedPattern, regex::Error> {
        let classification = classify(pattern);
        let compile_start = Instant::now();
        // Multiline is unconditional: ^ and $ bind to line boundaries.
        let regex = RegexBuilder::new(pattern)
            .multi_line(true)
            .case_insensitive(case_insensitive)
            .build()?;
        let compilation_time = compile_start.elapsed();

        match classification {
            PatternClass::Simple => {
                let literals = extract_literals(pattern);
                tracing::debug!(pattern, literals = literals.len(), "parsed simple pattern");
                let entry = self.cache.cache_simple(SimplePattern {
                    pattern: pattern.to_string(),
                    case_insensitive,
                    literals,
                    regex,
                    compiled_at: Instant::now(),
                    compilation_time,
                });
                Ok(CachedPattern::Simple(entry))
            }
            PatternClass::Complex { reason } => {
                tracing::debug!(pattern, reason, "parsed complex pattern");
                let entry = self.cache.cache_complex(pattern, case_insensitive, regex);
                Ok(CachedPattern::Complex(entry))
            }
        }
    }

    /// Narrow the candidate set through the trigram index, or through a
    /// linear multi-literal scan when no index is attached. Empty filter
    /// output falls back to the full candidate set.
    fn filter_candidates(
        &self,
        simple: &SimplePattern,
        provider: &dyn ContentProvider,
        candidates: &[FileId],
    ) -> (Vec<FileId>, ExecutionPath) {
        let literals: Vec<&str> = simple
            .literals
            .iter()
            .map(|l| l.as_str())
            .filter(|l| l.len() >= MIN_FILTER_LITERAL_LENGTH)
            .collect();
        if literals.is_empty() || candidates.is_empty() {
            return (candidates.to_vec(), ExecutionPath::SimpleNoTrigrams);
        }

        // The trigram collaborator is case-exact; a case-folded search
        // must fall back to the scan to stay behaviour-preserving.
        let surviving = match &self.trigram_index {
            Some(index) if !simple.case_insensitive => {
                self.trigram_filter(index.as_ref(), &literals, candidates)
            }
            _ => self.scan_filter(simple.case_insensitive, &literals, provider, candidates),
        };

        let surviving = match surviving {
            Some(set) if !set.is_empty() => set,
            _ => return (candidates.to_vec(), ExecutionPath::SimpleNoTrigrams),
        };

        let filtered: Vec<FileId> = candidates
            .iter()
            .copied()
            .filter(|file_id| surviving.contains(file_id))
            .collect();
        (filtered, ExecutionPath::SimpleTrigramFiltered)
    }

    /// Union over literals of (trigram candidates ∩ caller candidates).
    fn trigram_filter(
        &self,
        index: &dyn TrigramIndex,
        literals: &[&str],
        candidates: &[FileId],
    ) -> Option<HashSet<FileId>> {
        let candidate_set: HashSet<FileId> = candidates.iter().copied().collect();
        let mut surviving = HashSet::new();
        for literal in literals {
            for file_id in index.find_candidates(literal) {
                if candidate_set.contains(&file_id) {
                    surviving.insert(file_id);
                }
            }
        }
        Some(surviving)
    }

    /// Multi-literal substring scan over candidate contents. A single
    /// case-exact literal takes the memmem fast path; everything else
    /// goes through an Aho-Corasick automaton.
    fn scan_filter(
        &self,
        case_insensitive: bool,
        literals: &[&str],
        provider: &dyn ContentProvider,
        candidates: &[FileId],
    ) -> Option<HashSet<FileId>> {
        let mut surviving = HashSet::new();
        if literals.len() == 1 && !case_insensitive {
            let finder = memmem::Finder::new(literals[0].as_bytes());
            for &file_id in candidates {
                if let Some(content) = provider.get(file_id) {
                    if finder.find(content.as_ref()).is_some() {
                        surviving.insert(file_id);
                    }
                }
            }
            return Some(surviving);
        }

        let automaton = AhoCorasickBuilder::new()
            .ascii_case_insensitive(case_insensitive)
            .build(literals)
            .ok()?;
        for &file_id in candidates {
            if let Some(content) = provider.get(file_id) {
                if automaton.is_match(content.as_ref()) {
                    surviving.insert(file_id);
                }
            }
        }
        Some(surviving)
    }

    /// Run the compiled regex over each surviving file, preserving
    /// candidate order. Large survivor sets fan out across threads.
    fn execute(
        &self,
        regex: &Regex,
        provider: &dyn ContentProvider,
        survivors: &[FileId],
    ) -> Vec<Match> {
        let find_in_file = |file_id: FileId| -> Vec<Match> {
            let content = match provider.get(file_id) {
                Some(content) => content,
                None => return Vec::new(),
            };
            regex
                .find_iter(content.as_ref())
                .map(|found| Match {
                    start: found.start(),
                    end: found.end(),
                    exact: false,
                    file_id,
                })
                .collect()
        };

        let per_file: Vec<Vec<Match>> = if survivors.len() >= self.config.parallel_threshold {
            survivors.par_iter().copied().map(find_in_file).collect()
        } else {
            survivors.iter().copied().map(find_in_file).collect()
        };
        per_file.into_iter().flatten().collect()
    }
}

impl Default for HybridSearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{InMemoryContentStore, InMemoryTrigramIndex};

    fn fid(raw: u32) -> FileId {
        FileId::new(raw).unwrap()
    }

    fn fixture() -> (InMemoryContentStore, Arc<InMemoryTrigramIndex>, Vec<FileId>) {
        let store = InMemoryContentStore::new();
        let index = Arc::new(InMemoryTrigramIndex::new());
        let files: [(u32, &[u8]); 3] = [
            (1, b"func processData() { return true; }"),
            (2, b"class MyClass { void method() {} }"),
            (3, b"struct Point { x int; }"),
        ];
        let mut candidates = Vec::new();
        for (raw, content) in files {
            let id = fid(raw);
            store.insert(id, content.to_vec());
            index.insert_file(id, content);
            candidates.push(id);
        }
        (store, index, candidates)
    }

    #[test]
    fn test_trigram_filtered_search() {
        let (store, index, candidates) = fixture();
        let engine = HybridSearchEngine::new().with_trigram_index(index);
        let (matches, result) = engine.search("func", false, &store, &candidates);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file_id, fid(1));
        assert_eq!((matches[0].start, matches[0].end), (0, 4));
        assert_eq!(result.path, ExecutionPath::SimpleTrigramFiltered);
        assert_eq!(result.candidates_filtered, 1);
        assert!(!result.cache_hit);
    }

    #[test]
    fn test_fallback_scan_without_index() {
        let (store, _, candidates) = fixture();
        let engine = HybridSearchEngine::new();
        let (matches, result) = engine.search("struct", false, &store, &candidates);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file_id, fid(3));
        assert_eq!(result.path, ExecutionPath::SimpleTrigramFiltered);
    }

    #[test]
    fn test_no_usable_literals_runs_unfiltered() {
        let (store, index, candidates) = fixture();
        let engine = HybridSearchEngine::new().with_trigram_index(index);
        let (matches, result) = engine.search("x.", false, &store, &candidates);
        assert_eq!(result.path, ExecutionPath::SimpleNoTrigrams);
        assert_eq!(result.candidates_filtered, candidates.len());
        assert!(!matches.is_empty());
    }

    #[test]
    fn test_complex_pattern_runs_direct() {
        let (store, index, candidates) = fixture();
        let engine = HybridSearchEngine::new().with_trigram_index(index);
        let (matches, result) = engine.search("(?:func)", false, &store, &candidates);
        assert_eq!(result.path, ExecutionPath::ComplexDirect);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file_id, fid(1));
    }

    #[test]
    fn test_compile_failure_yields_error_path() {
        let (store, index, candidates) = fixture();
        let engine = HybridSearchEngine::new().with_trigram_index(index);
        let (matches, result) = engine.search("[unclosed", false, &store, &candidates);
        assert!(matches.is_empty());
        assert_eq!(result.path, ExecutionPath::Error);
        assert!(result.error.is_some());
        assert_eq!(engine.metrics().errors, 1);
    }

    #[test]
    fn test_cache_hit_on_repeat() {
        let (store, index, candidates) = fixture();
        let engine = HybridSearchEngine::new().with_trigram_index(index);
        let (first_matches, first) = engine.search("method", false, &store, &candidates);
        assert!(!first.cache_hit);
        let (second_matches, second) = engine.search("method", false, &store, &candidates);
        assert!(second.cache_hit);
        assert_eq!(first_matches, second_matches);
    }

    #[test]
    fn test_case_insensitive_search_stays_correct() {
        let (store, index, candidates) = fixture();
        let engine = HybridSearchEngine::new().with_trigram_index(index);
        let (matches, _) = engine.search("MYCLASS", true, &store, &candidates);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file_id, fid(2));
    }

    #[test]
    fn test_filtering_is_behaviour_preserving() {
        let (store, index, candidates) = fixture();
        let filtered = HybridSearchEngine::new().with_trigram_index(index);
        let unfiltered = HybridSearchEngine::new();
        for pattern in ["func", "Class", "int", r"\w+Data", "(struct|class)"] {
            let (with_filter, _) = filtered.search(pattern, false, &store, &candidates);
            let (without_filter, _) = unfiltered.search(pattern, false, &store, &candidates);
            assert_eq!(with_filter, without_filter, "pattern {:?}", pattern);
        }
    }

    #[test]
    fn test_match_order_follows_candidate_order() {
        let store = InMemoryContentStore::new();
        store.insert(fid(1), b"one needle".to_vec());
        store.insert(fid(2), b"needle needle".to_vec());
        let engine = HybridSearchEngine::new();
        let candidates = vec![fid(2), fid(1)];
        let (matches, _) = engine.search("needle", false, &store, &candidates);
        let order: Vec<FileId> = matches.iter().map(|m| m.file_id).collect();
        assert_eq!(order, vec![fid(2), fid(2), fid(1)]);
        assert!(matches[0].start < matches[1].start);
    }

    #[test]
    fn test_missing_content_skipped() {
        let store = InMemoryContentStore::new();
        store.insert(fid(1), b"needle".to_vec());
        let engine = HybridSearchEngine::new();
        let candidates = vec![fid(1), fid(9)];
        let (matches, result) = engine.search("needle", false, &store, &candidates);
        assert_eq!(matches.len(), 1);
        assert_ne!(result.path, ExecutionPath::Error);
    }

    #[test]
    fn test_anchor_binds_to_line_start() {
        let store = InMemoryContentStore::new();
        store.insert(fid(1), b"alpha\ntype Config\n  type indented".to_vec());
        let engine = HybridSearchEngine::new();
        let (matches, _) = engine.search("^type", false, &store, &[fid(1)]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].start, 6);
    }

    #[test]
    fn test_metrics_accumulate() {
        let (store, index, candidates) = fixture();
        let engine = HybridSearchEngine::new().with_trigram_index(index);
        engine.search("func", false, &store, &candidates);
        engine.search("func", false, &store, &candidates);
        engine.search("(?:zzz)", false, &store, &candidates);
        let metrics = engine.metrics();
        assert_eq!(metrics.searches_total, 3);
        assert_eq!(metrics.simple_filtered, 2);
        assert_eq!(metrics.complex_direct, 1);
        engine.reset_stats();
        assert_eq!(engine.metrics().searches_total, 0);
    }
}
