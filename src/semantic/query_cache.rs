//! Memoized query analyses.
//!
//! Scoring a query against thousands of symbols re-uses the same
//! lowercase form, split words, and stems every time; this bounded LRU
//! computes them once per distinct query. Analysis happens outside the
//! cache lock.

use std::sync::{Arc, Mutex};

use crate::cache::lru::LruCache;
use crate::semantic::name_split::NameSplitter;
use crate::semantic::stemmer::Stemmer;

/// Pre-normalized view of one query string.
#[derive(Debug, Clone)]
pub struct QueryAnalysis {
    pub original: String,
    pub lowercase: String,
    pub words: Vec<String>,
    pub stems: Vec<String>,
    pub has_whitespace: bool,
}

/// Bounded cache of query analyses (default 1000 entries).
pub struct QueryAnalysisCache {
    cache: Mutex<LruCache<String, Arc<QueryAnalysis>>>,
}

impl QueryAnalysisCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fetch or compute the analysis for `query`.
    pub fn analyze(
        &self,
        query: &str,
        splitter: &NameSplitter,
        stemmer: &Stemmer,
    ) -> Arc<QueryAnalysis> {
        let key = query.to_string();
        {
            let mut cache = self.lock_cache();
            if let Some(hit) = cache.get(&key) {
                return Arc::clone(hit);
            }
        }

        let lowercase = query.to_lowercase();
        let words: Vec<String> = splitter.split(query).as_ref().clone();
        let stems = words.iter().map(|word| stemmer.stem(word)).collect();
        let analysis = Arc::new(QueryAnalysis {
            original: key.clone(),
            lowercase,
            words,
            stems,
            has_whitespace: query.trim().contains(char::is_whitespace),
        });
        self.lock_cache().insert(key, Arc::clone(&analysis));
        analysis
    }

    pub fn len(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_cache().is_empty()
    }

    pub fn clear(&self) {
        self.lock_cache().clear();
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<QueryAnalysis>>> {
        self.cache.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Mutex poisoned in QueryAnalysisCache");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_contents() {
        let cache = QueryAnalysisCache::new(10);
        let splitter = NameSplitter::new();
        let stemmer = Stemmer::with_defaults();
        let analysis = cache.analyze("HTTP connections", &splitter, &stemmer);
        assert_eq!(analysis.lowercase, "http connections");
        assert_eq!(analysis.words, vec!["http", "connections"]);
        assert_eq!(analysis.stems, vec!["http", "connect"]);
        assert!(analysis.has_whitespace);

        let single = cache.analyze("getUser", &splitter, &stemmer);
        assert!(!single.has_whitespace);
    }

    #[test]
    fn test_repeat_queries_share_analysis() {
        let cache = QueryAnalysisCache::new(10);
        let splitter = NameSplitter::new();
        let stemmer = Stemmer::with_defaults();
        let first = cache.analyze("parse json", &splitter, &stemmer);
        let second = cache.analyze("parse json", &splitter, &stemmer);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_bound_holds() {
        let cache = QueryAnalysisCache::new(3);
        let splitter = NameSplitter::new();
        let stemmer = Stemmer::with_defaults();
        for i in 0..8 {
            cache.analyze(&format!("query {}", i), &splitter, &stemmer);
        }
        assert_eq!(cache.len(), 3);
    }
}
