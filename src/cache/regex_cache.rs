//! Parsed-pattern cache for the hybrid regex engine.
//!
//! Two parallel bounded LRU caches hold simple entries (compiled regex plus
//! extracted literals) and complex entries (compiled regex only). The cache
//! key is the pattern text prefixed with a case-sensitivity marker, so a
//! case-folded compilation can never alias a case-sensitive one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::lru::LruCache;
use crate::config::RegexCacheConfig;
use crate::error::Result;

/// A parsed simple pattern: compiled regex plus the literals that drive
/// trigram filtering.
#[derive(Debug)]
pub struct SimplePattern {
    pub pattern: String,
    pub case_insensitive: bool,
    pub literals: Vec<String>,
    pub regex: Regex,
    pub compiled_at: Instant,
    pub compilation_time: Duration,
}

/// A parsed complex pattern, executed without filtering.
#[derive(Debug)]
pub struct ComplexPattern {
    pub pattern: String,
    pub case_insensitive: bool,
    pub regex: Regex,
    pub compiled_at: Instant,
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub enum CachedPattern {
    Simple(Arc<SimplePattern>),
    Complex(Arc<ComplexPattern>),
}

struct SimpleSlot {
    entry: Arc<SimplePattern>,
    access_count: u64,
    last_accessed: Instant,
}

struct ComplexSlot {
    entry: Arc<ComplexPattern>,
    access_count: u64,
}

#[derive(Debug, Default)]
struct CacheCounters {
    simple_hits: AtomicU64,
    simple_misses: AtomicU64,
    complex_hits: AtomicU64,
    complex_misses: AtomicU64,
    simple_evictions: AtomicU64,
    complex_evictions: AtomicU64,
    total_requests: AtomicU64,
}

/// Snapshot of the cache counters.
///
/// Misses are counted at insertion time: a lookup that finds neither cache
/// increments nothing until the caller classifies, compiles, and inserts
/// the pattern, at which point the owning cache's miss counter advances.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PatternCacheStats {
    pub simple_hits: u64,
    pub simple_misses: u64,
    pub complex_hits: u64,
    pub complex_misses: u64,
    pub simple_evictions: u64,
    pub complex_evictions: u64,
    pub total_requests: u64,
}

impl PatternCacheStats {
    pub fn simple_hit_ratio(&self) -> f64 {
        ratio(self.simple_hits, self.simple_misses)
    }

    pub fn complex_hit_ratio(&self) -> f64 {
        ratio(self.complex_hits, self.complex_misses)
    }

    pub fn overall_hit_ratio(&self) -> f64 {
        ratio(
            self.simple_hits + self.complex_hits,
            self.simple_misses + self.complex_misses,
        )
    }

    pub fn report(&self) -> String {
        format!(
            "Pattern Cache Report:\n\
             - Total requests: {}\n\
             - Simple: {} hits / {} misses ({:.1}%)\n\
             - Complex: {} hits / {} misses ({:.1}%)\n\
             - Evictions: {} simple, {} complex",
            self.total_requests,
            self.simple_hits,
            self.simple_misses,
            self.simple_hit_ratio() * 100.0,
            self.complex_hits,
            self.complex_misses,
            self.complex_hit_ratio() * 100.0,
            self.simple_evictions,
            self.complex_evictions
        )
    }
}

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Thread-safe dual cache of parsed patterns.
pub struct PatternCache {
    config: RegexCacheConfig,
    simple: Mutex<LruCache<String, SimpleSlot>>,
    complex: Mutex<LruCache<String, ComplexSlot>>,
    counters: CacheCounters,
}

impl PatternCache {
    pub fn new(config: RegexCacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            simple: Mutex::new(LruCache::new(config.max_simple_entries)),
            complex: Mutex::new(LruCache::new(config.max_complex_entries)),
            config,
            counters: CacheCounters::default(),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            simple: Mutex::new(LruCache::new(RegexCacheConfig::default().max_simple_entries)),
            complex: Mutex::new(LruCache::new(
                RegexCacheConfig::default().max_complex_entries,
            )),
            config: RegexCacheConfig::default(),
            counters: CacheCounters::default(),
        }
    }

    /// Whether a pattern is eligible for caching at all.
    pub fn accepts(&self, pattern: &str) -> bool {
        pattern.len() <= self.config.max_pattern_length
    }

    fn key(pattern: &str, case_insensitive: bool) -> String {
        let marker = if case_insensitive { "i:" } else { "s:" };
        let mut key = String::with_capacity(marker.len() + pattern.len());
        key.push_str(marker);
        key.push_str(pattern);
        key
    }

    /// Look up a parsed pattern. A hit bumps the entry in its LRU list.
    /// Over-long patterns are never looked up.
    pub fn get(&self, pattern: &str, case_insensitive: bool) -> Option<CachedPattern> {
        if !self.accepts(pattern) {
            return None;
        }
        self.counters.total_requests.fetch_add(1, Ordering::Relaxed);
        let key = Self::key(pattern, case_insensitive);

        {
            let mut simple = self.lock_simple();
            if let Some(slot) = simple.get_mut(&key) {
                slot.access_count += 1;
                slot.last_accessed = Instant::now();
                self.counters.simple_hits.fetch_add(1, Ordering::Relaxed);
                return Some(CachedPattern::Simple(Arc::clone(&slot.entry)));
            }
        }

        let mut complex = self.lock_complex();
        if let Some(slot) = complex.get_mut(&key) {
            slot.access_count += 1;
            self.counters.complex_hits.fetch_add(1, Ordering::Relaxed);
            return Some(CachedPattern::Complex(Arc::clone(&slot.entry)));
        }
        None
    }

    /// Insert a parsed simple pattern. Returns the shared handle, which is
    /// the already-cached entry when another thread inserted first.
    pub fn cache_simple(&self, entry: SimplePattern) -> Arc<SimplePattern> {
        let entry = Arc::new(entry);
        if !self.accepts(&entry.pattern) {
            return entry;
        }
        let key = Self::key(&entry.pattern, entry.case_insensitive);
        let mut simple = self.lock_simple();
        if let Some(existing) = simple.peek(&key) {
            return Arc::clone(&existing.entry);
        }
        self.counters.simple_misses.fetch_add(1, Ordering::Relaxed);
        let evicted = simple.insert(
            key,
            SimpleSlot {
                entry: Arc::clone(&entry),
                access_count: 1,
                last_accessed: Instant::now(),
            },
        );
        if let Some((evicted_key, _)) = evicted {
            self.counters.simple_evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(pattern = %evicted_key, "evicted simple pattern");
        }
        entry
    }

    /// Insert a parsed complex pattern.
    pub fn cache_complex(
        &self,
        pattern: &str,
        case_insensitive: bool,
        regex: Regex,
    ) -> Arc<ComplexPattern> {
        let entry = Arc::new(ComplexPattern {
            pattern: pattern.to_string(),
            case_insensitive,
            regex,
            compiled_at: Instant::now(),
        });
        if !self.accepts(pattern) {
            return entry;
        }
        let key = Self::key(pattern, case_insensitive);
        let mut complex = self.lock_complex();
        if let Some(existing) = complex.peek(&key) {
            return Arc::clone(&existing.entry);
        }
        self.counters.complex_misses.fetch_add(1, Ordering::Relaxed);
        let evicted = complex.insert(
            key,
            ComplexSlot {
                entry: Arc::clone(&entry),
                access_count: 1,
            },
        );
        if let Some((evicted_key, _)) = evicted {
            self.counters
                .complex_evictions
                .fetch_add(1, Ordering::Relaxed);
            tracing::debug!(pattern = %evicted_key, "evicted complex pattern");
        }
        entry
    }

    /// Evict simple entries not accessed within `max_age`. Complex entries
    /// carry no access times; when the complex cache is past half capacity
    /// its LRU tail is dropped back down to half. Returns entries removed.
    pub fn cleanup_expired(&self, max_age: Duration) -> usize {
        let mut removed = 0;

        {
            let mut simple = self.lock_simple();
            let stale: Vec<String> = simple
                .iter()
                .filter(|(_, slot)| slot.last_accessed.elapsed() > max_age)
                .map(|(key, _)| key.clone())
                .collect();
            for key in stale {
                if simple.remove(&key).is_some() {
                    removed += 1;
                    self.counters.simple_evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let mut complex = self.lock_complex();
        let half = self.config.max_complex_entries / 2;
        while complex.len() > half {
            if complex.pop_lru().is_none() {
                break;
            }
            removed += 1;
            self.counters
                .complex_evictions
                .fetch_add(1, Ordering::Relaxed);
        }

        if removed > 0 {
            tracing::debug!(removed, "pattern cache cleanup");
        }
        removed
    }

    /// Drop all entries and zero the counters.
    pub fn clear(&self) {
        self.lock_simple().clear();
        self.lock_complex().clear();
        self.counters.simple_hits.store(0, Ordering::Relaxed);
        self.counters.simple_misses.store(0, Ordering::Relaxed);
        self.counters.complex_hits.store(0, Ordering::Relaxed);
        self.counters.complex_misses.store(0, Ordering::Relaxed);
        self.counters.simple_evictions.store(0, Ordering::Relaxed);
        self.counters.complex_evictions.store(0, Ordering::Relaxed);
        self.counters.total_requests.store(0, Ordering::Relaxed);
    }

    /// Simple entries ranked by access count, most accessed first.
    pub fn most_accessed_simple(&self, limit: usize) -> Vec<(Arc<SimplePattern>, u64)> {
        let simple = self.lock_simple();
        let mut ranked: Vec<(Arc<SimplePattern>, u64)> = simple
            .iter()
            .map(|(_, slot)| (Arc::clone(&slot.entry), slot.access_count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit);
        ranked
    }

    pub fn simple_len(&self) -> usize {
        self.lock_simple().len()
    }

    pub fn complex_len(&self) -> usize {
        self.lock_complex().len()
    }

    pub fn stats(&self) -> PatternCacheStats {
        PatternCacheStats {
            simple_hits: self.counters.simple_hits.load(Ordering::Relaxed),
            simple_misses: self.counters.simple_misses.load(Ordering::Relaxed),
            complex_hits: self.counters.complex_hits.load(Ordering::Relaxed),
            complex_misses: self.counters.complex_misses.load(Ordering::Relaxed),
            simple_evictions: self.counters.simple_evictions.load(Ordering::Relaxed),
            complex_evictions: self.counters.complex_evictions.load(Ordering::Relaxed),
            total_requests: self.counters.total_requests.load(Ordering::Relaxed),
        }
    }

    fn lock_simple(&self) -> std::sync::MutexGuard<'_, LruCache<String, SimpleSlot>> {
        self.simple.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Mutex poisoned in PatternCache simple cache");
            poisoned.into_inner()
        })
    }

    fn lock_complex(&self) -> std::sync::MutexGuard<'_, LruCache<String, ComplexSlot>> {
        self.complex.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Mutex poisoned in PatternCache complex cache");
            poisoned.into_inner()
        })
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}
