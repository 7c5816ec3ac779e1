//! Tiered slab allocator for short-lived `Vec<T>` buffers.
//!
//! Posting lists, match buffers, and split-word slices cluster around a
//! few small capacities. The pool keeps one free list per size class and
//! recycles buffers instead of round-tripping the global allocator on
//! every lookup.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::config::SlabConfig;
use crate::error::Result;

struct Tier<T> {
    capacity: usize,
    #[allow(dead_code)]
    weight: f64,
    max_retained: usize,
    free: Mutex<Vec<Vec<T>>>,
}

/// Statistics counters, updated with relaxed atomics on every `get`/`put`.
/// No cross-counter consistency is guaranteed: a reader may observe one
/// counter advanced and another not.
#[derive(Debug, Default)]
struct SlabStats {
    allocations: AtomicU64,
    reuses: AtomicU64,
    pool_hits: AtomicU64,
    pool_misses: AtomicU64,
    total_capacity_touched: AtomicU64,
}

/// Point-in-time view of the pool counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SlabStatsSnapshot {
    pub allocations: u64,
    pub reuses: u64,
    pub pool_hits: u64,
    pub pool_misses: u64,
    pub total_capacity_touched: u64,
}

impl SlabStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.pool_hits + self.pool_misses;
        if total == 0 {
            0.0
        } else {
            self.pool_hits as f64 / total as f64
        }
    }

    pub fn report(&self) -> String {
        format!(
            "Slab Pool Report:\n\
             - Allocations: {}\n\
             - Reuses: {}\n\
             - Pool hit rate: {:.1}%\n\
             - Total capacity touched: {}",
            self.allocations,
            self.reuses,
            self.hit_rate() * 100.0,
            self.total_capacity_touched
        )
    }
}

/// Size-class pool of recycled `Vec<T>` buffers.
///
/// `get` hands out an empty buffer whose capacity covers the request; `put`
/// recycles buffers whose capacity exactly matches a tier. Requests larger
/// than the top tier are allocated directly and never pooled. Neither
/// operation can fail.
pub struct SlabPool<T> {
    tiers: Vec<Tier<T>>,
    stats: SlabStats,
}

impl<T> SlabPool<T> {
    /// Build a pool from a tier layout. Rejects empty, unsorted, or
    /// zero-capacity tier lists.
    pub fn new(config: SlabConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// The standard profile: capacities 8 through 512.
    pub fn with_default_tiers() -> Self {
        Self::build(SlabConfig::default())
    }

    /// Profile tuned for trigram posting lists (capacities 8 through 128,
    /// weighted toward the small end).
    pub fn for_trigram_postings() -> Self {
        Self::build(SlabConfig::trigram_tuned())
    }

    fn build(config: SlabConfig) -> Self {
        let tiers = config
            .tiers
            .iter()
            .map(|tier| {
                let max_retained =
                    ((tier.weight * config.retained_per_tier as f64).ceil() as usize).max(8);
                Tier {
                    capacity: tier.capacity,
                    weight: tier.weight,
                    max_retained,
                    free: Mutex::new(Vec::new()),
                }
            })
            .collect();
        Self {
            tiers,
            stats: SlabStats::default(),
        }
    }

    /// Return an empty buffer with capacity at least `requested`.
    pub fn get(&self, requested: usize) -> Vec<T> {
        if requested == 0 {
            return Vec::new();
        }

        let tier_idx = self.tiers.partition_point(|t| t.capacity < requested);
        if tier_idx >= self.tiers.len() {
            // Past the largest tier: allocate exactly, bypass pooling.
            self.stats.allocations.fetch_add(1, Ordering::Relaxed);
            self.stats.pool_misses.fetch_add(1, Ordering::Relaxed);
            self.stats
                .total_capacity_touched
                .fetch_add(requested as u64, Ordering::Relaxed);
            return Vec::with_capacity(requested);
        }

        let tier = &self.tiers[tier_idx];
        let recycled = {
            let mut free = tier.free.lock().unwrap_or_else(|poisoned| {
                tracing::warn!("Mutex poisoned in SlabPool::get");
                poisoned.into_inner()
            });
            free.pop()
        };

        match recycled {
            Some(buffer) => {
                self.stats.reuses.fetch_add(1, Ordering::Relaxed);
                self.stats.pool_hits.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .total_capacity_touched
                    .fetch_add(buffer.capacity() as u64, Ordering::Relaxed);
                buffer
            }
            None => {
                self.stats.allocations.fetch_add(1, Ordering::Relaxed);
                self.stats.pool_misses.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .total_capacity_touched
                    .fetch_add(tier.capacity as u64, Ordering::Relaxed);
                Vec::with_capacity(tier.capacity)
            }
        }
    }

    /// Recycle a buffer. Only buffers whose capacity exactly matches a tier
    /// are retained; everything else is dropped normally.
    pub fn put(&self, mut buffer: Vec<T>) {
        let cap = buffer.capacity();
        if cap == 0 {
            return;
        }

        let tier_idx = self.tiers.partition_point(|t| t.capacity < cap);
        let tier = match self.tiers.get(tier_idx) {
            Some(tier) if tier.capacity == cap => tier,
            _ => return,
        };

        buffer.clear();
        let mut free = tier.free.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Mutex poisoned in SlabPool::put");
            poisoned.into_inner()
        });
        if free.len() < tier.max_retained {
            free.push(buffer);
            self.stats
                .total_capacity_touched
                .fetch_add(cap as u64, Ordering::Relaxed);
        }
    }

    /// Ensure `buffer` has at least `additional` spare capacity, recycling
    /// the old allocation through the pool when a larger one is needed.
    pub fn grow(&self, mut buffer: Vec<T>, additional: usize) -> Vec<T> {
        if buffer.capacity() - buffer.len() >= additional {
            return buffer;
        }
        let mut grown = self.get(buffer.len() + additional);
        grown.append(&mut buffer);
        self.put(buffer);
        grown
    }

    /// Buffers currently parked in a tier's free list. Exposed for
    /// diagnostics and tests.
    pub fn retained_in_tier(&self, capacity: usize) -> usize {
        self.tiers
            .iter()
            .find(|t| t.capacity == capacity)
            .map(|tier| {
                tier.free
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .len()
            })
            .unwrap_or(0)
    }

    pub fn stats(&self) -> SlabStatsSnapshot {
        SlabStatsSnapshot {
            allocations: self.stats.allocations.load(Ordering::Relaxed),
            reuses: self.stats.reuses.load(Ordering::Relaxed),
            pool_hits: self.stats.pool_hits.load(Ordering::Relaxed),
            pool_misses: self.stats.pool_misses.load(Ordering::Relaxed),
            total_capacity_touched: self.stats.total_capacity_touched.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.stats.allocations.store(0, Ordering::Relaxed);
        self.stats.reuses.store(0, Ordering::Relaxed);
        self.stats.pool_hits.store(0, Ordering::Relaxed);
        self.stats.pool_misses.store(0, Ordering::Relaxed);
        self.stats.total_capacity_touched.store(0, Ordering::Relaxed);
    }
}

impl<T> Default for SlabPool<T> {
    fn default() -> Self {
        Self::with_default_tiers()
    }
}
