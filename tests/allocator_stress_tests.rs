//! Allocator Stress Tests
//!
//! Concurrency and accounting behavior of the tiered slab pool under
//! mixed get/put/grow traffic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::{rngs::StdRng, Rng, SeedableRng};

use lightning_index::cache::memory_pool::SlabPool;

#[test]
fn reuse_accounting_after_round_trip() {
    let pool: SlabPool<u64> = SlabPool::with_default_tiers();
    let buffer = pool.get(32);
    assert!(buffer.capacity() >= 32);
    pool.put(buffer);

    let before = pool.stats();
    let buffer = pool.get(32);
    let after = pool.stats();
    assert_eq!(after.reuses, before.reuses + 1);
    assert!(buffer.is_empty());
}

#[test]
fn get_never_under_allocates() {
    let pool: SlabPool<u8> = SlabPool::for_trigram_postings();
    for requested in [0usize, 1, 7, 8, 9, 63, 64, 65, 128, 129, 1000] {
        let buffer = pool.get(requested);
        assert!(
            buffer.capacity() >= requested,
            "requested {} got {}",
            requested,
            buffer.capacity()
        );
        pool.put(buffer);
    }
}

#[test]
fn mixed_workload_smoke() {
    let pool: Arc<SlabPool<u32>> = Arc::new(SlabPool::with_default_tiers());
    let workers = 4;
    let mut handles = Vec::new();
    for worker in 0..workers {
        let pool = Arc::clone(&pool);
        handles.push(std::thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(worker as u64);
            let mut held: Vec<Vec<u32>> = Vec::new();
            for _ in 0..2_000 {
                match rng.gen_range(0..3) {
                    0 => {
                        let mut buffer = pool.get(rng.gen_range(0..600));
                        if buffer.capacity() > 0 {
                            buffer.push(rng.gen());
                        }
                        held.push(buffer);
                    }
                    1 => {
                        if let Some(buffer) = held.pop() {
                            pool.put(buffer);
                        }
                    }
                    _ => {
                        if let Some(buffer) = held.pop() {
                            let grown = pool.grow(buffer, rng.gen_range(1..100));
                            held.push(grown);
                        }
                    }
                }
            }
            for buffer in held {
                pool.put(buffer);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("pool worker panicked");
    }
    let stats = pool.stats();
    assert!(stats.allocations > 0);
    assert!(stats.total_capacity_touched > 0);
}

#[test]
fn grow_keeps_data_and_recycles_old_buffer() {
    let pool: SlabPool<u32> = SlabPool::with_default_tiers();
    let mut buffer = pool.get(8);
    for value in 0..8u32 {
        buffer.push(value);
    }
    let grown = pool.grow(buffer, 100);
    assert_eq!(grown.len(), 8);
    assert_eq!(grown[7], 7);
    assert!(grown.capacity() >= 108);
    // The 8-capacity buffer went back to its tier.
    assert_eq!(pool.retained_in_tier(8), 1);
}

/// Full stress property: `num_cpus * 2` writers for five seconds, no
/// panic, p99 operation latency under a scaled ceiling.
#[test]
#[ignore = "five-second stress run; execute explicitly"]
fn sustained_stress_with_latency_ceiling() {
    let pool: Arc<SlabPool<u64>> = Arc::new(SlabPool::with_default_tiers());
    let writers = num_cpus::get() * 2;
    let deadline = Instant::now() + Duration::from_secs(5);
    let slow_ops = Arc::new(AtomicU64::new(0));
    let total_ops = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();
    for worker in 0..writers {
        let pool = Arc::clone(&pool);
        let slow_ops = Arc::clone(&slow_ops);
        let total_ops = Arc::clone(&total_ops);
        handles.push(std::thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(worker as u64 + 17);
            while Instant::now() < deadline {
                let op_start = Instant::now();
                let buffer: Vec<u64> = pool.get(rng.gen_range(0..600));
                pool.put(buffer);
                if op_start.elapsed() > Duration::from_millis(10) {
                    slow_ops.fetch_add(1, Ordering::Relaxed);
                }
                total_ops.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("stress worker panicked");
    }

    let total = total_ops.load(Ordering::Relaxed);
    let slow = slow_ops.load(Ordering::Relaxed);
    assert!(total > 0);
    // p99: at most 1% of operations may exceed the 10ms ceiling.
    assert!(
        slow * 100 <= total,
        "{} of {} ops exceeded the latency ceiling",
        slow,
        total
    );
}
