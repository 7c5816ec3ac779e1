//! Caching and buffer recycling.
//!
//! Three pieces live here: a map-plus-linked-list LRU primitive shared by
//! every bounded cache in the crate, the tiered slab allocator that
//! recycles `Vec<T>` buffers across the search hot paths, and the dual
//! simple/complex cache of parsed regex patterns.

pub mod lru;
pub mod memory_pool;
pub mod regex_cache;

pub use lru::LruCache;
pub use memory_pool::{SlabPool, SlabStatsSnapshot};
pub use regex_cache::{CachedPattern, ComplexPattern, PatternCache, SimplePattern};
