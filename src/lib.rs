//! # Lightning Code Index
//!
//! An in-process library that ingests a source tree and serves fast,
//! semantically-aware code search queries, literal, regex, and
//! natural-language symbol lookup, across millions of lines of code.
//!
//! ## Subsystems
//!
//! - **Hybrid regex engine**: classifies patterns as simple or complex,
//!   extracts literals, filters candidate files through a trigram posting
//!   index, and executes regex only on surviving candidates behind an LRU
//!   cache of parsed patterns.
//! - **Semantic scorer**: ranks symbol names against natural-language
//!   queries through eight cascading matchers with calibrated weights and
//!   a bounded query cache.
//! - **Slab allocator**: a size-class pool recycling `Vec<T>` buffers
//!   across the hot paths above, with per-tier weight hints and atomic
//!   statistics.
//!
//! Directory walking, tokenization, and annotation parsing live upstream;
//! the core consumes them through the [`providers`] traits.

pub mod annotations;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod pattern;
pub mod providers;
pub mod semantic;
pub mod types;

// Re-export commonly used types
pub use crate::{
    annotations::{AnnotationQuery, AnnotationSearchIndex},
    cache::{PatternCache, SlabPool},
    config::{EngineConfig, ScoreLayers, SemanticConfig, SlabConfig},
    engine::HybridSearchEngine,
    error::{IndexError, Result},
    index::LightningIndex,
    providers::{AnnotationIndex, ContentProvider, TrigramIndex},
    semantic::SemanticScorer,
    types::*,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
