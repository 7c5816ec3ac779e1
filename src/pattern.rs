//! Pattern analysis for the hybrid regex engine.
//!
//! `classifier` decides whether a pattern can benefit from trigram
//! filtering; `literals` lifts the mandatory substrings that drive the
//! filter.

pub mod classifier;
pub mod literals;

pub use classifier::{classify, is_simple, PatternClass};
pub use literals::extract_literals;
