//! Semantic symbol scoring.
//!
//! Natural-language queries are ranked against symbol names through an
//! eight-layer matcher cascade backed by a shared name splitter,
//! translation dictionary, fuzzy matcher, and stemmer. All shared pieces
//! are read-mostly and constructed once.

pub mod dictionary;
pub mod fuzzy;
pub mod matchers;
pub mod name_split;
pub mod phrase;
pub mod query_cache;
pub mod scorer;
pub mod stemmer;

pub use dictionary::TranslationDictionary;
pub use fuzzy::FuzzyMatcher;
pub use name_split::{split_identifier, NameSplitter};
pub use phrase::{PhraseMatch, PhraseMatcher, PhraseRanking};
pub use query_cache::{QueryAnalysis, QueryAnalysisCache};
pub use scorer::SemanticScorer;
pub use stemmer::Stemmer;
