use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::{IndexError, Result};

/// Alphabet for the external base-63 symbol encoding.
///
/// The 63 characters are `A-Z a-z 0-9 _`, in that order.
pub const SYMBOL_ALPHABET: &[u8; 63] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_";

/// Opaque non-zero 32-bit file identifier, stable for the lifetime of the
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(NonZeroU32);

impl FileId {
    /// Construct a `FileId`; zero is not a valid identifier.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// The raw 32-bit value.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 64-bit symbol identifier: upper 32 bits are the owning [`FileId`], lower
/// 32 bits are a 1-based local symbol index within that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(u64);

impl SymbolId {
    /// Combine a file id and a local index. A local index of zero is
    /// invalid and yields `None`.
    pub fn from_parts(file_id: FileId, local_index: u32) -> Option<Self> {
        if local_index == 0 {
            return None;
        }
        Some(Self(((file_id.get() as u64) << 32) | local_index as u64))
    }

    /// Reconstruct from a raw 64-bit value, validating both halves.
    pub fn from_raw(raw: u64) -> Option<Self> {
        let file = (raw >> 32) as u32;
        let local = (raw & 0xFFFF_FFFF) as u32;
        if file == 0 || local == 0 {
            return None;
        }
        Some(Self(raw))
    }

    /// The raw 64-bit value.
    pub fn raw(self) -> u64 {
        self.0
    }

    /// The file this symbol belongs to.
    pub fn file_id(self) -> FileId {
        // Upper half is non-zero by construction.
        FileId::new((self.0 >> 32) as u32).expect("SymbolId carries a non-zero file id")
    }

    /// The 1-based symbol index within its file.
    pub fn local_index(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    /// Encode the full 64-bit value in base-63 over `A-Z a-z 0-9 _`.
    pub fn encode(self) -> String {
        let mut value = self.0;
        let mut out = Vec::with_capacity(11);
        loop {
            out.push(SYMBOL_ALPHABET[(value % 63) as usize]);
            value /= 63;
            if value == 0 {
                break;
            }
        }
        out.reverse();
        // Alphabet bytes are ASCII.
        String::from_utf8(out).expect("base-63 alphabet is ASCII")
    }

    /// Decode a base-63 symbol reference produced by [`SymbolId::encode`].
    pub fn decode(encoded: &str) -> Result<Self> {
        if encoded.is_empty() {
            return Err(IndexError::symbol("empty symbol reference"));
        }
        let mut value: u64 = 0;
        for ch in encoded.bytes() {
            let digit = SYMBOL_ALPHABET
                .iter()
                .position(|&a| a == ch)
                .ok_or_else(|| {
                    IndexError::symbol(format!("invalid character {:?} in symbol reference", ch as char))
                })?;
            value = value
                .checked_mul(63)
                .and_then(|v| v.checked_add(digit as u64))
                .ok_or_else(|| IndexError::symbol("symbol reference overflows 64 bits"))?;
        }
        Self::from_raw(value)
            .ok_or_else(|| IndexError::symbol("symbol reference decodes to an invalid id"))
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_id(), self.local_index())
    }
}

/// Ordered, deduplicated sequence of file ids, ascending.
pub type PostingList = Vec<FileId>;

/// A single regex or literal occurrence inside a file.
///
/// `start..end` is a half-open byte interval into the file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    /// Whether the occurrence came from an exact literal comparison rather
    /// than regex execution.
    pub exact: bool,
    pub file_id: FileId,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Which execution strategy a regex search took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    /// Simple pattern, candidates narrowed through the trigram index.
    SimpleTrigramFiltered,
    /// Simple pattern, but no usable literals or no surviving candidates;
    /// executed over the full candidate set.
    SimpleNoTrigrams,
    /// Complex pattern executed directly on every candidate.
    ComplexDirect,
    /// The pattern failed to compile; no matches were produced.
    Error,
}

impl ExecutionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPath::SimpleTrigramFiltered => "simple_trigram_filtered",
            ExecutionPath::SimpleNoTrigrams => "simple_no_trigrams",
            ExecutionPath::ComplexDirect => "complex_direct",
            ExecutionPath::Error => "error",
        }
    }
}

/// Per-search execution report emitted alongside the match list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub path: ExecutionPath,
    pub pattern: String,
    pub case_insensitive: bool,
    pub cache_hit: bool,
    pub candidates_total: usize,
    pub candidates_filtered: usize,
    pub matches_found: usize,
    pub total_time: Duration,
    pub cache_lookup_time: Duration,
    pub filter_time: Duration,
    pub execute_time: Duration,
    /// Compilation diagnostic when `path == Error`.
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn is_error(&self) -> bool {
        self.path == ExecutionPath::Error
    }
}

/// The matcher layer that produced a winning semantic score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    None,
    Exact,
    Substring,
    Phrase,
    Annotation,
    Fuzzy,
    Stemming,
    NameSplit,
    Abbreviation,
}

impl MatchKind {
    /// Canonical confidence carried by each layer's identity.
    pub fn confidence(&self) -> f64 {
        match self {
            MatchKind::None => 0.0,
            MatchKind::Exact => 1.0,
            MatchKind::Substring => 0.95,
            MatchKind::Phrase => 0.92,
            MatchKind::Annotation => 0.90,
            MatchKind::Fuzzy => 0.80,
            MatchKind::Stemming => 0.70,
            MatchKind::NameSplit => 0.60,
            MatchKind::Abbreviation => 0.50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::None => "none",
            MatchKind::Exact => "exact",
            MatchKind::Substring => "substring",
            MatchKind::Phrase => "phrase",
            MatchKind::Annotation => "annotation",
            MatchKind::Fuzzy => "fuzzy",
            MatchKind::Stemming => "stemming",
            MatchKind::NameSplit => "name_split",
            MatchKind::Abbreviation => "abbreviation",
        }
    }
}

/// Outcome of scoring one symbol name against one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticScore {
    /// Combined score in `[0, 1]`.
    pub score: f64,
    pub match_kind: MatchKind,
    /// Layer confidence in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable account of why the layer matched.
    pub justification: String,
    /// Layer-specific diagnostic key/value pairs.
    pub details: HashMap<String, String>,
}

impl SemanticScore {
    pub fn new(score: f64, match_kind: MatchKind, justification: impl Into<String>) -> Self {
        Self {
            score,
            match_kind,
            confidence: match_kind.confidence(),
            justification: justification.into(),
            details: HashMap::new(),
        }
    }

    /// The no-match outcome.
    pub fn none() -> Self {
        Self {
            score: 0.0,
            match_kind: MatchKind::None,
            confidence: 0.0,
            justification: String::new(),
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn is_match(&self) -> bool {
        self.match_kind != MatchKind::None && self.score > 0.0
    }

    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.score) && (0.0..=1.0).contains(&self.confidence)
    }
}

/// A ranked semantic search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSymbol {
    pub symbol: String,
    pub score: SemanticScore,
    /// 1-based position within the result list.
    pub rank: usize,
}

/// Report produced by [`crate::semantic::SemanticScorer::search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub query: String,
    pub results: Vec<ScoredSymbol>,
    pub candidates_considered: usize,
    pub results_returned: usize,
    pub execution_time_ns: u64,
    pub timestamp: DateTime<Utc>,
}

/// One declared dependency of an annotated symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub kind: String,
    pub name: String,
    pub mode: String,
}

/// Structured metadata attached to a symbol by the upstream annotator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub labels: Vec<String>,
    pub category: String,
    pub tags: HashMap<String, String>,
    pub dependencies: Vec<Dependency>,
}
