//! Top-level index facade.
//!
//! Wires the in-memory stores, the hybrid regex engine, and the semantic
//! scorer into one handle for embedders that don't bring their own
//! collaborators: feed it files and symbols, then run pattern or
//! natural-language searches.

use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};

use crate::annotations::{AnnotationQuery, AnnotationSearchIndex};
use crate::config::{EngineConfig, SemanticConfig};
use crate::engine::{EngineMetricsSnapshot, HybridSearchEngine};
use crate::providers::{ContentProvider, InMemoryContentStore, InMemoryTrigramIndex};
use crate::semantic::SemanticScorer;
use crate::types::{
    AnnotationRecord, ExecutionResult, FileId, Match, SearchReport, SymbolId,
};

/// An in-process code index over memory-resident file contents.
pub struct LightningIndex {
    content: Arc<InMemoryContentStore>,
    trigrams: Arc<InMemoryTrigramIndex>,
    annotations: Arc<AnnotationSearchIndex>,
    engine: HybridSearchEngine,
    scorer: SemanticScorer,
    symbols: RwLock<Vec<(SymbolId, String)>>,
}

impl LightningIndex {
    pub fn new() -> Self {
        Self::with_configs(EngineConfig::default(), SemanticConfig::default())
            .expect("default configurations are valid")
    }

    pub fn with_configs(engine: EngineConfig, semantic: SemanticConfig) -> Result<Self> {
        let content = Arc::new(InMemoryContentStore::new());
        let trigrams = Arc::new(InMemoryTrigramIndex::new());
        let annotations = Arc::new(AnnotationSearchIndex::new());
        let engine = HybridSearchEngine::with_config(engine)?
            .with_trigram_index(Arc::clone(&trigrams) as Arc<dyn crate::providers::TrigramIndex>);
        let scorer = SemanticScorer::with_annotation_index(
            semantic,
            Arc::clone(&annotations) as Arc<dyn crate::providers::AnnotationIndex>,
        )?;
        Ok(Self {
            content,
            trigrams,
            annotations,
            engine,
            scorer,
            symbols: RwLock::new(Vec::new()),
        })
    }

    /// Register a file's content under a caller-chosen non-zero id.
    pub fn add_file(&self, raw_id: u32, content: impl Into<Vec<u8>>) -> Result<FileId> {
        let file_id = match FileId::new(raw_id) {
            Some(file_id) => file_id,
            None => bail!("file id 0 is not valid"),
        };
        if self.content.get(file_id).is_some() {
            bail!("file {} is already indexed", file_id);
        }
        let bytes: Vec<u8> = content.into();
        self.trigrams.insert_file(file_id, &bytes);
        self.content.insert(file_id, bytes);
        Ok(file_id)
    }

    /// Register a symbol name under a 1-based local index within a file.
    pub fn add_symbol(&self, file_id: FileId, local_index: u32, name: &str) -> Result<SymbolId> {
        let symbol = match SymbolId::from_parts(file_id, local_index) {
            Some(symbol) => symbol,
            None => bail!("local symbol index 0 is not valid"),
        };
        let mut symbols = self.symbols.write().unwrap_or_else(|poisoned| {
            tracing::warn!("RwLock poisoned in LightningIndex symbols");
            poisoned.into_inner()
        });
        symbols.push((symbol, name.to_string()));
        Ok(symbol)
    }

    /// Attach annotation metadata to a registered symbol.
    pub fn annotate(&self, symbol: SymbolId, record: AnnotationRecord) {
        self.annotations.insert(symbol, record);
    }

    /// Regex or literal search across every indexed file.
    pub fn search_pattern(
        &self,
        pattern: &str,
        case_insensitive: bool,
    ) -> (Vec<Match>, ExecutionResult) {
        let candidates = self.content.file_ids();
        self.engine
            .search(pattern, case_insensitive, self.content.as_ref(), &candidates)
    }

    /// Regex search restricted to the supplied candidates, in their order.
    pub fn search_pattern_in(
        &self,
        pattern: &str,
        case_insensitive: bool,
        candidates: &[FileId],
    ) -> (Vec<Match>, ExecutionResult) {
        self.engine
            .search(pattern, case_insensitive, self.content.as_ref(), candidates)
    }

    /// Natural-language symbol search across every registered symbol.
    pub fn search_symbols(&self, query: &str) -> SearchReport {
        let names: Vec<String> = {
            let symbols = self.symbols.read().unwrap_or_else(|poisoned| {
                tracing::warn!("RwLock poisoned in LightningIndex symbols");
                poisoned.into_inner()
            });
            symbols.iter().map(|(_, name)| name.clone()).collect()
        };
        self.scorer.search(query, &names)
    }

    /// Composed annotation filter with AND semantics.
    pub fn annotation_query(&self, query: &AnnotationQuery) -> Vec<SymbolId> {
        self.annotations.query(query)
    }

    pub fn file_count(&self) -> usize {
        self.content.len()
    }

    pub fn engine(&self) -> &HybridSearchEngine {
        &self.engine
    }

    pub fn scorer(&self) -> &SemanticScorer {
        &self.scorer
    }

    pub fn engine_metrics(&self) -> EngineMetricsSnapshot {
        self.engine.metrics()
    }
}

impl Default for LightningIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExecutionPath, MatchKind};

    #[test]
    fn test_end_to_end_pattern_search() {
        let index = LightningIndex::new();
        index.add_file(1, &b"fn parse_config() {}"[..]).unwrap();
        index.add_file(2, &b"fn render_page() {}"[..]).unwrap();
        let (matches, result) = index.search_pattern("parse_config", false);
        assert_eq!(matches.len(), 1);
        assert_eq!(result.path, ExecutionPath::SimpleTrigramFiltered);
    }

    #[test]
    fn test_duplicate_file_rejected() {
        let index = LightningIndex::new();
        index.add_file(1, &b"content"[..]).unwrap();
        assert!(index.add_file(1, &b"other"[..]).is_err());
        assert!(index.add_file(0, &b"zero"[..]).is_err());
        assert_eq!(index.file_count(), 1);
    }

    #[test]
    fn test_end_to_end_symbol_search() {
        let index = LightningIndex::new();
        let file = index.add_file(1, &b"..."[..]).unwrap();
        index.add_symbol(file, 1, "HTTPClient").unwrap();
        index.add_symbol(file, 2, "DatabaseClient").unwrap();
        let report = index.search_symbols("HTTP client");
        assert_eq!(report.results[0].symbol, "HTTPClient");
    }

    #[test]
    fn test_annotation_layer_through_facade() {
        let index = LightningIndex::new();
        let file = index.add_file(1, &b"..."[..]).unwrap();
        let symbol = index.add_symbol(file, 1, "TokenStore").unwrap();
        index.annotate(
            symbol,
            AnnotationRecord {
                labels: vec!["auth".to_string()],
                category: "security".to_string(),
                ..AnnotationRecord::default()
            },
        );
        // The query names a label, so the annotation layer matches even
        // though the symbol text shares nothing with it.
        let score = index.scorer().score("auth", "UnrelatedName");
        assert_eq!(score.match_kind, MatchKind::Annotation);

        let hits = index.annotation_query(&AnnotationQuery::new().with_label("auth"));
        assert_eq!(hits, vec![symbol]);
    }
}
