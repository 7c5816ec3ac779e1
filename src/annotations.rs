//! In-memory inverted indexes over symbol annotations.
//!
//! Built from an upstream annotator's records: label, category, and
//! `key:value` tag postings plus per-symbol dependency lists and reverse
//! label/category maps. The query builder composes filters with AND
//! semantics; an empty filter set yields no results.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::types::{AnnotationRecord, Dependency, SymbolId};

#[derive(Default)]
struct Inner {
    by_label: HashMap<String, Vec<SymbolId>>,
    by_category: HashMap<String, Vec<SymbolId>>,
    by_tag: HashMap<String, Vec<SymbolId>>,
    dependencies: HashMap<SymbolId, Vec<Dependency>>,
    /// "kind:name" -> symbols declaring such a dependency.
    dependents: HashMap<String, Vec<SymbolId>>,
    labels_of: HashMap<SymbolId, Vec<String>>,
    category_of: HashMap<SymbolId, String>,
}

fn insert_sorted(list: &mut Vec<SymbolId>, symbol: SymbolId) {
    if let Err(pos) = list.binary_search(&symbol) {
        list.insert(pos, symbol);
    }
}

fn tag_key(key: &str, value: &str) -> String {
    format!("{}:{}", key.to_lowercase(), value.to_lowercase())
}

fn dependency_key(kind: &str, name: &str) -> String {
    format!("{}:{}", kind.to_lowercase(), name.to_lowercase())
}

/// Thread-safe annotation index. Keys are lowercased on insert so query
/// strings compare case-insensitively.
#[derive(Default)]
pub struct AnnotationSearchIndex {
    inner: RwLock<Inner>,
}

impl AnnotationSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one annotated symbol.
    pub fn insert(&self, symbol: SymbolId, record: AnnotationRecord) {
        let mut inner = self.write_inner();
        for label in &record.labels {
            insert_sorted(inner.by_label.entry(label.to_lowercase()).or_default(), symbol);
        }
        if !record.category.is_empty() {
            insert_sorted(
                inner
                    .by_category
                    .entry(record.category.to_lowercase())
                    .or_default(),
                symbol,
            );
            inner
                .category_of
                .insert(symbol, record.category.to_lowercase());
        }
        for (key, value) in &record.tags {
            insert_sorted(inner.by_tag.entry(tag_key(key, value)).or_default(), symbol);
        }
        for dependency in &record.dependencies {
            insert_sorted(
                inner
                    .dependents
                    .entry(dependency_key(&dependency.kind, &dependency.name))
                    .or_default(),
                symbol,
            );
        }
        inner.labels_of.insert(
            symbol,
            record.labels.iter().map(|l| l.to_lowercase()).collect(),
        );
        inner.dependencies.insert(symbol, record.dependencies);
    }

    pub fn symbol_count(&self) -> usize {
        self.read_inner().labels_of.len()
    }

    /// Labels attached to one symbol.
    pub fn labels_of(&self, symbol: SymbolId) -> Vec<String> {
        self.read_inner()
            .labels_of
            .get(&symbol)
            .cloned()
            .unwrap_or_default()
    }

    /// Category of one symbol, if annotated.
    pub fn category_of(&self, symbol: SymbolId) -> Option<String> {
        self.read_inner().category_of.get(&symbol).cloned()
    }

    /// Declared dependencies of one symbol.
    pub fn dependencies_of(&self, symbol: SymbolId) -> Vec<Dependency> {
        self.read_inner()
            .dependencies
            .get(&symbol)
            .cloned()
            .unwrap_or_default()
    }

    /// Run a composed query; filters intersect.
    pub fn query(&self, query: &AnnotationQuery) -> Vec<SymbolId> {
        if query.is_empty() {
            return Vec::new();
        }
        let inner = self.read_inner();
        let mut result: Option<Vec<SymbolId>> = None;

        let mut apply = |posting: Option<&Vec<SymbolId>>, result: &mut Option<Vec<SymbolId>>| {
            let posting = posting.map(|p| p.as_slice()).unwrap_or(&[]);
            *result = Some(match result.take() {
                None => posting.to_vec(),
                Some(current) => intersect(&current, posting),
            });
        };

        for label in &query.labels {
            apply(inner.by_label.get(&label.to_lowercase()), &mut result);
        }
        for category in &query.categories {
            apply(inner.by_category.get(&category.to_lowercase()), &mut result);
        }
        for (key, value) in &query.tags {
            apply(inner.by_tag.get(&tag_key(key, value)), &mut result);
        }
        for (kind, name) in &query.dependencies {
            apply(inner.dependents.get(&dependency_key(kind, name)), &mut result);
        }
        result.unwrap_or_default()
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("RwLock poisoned in AnnotationSearchIndex");
            poisoned.into_inner()
        })
    }

    fn write_inner(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("RwLock poisoned in AnnotationSearchIndex");
            poisoned.into_inner()
        })
    }
}

fn intersect(a: &[SymbolId], b: &[SymbolId]) -> Vec<SymbolId> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

impl crate::providers::AnnotationIndex for AnnotationSearchIndex {
    fn symbols_by_label(&self, label: &str) -> Vec<SymbolId> {
        self.read_inner()
            .by_label
            .get(&label.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn symbols_by_category(&self, category: &str) -> Vec<SymbolId> {
        self.read_inner()
            .by_category
            .get(&category.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn symbols_by_tag(&self, key: &str, value: &str) -> Vec<SymbolId> {
        self.read_inner()
            .by_tag
            .get(&tag_key(key, value))
            .cloned()
            .unwrap_or_default()
    }

    fn symbols_depending_on(&self, kind: &str, name: &str) -> Vec<SymbolId> {
        self.read_inner()
            .dependents
            .get(&dependency_key(kind, name))
            .cloned()
            .unwrap_or_default()
    }

    fn label_stats(&self) -> Vec<(String, usize)> {
        let inner = self.read_inner();
        let mut stats: Vec<(String, usize)> = inner
            .by_label
            .iter()
            .map(|(label, symbols)| (label.clone(), symbols.len()))
            .collect();
        stats.sort();
        stats
    }

    fn category_stats(&self) -> Vec<(String, usize)> {
        let inner = self.read_inner();
        let mut stats: Vec<(String, usize)> = inner
            .by_category
            .iter()
            .map(|(category, symbols)| (category.clone(), symbols.len()))
            .collect();
        stats.sort();
        stats
    }
}

/// Composable AND filter over the annotation dimensions.
#[derive(Debug, Clone, Default)]
pub struct AnnotationQuery {
    labels: Vec<String>,
    categories: Vec<String>,
    tags: Vec<(String, String)>,
    dependencies: Vec<(String, String)>,
}

impl AnnotationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn with_dependency(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.dependencies.push((kind.into(), name.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
            && self.categories.is_empty()
            && self.tags.is_empty()
            && self.dependencies.is_empty()
    }
}
